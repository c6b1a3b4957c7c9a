//! Per-platform registry of tracked streams and their subscribed channels.
//!
//! Streams are indexed by [`StreamKey`] with a lowercased-name alias index,
//! so a lookup by id and a later lookup by name land on the same entry. An
//! entry never outlives its last subscriber.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use serde_json::Value;
use stream_platforms::Platform;
use tracing::{debug, warn};

use super::persistence::StateStore;
use crate::Result;
use crate::domain::{ChannelId, StreamKey, TrackedStream};

/// Result of toggling a channel's subscription to a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Toggle {
    Enabled,
    Disabled,
}

#[derive(Debug, Clone, Default)]
struct PlatformStreams {
    entries: BTreeMap<StreamKey, TrackedStream>,
    names: HashMap<String, StreamKey>,
}

impl PlatformStreams {
    /// When both the caller and the stored entry carry an id, only the id
    /// decides; otherwise the name does, case-insensitively.
    fn find(&self, name: &str, id: Option<&str>) -> Option<StreamKey> {
        if let Some(id) = id {
            let key = StreamKey::Id(id.to_string());
            if self.entries.contains_key(&key) {
                return Some(key);
            }
        }
        let key = self.names.get(&name.to_lowercase())?;
        match (key, id) {
            (StreamKey::Id(stored), Some(id)) if stored != id => None,
            _ => Some(key.clone()),
        }
    }

    /// Insert a stream, merging it into an existing entry with the same key.
    fn insert(&mut self, stream: TrackedStream) -> StreamKey {
        let key = stream.key();
        self.names.insert(stream.name.to_lowercase(), key.clone());
        match self.entries.entry(key.clone()) {
            Entry::Occupied(mut existing) => {
                let existing = existing.get_mut();
                existing.channels.extend(stream.channels);
                existing.online |= stream.online;
            }
            Entry::Vacant(slot) => {
                slot.insert(stream);
            }
        }
        key
    }

    fn remove(&mut self, key: &StreamKey) -> Option<TrackedStream> {
        let stream = self.entries.remove(key)?;
        let alias = stream.name.to_lowercase();
        if self.names.get(&alias) == Some(key) {
            self.names.remove(&alias);
            // Another entry may share the name (e.g. before migration merged it).
            if let Some(other) = self
                .entries
                .iter()
                .find(|(_, s)| s.name.to_lowercase() == alias)
                .map(|(k, _)| k.clone())
            {
                self.names.insert(alias, other);
            }
        }
        Some(stream)
    }
}

/// Suffix of the key a platform document is copied to before its
/// unreadable records are dropped.
pub const INVALID_BACKUP_SUFFIX: &str = "invalid";

/// Subscriptions for every platform.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionStore {
    platforms: BTreeMap<Platform, PlatformStreams>,
    /// Platforms whose stored document could neither be read nor copied
    /// aside. They are left out of snapshots so the document survives.
    read_only: BTreeSet<Platform>,
}

impl SubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn streams(&self, platform: Platform) -> Option<&PlatformStreams> {
        self.platforms.get(&platform)
    }

    fn streams_mut(&mut self, platform: Platform) -> &mut PlatformStreams {
        self.platforms.entry(platform).or_default()
    }

    /// Add `channel` to the stream's subscribers, or remove it if it is
    /// already subscribed.
    ///
    /// `resolved_id` is the platform id when the caller resolved one; an
    /// existing entry that lacks an id adopts it.
    pub fn toggle(
        &mut self,
        platform: Platform,
        name: &str,
        channel: ChannelId,
        resolved_id: Option<&str>,
    ) -> Toggle {
        let streams = self.streams_mut(platform);

        let Some(mut key) = streams.find(name, resolved_id) else {
            let mut stream = TrackedStream::new(name, resolved_id.map(str::to_string));
            stream.channels.insert(channel);
            let key = streams.insert(stream);
            debug!(%platform, stream = %key, channel = %channel, "Created tracked stream");
            return Toggle::Enabled;
        };

        if let Some(id) = resolved_id
            && streams.entries.get(&key).is_some_and(|s| s.id.is_none())
            && let Some(mut stream) = streams.remove(&key)
        {
            stream.id = Some(id.to_string());
            key = streams.insert(stream);
        }

        let Some(stream) = streams.entries.get_mut(&key) else {
            return Toggle::Disabled;
        };

        if stream.channels.remove(&channel) {
            if stream.channels.is_empty() {
                streams.remove(&key);
                debug!(%platform, stream = %key, "Removed tracked stream without subscribers");
            }
            Toggle::Disabled
        } else {
            stream.channels.insert(channel);
            Toggle::Enabled
        }
    }

    /// Key of the stream matching `name`/`id`, using the same rules as
    /// [`toggle`](Self::toggle).
    pub fn find(&self, platform: Platform, name: &str, id: Option<&str>) -> Option<StreamKey> {
        self.streams(platform)?.find(name, id)
    }

    pub fn get(&self, platform: Platform, key: &StreamKey) -> Option<&TrackedStream> {
        self.streams(platform)?.entries.get(key)
    }

    pub fn get_mut(&mut self, platform: Platform, key: &StreamKey) -> Option<&mut TrackedStream> {
        self.platforms.get_mut(&platform)?.entries.get_mut(key)
    }

    pub fn iter(&self, platform: Platform) -> impl Iterator<Item = &TrackedStream> {
        self.streams(platform)
            .into_iter()
            .flat_map(|s| s.entries.values())
    }

    pub fn keys(&self, platform: Platform) -> Vec<StreamKey> {
        self.streams(platform)
            .map(|s| s.entries.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self, platform: Platform) -> usize {
        self.streams(platform).map_or(0, |s| s.entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.platforms.values().all(|s| s.entries.is_empty())
    }

    pub fn remove(&mut self, platform: Platform, key: &StreamKey) -> Option<TrackedStream> {
        self.platforms.get_mut(&platform)?.remove(key)
    }

    /// Give a stream its platform id, merging it into an entry that
    /// already carries that id. Returns the stream's new key.
    pub fn assign_id(&mut self, platform: Platform, key: &StreamKey, id: &str) -> Option<StreamKey> {
        let streams = self.platforms.get_mut(&platform)?;
        let mut stream = streams.remove(key)?;
        stream.id = Some(id.to_string());
        Some(streams.insert(stream))
    }

    /// Streams that have no platform id yet, with their names.
    pub fn unresolved(&self, platform: Platform) -> Vec<(StreamKey, String)> {
        self.iter(platform)
            .filter(|s| s.id.is_none())
            .map(|s| (s.key(), s.name.clone()))
            .collect()
    }

    /// Remove `channel` from every stream on every platform. Returns the
    /// number of subscriptions removed.
    pub fn unsubscribe_all(&mut self, channel: ChannelId) -> usize {
        let mut removed = 0;
        for streams in self.platforms.values_mut() {
            let mut emptied = Vec::new();
            for (key, stream) in streams.entries.iter_mut() {
                if stream.channels.remove(&channel) {
                    removed += 1;
                    if stream.channels.is_empty() {
                        emptied.push(key.clone());
                    }
                }
            }
            for key in emptied {
                streams.remove(&key);
            }
        }
        removed
    }

    /// `(platform, name)` of every stream `channel` is subscribed to.
    pub fn subscriptions_for(&self, channel: ChannelId) -> Vec<(Platform, String)> {
        self.platforms
            .iter()
            .flat_map(|(platform, streams)| {
                streams
                    .entries
                    .values()
                    .filter(move |s| s.is_subscribed(channel))
                    .map(move |s| (*platform, s.name.clone()))
            })
            .collect()
    }

    /// Replace a platform's streams with `records`.
    ///
    /// Records without subscribers are dropped and records sharing a key
    /// are merged.
    pub fn replace(&mut self, platform: Platform, records: Vec<TrackedStream>) {
        let mut streams = PlatformStreams::default();
        for record in records {
            if record.has_subscribers() {
                streams.insert(record);
            } else {
                debug!(%platform, stream = %record.name, "Dropping stored stream without subscribers");
            }
        }
        self.platforms.insert(platform, streams);
    }

    pub fn records(&self, platform: Platform) -> Vec<TrackedStream> {
        self.iter(platform).cloned().collect()
    }

    /// Whether the platform's stored document is left untouched on save.
    pub fn is_read_only(&self, platform: Platform) -> bool {
        self.read_only.contains(&platform)
    }

    /// Load every platform's streams.
    ///
    /// A missing document starts empty. Unreadable records are skipped
    /// after the document is copied to `<platform>.invalid`; if that copy
    /// fails, or the document cannot be loaded at all, the platform is
    /// never written back.
    pub async fn load(store: &dyn StateStore) -> Self {
        let mut subscriptions = Self::new();
        for platform in Platform::ALL {
            let records = match store.load(platform.as_str()).await {
                Ok(Some(value)) => {
                    let (records, rejected) = parse_records(platform, &value);
                    if rejected > 0 && !back_up(store, platform, &value).await {
                        subscriptions.read_only.insert(platform);
                    }
                    records
                }
                Ok(None) => Vec::new(),
                Err(e) => {
                    warn!(%platform, error = %e, "Failed to load stored streams; leaving them untouched");
                    subscriptions.read_only.insert(platform);
                    Vec::new()
                }
            };
            subscriptions.replace(platform, records);
        }
        subscriptions
    }

    /// Serialize the given platforms for a later [`StoreSnapshot::save`].
    ///
    /// Taking the snapshot is synchronous so it can happen under the state
    /// lock; the save itself runs after the lock is released.
    pub fn snapshot(&self, platforms: &[Platform]) -> Result<StoreSnapshot> {
        let mut documents = Vec::with_capacity(platforms.len());
        for &platform in platforms {
            if self.is_read_only(platform) {
                warn!(%platform, "Stored streams failed to load; not overwriting them");
                continue;
            }
            documents.push((platform, serde_json::to_value(self.records(platform))?));
        }
        Ok(StoreSnapshot { documents })
    }
}

/// Parse a platform document record by record. Returns the readable
/// records and how many were rejected.
fn parse_records(platform: Platform, value: &Value) -> (Vec<TrackedStream>, usize) {
    let Some(items) = value.as_array() else {
        warn!(%platform, "Stored streams are not a list; ignoring them");
        return (Vec::new(), 1);
    };

    let mut rejected = 0;
    let records = items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item.clone()) {
            Ok(record) => Some(record),
            Err(e) => {
                rejected += 1;
                warn!(%platform, index, error = %e, record = %item, "Skipping unreadable stored stream");
                None
            }
        })
        .collect();
    (records, rejected)
}

/// Copy a platform document aside. Returns whether the copy was written.
async fn back_up(store: &dyn StateStore, platform: Platform, value: &Value) -> bool {
    let key = format!("{}.{INVALID_BACKUP_SUFFIX}", platform.as_str());
    match store.save(&key, value).await {
        Ok(()) => {
            warn!(%platform, backup = %key, "Stored streams had unreadable records; original copied aside");
            true
        }
        Err(e) => {
            warn!(%platform, error = %e, "Failed to copy stored streams aside; leaving them untouched");
            false
        }
    }
}

/// Serialized platform documents waiting to be written.
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    documents: Vec<(Platform, Value)>,
}

impl StoreSnapshot {
    /// Write every document, attempting all of them even if one fails.
    /// Returns the first error.
    pub async fn save(&self, store: &dyn StateStore) -> Result<()> {
        let mut first_error = None;
        for (platform, value) in &self.documents {
            if let Err(e) = store.save(platform.as_str(), value).await {
                warn!(%platform, error = %e, "Failed to save streams");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
