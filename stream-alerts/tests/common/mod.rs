#![allow(dead_code)]
//! In-process fakes for the engine tests.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use stream_alerts::domain::{ChannelId, GuildId, MessageId};
use stream_alerts::notification::{ChannelInfo, MessageTransport, RenderedNotification};
use stream_alerts::{
    AlertService, DefaultRenderer, MemoryStore, NotificationEventBroadcaster, NotificationManager,
    PollingScheduler, SchedulerConfig, StateHandle, StateStore,
};
use stream_platforms::{
    LiveInfo, Platform, ProviderError, ProviderRegistry, ResolvedChannel, StreamProvider,
    StreamStatus,
};

/// Scripted answer for one stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Online,
    Offline,
    NotFound,
    ApiError(u16),
    BadToken,
    Hang,
}

type CheckHook = Box<dyn Fn(&str) + Send + Sync>;

pub struct FakeProvider {
    platform: Platform,
    replies: Mutex<HashMap<String, Reply>>,
    ids: Mutex<HashMap<String, String>>,
    checks: Mutex<Vec<String>>,
    resolve_calls: Mutex<Vec<Vec<String>>>,
    reject_token: Mutex<bool>,
    on_check: Mutex<Option<CheckHook>>,
}

impl FakeProvider {
    pub fn new(platform: Platform) -> Arc<Self> {
        Arc::new(Self {
            platform,
            replies: Mutex::new(HashMap::new()),
            ids: Mutex::new(HashMap::new()),
            checks: Mutex::new(Vec::new()),
            resolve_calls: Mutex::new(Vec::new()),
            reject_token: Mutex::new(false),
            on_check: Mutex::new(None),
        })
    }

    pub fn reply(&self, key: &str, reply: Reply) {
        self.replies.lock().insert(key.to_string(), reply);
    }

    /// Make `name` resolvable to `id`.
    pub fn know(&self, name: &str, id: &str) {
        self.ids.lock().insert(name.to_lowercase(), id.to_string());
    }

    /// Make name lookups fail with invalid credentials.
    pub fn reject_token(&self, reject: bool) {
        *self.reject_token.lock() = reject;
    }

    pub fn checks(&self) -> Vec<String> {
        self.checks.lock().clone()
    }

    pub fn resolve_calls(&self) -> Vec<Vec<String>> {
        self.resolve_calls.lock().clone()
    }

    /// Run `hook` while a status check is in flight.
    pub fn on_check(&self, hook: impl Fn(&str) + Send + Sync + 'static) {
        *self.on_check.lock() = Some(Box::new(hook));
    }
}

pub fn live(platform: Platform, name: &str) -> LiveInfo {
    LiveInfo::builder(platform, name, format!("https://example.com/{name}"))
        .title("Live now")
        .build()
}

#[async_trait]
impl StreamProvider for FakeProvider {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn check_status(
        &self,
        key: &str,
        _token: Option<&str>,
    ) -> Result<StreamStatus, ProviderError> {
        self.checks.lock().push(key.to_string());
        if let Some(hook) = self.on_check.lock().as_ref() {
            hook(key);
        }

        let reply = self
            .replies
            .lock()
            .get(key)
            .copied()
            .unwrap_or(Reply::Offline);
        match reply {
            Reply::Online => Ok(StreamStatus::Online(Box::new(live(self.platform, key)))),
            Reply::Offline => Ok(StreamStatus::Offline),
            Reply::NotFound => Ok(StreamStatus::NotFound),
            Reply::ApiError(status) => Err(ProviderError::Api { status }),
            Reply::BadToken => Err(ProviderError::InvalidCredentials),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(StreamStatus::Offline)
            }
        }
    }

    async fn resolve_identifiers(
        &self,
        names: &[String],
        _token: Option<&str>,
        require_match: bool,
    ) -> Result<Vec<ResolvedChannel>, ProviderError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        self.resolve_calls.lock().push(names.to_vec());
        if *self.reject_token.lock() {
            return Err(ProviderError::InvalidCredentials);
        }

        let ids = self.ids.lock();
        let resolved: Vec<ResolvedChannel> = names
            .iter()
            .filter_map(|name| {
                ids.get(&name.to_lowercase()).map(|id| ResolvedChannel {
                    name: name.to_lowercase(),
                    id: id.clone(),
                })
            })
            .collect();

        if require_match && resolved.is_empty() {
            return Err(ProviderError::StreamerNotFound);
        }
        Ok(resolved)
    }

    fn parse_channel_name(&self, input: &str) -> String {
        input
            .trim()
            .trim_start_matches("https://example.com/")
            .to_string()
    }
}

#[derive(Default)]
pub struct FakeTransport {
    channels: Mutex<HashMap<ChannelId, ChannelInfo>>,
    failing: Mutex<HashSet<ChannelId>>,
    pub sent: Mutex<Vec<(ChannelId, MessageId, String)>>,
    pub deleted: Mutex<Vec<(ChannelId, MessageId)>>,
    next_id: Mutex<u64>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_channel(&self, channel: u64, guild: u64) {
        self.channels.lock().insert(
            ChannelId(channel),
            ChannelInfo {
                guild: GuildId(guild),
                can_send: true,
            },
        );
    }

    pub fn fail_sends_to(&self, channel: u64) {
        self.failing.lock().insert(ChannelId(channel));
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn deleted_count(&self) -> usize {
        self.deleted.lock().len()
    }
}

#[async_trait]
impl MessageTransport for FakeTransport {
    async fn channel_info(&self, channel: ChannelId) -> stream_alerts::Result<Option<ChannelInfo>> {
        Ok(self.channels.lock().get(&channel).copied())
    }

    async fn send_message(
        &self,
        channel: ChannelId,
        message: &RenderedNotification,
    ) -> stream_alerts::Result<MessageId> {
        if self.failing.lock().contains(&channel) {
            return Err(stream_alerts::Error::transport("send rejected"));
        }
        let id = {
            let mut next = self.next_id.lock();
            *next += 1;
            MessageId(*next)
        };
        self.sent.lock().push((channel, id, message.content.clone()));
        Ok(id)
    }

    async fn delete_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> stream_alerts::Result<()> {
        self.deleted.lock().push((channel, message));
        Ok(())
    }
}

/// A fully wired engine over fakes.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub state: StateHandle,
    pub twitch: Arc<FakeProvider>,
    pub mixer: Arc<FakeProvider>,
    pub transport: Arc<FakeTransport>,
    pub notifier: Arc<NotificationManager>,
    pub scheduler: PollingScheduler,
    pub service: AlertService,
}

pub const TIMEOUT: Duration = Duration::from_millis(200);

impl Harness {
    /// Build an engine over `store`, loading whatever it already holds.
    pub async fn with_store(store: Arc<MemoryStore>) -> Self {
        let twitch = FakeProvider::new(Platform::Twitch);
        let mixer = FakeProvider::new(Platform::Mixer);
        let transport = FakeTransport::new();

        let mut providers = ProviderRegistry::new();
        providers.register(twitch.clone()).register(mixer.clone());

        let dyn_store: Arc<dyn StateStore> = store.clone();
        let state = StateHandle::load(dyn_store, Some("client-id")).await;

        let notifier = Arc::new(NotificationManager::new(
            transport.clone(),
            Arc::new(DefaultRenderer),
            NotificationEventBroadcaster::new(),
        ));
        let scheduler = PollingScheduler::new(
            state.clone(),
            providers.clone(),
            notifier.clone(),
            SchedulerConfig {
                check_interval: Duration::from_millis(20),
                request_timeout: TIMEOUT,
            },
        );
        let service = AlertService::new(state.clone(), providers, TIMEOUT);

        Self {
            store,
            state,
            twitch,
            mixer,
            transport,
            notifier,
            scheduler,
            service,
        }
    }

    pub async fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new())).await
    }
}
