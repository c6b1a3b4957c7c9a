//! Converts streams stored by name into streams stored by platform id.
//!
//! Platforms that check by id cannot poll a stream that only has a name.
//! Each cycle starts by resolving such names in bulk; a stream the
//! platform does not recognise is dropped.

use std::collections::HashMap;
use std::time::Duration;

use stream_platforms::{KeyKind, Platform, ProviderRegistry};
use tracing::{debug, info, warn};

use super::with_timeout;
use crate::state::StateHandle;

/// What one migration pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Streams that received an id.
    pub resolved: usize,
    /// Streams the platform did not know, removed.
    pub dropped: usize,
}

impl MigrationReport {
    pub fn changed(&self) -> bool {
        self.resolved > 0 || self.dropped > 0
    }
}

pub struct MigrationTask {
    state: StateHandle,
    providers: ProviderRegistry,
    request_timeout: Duration,
}

impl MigrationTask {
    pub fn new(state: StateHandle, providers: ProviderRegistry, request_timeout: Duration) -> Self {
        Self {
            state,
            providers,
            request_timeout,
        }
    }

    /// Resolve unresolved streams on every id-keyed platform.
    ///
    /// Failures are logged and leave the streams untouched; they are
    /// retried on the next pass.
    pub async fn run(&self) -> MigrationReport {
        let mut report = MigrationReport::default();
        for platform in self.providers.platforms() {
            if platform.key_kind() != KeyKind::Id {
                continue;
            }
            let platform_report = self.run_platform(platform).await;
            report.resolved += platform_report.resolved;
            report.dropped += platform_report.dropped;
        }
        report
    }

    async fn run_platform(&self, platform: Platform) -> MigrationReport {
        let mut report = MigrationReport::default();

        let (candidates, token) = {
            let state = self.state.lock();
            (
                state.subscriptions.unresolved(platform),
                state.settings.token(platform).map(str::to_string),
            )
        };
        if candidates.is_empty() {
            return report;
        }

        let provider = match self.providers.get(platform) {
            Ok(provider) => provider,
            Err(e) => {
                warn!(%platform, error = %e, "No provider for migration");
                return report;
            }
        };

        let names: Vec<String> = candidates.iter().map(|(_, name)| name.clone()).collect();
        debug!(%platform, count = names.len(), "Resolving stream names to ids");

        // A single batched call covers all names; the timeout scales with
        // the number of requests it makes.
        let batches = names.len().div_ceil(stream_platforms::RESOLVE_BATCH_SIZE) as u32;
        let resolved = match with_timeout(
            self.request_timeout * batches.max(1),
            provider.resolve_identifiers(&names, token.as_deref(), false),
        )
        .await
        {
            Ok(resolved) => resolved,
            Err(e) if e.is_credentials() => {
                warn!(%platform, error = %e, "Cannot convert stream names to ids: invalid token");
                return report;
            }
            Err(e) => {
                warn!(%platform, error = %e, "Cannot convert stream names to ids");
                return report;
            }
        };

        let ids: HashMap<String, String> = resolved
            .into_iter()
            .map(|channel| (channel.name.to_lowercase(), channel.id))
            .collect();

        let mut state = self.state.lock();
        for (key, name) in candidates {
            // Changed while the lookup was in flight; leave it for next pass.
            if state
                .subscriptions
                .get(platform, &key)
                .is_none_or(|s| s.id.is_some())
            {
                continue;
            }

            match ids.get(&name.to_lowercase()) {
                Some(id) => {
                    state.subscriptions.assign_id(platform, &key, id);
                    report.resolved += 1;
                    debug!(%platform, stream = %name, %id, "Resolved stream id");
                }
                None => {
                    state.subscriptions.remove(platform, &key);
                    report.dropped += 1;
                    info!(%platform, stream = %name, "Dropped stream the platform does not know");
                }
            }
        }

        if report.changed() {
            state.mark_streams_unsaved();
        }

        report
    }
}
