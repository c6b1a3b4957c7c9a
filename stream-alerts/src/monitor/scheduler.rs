//! Periodic status polling.
//!
//! One cycle migrates unresolved streams, checks every tracked stream once,
//! acts on state changes and writes the state back if anything changed.
//! Cycles run back to back with a fixed pause between them.

use std::sync::Arc;
use std::time::Duration;

use stream_platforms::{LiveInfo, Platform, ProviderRegistry, StreamProvider, StreamStatus};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::migration::MigrationTask;
use super::transition::{Transition, transition};
use super::with_timeout;
use crate::domain::{Settings, StreamKey, TrackedStream};
use crate::notification::NotificationManager;
use crate::state::{AlertState, StateHandle};

/// Scheduler timing.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Pause between the end of one cycle and the start of the next.
    pub check_interval: Duration,
    /// Upper bound on each provider call.
    pub request_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(60),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Outcome of one polling cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Streams whose status was requested.
    pub checked: usize,
    pub went_online: usize,
    pub went_offline: usize,
    /// Streams no longer tracked whose notifications were retracted.
    pub orphaned: usize,
    /// Status checks that failed; those streams were left unchanged.
    pub failures: usize,
    /// Streams without a usable key (unresolved ids).
    pub skipped: usize,
    /// Whether state was written back this cycle.
    pub persisted: bool,
}

/// Side effect decided under the state lock, performed after releasing it.
enum Action {
    Send(TrackedStream, Box<LiveInfo>, Settings),
    Retract(StreamKey, String, Settings),
}

pub struct PollingScheduler {
    state: StateHandle,
    providers: ProviderRegistry,
    notifier: Arc<NotificationManager>,
    migration: MigrationTask,
    config: SchedulerConfig,
}

impl PollingScheduler {
    pub fn new(
        state: StateHandle,
        providers: ProviderRegistry,
        notifier: Arc<NotificationManager>,
        config: SchedulerConfig,
    ) -> Self {
        let migration = MigrationTask::new(state.clone(), providers.clone(), config.request_timeout);
        Self {
            state,
            providers,
            notifier,
            migration,
            config,
        }
    }

    /// Run cycles until `cancel` fires. A cycle in progress is finished first.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            interval_secs = self.config.check_interval.as_secs(),
            "Stream polling started"
        );

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let report = self.run_cycle().await;
            debug!(
                checked = report.checked,
                went_online = report.went_online,
                went_offline = report.went_offline,
                orphaned = report.orphaned,
                failures = report.failures,
                skipped = report.skipped,
                persisted = report.persisted,
                "Polling cycle finished"
            );

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.check_interval) => {}
            }
        }

        info!("Stream polling stopped");
    }

    /// Run one full cycle over every platform.
    pub async fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();

        let migration = self.migration.run().await;
        if migration.changed() {
            info!(
                resolved = migration.resolved,
                dropped = migration.dropped,
                "Migrated streams to platform ids"
            );
        }

        for platform in self.providers.platforms() {
            match self.providers.get(platform) {
                Ok(provider) => self.check_platform(platform, provider.as_ref(), &mut report).await,
                Err(e) => warn!(%platform, error = %e, "No provider registered"),
            }
        }

        report.orphaned = self.retract_orphans().await;

        match self.state.flush().await {
            Ok(written) => report.persisted = written,
            Err(e) => warn!(error = %e, "Failed to save stream state; will retry next cycle"),
        }

        report
    }

    async fn check_platform(
        &self,
        platform: Platform,
        provider: &dyn StreamProvider,
        report: &mut CycleReport,
    ) {
        let (targets, token) = {
            let state = self.state.lock();
            let targets: Vec<(StreamKey, Option<String>)> = state
                .subscriptions
                .iter(platform)
                .map(|s| (s.key(), s.check_key(platform).map(str::to_string)))
                .collect();
            (targets, state.settings.token(platform).map(str::to_string))
        };

        for (key, check_key) in targets {
            let Some(check_key) = check_key else {
                report.skipped += 1;
                continue;
            };
            report.checked += 1;

            let status = match with_timeout(
                self.config.request_timeout,
                provider.check_status(&check_key, token.as_deref()),
            )
            .await
            {
                Ok(status) => status,
                Err(e) => {
                    report.failures += 1;
                    warn!(%platform, stream = %key, error = %e, transient = e.is_transient(), "Status check failed");
                    continue;
                }
            };

            let action = {
                let mut guard = self.state.lock();
                Self::apply(&mut guard, platform, &key, status)
            };

            match action {
                Some(Action::Send(stream, live, settings)) => {
                    report.went_online += 1;
                    self.notifier.send(platform, &stream, &live, &settings).await;
                }
                Some(Action::Retract(key, name, settings)) => {
                    report.went_offline += 1;
                    self.notifier.retract(platform, &key, &name, &settings).await;
                }
                None => {}
            }
        }
    }

    /// Retract notifications of streams that lost their last subscriber
    /// while live. Returns how many streams were retracted.
    async fn retract_orphans(&self) -> usize {
        let recorded = self.notifier.recorded().await;
        if recorded.is_empty() {
            return 0;
        }

        let (orphans, settings) = {
            let state = self.state.lock();
            let orphans: Vec<_> = recorded
                .into_iter()
                .filter(|(platform, key, _)| state.subscriptions.get(*platform, key).is_none())
                .collect();
            (orphans, state.settings.clone())
        };

        for (platform, key, name) in &orphans {
            debug!(%platform, stream = %key, "Stream no longer tracked; retracting its notifications");
            self.notifier.retract(*platform, key, name, &settings).await;
        }
        orphans.len()
    }

    /// Record the observed status on the stream, if it still exists, and
    /// decide what to tell subscribers.
    fn apply(
        state: &mut AlertState,
        platform: Platform,
        key: &StreamKey,
        status: StreamStatus,
    ) -> Option<Action> {
        let AlertState {
            subscriptions,
            settings,
            ..
        } = &mut *state;

        let Some(stream) = subscriptions.get_mut(platform, key) else {
            debug!(%platform, stream = %key, "Stream removed during check; ignoring result");
            return None;
        };

        let action = match (transition(stream.online, &status), status) {
            (Transition::WentOnline, StreamStatus::Online(live)) => {
                stream.online = true;
                Action::Send(stream.clone(), live, settings.clone())
            }
            (Transition::WentOffline, _) => {
                stream.online = false;
                Action::Retract(key.clone(), stream.name.clone(), settings.clone())
            }
            _ => return None,
        };

        state.mark_streams_unsaved();
        Some(action)
    }
}
