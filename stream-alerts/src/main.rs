use std::sync::Arc;

use anyhow::Context;
use stream_alerts::{
    AppConfig, DefaultRenderer, DiscordTransport, JsonFileStore, NotificationEventBroadcaster,
    NotificationManager, PollingScheduler, SchedulerConfig, StateHandle, StateStore, logging,
};
use stream_platforms::extractor::create_client_builder;
use stream_platforms::{Platform, default_registry};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    let (logging, _guard) = logging::init_logging(&config.log_dir, config.log_retention_days)?;

    let store: Arc<dyn StateStore> = Arc::new(JsonFileStore::new(&config.data_dir));
    let state = StateHandle::load(store, config.twitch_client_id.as_deref()).await;
    {
        let state = state.lock();
        for platform in Platform::ALL {
            info!(%platform, streams = state.subscriptions.len(platform), "Tracking streams");
        }
    }

    let client = create_client_builder(Some(config.request_timeout))
        .build()
        .context("failed to build HTTP client")?;
    let providers = default_registry(client.clone());

    let events = NotificationEventBroadcaster::new();
    let transport = DiscordTransport::new(client, config.discord_token.clone())
        .with_max_retry_wait(config.request_timeout);
    let notifier = Arc::new(
        NotificationManager::new(Arc::new(transport), Arc::new(DefaultRenderer), events.clone())
            .with_delivery_timeout(config.request_timeout),
    );

    let scheduler = PollingScheduler::new(
        state.clone(),
        providers,
        notifier,
        SchedulerConfig {
            check_interval: config.check_interval,
            request_timeout: config.request_timeout,
        },
    );

    let cancel = CancellationToken::new();
    logging.start_retention_cleanup(cancel.clone());

    let mut event_rx = events.subscribe();
    let event_cancel = cancel.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = event_cancel.cancelled() => break,
                event = event_rx.recv() => match event {
                    Ok(event) => debug!(
                        kind = ?event.kind,
                        platform = %event.platform,
                        stream = %event.stream,
                        destinations = event.destinations.len(),
                        "Notification event"
                    ),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Notification event observer lagged");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    });

    let polling = tokio::spawn({
        let cancel = cancel.clone();
        async move { scheduler.run(cancel).await }
    });

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Shutting down");
    cancel.cancel();
    polling.await.context("polling task failed")?;

    if let Err(e) = state.flush().await {
        warn!(error = %e, "Failed to save state on shutdown");
    }

    Ok(())
}
