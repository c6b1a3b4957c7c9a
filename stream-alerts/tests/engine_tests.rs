#![allow(clippy::unwrap_used)]
// End-to-end tests of the polling engine against in-process fakes.

mod common;

use std::sync::Arc;

use common::{Harness, Reply};
use serde_json::json;
use stream_alerts::domain::{ChannelId, GuildId, MentionMode, StreamKey};
use stream_alerts::notification::NotificationKind;
use stream_alerts::{AlertError, MemoryStore, Toggle};
use stream_platforms::Platform;

const A: ChannelId = ChannelId(100);
const B: ChannelId = ChannelId(200);

#[tokio::test]
async fn test_subscribe_twice_removes_stream() {
    let h = Harness::new().await;

    assert_eq!(
        h.service.subscribe(Platform::Mixer, "foo", A).await.unwrap(),
        Toggle::Enabled
    );
    assert_eq!(h.store.get("mixer").unwrap()[0]["name"], "foo");

    assert_eq!(
        h.service
            .subscribe(Platform::Mixer, "https://example.com/foo", A)
            .await
            .unwrap(),
        Toggle::Disabled
    );
    assert_eq!(h.state.lock().subscriptions.len(Platform::Mixer), 0);
    assert_eq!(h.store.get("mixer").unwrap(), json!([]));
}

#[tokio::test]
async fn test_subscribe_unknown_stream() {
    let h = Harness::new().await;
    h.mixer.reply("ghost", Reply::NotFound);

    let err = h.service.subscribe(Platform::Mixer, "ghost", A).await.unwrap_err();
    assert!(matches!(err, AlertError::NotFound(_)));
    assert_eq!(err.user_message(), "That stream doesn't exist.");

    // Twitch: the name does not resolve.
    let err = h.service.subscribe(Platform::Twitch, "ghost", A).await.unwrap_err();
    assert!(matches!(err, AlertError::NotFound(_)));
    assert!(h.state.lock().subscriptions.is_empty());
}

#[tokio::test]
async fn test_subscribe_api_failure() {
    let h = Harness::new().await;
    h.mixer.reply("foo", Reply::ApiError(502));

    let err = h.service.subscribe(Platform::Mixer, "foo", A).await.unwrap_err();
    assert_eq!(err.user_message(), "Error contacting the API.");
    assert!(h.state.lock().subscriptions.is_empty());
}

#[tokio::test]
async fn test_online_once_then_offline_once() {
    let h = Harness::new().await;
    h.transport.add_channel(A.get(), 1);
    h.service.subscribe(Platform::Mixer, "foo", A).await.unwrap();

    h.mixer.reply("foo", Reply::Online);
    let first = h.scheduler.run_cycle().await;
    let second = h.scheduler.run_cycle().await;
    assert_eq!(first.went_online, 1);
    assert!(first.persisted);
    assert_eq!(second.went_online, 0);
    assert!(!second.persisted);
    assert_eq!(h.transport.sent_count(), 1);

    h.mixer.reply("foo", Reply::Offline);
    let third = h.scheduler.run_cycle().await;
    let fourth = h.scheduler.run_cycle().await;
    assert_eq!(third.went_offline, 1);
    assert_eq!(fourth.went_offline, 0);
    assert_eq!(h.transport.deleted_count(), 1);
}

#[tokio::test]
async fn test_stream_going_live_notifies_and_persists() {
    let store = Arc::new(MemoryStore::new());
    store.insert(
        "mixer",
        json!([{ "name": "foo", "channels": [A.get()], "online": false }]),
    );
    store.insert(
        "settings",
        json!({ "guilds": { "1": { "mention": "everyone", "auto_delete": true } } }),
    );
    let h = Harness::with_store(store).await;
    h.transport.add_channel(A.get(), 1);
    h.mixer.reply("foo", Reply::Online);
    let mut events = h.notifier.events().subscribe();

    let report = h.scheduler.run_cycle().await;
    assert_eq!(report.checked, 1);
    assert_eq!(report.went_online, 1);
    assert!(report.persisted);

    let sent = h.transport.sent.lock().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, A);
    assert_eq!(sent[0].2, "@everyone foo is live!");

    assert_eq!(h.store.get("mixer").unwrap()[0]["online"], true);

    let event = events.recv().await.unwrap();
    assert_eq!(event.kind, NotificationKind::Send);
    assert_eq!(event.stream, "foo");
    assert_eq!(event.destinations, vec![A]);
}

#[tokio::test]
async fn test_legacy_records_survive_unrelated_save() {
    let store = Arc::new(MemoryStore::new());
    store.insert(
        "twitch",
        json!([
            { "NAME": "foo", "ID": 123, "CHANNELS": [A.get()], "ALREADY_ONLINE": false },
            { "NAME": "bar", "ID": "456", "CHANNELS": [B.get()], "ALREADY_ONLINE": false },
            { "NAME": "broken", "CHANNELS": "not a list" }
        ]),
    );
    let h = Harness::with_store(store).await;
    assert_eq!(h.state.lock().subscriptions.len(Platform::Twitch), 2);

    h.service.subscribe(Platform::Mixer, "baz", A).await.unwrap();

    let twitch = h.store.get("twitch").unwrap();
    let names: Vec<_> = twitch
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["foo".to_string(), "bar".to_string()]);
    assert_eq!(h.store.get("twitch.invalid").unwrap()[2]["NAME"], "broken");
}

#[tokio::test]
async fn test_failure_is_isolated_per_stream() {
    let h = Harness::new().await;
    h.service.subscribe(Platform::Mixer, "broken", A).await.unwrap();
    h.service.subscribe(Platform::Mixer, "healthy", A).await.unwrap();
    h.service.subscribe(Platform::Mixer, "slow", A).await.unwrap();

    h.mixer.reply("broken", Reply::ApiError(500));
    h.mixer.reply("healthy", Reply::Online);
    h.mixer.reply("slow", Reply::Hang);

    let report = h.scheduler.run_cycle().await;
    assert_eq!(report.checked, 3);
    assert_eq!(report.failures, 2);
    assert_eq!(report.went_online, 1);

    let state = h.state.lock();
    let broken = state
        .subscriptions
        .get(Platform::Mixer, &StreamKey::name("broken"))
        .unwrap();
    assert!(!broken.online);
    let healthy = state
        .subscriptions
        .get(Platform::Mixer, &StreamKey::name("healthy"))
        .unwrap();
    assert!(healthy.online);
}

#[tokio::test]
async fn test_migration_resolves_and_drops() {
    let store = Arc::new(MemoryStore::new());
    store.insert(
        "twitch",
        json!([
            { "NAME": "Foo", "CHANNELS": [A.get()], "ALREADY_ONLINE": false },
            { "NAME": "gone", "CHANNELS": [A.get()], "ALREADY_ONLINE": false },
            { "NAME": "known", "ID": "7", "CHANNELS": [B.get()], "ALREADY_ONLINE": false }
        ]),
    );
    let h = Harness::with_store(store).await;
    h.twitch.know("foo", "42");

    let report = h.scheduler.run_cycle().await;
    assert!(report.persisted);
    assert_eq!(h.twitch.resolve_calls().len(), 1);
    assert_eq!(report.checked, 2);

    let twitch = h.store.get("twitch").unwrap();
    let names: Vec<&str> = twitch
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"Foo"));
    assert!(!names.contains(&"gone"));

    // Nothing left to resolve: no further lookups.
    h.scheduler.run_cycle().await;
    assert_eq!(h.twitch.resolve_calls().len(), 1);

    // A later subscribe by name lands on the migrated stream.
    assert_eq!(
        h.service.subscribe(Platform::Twitch, "FOO", B).await.unwrap(),
        Toggle::Enabled
    );
    let state = h.state.lock();
    assert_eq!(state.subscriptions.len(Platform::Twitch), 2);
    let foo = state
        .subscriptions
        .get(Platform::Twitch, &StreamKey::Id("42".to_string()))
        .unwrap();
    assert_eq!(foo.channels.len(), 2);
}

#[tokio::test]
async fn test_migration_keeps_streams_on_credential_failure() {
    let store = Arc::new(MemoryStore::new());
    store.insert("twitch", json!([{ "name": "foo", "channels": [A.get()] }]));
    let h = Harness::with_store(store).await;
    h.twitch.know("foo", "42");
    h.twitch.reject_token(true);

    let report = h.scheduler.run_cycle().await;
    assert_eq!(report.skipped, 1);
    assert_eq!(report.checked, 0);
    assert_eq!(h.state.lock().subscriptions.unresolved(Platform::Twitch).len(), 1);

    // Fixed token: the stream is resolved on the next pass.
    h.twitch.reject_token(false);
    let report = h.scheduler.run_cycle().await;
    assert_eq!(report.skipped, 0);
    assert_eq!(report.checked, 1);
    assert_eq!(h.twitch.checks(), vec!["42".to_string()]);
}

#[tokio::test]
async fn test_stream_removed_mid_check_is_not_recreated() {
    let h = Harness::new().await;
    h.service.subscribe(Platform::Mixer, "foo", A).await.unwrap();
    h.mixer.reply("foo", Reply::Online);

    let state = h.state.clone();
    h.mixer.on_check(move |_| {
        state.lock().subscriptions.unsubscribe_all(A);
    });

    let report = h.scheduler.run_cycle().await;
    assert_eq!(report.checked, 1);
    assert_eq!(report.went_online, 0);
    assert_eq!(h.transport.sent_count(), 0);
    assert!(h.state.lock().subscriptions.is_empty());
}

#[tokio::test]
async fn test_unsubscribing_live_stream_retracts_notification() {
    let h = Harness::new().await;
    h.transport.add_channel(A.get(), 1);
    h.service.subscribe(Platform::Mixer, "foo", A).await.unwrap();
    h.mixer.reply("foo", Reply::Online);

    let report = h.scheduler.run_cycle().await;
    assert_eq!(report.went_online, 1);
    assert_eq!(h.transport.sent_count(), 1);

    assert_eq!(h.service.unsubscribe_all_in_channel(A).await, 1);
    let report = h.scheduler.run_cycle().await;
    assert_eq!(report.checked, 0);
    assert_eq!(report.orphaned, 1);
    assert_eq!(h.transport.deleted_count(), 1);
    assert!(h.notifier.recorded().await.is_empty());

    let report = h.scheduler.run_cycle().await;
    assert_eq!(report.orphaned, 0);
    assert_eq!(h.transport.deleted_count(), 1);
}

#[tokio::test]
async fn test_failed_save_is_retried_next_cycle() {
    let h = Harness::new().await;
    h.service.subscribe(Platform::Mixer, "foo", A).await.unwrap();
    h.mixer.reply("foo", Reply::Online);

    h.store.set_fail_saves(true);
    let report = h.scheduler.run_cycle().await;
    assert_eq!(report.went_online, 1);
    assert!(!report.persisted);
    assert_eq!(h.store.get("mixer").unwrap()[0]["online"], false);

    h.store.set_fail_saves(false);
    let report = h.scheduler.run_cycle().await;
    assert_eq!(report.went_online, 0);
    assert!(report.persisted);
    assert_eq!(h.store.get("mixer").unwrap()[0]["online"], true);
}

#[tokio::test]
async fn test_auto_delete_disabled_keeps_messages() {
    let h = Harness::new().await;
    h.transport.add_channel(A.get(), 1);
    h.service.set_guild_auto_delete(GuildId(1), false).await;
    h.service.subscribe(Platform::Mixer, "foo", A).await.unwrap();

    h.mixer.reply("foo", Reply::Online);
    h.scheduler.run_cycle().await;
    h.mixer.reply("foo", Reply::Offline);
    let report = h.scheduler.run_cycle().await;

    assert_eq!(report.went_offline, 1);
    assert_eq!(h.transport.deleted_count(), 0);
    assert!(
        h.notifier
            .sent_messages(Platform::Mixer, &StreamKey::name("foo"))
            .await
            .is_empty()
    );
}

#[tokio::test]
async fn test_guild_settings_persist() {
    let h = Harness::new().await;
    h.service.set_guild_mention(GuildId(9), MentionMode::Here).await;
    assert!(!h.service.toggle_guild_auto_delete(GuildId(9)).await);
    h.service.set_credential(Platform::Twitch, " new-id ").await;

    let settings = h.store.get("settings").unwrap();
    assert_eq!(settings["guilds"]["9"]["mention"], "here");
    assert_eq!(settings["guilds"]["9"]["auto_delete"], false);
    assert_eq!(settings["tokens"]["twitch"], "new-id");
}

#[tokio::test]
async fn test_unsubscribe_all_and_listing() {
    let h = Harness::new().await;
    h.twitch.know("bar", "5");
    h.service.subscribe(Platform::Mixer, "foo", A).await.unwrap();
    h.service.subscribe(Platform::Twitch, "bar", A).await.unwrap();
    h.service.subscribe(Platform::Twitch, "bar", B).await.unwrap();

    let mut listed = h.service.subscriptions_for(A);
    listed.sort();
    assert_eq!(
        listed,
        vec![
            (Platform::Twitch, "bar".to_string()),
            (Platform::Mixer, "foo".to_string())
        ]
    );

    assert_eq!(h.service.unsubscribe_all_in_channel(A).await, 2);
    assert!(h.service.subscriptions_for(A).is_empty());
    assert_eq!(h.service.subscriptions_for(B).len(), 1);
    assert_eq!(h.store.get("mixer").unwrap(), json!([]));
}

#[tokio::test]
async fn test_check_now() {
    let h = Harness::new().await;
    h.twitch.know("foo", "42");
    h.twitch.reply("42", Reply::Online);

    let info = h.service.check_now(Platform::Twitch, "foo").await.unwrap();
    assert_eq!(info.title, "Live now");
    assert_eq!(h.twitch.checks(), vec!["42".to_string()]);

    let err = h.service.check_now(Platform::Mixer, "idle").await.unwrap_err();
    assert_eq!(err.user_message(), "idle is offline.");

    h.mixer.reply("token", Reply::BadToken);
    let err = h.service.check_now(Platform::Mixer, "token").await.unwrap_err();
    assert_eq!(err.user_message(), "Client-ID is invalid or not set.");
}

#[tokio::test]
async fn test_delivery_failure_does_not_block_others() {
    let h = Harness::new().await;
    h.transport.add_channel(A.get(), 1);
    h.transport.add_channel(B.get(), 2);
    h.transport.fail_sends_to(A.get());
    h.service.subscribe(Platform::Mixer, "foo", A).await.unwrap();
    h.service.subscribe(Platform::Mixer, "foo", B).await.unwrap();

    h.mixer.reply("foo", Reply::Online);
    let report = h.scheduler.run_cycle().await;
    assert_eq!(report.went_online, 1);

    let sent = h.transport.sent.lock().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, B);
}

#[tokio::test]
async fn test_run_stops_on_cancel() {
    let h = Harness::new().await;
    h.service.subscribe(Platform::Mixer, "foo", A).await.unwrap();

    let cancel = tokio_util::sync::CancellationToken::new();
    let stop = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        stop.cancel();
    });

    tokio::time::timeout(std::time::Duration::from_secs(2), h.scheduler.run(cancel))
        .await
        .unwrap();
    assert!(h.mixer.checks().len() >= 2);
}
