//! Synchronizer convergence integration tests
//!
//! Covers the reconciliation of the fallback and channel copies of the
//! record map across the surfaces that write to only one of them.

use std::sync::Arc;
use std::time::Duration;

use prayer_core::{
    FixedClock, MergePrecedence, Platform, PrayerRepository, SyncConfig, SyncOutcome,
    SyncTrigger, Synchronizer,
};
use storage::{ChannelStore, FallbackStore, SledStore, StorageAdapter};

const PRAYER_DATA: &str = "prayer_data";

fn stores() -> (Arc<FallbackStore>, Arc<ChannelStore>) {
    (
        Arc::new(FallbackStore::in_memory()),
        Arc::new(ChannelStore::in_memory()),
    )
}

async fn repository(fallback: Arc<FallbackStore>, day: &str) -> PrayerRepository {
    let adapter = Arc::new(StorageAdapter::new(
        Some(Arc::new(SledStore::in_memory().unwrap())),
        fallback,
    ));
    adapter.initialize().await;
    PrayerRepository::new(adapter, Arc::new(FixedClock::on_day(day).unwrap()))
}

/// Recorded data reaches the channel store on the next reconciliation
#[tokio::test]
async fn test_recordings_propagate_to_channel() {
    let (fallback, channel) = stores();

    let repo = repository(Arc::clone(&fallback), "2025-10-14").await;
    repo.record_moment(Platform::Web).await.unwrap();

    let sync = Synchronizer::new(
        Arc::clone(&fallback),
        Arc::clone(&channel),
        SyncConfig::default(),
    );
    let outcome = sync.handle(SyncTrigger::Startup).await;
    assert_eq!(outcome, SyncOutcome::CopiedToChannel);

    assert_eq!(
        channel.get(PRAYER_DATA),
        fallback.get(PRAYER_DATA),
    );
}

/// Data arriving only via the channel becomes visible to the repository
#[tokio::test]
async fn test_channel_data_reaches_repository() {
    let (fallback, channel) = stores();

    // Another surface propagated a recorded day through the channel only
    channel
        .set(
            PRAYER_DATA,
            r#"{"2025-10-13":{"date":"2025-10-13","moments":[{"timestamp":1,"platform":"telegram","duration":60}],"count":1,"completed":false}}"#,
        )
        .unwrap();

    let sync = Synchronizer::new(
        Arc::clone(&fallback),
        Arc::clone(&channel),
        SyncConfig::default(),
    );
    assert_eq!(
        sync.handle(SyncTrigger::Startup).await,
        SyncOutcome::CopiedToFallback
    );

    let repo = repository(Arc::clone(&fallback), "2025-10-14").await;
    let day = repo.get_day("2025-10-13").await;
    assert_eq!(day.count, 1);
    assert_eq!(day.moments[0].platform, Platform::Telegram);
}

/// Two surfaces with disjoint days converge without losing either side
#[tokio::test]
async fn test_disjoint_surfaces_converge() {
    let (fallback, channel) = stores();

    let repo = repository(Arc::clone(&fallback), "2025-10-14").await;
    repo.record_moment(Platform::Web).await.unwrap();

    channel
        .set(
            PRAYER_DATA,
            r#"{"2025-10-13":{"date":"2025-10-13","moments":[{"timestamp":1,"platform":"android","duration":60}],"count":1,"completed":false}}"#,
        )
        .unwrap();

    let sync = Synchronizer::new(
        Arc::clone(&fallback),
        Arc::clone(&channel),
        SyncConfig::default(),
    );
    let outcome = sync.handle(SyncTrigger::VisibilityRegained).await;
    assert_eq!(outcome, SyncOutcome::Merged { days: 2 });

    // Both stores hold the identical merged payload
    assert_eq!(fallback.get(PRAYER_DATA), channel.get(PRAYER_DATA));

    // On the next launch both days are visible through the repository
    let reader = repository(Arc::clone(&fallback), "2025-10-14").await;
    assert_eq!(reader.get_day("2025-10-13").await.count, 1);
    assert_eq!(reader.get_day("2025-10-14").await.count, 1);
}

/// The precedence policy decides same-day conflicts in either direction
#[tokio::test]
async fn test_precedence_policy_is_configurable() {
    for (precedence, expected_count) in [
        (MergePrecedence::PreferChannel, 5u32),
        (MergePrecedence::PreferFallback, 3u32),
    ] {
        let (fallback, channel) = stores();

        let repo = repository(Arc::clone(&fallback), "2025-10-14").await;
        for _ in 0..3 {
            repo.record_moment(Platform::Web).await.unwrap();
        }

        // The channel carries a different copy of the same day
        let mut conflicting = String::from(
            r#"{"2025-10-14":{"date":"2025-10-14","moments":["#,
        );
        for i in 0..5 {
            if i > 0 {
                conflicting.push(',');
            }
            conflicting.push_str(&format!(
                r#"{{"timestamp":{},"platform":"ios","duration":60}}"#,
                i
            ));
        }
        conflicting.push_str(r#"],"count":5,"completed":false}}"#);
        channel.set(PRAYER_DATA, &conflicting).unwrap();

        let sync = Synchronizer::new(
            Arc::clone(&fallback),
            Arc::clone(&channel),
            SyncConfig { precedence, ..Default::default() },
        );
        sync.handle(SyncTrigger::Interval).await;

        // Read through a fresh launch over the converged fallback
        let reader = repository(Arc::clone(&fallback), "2025-10-14").await;
        assert_eq!(
            reader.get_day("2025-10-14").await.count,
            expected_count,
            "precedence {:?}",
            precedence
        );
    }
}

/// The periodic task converges the stores without explicit triggers
#[tokio::test]
async fn test_periodic_convergence() {
    let (fallback, channel) = stores();
    fallback.set(
        PRAYER_DATA,
        r#"{"2025-10-14":{"date":"2025-10-14","moments":[],"count":0,"completed":false}}"#,
    );

    let sync = Arc::new(Synchronizer::new(
        Arc::clone(&fallback),
        Arc::clone(&channel),
        SyncConfig { interval: Duration::from_millis(20), ..Default::default() },
    ));

    let mut outcomes = sync.subscribe();
    let handle = sync.spawn_periodic();

    let outcome = tokio::time::timeout(Duration::from_secs(1), outcomes.recv())
        .await
        .expect("periodic reconciliation did not fire")
        .unwrap();
    handle.abort();

    assert_eq!(outcome, SyncOutcome::CopiedToChannel);
    assert_eq!(fallback.get(PRAYER_DATA), channel.get(PRAYER_DATA));
}
