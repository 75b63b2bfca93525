//! Discovery pass integration tests

mod helpers;

use avqc_common::{Error, Outcome, PackageType, ProcessStatus};
use avqc_review::db::packages;
use avqc_review::services::DiscoveryProcess;
use helpers::fakes::{FakeLookup, FakeProbe, RecordingBus};
use helpers::TestEnv;
use std::fs;
use std::sync::Arc;

fn discovery(
    env: &TestEnv,
    lookup: Arc<FakeLookup>,
    probe: Arc<FakeProbe>,
    bus: Arc<RecordingBus>,
) -> DiscoveryProcess {
    DiscoveryProcess::new(
        env.pool.clone(),
        env.config.clone(),
        lookup,
        probe,
        env.notifier(bus),
    )
}

#[tokio::test]
async fn test_discovery_creates_pending_packages() {
    let env = TestEnv::new().await;
    env.add_audio_package("aaa");
    env.add_package_dir("bbb", &["bbb.mp4", "bbb.mkv"]);
    let bus = Arc::new(RecordingBus::new());

    let probe = Arc::new(FakeProbe::new(30.0));
    let created = discovery(&env, Arc::new(FakeLookup::new()), probe, bus.clone())
        .discover()
        .await
        .unwrap();

    assert_eq!(created, vec!["aaa", "bbb"]);

    let pending = packages::list_by_status(&env.pool, ProcessStatus::Pending).await.unwrap();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].package_type, PackageType::Audio);
    assert_eq!(pending[0].title, "Recording aaa");
    assert!(!pending[0].undated_object);
    assert_eq!(pending[1].package_type, PackageType::Video);
    assert!(bus.sent().is_empty(), "Successful discovery sends no notifications");
}

#[tokio::test]
async fn test_discovery_is_idempotent() {
    let env = TestEnv::new().await;
    env.add_audio_package("aaa");
    env.add_audio_package("bbb");
    let lookup = Arc::new(FakeLookup::new());
    let probe = Arc::new(FakeProbe::new(1.0));
    let process = discovery(&env, lookup.clone(), probe, Arc::new(RecordingBus::new()));

    let first = process.discover().await.unwrap();
    let second = process.discover().await.unwrap();

    assert_eq!(first.len(), 2);
    assert!(second.is_empty(), "Second pass must create nothing, got {:?}", second);
    assert_eq!(packages::count_packages(&env.pool).await.unwrap(), 2);
    // Pending packages are skipped before any lookup
    assert_eq!(lookup.calls().len(), 2);
}

#[tokio::test]
async fn test_lookup_failure_is_isolated_to_one_package() {
    let env = TestEnv::new().await;
    for refid in ["aaa", "bbb", "ccc"] {
        env.add_audio_package(refid);
    }
    let bus = Arc::new(RecordingBus::new());

    let created = discovery(
        &env,
        Arc::new(FakeLookup::failing_for(&["bbb"])),
        Arc::new(FakeProbe::new(1.0)),
        bus.clone(),
    )
    .discover()
    .await
    .unwrap();

    assert_eq!(created, vec!["aaa", "ccc"]);
    assert_eq!(packages::count_packages(&env.pool).await.unwrap(), 2);

    let failures = bus.with_outcome(Outcome::Failure);
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].refid.as_deref(), Some("bbb"));
    assert!(failures[0]
        .message
        .starts_with("Error discovering refid bbb\n\n"));
    assert!(failures[0]
        .failure_detail
        .as_deref()
        .unwrap()
        .contains("Expecting to get one result for ref id bbb"));
    assert_eq!(bus.topics(), vec![helpers::TOPIC]);
}

#[tokio::test]
async fn test_failed_package_is_retried_next_pass() {
    let env = TestEnv::new().await;
    env.add_package_dir("aaa", &["notes.txt"]);
    let process = discovery(
        &env,
        Arc::new(FakeLookup::new()),
        Arc::new(FakeProbe::new(1.0)),
        Arc::new(RecordingBus::new()),
    );

    assert!(process.discover().await.unwrap().is_empty());

    fs::write(env.storage_root().join("aaa").join("aaa.mp3"), b"").unwrap();
    assert_eq!(process.discover().await.unwrap(), vec!["aaa"]);
}

#[tokio::test]
async fn test_possible_duplicate_set_only_after_approval() {
    let env = TestEnv::new().await;
    env.seed_record("dup", ProcessStatus::Approved).await;
    env.seed_record("rej", ProcessStatus::Rejected).await;
    env.add_audio_package("dup");
    env.add_audio_package("rej");
    env.add_audio_package("new");

    discovery(
        &env,
        Arc::new(FakeLookup::new()),
        Arc::new(FakeProbe::new(1.0)),
        Arc::new(RecordingBus::new()),
    )
    .discover()
    .await
    .unwrap();

    let flag = |refid: &'static str| {
        let pool = env.pool.clone();
        async move {
            packages::list_by_refid(&pool, refid)
                .await
                .unwrap()
                .into_iter()
                .find(|p| p.process_status == ProcessStatus::Pending)
                .unwrap()
                .possible_duplicate
        }
    };

    assert!(flag("dup").await);
    assert!(!flag("rej").await);
    assert!(!flag("new").await);
}

#[tokio::test]
async fn test_unknown_package_type_reports_failure() {
    let env = TestEnv::new().await;
    env.add_package_dir("aaa", &["aaa.wav", "aaa.txt"]);
    let bus = Arc::new(RecordingBus::new());

    let probe = Arc::new(FakeProbe::new(1.0));
    let created = discovery(&env, Arc::new(FakeLookup::new()), probe, bus.clone())
        .discover()
        .await
        .unwrap();

    assert!(created.is_empty());
    let failures = bus.with_outcome(Outcome::Failure);
    assert_eq!(failures.len(), 1);
    assert!(failures[0]
        .message
        .contains("Unable to determine type of package aaa"));
}

#[tokio::test]
async fn test_probe_failure_fails_the_package() {
    let env = TestEnv::new().await;
    env.add_package_dir("aaa", &["aaa.mp3", "aaa.wav", "aaa_b.wav"]);
    env.add_audio_package("bbb");
    let bus = Arc::new(RecordingBus::new());

    let created = discovery(
        &env,
        Arc::new(FakeLookup::new()),
        Arc::new(FakeProbe::failing_on(1.0, &["aaa_b.wav"])),
        bus.clone(),
    )
    .discover()
    .await
    .unwrap();

    assert_eq!(created, vec!["bbb"]);
    assert!(packages::list_by_refid(&env.pool, "aaa").await.unwrap().is_empty());
    assert_eq!(bus.with_outcome(Outcome::Failure).len(), 1);
}

#[tokio::test]
async fn test_technical_summary_is_stored() {
    let env = TestEnv::new().await;
    env.add_package_dir("aaa", &["aaa.mp3", "aaa_1.wav", "aaa_2.wav", "aaa.txt"]);
    let probe = Arc::new(FakeProbe::new(12.5));

    let lookup = Arc::new(FakeLookup::new());
    discovery(&env, lookup, probe.clone(), Arc::new(RecordingBus::new()))
        .discover()
        .await
        .unwrap();

    let package = packages::list_by_refid(&env.pool, "aaa").await.unwrap().remove(0);
    assert_eq!(package.duration_access, 12.5);
    assert_eq!(package.duration_master, 25.0);
    assert!(package.multiple_masters);
    assert_eq!(probe.probed().len(), 3, "txt files are never probed");
}

#[tokio::test]
async fn test_entries_with_extensions_are_skipped() {
    let env = TestEnv::new().await;
    env.add_package_dir("abc.v2", &["abc.mp3", "abc.wav"]);
    env.add_audio_package("abc");
    let lookup = Arc::new(FakeLookup::new());
    let bus = Arc::new(RecordingBus::new());

    let created = discovery(&env, lookup.clone(), Arc::new(FakeProbe::new(1.0)), bus.clone())
        .discover()
        .await
        .unwrap();

    assert_eq!(created, vec!["abc"]);
    assert_eq!(lookup.calls(), vec!["abc"]);
    assert_eq!(packages::list_by_refid(&env.pool, "abc").await.unwrap().len(), 1);
    assert!(env.storage_root().join("abc.v2").is_dir());
    assert!(bus.sent().is_empty());
}

#[tokio::test]
async fn test_missing_storage_root_is_fatal() {
    let env = TestEnv::new().await;
    fs::remove_dir_all(env.storage_root()).unwrap();
    let bus = Arc::new(RecordingBus::new());
    let lookup = Arc::new(FakeLookup::new());

    let result = discovery(&env, lookup.clone(), Arc::new(FakeProbe::new(1.0)), bus.clone())
        .discover()
        .await;

    assert!(matches!(result, Err(Error::StorageRootMissing(_))));
    assert!(lookup.calls().is_empty());
    assert!(bus.sent().is_empty());
}

#[tokio::test]
async fn test_notification_outage_does_not_stop_discovery() {
    let env = TestEnv::new().await;
    env.add_audio_package("aaa");
    env.add_audio_package("bbb");
    let bus = Arc::new(RecordingBus::new());
    bus.fail_deliveries();

    let created = discovery(
        &env,
        Arc::new(FakeLookup::failing_for(&["aaa"])),
        Arc::new(FakeProbe::new(1.0)),
        bus,
    )
    .discover()
    .await
    .unwrap();

    assert_eq!(created, vec!["bbb"]);
}
