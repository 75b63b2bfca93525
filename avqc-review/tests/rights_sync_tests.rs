//! Rights statement mirror tests

mod helpers;

use avqc_review::commands;
use avqc_review::db::rights_statements;
use avqc_review::services::{sync_rights_statements, SyncError};
use helpers::fakes::FakeRegistry;
use helpers::TestEnv;
use std::fs;

#[tokio::test]
async fn test_sync_inserts_only_on_first_run() {
    let env = TestEnv::new().await;
    let registry =
        FakeRegistry::with_entries(&[("1", "In copyright"), ("2", "No known copyright")]);

    let first = sync_rights_statements(&env.pool, &registry).await.unwrap();
    let second = sync_rights_statements(&env.pool, &registry).await.unwrap();

    assert_eq!(first, vec!["1", "2"]);
    assert!(second.is_empty());
    assert_eq!(rights_statements::list_rights_statements(&env.pool).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_sync_picks_up_new_entries_without_touching_old() {
    let env = TestEnv::new().await;
    let registry = FakeRegistry::with_entries(&[("1", "In copyright")]);
    sync_rights_statements(&env.pool, &registry).await.unwrap();

    registry.add("1", "Renamed upstream");
    registry.add("3", "Public domain");
    let created = sync_rights_statements(&env.pool, &registry).await.unwrap();

    assert_eq!(created, vec!["3"]);
    let titles: Vec<String> = rights_statements::list_rights_statements(&env.pool)
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.title)
        .collect();
    assert_eq!(titles, vec!["In copyright", "Public domain"]);
}

#[tokio::test]
async fn test_registry_failure_is_reported() {
    let env = TestEnv::new().await;
    let registry = FakeRegistry::default();
    registry.go_offline();

    let result = sync_rights_statements(&env.pool, &registry).await;
    assert!(matches!(result, Err(SyncError::Registry(_))));
}

#[tokio::test]
async fn test_fetch_task_summary() {
    let env = TestEnv::new().await;
    let registry = FakeRegistry::with_entries(&[("4", "Orphan work")]);

    let summary = commands::fetch_rights_statements(&env.config, &env.pool, &registry)
        .await
        .unwrap();
    assert_eq!(summary, "Rights statements created: 4");

    let summary = commands::fetch_rights_statements(&env.config, &env.pool, &registry)
        .await
        .unwrap();
    assert_eq!(summary, "No new rights statements.");
}

#[tokio::test]
async fn test_fetch_task_requires_storage_root() {
    let env = TestEnv::new().await;
    fs::remove_dir_all(env.storage_root()).unwrap();
    let registry = FakeRegistry::with_entries(&[("4", "Orphan work")]);

    let result = commands::fetch_rights_statements(&env.config, &env.pool, &registry).await;

    assert!(result.is_err());
    assert!(rights_statements::list_rights_statements(&env.pool).await.unwrap().is_empty());
}
