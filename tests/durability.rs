use std::sync::Arc;

use assessment_sync::domain::entities::{Assessment, OfflineRecord};
use assessment_sync::infrastructure::remote::StaticCredentials;
use assessment_sync::shared::config::AppConfig;
use assessment_sync::{AppState, SyncAction, SyncStatus};

fn file_config(dir: &tempfile::TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.database.url = format!(
        "sqlite:{}?mode=rwc",
        dir.path().join("assessment_sync.db").display()
    );
    config.database.max_connections = 2;
    config.remote.base_url = "http://127.0.0.1:9/api".to_string();
    config.sync.auto_sync = false;
    config
}

#[tokio::test]
async fn queued_writes_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let credentials = Arc::new(StaticCredentials::new(None));

    let state = AppState::new(file_config(&dir), credentials.clone())
        .await
        .unwrap();
    state.network.set_online(false);
    let draft = state
        .repositories
        .assessments
        .add(Assessment::new("org-1", "Survives restarts"))
        .await
        .unwrap();
    state
        .repositories
        .assessments
        .update(&draft.id, serde_json::json!({"description": "second edit"}))
        .await
        .unwrap();
    state.shutdown(None).await;

    let reopened = AppState::new(file_config(&dir), credentials).await.unwrap();
    reopened.network.set_online(false);

    let stored = reopened
        .repositories
        .assessments
        .get_local(&draft.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.sync_status(), SyncStatus::New);
    assert_eq!(stored.description.as_deref(), Some("second edit"));

    let actions: Vec<SyncAction> = reopened
        .queue
        .pending(10)
        .await
        .unwrap()
        .into_iter()
        .map(|item| item.action)
        .collect();
    assert_eq!(actions, vec![SyncAction::Create, SyncAction::Update]);
    reopened.shutdown(None).await;
}

#[tokio::test]
async fn auto_sync_off_starts_no_background_loop() {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new(file_config(&dir), Arc::new(StaticCredentials::new(None)))
        .await
        .unwrap();

    assert!(state.start_sync().is_none());
    state.shutdown(None).await;
}
