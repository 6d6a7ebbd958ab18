//! Settings sync and record storage driven through the real engine and a
//! scripted tool.
#![cfg(unix)]

use std::fs;
use std::sync::Arc;

use cloudsave_settings::{CancellationToken, CloudDatastore, Datastore, SettingsSyncer};
use cloudsave_state::{CloudPrefs, PrefsStore};
use cloudsave_sync::{
    BackendKind, CloudManager, FixedRemote, OAuthRemote, PrefsSelector, RemoteBackend,
    RemoteRegistry, SyncOptions, SyncStrategy, ToolConfig, SETTINGS_AREA,
};
use cloudsave_test_utils::FakeTool;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Record {
    name: String,
    value: i32,
}

fn manager(tool: &FakeTool) -> Arc<CloudManager> {
    Arc::new(CloudManager::new(
        ToolConfig::new(tool.program()).with_leading_args(tool.leading_args()),
        SyncStrategy::MergeThenMirror,
    ))
}

fn google_drive() -> Arc<FixedRemote> {
    let remote: Arc<dyn RemoteBackend> =
        Arc::new(OAuthRemote::for_kind(BackendKind::GoogleDrive).unwrap());
    Arc::new(FixedRemote(Some(remote)))
}

#[tokio::test]
async fn settings_directory_json_files_reach_remote() {
    let tool = FakeTool::new().unwrap();
    let settings_dir = tool.local_dir("OpenCloudSave");
    fs::create_dir_all(&settings_dir).unwrap();
    fs::write(settings_dir.join("user_overrides.json"), "{}").unwrap();
    fs::write(settings_dir.join("notes.txt"), "private").unwrap();

    let syncer = SettingsSyncer::spawn(manager(&tool), google_drive(), None);
    syncer
        .request_sync(
            &CancellationToken::new(),
            settings_dir.join("user_overrides.json"),
        )
        .await
        .unwrap();
    syncer.stop().await;

    let remote = tool.remote_dir(SETTINGS_AREA);
    assert!(remote.join("user_overrides.json").exists());
    assert!(!remote.join("notes.txt").exists());
    let mirror = &tool.invocations_of("sync")[0];
    assert!(mirror.iter().any(|a| a == "--include=*.json"));
}

#[tokio::test]
async fn selector_follows_preferences_file() {
    let tool = FakeTool::new().unwrap();
    let prefs = PrefsStore::new(tool.local_dir("cfg").join("opencloud_perfs.json"));
    prefs
        .save(&CloudPrefs {
            cloud: BackendKind::OneDrive,
            ..CloudPrefs::default()
        })
        .unwrap();
    let selector = Arc::new(PrefsSelector::new(
        Arc::new(RemoteRegistry::with_defaults()),
        prefs,
    ));
    let settings_dir = tool.local_dir("settings");

    let syncer = SettingsSyncer::spawn(manager(&tool), selector, None);
    syncer
        .request_sync(&CancellationToken::new(), settings_dir.join("a.json"))
        .await
        .unwrap();

    let mkdir = &tool.invocations_of("mkdir")[0];
    assert!(mkdir
        .iter()
        .any(|a| a == "opencloudsave-onedrive:opencloudsaves/user_settings/"));
}

#[tokio::test]
async fn record_written_on_one_device_is_fetched_on_another() {
    let tool = FakeTool::new().unwrap();
    let cloud = manager(&tool);
    let original = Record {
        name: "Test".into(),
        value: 42,
    };

    let first = CloudDatastore::<Record>::spawn(
        tool.local_dir("device-a").join("record.json"),
        cloud.clone(),
        google_drive(),
        SyncOptions::defaults(),
    );
    first.store(original.clone());
    first.flush().await.unwrap();
    first.stop().await;
    assert!(tool.remote_dir(SETTINGS_AREA).join("record.json").exists());

    let second = CloudDatastore::<Record>::spawn(
        tool.local_dir("device-b").join("record.json"),
        cloud,
        google_drive(),
        SyncOptions::defaults(),
    );
    assert_eq!(second.fetch().await.unwrap(), original);
    assert_eq!(tool.invocations_of("copyto").len(), 1);
}

#[tokio::test]
async fn fetch_of_never_written_record_fails() {
    let tool = FakeTool::new().unwrap();
    let store = CloudDatastore::<Record>::spawn(
        tool.local_dir("device").join("record.json"),
        manager(&tool),
        google_drive(),
        SyncOptions::defaults(),
    );

    let err = store.fetch().await.unwrap_err();

    assert!(err.is_transport());
    assert!(err.to_string().contains("object not found"));
}

#[tokio::test]
async fn push_failure_is_reported_by_flush() {
    let tool = FakeTool::new().unwrap();
    tool.always_fail("sync", 5).unwrap();
    let store = CloudDatastore::<Record>::spawn(
        tool.local_dir("device").join("record.json"),
        manager(&tool),
        google_drive(),
        SyncOptions::defaults(),
    );

    store.store(Record {
        name: "Test".into(),
        value: 1,
    });
    let err = store.flush().await.unwrap_err();

    assert_eq!(err.to_string(), "scripted failure: sync exit 5\n");
    assert!(store.flush().await.is_ok());
}
