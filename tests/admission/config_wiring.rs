use chrono::{TimeZone, Utc};
use tempfile::TempDir;

use crawl_admission::Config;
use crawl_admission::config::EngineKind;
use crawl_admission::daemon::build_dispatcher;
use crawl_admission::schedule::TriggerAction;

#[test]
fn first_run_writes_default_config() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("config.toml");

    let config = Config::load_or_init_at(&path).unwrap();

    assert!(path.exists());
    assert_eq!(config.engine.kind, EngineKind::Memory);
    assert_eq!(config.state_file_path(), tmp.path().join("daemon_state.json"));
}

#[tokio::test]
async fn disabled_generation_in_config_reaches_the_dispatcher() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("config.toml");
    std::fs::write(&path, "[generation]\nenabled = false\n").unwrap();

    let config = Config::load_or_init_at(&path).unwrap();
    let dispatcher = build_dispatcher(&config).unwrap();
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

    let state = dispatcher.fire(TriggerAction::AsinWatchdog, now).await;

    assert_eq!(state.map(|s| s.code), Some(100));
}

#[tokio::test]
async fn task_override_and_offset_shape_the_run_window() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[scheduler]
utc_offset = "+08:00"

[[tasks]]
name = "asin"
category = "ASIN"
period_secs = 86400
window_start = "08:00"
window_end = "20:00"

[[tasks]]
name = "review"
category = "REVIEW"
period_secs = 86400
"#,
    )
    .unwrap();

    let config = Config::load_or_init_at(&path).unwrap();
    let dispatcher = build_dispatcher(&config).unwrap();

    // 01:00 UTC is 09:00 at +08:00: inside the window, nothing pending
    let morning = Utc.with_ymd_and_hms(2024, 5, 1, 1, 0, 0).unwrap();
    let state = dispatcher.fire(TriggerAction::AsinWatchdog, morning).await;
    assert_eq!(state.map(|s| s.code), Some(0));

    // 13:00 UTC is 21:00 at +08:00: outside
    let evening = Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap();
    let state = dispatcher.fire(TriggerAction::AsinWatchdog, evening).await;
    assert_eq!(state.map(|s| s.code), Some(95));
}

#[test]
fn malformed_catalog_is_fatal_at_startup() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[[tasks]]
name = "review"
category = "REVIEW"
period_secs = 86400
"#,
    )
    .unwrap();

    let config = Config::load_or_init_at(&path).unwrap();
    let err = build_dispatcher(&config).err().expect("catalog without ASIN task");

    assert!(format!("{err:#}").contains("exactly one ASIN task"));
}
