use configdb::config::LogConfig;
use configdb::logger::{AUDIT_TARGET, configure_from_config};

#[test]
fn log_config_creates_rolling_files() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = LogConfig { dir: Some(dir.path().join("logs")), level: Some("debug".into()), retention: Some(1) };
    configure_from_config(&cfg).unwrap();
    log::info!(target: AUDIT_TARGET, "audit line from the integration suite");
    assert!(dir.path().join("logs").join("app.log").exists());
    assert!(dir.path().join("logs").join("audit.log").exists());
}
