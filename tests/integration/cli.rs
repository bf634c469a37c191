#[path = "common/mod.rs"]
mod common;

use std::fs;

use common::Fixture;
use predicates::prelude::*;
use serde_json::json;

#[test]
fn help_lists_flags() {
    let fixture = Fixture::new();
    fixture
        .command()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--config-file"))
        .stdout(predicate::str::contains("--tunneling-disable-notification"));
}

#[test]
fn missing_configuration_exits_cleanly() {
    let fixture = Fixture::new();
    fixture
        .command()
        .assert()
        .success()
        .stdout(predicate::str::contains("Failed to initialize configuration"));
}

#[test]
fn missing_explicit_config_file_exits_cleanly() {
    let fixture = Fixture::new();
    let missing = fixture.temp.path().join("nope.json");
    fixture
        .command()
        .arg("--config-file")
        .arg(&missing)
        .assert()
        .success()
        .stdout(predicate::str::contains("Failed to initialize configuration"));
}

#[test]
fn malformed_config_file_exits_cleanly() {
    let fixture = Fixture::new();
    let path = fixture.temp.path().join("broken.json");
    fs::write(&path, "{ not json").unwrap();

    fixture
        .command()
        .arg("--config-file")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Failed to initialize configuration"));
}

#[test]
fn invalid_log_level_from_environment_exits_cleanly() {
    let fixture = Fixture::new();
    let config = fixture.write_config(&fixture.config_json(json!({})));

    fixture
        .command()
        .arg("--config-file")
        .arg(&config)
        .env("IOT_DEVICE_CLIENT_LOG_LEVEL", "LOUD")
        .assert()
        .success()
        .stdout(predicate::str::contains("LOUD"));
    assert!(!fixture.log_path().exists());
}

#[test]
fn missing_identity_exits_cleanly() {
    let fixture = Fixture::new();
    fixture
        .command()
        .args(["--log-level", "info"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Failed to initialize configuration"));
}

#[test]
fn unreadable_credentials_abort() {
    let fixture = Fixture::new();
    fs::remove_file(&fixture.key).unwrap();
    let config = fixture.write_config(&fixture.config_json(json!({})));

    fixture
        .command()
        .arg("--config-file")
        .arg(&config)
        .assert()
        .failure();

    let log = fs::read_to_string(fixture.log_path()).unwrap();
    assert!(log.contains("Failed to initialize shared resources"));
}

#[test]
fn no_enabled_features_terminates_naturally() {
    let fixture = Fixture::new();
    let config = fixture.write_config(&fixture.config_json(json!({
        "jobs": { "enabled": false },
        "tunneling": { "enabled": false },
        "device-defender": { "enabled": false },
    })));

    fixture
        .command()
        .arg("--config-file")
        .arg(&config)
        .assert()
        .success();

    let log = fs::read_to_string(fixture.log_path()).unwrap();
    assert!(log.contains("No features are running"));
    assert!(log.contains("iot-device-client exiting"));
}

#[test]
fn default_config_path_is_used() {
    let fixture = Fixture::new();
    let default_dir = fixture.home.join(".config/iot-device-client");
    fs::create_dir_all(&default_dir).unwrap();
    let config = fixture.config_json(json!({
        "jobs": { "enabled": false },
        "tunneling": { "enabled": false },
        "device-defender": { "enabled": false },
    }));
    fs::write(default_dir.join("config.json"), config.to_string()).unwrap();

    fixture.command().assert().success();

    let log = fs::read_to_string(fixture.log_path()).unwrap();
    assert!(log.contains("No features are running"));
}
