#[path = "common/mod.rs"]
mod common;

use std::{
    thread,
    time::{Duration, Instant},
};

use common::{Fixture, wait_for_log};
use nix::{
    sys::signal::{Signal, kill},
    unistd::Pid,
};
use serde_json::json;

fn wait_for_exit(child: &mut std::process::Child) -> std::process::ExitStatus {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        if let Some(status) = child.try_wait().expect("failed to poll child") {
            return status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            panic!("client did not exit after interrupt");
        }
        thread::sleep(Duration::from_millis(50));
    }
}

#[cfg(unix)]
#[test]
fn interrupt_stops_every_feature_and_exits_zero() {
    let fixture = Fixture::new();
    let config = fixture.write_config(&fixture.config_json(json!({
        "jobs": { "enabled": true },
        "tunneling": { "enabled": true },
        "device-defender": { "enabled": true, "interval": 1 },
    })));
    let log_path = fixture.log_path();

    let mut child = fixture
        .std_command()
        .arg("--config-file")
        .arg(&config)
        .spawn()
        .expect("failed to spawn client");

    wait_for_log(&log_path, "Jobs has started");
    wait_for_log(&log_path, "Secure Tunneling has started");
    wait_for_log(&log_path, "Device Defender has started");

    kill(Pid::from_raw(child.id() as i32), Signal::SIGINT).expect("failed to send SIGINT");
    let status = wait_for_exit(&mut child);
    assert_eq!(status.code(), Some(0));

    let log = wait_for_log(&log_path, "All features have stopped");
    assert!(log.contains("Disconnected shared connection"));
    for feature in ["Jobs", "Secure Tunneling", "Device Defender"] {
        assert!(log.contains(&format!("{feature} has stopped")), "{feature}");
    }
}

#[cfg(unix)]
#[test]
fn hangup_is_ignored_until_interrupt() {
    let fixture = Fixture::new();
    let config = fixture.write_config(&fixture.config_json(json!({
        "jobs": { "enabled": true },
        "tunneling": { "enabled": false },
        "device-defender": { "enabled": false },
    })));
    let log_path = fixture.log_path();

    let mut child = fixture
        .std_command()
        .arg("--config-file")
        .arg(&config)
        .spawn()
        .expect("failed to spawn client");
    wait_for_log(&log_path, "Jobs has started");

    let pid = Pid::from_raw(child.id() as i32);
    kill(pid, Signal::SIGHUP).expect("failed to send SIGHUP");
    wait_for_log(&log_path, "ignoring");
    assert!(child.try_wait().unwrap().is_none());

    kill(pid, Signal::SIGTERM).expect("failed to send SIGTERM");
    assert_eq!(wait_for_exit(&mut child).code(), Some(0));
}
