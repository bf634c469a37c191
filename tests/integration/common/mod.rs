#![allow(dead_code)]

use std::{
    fs,
    path::{Path, PathBuf},
    process::Command as StdCommand,
    thread,
    time::{Duration, Instant},
};

use assert_cmd::Command;
use tempfile::TempDir;

pub const BIN: &str = "iot-device-client";

/// Environment variables the client reads; cleared so the host cannot leak in.
const CLIENT_ENV: [&str; 7] = [
    "AWSIOT_TUNNEL_ACCESS_TOKEN",
    "IOT_DEVICE_CLIENT_ENDPOINT",
    "IOT_DEVICE_CLIENT_CERT",
    "IOT_DEVICE_CLIENT_KEY",
    "IOT_DEVICE_CLIENT_ROOT_CA",
    "IOT_DEVICE_CLIENT_THING_NAME",
    "IOT_DEVICE_CLIENT_LOG_LEVEL",
];

/// Isolated home directory with device credentials.
pub struct Fixture {
    pub temp: TempDir,
    pub home: PathBuf,
    pub cert: PathBuf,
    pub key: PathBuf,
    pub root_ca: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let temp = tempfile::tempdir().expect("failed to create tempdir");
        let home = temp.path().join("home");
        fs::create_dir_all(&home).expect("failed to create home dir");

        let certs = temp.path().join("certs");
        fs::create_dir_all(&certs).expect("failed to create certs dir");
        let cert = certs.join("device.pem.crt");
        let key = certs.join("private.pem.key");
        let root_ca = certs.join("AmazonRootCA1.pem");
        for path in [&cert, &key, &root_ca] {
            fs::write(path, "-----BEGIN TEST-----\n").expect("failed to write credential");
        }

        Self {
            temp,
            home,
            cert,
            key,
            root_ca,
        }
    }

    pub fn log_path(&self) -> PathBuf {
        self.temp.path().join("logs/client.log")
    }

    /// Identity section plus file logging, merged with `extra`.
    pub fn config_json(&self, extra: serde_json::Value) -> serde_json::Value {
        let mut config = serde_json::json!({
            "endpoint": "example-ats.iot.us-east-1.amazonaws.com",
            "cert": self.cert,
            "key": self.key,
            "root-ca": self.root_ca,
            "thing-name": "integration-device",
            "logging": {
                "level": "debug",
                "type": "file",
                "file": self.log_path(),
            },
        });
        if let (Some(base), Some(extra)) = (config.as_object_mut(), extra.as_object()) {
            for (key, value) in extra {
                base.insert(key.clone(), value.clone());
            }
        }
        config
    }

    pub fn write_config(&self, config: &serde_json::Value) -> PathBuf {
        let path = self.temp.path().join("config.json");
        fs::write(&path, config.to_string()).expect("failed to write config");
        path
    }

    pub fn command(&self) -> Command {
        let mut command = Command::new(assert_cmd::cargo::cargo_bin!("iot-device-client"));
        command.env("HOME", &self.home);
        for key in CLIENT_ENV {
            command.env_remove(key);
        }
        command
    }

    pub fn std_command(&self) -> StdCommand {
        let mut command = StdCommand::new(assert_cmd::cargo::cargo_bin!("iot-device-client"));
        command.env("HOME", &self.home);
        for key in CLIENT_ENV {
            command.env_remove(key);
        }
        command
    }
}

pub fn wait_for_log(path: &Path, needle: &str) -> String {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        if let Ok(content) = fs::read_to_string(path)
            && content.contains(needle)
        {
            return content;
        }

        if Instant::now() >= deadline {
            let content = fs::read_to_string(path).unwrap_or_default();
            panic!("Timed out waiting for '{needle}' in {:?}:\n{content}", path);
        }

        thread::sleep(Duration::from_millis(100));
    }
}
