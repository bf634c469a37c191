//! Constants and configuration keys for the device client.
//!
//! This module centralizes the flag names, environment variables, file keys and
//! default values shared by the CLI parser and the configuration resolver.

use std::time::Duration;

// ============================================================================
// CLI Flag Keys
// ============================================================================

/// Path to the JSON configuration file.
pub const CLI_CONFIG_FILE: &str = "config-file";

/// MQTT endpoint of the IoT data plane.
pub const CLI_ENDPOINT: &str = "endpoint";

/// Path to the device certificate.
pub const CLI_CERT: &str = "cert";

/// Path to the device private key.
pub const CLI_KEY: &str = "key";

/// Path to the root certificate authority bundle.
pub const CLI_ROOT_CA: &str = "root-ca";

/// Thing (device identity) name.
pub const CLI_THING_NAME: &str = "thing-name";

pub const CLI_LOG_LEVEL: &str = "log-level";
pub const CLI_LOG_TYPE: &str = "log-type";
pub const CLI_LOG_FILE: &str = "log-file";

pub const CLI_ENABLE_JOBS: &str = "enable-jobs";
pub const CLI_JOBS_HANDLER_DIR: &str = "jobs-handler-dir";

pub const CLI_ENABLE_TUNNELING: &str = "enable-tunneling";
pub const CLI_TUNNELING_REGION: &str = "tunneling-region";
pub const CLI_TUNNELING_SERVICE: &str = "tunneling-service";
pub const CLI_TUNNELING_PORT: &str = "tunneling-port";

/// Presence-only flag: any value (including empty) disables the notification subscription.
pub const CLI_TUNNELING_DISABLE_NOTIFICATION: &str = "tunneling-disable-notification";

pub const CLI_ENABLE_DEVICE_DEFENDER: &str = "enable-device-defender";
pub const CLI_DEVICE_DEFENDER_INTERVAL: &str = "device-defender-interval";

pub const CLI_ENABLE_FLEET_PROVISIONING: &str = "enable-fleet-provisioning";
pub const CLI_FLEET_PROVISIONING_TEMPLATE_NAME: &str = "fleet-provisioning-template-name";
pub const CLI_CSR_FILE: &str = "csr-file";

/// Every flag key the resolver understands. Keys outside this list are ignored.
pub const RECOGNIZED_CLI_KEYS: &[&str] = &[
    CLI_ENDPOINT,
    CLI_CERT,
    CLI_KEY,
    CLI_ROOT_CA,
    CLI_THING_NAME,
    CLI_LOG_LEVEL,
    CLI_LOG_TYPE,
    CLI_LOG_FILE,
    CLI_ENABLE_JOBS,
    CLI_JOBS_HANDLER_DIR,
    CLI_ENABLE_TUNNELING,
    CLI_TUNNELING_REGION,
    CLI_TUNNELING_SERVICE,
    CLI_TUNNELING_PORT,
    CLI_TUNNELING_DISABLE_NOTIFICATION,
    CLI_ENABLE_DEVICE_DEFENDER,
    CLI_DEVICE_DEFENDER_INTERVAL,
    CLI_ENABLE_FLEET_PROVISIONING,
    CLI_FLEET_PROVISIONING_TEMPLATE_NAME,
    CLI_CSR_FILE,
];

// ============================================================================
// Environment Variables
// ============================================================================

/// Destination access token for secure tunneling. The environment is the only
/// source for this secret.
pub const ENV_TUNNEL_ACCESS_TOKEN: &str = "AWSIOT_TUNNEL_ACCESS_TOKEN";

pub const ENV_ENDPOINT: &str = "IOT_DEVICE_CLIENT_ENDPOINT";
pub const ENV_CERT: &str = "IOT_DEVICE_CLIENT_CERT";
pub const ENV_KEY: &str = "IOT_DEVICE_CLIENT_KEY";
pub const ENV_ROOT_CA: &str = "IOT_DEVICE_CLIENT_ROOT_CA";
pub const ENV_THING_NAME: &str = "IOT_DEVICE_CLIENT_THING_NAME";
pub const ENV_LOG_LEVEL: &str = "IOT_DEVICE_CLIENT_LOG_LEVEL";

/// Every environment variable the resolver reads.
pub const RECOGNIZED_ENV_VARS: &[&str] = &[
    ENV_TUNNEL_ACCESS_TOKEN,
    ENV_ENDPOINT,
    ENV_CERT,
    ENV_KEY,
    ENV_ROOT_CA,
    ENV_THING_NAME,
    ENV_LOG_LEVEL,
];

// ============================================================================
// Defaults
// ============================================================================

/// Config file location relative to `$HOME`, used when `--config-file` is absent.
pub const DEFAULT_CONFIG_FILE: &str = ".config/iot-device-client/config.json";

/// Log file used when the sink type is `file` and no path is configured.
pub const DEFAULT_LOG_FILE: &str = "/var/log/iot-device-client/iot-device-client.log";

pub const DEFAULT_JOBS_ENABLED: bool = true;
pub const DEFAULT_TUNNELING_ENABLED: bool = true;
pub const DEFAULT_DEVICE_DEFENDER_ENABLED: bool = true;
pub const DEFAULT_FLEET_PROVISIONING_ENABLED: bool = false;

/// Seconds between Device Defender metric reports.
pub const DEFAULT_DEVICE_DEFENDER_INTERVAL_SECS: u64 = 300;

/// Static service-name to destination-port table used by secure tunneling.
pub const TUNNELING_SERVICE_PORTS: &[(&str, u16)] = &[("SSH", 22), ("VNC", 5900)];

/// Looks up the destination port for a well-known tunneling service.
pub fn port_for_service(service: &str) -> Option<u16> {
    let service = service.trim();
    TUNNELING_SERVICE_PORTS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(service))
        .map(|(_, port)| *port)
}

// ============================================================================
// Feature Names
// ============================================================================

pub const JOBS_FEATURE_NAME: &str = "Jobs";
pub const TUNNELING_FEATURE_NAME: &str = "Secure Tunneling";
pub const DEVICE_DEFENDER_FEATURE_NAME: &str = "Device Defender";

/// Poll interval for features that have no periodic work of their own.
pub const IDLE_FEATURE_TICK: Duration = Duration::from_secs(60);

// ============================================================================
// Deployment Mode
// ============================================================================

/// Which set of features this build is allowed to run.
///
/// `TunnelingOnly` builds run secure tunneling alone and do not require the
/// top-level device identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentMode {
    /// Every feature is available; the device identity is mandatory.
    Full,
    /// Only secure tunneling runs.
    TunnelingOnly,
}

impl DeploymentMode {
    /// The mode selected by the `tunneling-only` cargo feature.
    pub const fn from_build() -> Self {
        if cfg!(feature = "tunneling-only") {
            Self::TunnelingOnly
        } else {
            Self::Full
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::TunnelingOnly => "tunneling-only",
        }
    }
}
