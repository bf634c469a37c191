//! Command-line interface for the device client.
use std::path::PathBuf;

use clap::Parser;

use crate::config::CliArgs;
use crate::constants::*;

/// Command-line interface for the device client.
///
/// Every value is kept as a string; typing and validation happen in the
/// configuration resolver so that a bad value in a lower layer can still be
/// overridden by a higher one.
#[derive(Parser, Debug, Default)]
#[command(name = "iot-device-client", version, author)]
#[command(about = "Runs IoT device client features and shuts them down cleanly", long_about = None)]
pub struct Cli {
    /// Path to the JSON configuration file.
    #[arg(long = CLI_CONFIG_FILE, value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    /// IoT data-plane endpoint.
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Path to the device certificate.
    #[arg(long)]
    pub cert: Option<String>,

    /// Path to the device private key.
    #[arg(long)]
    pub key: Option<String>,

    /// Path to the root CA bundle.
    #[arg(long = "root-ca")]
    pub root_ca: Option<String>,

    /// Thing name identifying this device.
    #[arg(long = "thing-name")]
    pub thing_name: Option<String>,

    /// Log level: error, warn, info, debug or trace.
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Log sink: stdout or file.
    #[arg(long = "log-type", value_name = "TYPE")]
    pub log_type: Option<String>,

    /// Log file used when the sink is `file`.
    #[arg(long = "log-file", value_name = "PATH")]
    pub log_file: Option<String>,

    /// Enable or disable the Jobs feature (true/false).
    #[arg(long = "enable-jobs", value_name = "BOOL")]
    pub enable_jobs: Option<String>,

    /// Directory containing job handlers.
    #[arg(long = "jobs-handler-dir", value_name = "DIR")]
    pub jobs_handler_dir: Option<String>,

    /// Enable or disable Secure Tunneling (true/false).
    #[arg(long = "enable-tunneling", value_name = "BOOL")]
    pub enable_tunneling: Option<String>,

    /// Region of the tunnel endpoint.
    #[arg(long = "tunneling-region", value_name = "REGION")]
    pub tunneling_region: Option<String>,

    /// Destination service name, mapped to a port (e.g. SSH).
    #[arg(long = "tunneling-service", value_name = "SERVICE")]
    pub tunneling_service: Option<String>,

    /// Destination port; takes precedence over the service mapping.
    #[arg(long = "tunneling-port", value_name = "PORT")]
    pub tunneling_port: Option<String>,

    /// Connect directly instead of waiting for tunnel notifications.
    #[arg(long = "tunneling-disable-notification")]
    pub tunneling_disable_notification: bool,

    /// Enable or disable Device Defender (true/false).
    #[arg(long = "enable-device-defender", value_name = "BOOL")]
    pub enable_device_defender: Option<String>,

    /// Seconds between Device Defender reports.
    #[arg(long = "device-defender-interval", value_name = "SECONDS")]
    pub device_defender_interval: Option<String>,

    /// Enable or disable Fleet Provisioning (true/false).
    #[arg(long = "enable-fleet-provisioning", value_name = "BOOL")]
    pub enable_fleet_provisioning: Option<String>,

    /// Fleet Provisioning template name.
    #[arg(long = "fleet-provisioning-template-name", value_name = "NAME")]
    pub fleet_provisioning_template_name: Option<String>,

    /// Certificate signing request used by Fleet Provisioning.
    #[arg(long = "csr-file", value_name = "PATH")]
    pub csr_file: Option<String>,
}

impl Cli {
    /// Flattens the parsed flags into the key/value map the resolver consumes.
    /// Flags that were not given are left out.
    pub fn to_cli_args(&self) -> CliArgs {
        let mut args = CliArgs::new();
        let pairs = [
            (CLI_ENDPOINT, &self.endpoint),
            (CLI_CERT, &self.cert),
            (CLI_KEY, &self.key),
            (CLI_ROOT_CA, &self.root_ca),
            (CLI_THING_NAME, &self.thing_name),
            (CLI_LOG_LEVEL, &self.log_level),
            (CLI_LOG_TYPE, &self.log_type),
            (CLI_LOG_FILE, &self.log_file),
            (CLI_ENABLE_JOBS, &self.enable_jobs),
            (CLI_JOBS_HANDLER_DIR, &self.jobs_handler_dir),
            (CLI_ENABLE_TUNNELING, &self.enable_tunneling),
            (CLI_TUNNELING_REGION, &self.tunneling_region),
            (CLI_TUNNELING_SERVICE, &self.tunneling_service),
            (CLI_TUNNELING_PORT, &self.tunneling_port),
            (CLI_ENABLE_DEVICE_DEFENDER, &self.enable_device_defender),
            (CLI_DEVICE_DEFENDER_INTERVAL, &self.device_defender_interval),
            (CLI_ENABLE_FLEET_PROVISIONING, &self.enable_fleet_provisioning),
            (
                CLI_FLEET_PROVISIONING_TEMPLATE_NAME,
                &self.fleet_provisioning_template_name,
            ),
            (CLI_CSR_FILE, &self.csr_file),
        ];

        for (key, value) in pairs {
            if let Some(value) = value {
                args.insert(key.to_string(), value.clone());
            }
        }

        if self.tunneling_disable_notification {
            args.insert(CLI_TUNNELING_DISABLE_NOTIFICATION.to_string(), String::new());
        }

        args
    }
}

/// Parses command-line arguments.
pub fn parse_args() -> Cli {
    Cli::parse()
}
