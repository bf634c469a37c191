//! Layered configuration for the device client.
//!
//! Values are merged field by field from four layers, lowest precedence first:
//! built-in defaults, the JSON config file, CLI flags and environment
//! variables. A layer only overwrites the fields it actually supplies. The
//! merged view is then validated into an immutable [`ResolvedConfig`].
use serde::Deserialize;
use std::{
    collections::HashMap,
    env, fmt, fs, io,
    path::{Path, PathBuf},
};
use strum_macros::{AsRefStr, EnumString};

use crate::constants::*;
use crate::error::ConfigError;

/// Flag key to value, as produced by the CLI parser. Presence-only flags map to
/// an empty string.
pub type CliArgs = HashMap<String, String>;

/// Snapshot of the environment variables the resolver understands.
pub type EnvVars = HashMap<String, String>;

/// Log severity. The discriminant is the ordinal used by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl LogLevel {
    pub fn ordinal(self) -> u8 {
        self as u8
    }
}

/// Where log output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogType {
    Stdout,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub level: LogLevel,
    pub log_type: LogType,
    /// Only used when `log_type` is [`LogType::File`].
    pub file: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobsConfig {
    pub enabled: bool,
    /// Directory holding job handler executables.
    pub handler_dir: Option<String>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct TunnelingConfig {
    pub enabled: bool,
    pub region: Option<String>,
    /// Taken from the environment only.
    pub destination_access_token: Option<String>,
    /// Explicit port, or the port derived from `service`.
    pub port: Option<u16>,
    pub service: Option<String>,
    /// Whether to wait for tunnel notifications instead of connecting directly.
    pub subscribe_notification: bool,
}

impl fmt::Debug for TunnelingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TunnelingConfig")
            .field("enabled", &self.enabled)
            .field("region", &self.region)
            .field(
                "destination_access_token",
                &self.destination_access_token.as_ref().map(|_| "<redacted>"),
            )
            .field("port", &self.port)
            .field("service", &self.service)
            .field("subscribe_notification", &self.subscribe_notification)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDefenderConfig {
    pub enabled: bool,
    pub interval_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetProvisioningConfig {
    pub enabled: bool,
    pub template_name: Option<String>,
    pub csr_file: Option<String>,
}

/// Validated configuration. Never mutated after [`resolve`] returns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub endpoint: Option<String>,
    pub cert: Option<String>,
    pub key: Option<String>,
    pub root_ca: Option<String>,
    pub thing_name: Option<String>,
    pub log: LogConfig,
    pub jobs: JobsConfig,
    pub tunneling: TunnelingConfig,
    pub device_defender: DeviceDefenderConfig,
    pub fleet_provisioning: FleetProvisioningConfig,
    pub mode: DeploymentMode,
}

/// On-disk JSON layout. Unknown keys are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct FileConfig {
    endpoint: Option<String>,
    cert: Option<String>,
    key: Option<String>,
    root_ca: Option<String>,
    thing_name: Option<String>,
    logging: Option<FileLogConfig>,
    jobs: Option<FileJobsConfig>,
    tunneling: Option<FileTunnelingConfig>,
    device_defender: Option<FileDeviceDefenderConfig>,
    fleet_provisioning: Option<FileFleetProvisioningConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct FileLogConfig {
    level: Option<String>,
    #[serde(rename = "type")]
    log_type: Option<String>,
    file: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct FileJobsConfig {
    enabled: Option<bool>,
    handler_directory: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct FileTunnelingConfig {
    enabled: Option<bool>,
    region: Option<String>,
    port: Option<u64>,
    service: Option<String>,
    subscribe_notification: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct FileDeviceDefenderConfig {
    enabled: Option<bool>,
    interval: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct FileFleetProvisioningConfig {
    enabled: Option<bool>,
    template_name: Option<String>,
    csr_file: Option<String>,
}

/// Merged, not yet validated view of every layer. Starts out holding the
/// built-in defaults.
#[derive(Debug, Clone)]
struct PartialConfig {
    endpoint: Option<String>,
    cert: Option<String>,
    key: Option<String>,
    root_ca: Option<String>,
    thing_name: Option<String>,
    log_level: String,
    log_type: String,
    log_file: String,
    jobs_enabled: bool,
    jobs_handler_dir: Option<String>,
    tunneling_enabled: bool,
    tunneling_region: Option<String>,
    tunneling_port: Option<u64>,
    tunneling_service: Option<String>,
    tunneling_subscribe_notification: bool,
    tunneling_access_token: Option<String>,
    device_defender_enabled: bool,
    device_defender_interval: u64,
    fleet_provisioning_enabled: bool,
    fleet_provisioning_template_name: Option<String>,
    fleet_provisioning_csr_file: Option<String>,
}

impl Default for PartialConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            cert: None,
            key: None,
            root_ca: None,
            thing_name: None,
            log_level: LogLevel::Info.as_ref().to_string(),
            log_type: LogType::Stdout.as_ref().to_string(),
            log_file: DEFAULT_LOG_FILE.to_string(),
            jobs_enabled: DEFAULT_JOBS_ENABLED,
            jobs_handler_dir: None,
            tunneling_enabled: DEFAULT_TUNNELING_ENABLED,
            tunneling_region: None,
            tunneling_port: None,
            tunneling_service: None,
            tunneling_subscribe_notification: true,
            tunneling_access_token: None,
            device_defender_enabled: DEFAULT_DEVICE_DEFENDER_ENABLED,
            device_defender_interval: DEFAULT_DEVICE_DEFENDER_INTERVAL_SECS,
            fleet_provisioning_enabled: DEFAULT_FLEET_PROVISIONING_ENABLED,
            fleet_provisioning_template_name: None,
            fleet_provisioning_csr_file: None,
        }
    }
}

/// Overwrites `slot` only when the layer supplied a value.
fn overlay<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn overlay_opt<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

fn parse_bool(args: &CliArgs, key: &str) -> Result<Option<bool>, ConfigError> {
    let Some(raw) = args.get(key) else {
        return Ok(None);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(Some(true)),
        "false" => Ok(Some(false)),
        _ => Err(ConfigError::InvalidBool {
            key: key.to_string(),
            value: raw.clone(),
        }),
    }
}

fn parse_number(args: &CliArgs, key: &str) -> Result<Option<u64>, ConfigError> {
    let Some(raw) = args.get(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<u64>()
        .map(Some)
        .map_err(|_| ConfigError::InvalidNumber {
            key: key.to_string(),
            value: raw.clone(),
        })
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().is_none_or(|v| v.trim().is_empty())
}

impl PartialConfig {
    fn apply_file(&mut self, file: FileConfig) {
        overlay_opt(&mut self.endpoint, file.endpoint);
        overlay_opt(&mut self.cert, file.cert);
        overlay_opt(&mut self.key, file.key);
        overlay_opt(&mut self.root_ca, file.root_ca);
        overlay_opt(&mut self.thing_name, file.thing_name);

        if let Some(logging) = file.logging {
            overlay(&mut self.log_level, logging.level);
            overlay(&mut self.log_type, logging.log_type);
            overlay(&mut self.log_file, logging.file);
        }

        if let Some(jobs) = file.jobs {
            overlay(&mut self.jobs_enabled, jobs.enabled);
            overlay_opt(&mut self.jobs_handler_dir, jobs.handler_directory);
        }

        if let Some(tunneling) = file.tunneling {
            overlay(&mut self.tunneling_enabled, tunneling.enabled);
            overlay_opt(&mut self.tunneling_region, tunneling.region);
            overlay_opt(&mut self.tunneling_port, tunneling.port);
            overlay_opt(&mut self.tunneling_service, tunneling.service);
            overlay(
                &mut self.tunneling_subscribe_notification,
                tunneling.subscribe_notification,
            );
        }

        if let Some(defender) = file.device_defender {
            overlay(&mut self.device_defender_enabled, defender.enabled);
            overlay(&mut self.device_defender_interval, defender.interval);
        }

        if let Some(fleet) = file.fleet_provisioning {
            overlay(&mut self.fleet_provisioning_enabled, fleet.enabled);
            overlay_opt(&mut self.fleet_provisioning_template_name, fleet.template_name);
            overlay_opt(&mut self.fleet_provisioning_csr_file, fleet.csr_file);
        }
    }

    fn apply_cli(&mut self, args: &CliArgs) -> Result<(), ConfigError> {
        let get = |key: &str| args.get(key).cloned();

        overlay_opt(&mut self.endpoint, get(CLI_ENDPOINT));
        overlay_opt(&mut self.cert, get(CLI_CERT));
        overlay_opt(&mut self.key, get(CLI_KEY));
        overlay_opt(&mut self.root_ca, get(CLI_ROOT_CA));
        overlay_opt(&mut self.thing_name, get(CLI_THING_NAME));

        overlay(&mut self.log_level, get(CLI_LOG_LEVEL));
        overlay(&mut self.log_type, get(CLI_LOG_TYPE));
        overlay(&mut self.log_file, get(CLI_LOG_FILE));

        overlay(&mut self.jobs_enabled, parse_bool(args, CLI_ENABLE_JOBS)?);
        overlay_opt(&mut self.jobs_handler_dir, get(CLI_JOBS_HANDLER_DIR));

        overlay(
            &mut self.tunneling_enabled,
            parse_bool(args, CLI_ENABLE_TUNNELING)?,
        );
        overlay_opt(&mut self.tunneling_region, get(CLI_TUNNELING_REGION));
        overlay_opt(&mut self.tunneling_service, get(CLI_TUNNELING_SERVICE));
        overlay_opt(
            &mut self.tunneling_port,
            parse_number(args, CLI_TUNNELING_PORT)?,
        );
        if args.contains_key(CLI_TUNNELING_DISABLE_NOTIFICATION) {
            self.tunneling_subscribe_notification = false;
        }

        overlay(
            &mut self.device_defender_enabled,
            parse_bool(args, CLI_ENABLE_DEVICE_DEFENDER)?,
        );
        overlay(
            &mut self.device_defender_interval,
            parse_number(args, CLI_DEVICE_DEFENDER_INTERVAL)?,
        );

        overlay(
            &mut self.fleet_provisioning_enabled,
            parse_bool(args, CLI_ENABLE_FLEET_PROVISIONING)?,
        );
        overlay_opt(
            &mut self.fleet_provisioning_template_name,
            get(CLI_FLEET_PROVISIONING_TEMPLATE_NAME),
        );
        overlay_opt(&mut self.fleet_provisioning_csr_file, get(CLI_CSR_FILE));

        Ok(())
    }

    fn apply_env(&mut self, env: &EnvVars) {
        let get = |key: &str| env.get(key).cloned();

        overlay_opt(&mut self.endpoint, get(ENV_ENDPOINT));
        overlay_opt(&mut self.cert, get(ENV_CERT));
        overlay_opt(&mut self.key, get(ENV_KEY));
        overlay_opt(&mut self.root_ca, get(ENV_ROOT_CA));
        overlay_opt(&mut self.thing_name, get(ENV_THING_NAME));
        overlay(&mut self.log_level, get(ENV_LOG_LEVEL));

        // The access token is a secret: only the environment may set it.
        self.tunneling_access_token = get(ENV_TUNNEL_ACCESS_TOKEN);
    }

    fn validate(self, mode: DeploymentMode) -> Result<ResolvedConfig, ConfigError> {
        let level = self
            .log_level
            .trim()
            .parse::<LogLevel>()
            .map_err(|_| ConfigError::InvalidLogLevel(self.log_level.clone()))?;
        let log_type = self
            .log_type
            .trim()
            .parse::<LogType>()
            .map_err(|_| ConfigError::InvalidLogType(self.log_type.clone()))?;

        if mode == DeploymentMode::Full {
            let identity = [
                ("endpoint", &self.endpoint),
                ("cert", &self.cert),
                ("key", &self.key),
                ("root-ca", &self.root_ca),
                ("thing-name", &self.thing_name),
            ];
            if let Some((field, _)) = identity.iter().find(|(_, value)| is_blank(value)) {
                return Err(ConfigError::MissingField { field: *field });
            }
        }

        let tunneling = self.validate_tunneling(mode)?;

        let tunneling_only = mode == DeploymentMode::TunnelingOnly;
        let device_defender = DeviceDefenderConfig {
            enabled: self.device_defender_enabled && !tunneling_only,
            interval_seconds: self.device_defender_interval,
        };
        if device_defender.enabled && device_defender.interval_seconds == 0 {
            return Err(ConfigError::InvalidInterval);
        }

        let fleet_provisioning = FleetProvisioningConfig {
            enabled: self.fleet_provisioning_enabled && !tunneling_only,
            template_name: self.fleet_provisioning_template_name,
            csr_file: self.fleet_provisioning_csr_file,
        };
        if fleet_provisioning.enabled && is_blank(&fleet_provisioning.template_name) {
            return Err(ConfigError::MissingTemplateName);
        }

        Ok(ResolvedConfig {
            endpoint: self.endpoint,
            cert: self.cert,
            key: self.key,
            root_ca: self.root_ca,
            thing_name: self.thing_name,
            log: LogConfig {
                level,
                log_type,
                file: PathBuf::from(self.log_file),
            },
            jobs: JobsConfig {
                enabled: self.jobs_enabled && !tunneling_only,
                handler_dir: self.jobs_handler_dir,
            },
            tunneling,
            device_defender,
            fleet_provisioning,
            mode,
        })
    }

    fn validate_tunneling(&self, mode: DeploymentMode) -> Result<TunnelingConfig, ConfigError> {
        let enabled = self.tunneling_enabled;
        if mode == DeploymentMode::TunnelingOnly && !enabled {
            return Err(ConfigError::TunnelingDisabled);
        }

        let port = match self.tunneling_port {
            Some(port) => match u16::try_from(port) {
                Ok(valid) if valid > 0 => Some(valid),
                _ => return Err(ConfigError::InvalidPort(port)),
            },
            None => self.tunneling_service.as_deref().and_then(port_for_service),
        };

        if enabled {
            if port.is_none()
                && let Some(service) = &self.tunneling_service
            {
                return Err(ConfigError::UnknownService(service.clone()));
            }

            if !self.tunneling_subscribe_notification {
                if is_blank(&self.tunneling_access_token) {
                    return Err(ConfigError::MissingTunnelingField {
                        field: "destination access token",
                    });
                }
                if is_blank(&self.tunneling_region) {
                    return Err(ConfigError::MissingTunnelingField { field: "region" });
                }
                if port.is_none() {
                    return Err(ConfigError::MissingTunnelingField { field: "port" });
                }
            }
        }

        Ok(TunnelingConfig {
            enabled,
            region: self.tunneling_region.clone(),
            destination_access_token: self.tunneling_access_token.clone(),
            port,
            service: self.tunneling_service.clone(),
            subscribe_notification: self.tunneling_subscribe_notification,
        })
    }
}

/// Merges every layer and validates the result.
///
/// `file_json` is the raw config file contents, if any. The function is pure:
/// on error nothing outside the call has been touched.
pub fn resolve(
    file_json: Option<&str>,
    cli: &CliArgs,
    env: &EnvVars,
    mode: DeploymentMode,
) -> Result<ResolvedConfig, ConfigError> {
    let has_cli = cli
        .keys()
        .any(|key| RECOGNIZED_CLI_KEYS.contains(&key.as_str()));
    let has_env = env
        .keys()
        .any(|key| RECOGNIZED_ENV_VARS.contains(&key.as_str()));
    if file_json.is_none() && !has_cli && !has_env {
        return Err(ConfigError::NoConfiguration);
    }

    let mut partial = PartialConfig::default();
    if let Some(json) = file_json {
        let file: FileConfig = serde_json::from_str(json)?;
        partial.apply_file(file);
    }
    partial.apply_cli(cli)?;
    partial.apply_env(env);
    partial.validate(mode)
}

/// Default config file location under `$HOME`.
pub fn default_config_path() -> Option<PathBuf> {
    env::var_os("HOME").map(|home| PathBuf::from(home).join(DEFAULT_CONFIG_FILE))
}

/// Reads the config file. An explicit path must exist; the default path is
/// skipped when absent.
fn read_config_file(config_path: Option<&Path>) -> Result<Option<String>, ConfigError> {
    let (path, explicit) = match config_path {
        Some(path) => (path.to_path_buf(), true),
        None => match default_config_path() {
            Some(path) => (path, false),
            None => return Ok(None),
        },
    };

    if !explicit && !path.exists() {
        return Ok(None);
    }

    fs::read_to_string(&path).map(Some).map_err(|e| {
        ConfigError::Read(io::Error::new(
            e.kind(),
            format!("{} ({})", e, path.display()),
        ))
    })
}

/// Loads the config file (if any) and resolves it against the CLI and
/// environment layers.
pub fn load_config(
    config_path: Option<&Path>,
    cli: &CliArgs,
    env: &EnvVars,
    mode: DeploymentMode,
) -> Result<ResolvedConfig, ConfigError> {
    let contents = read_config_file(config_path)?;
    resolve(contents.as_deref(), cli, env, mode)
}

/// Reads the recognised environment variables once.
pub fn environment_snapshot() -> EnvVars {
    RECOGNIZED_ENV_VARS
        .iter()
        .filter_map(|key| env::var(key).ok().map(|value| (key.to_string(), value)))
        .collect()
}
