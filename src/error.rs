//! Error handling for the device client.
use thiserror::Error;

/// Errors produced while merging and validating configuration layers.
///
/// Any of these aborts startup before a feature or the shared connection is
/// created.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No configuration file and no recognised CLI or environment values.
    #[error(
        "No configuration provided: pass a --config-file, CLI flags or environment variables"
    )]
    NoConfiguration,

    /// Error reading the configuration file.
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    /// Error parsing the JSON configuration file.
    #[error("Invalid JSON format: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field required by the deployment mode is absent or empty.
    #[error("Missing required configuration field '{field}'")]
    MissingField {
        /// Key of the missing field as written in the config file.
        field: &'static str,
    },

    /// Log level outside the supported vocabulary.
    #[error("Invalid log level '{0}' (expected one of: error, warn, info, debug, trace)")]
    InvalidLogLevel(String),

    /// Log sink type outside the supported vocabulary.
    #[error("Invalid log type '{0}' (expected one of: stdout, file)")]
    InvalidLogType(String),

    /// A boolean flag that is not `true` or `false`.
    #[error("Invalid boolean '{value}' for '{key}'")]
    InvalidBool {
        /// Flag or field name.
        key: String,
        /// Offending value.
        value: String,
    },

    /// A numeric flag that does not parse.
    #[error("Invalid number '{value}' for '{key}'")]
    InvalidNumber {
        /// Flag or field name.
        key: String,
        /// Offending value.
        value: String,
    },

    /// Port number outside `1..=65535`.
    #[error("Invalid tunneling port {0}")]
    InvalidPort(u64),

    /// A tunneling service without an entry in the service-to-port table.
    #[error("Unknown tunneling service '{0}' and no port given")]
    UnknownService(String),

    /// Destination-mode tunneling is missing one of its required values.
    #[error("Secure tunneling without notifications requires '{field}'")]
    MissingTunnelingField {
        /// Name of the missing tunneling value.
        field: &'static str,
    },

    /// Device Defender publishing interval must be positive.
    #[error("Device Defender interval must be greater than zero")]
    InvalidInterval,

    /// Fleet provisioning needs a template to provision against.
    #[error("Fleet provisioning is enabled but no template name was given")]
    MissingTemplateName,

    /// A tunneling-only build was configured with tunneling disabled.
    #[error("Secure tunneling must be enabled when running in tunneling-only mode")]
    TunnelingDisabled,
}

/// Error raised by a feature while initialising, starting or stopping.
#[derive(Debug, Error)]
#[error("Feature '{feature}' failed to {action}: {reason}")]
pub struct FeatureError {
    /// The feature name.
    pub feature: String,
    /// Lifecycle step that failed (`init`, `start`, `stop`).
    pub action: &'static str,
    /// Human-readable reason.
    pub reason: String,
}

impl FeatureError {
    pub fn new(feature: &str, action: &'static str, reason: impl Into<String>) -> Self {
        Self {
            feature: feature.to_string(),
            action,
            reason: reason.into(),
        }
    }
}

/// Defines all errors that can surface while running the client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration could not be resolved.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The shared connection used by every feature failed to initialise.
    #[error("Failed to initialize the shared connection: {0}")]
    ResourceInit(String),

    /// A feature lifecycle call failed.
    #[error(transparent)]
    Feature(#[from] FeatureError),

    /// Two features were registered under the same name.
    #[error("Feature '{0}' is already registered")]
    DuplicateFeature(String),

    /// Registration attempted after shutdown began.
    #[error("Cannot register feature '{0}': shutdown in progress")]
    ShuttingDown(String),

    /// Signal mask or wait failure.
    #[error("Signal handling failed: {0}")]
    Signal(#[from] nix::errno::Errno),

    /// Logging could not be initialised.
    #[error("Failed to initialize logging: {0}")]
    Logging(String),

    /// Generic I/O error (thread spawn, log file).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
