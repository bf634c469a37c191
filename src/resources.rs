//! The shared connection every feature runs on.
use std::{
    fs::File,
    sync::atomic::{AtomicBool, Ordering},
};

use tracing::{debug, info, warn};

use crate::config::ResolvedConfig;
use crate::error::ClientError;

/// Owner of the single transport connection that all features share.
///
/// If `initialize` fails no feature can run, so the caller treats the failure
/// as fatal.
pub trait SharedResourceManager: Send + Sync {
    fn initialize(&self, config: &ResolvedConfig) -> Result<(), ClientError>;
    fn disconnect(&self);
}

/// Connection manager that checks the configured endpoint and credential
/// material and tracks whether the connection is up.
#[derive(Debug, Default)]
pub struct ConnectionManager {
    connected: AtomicBool,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn check_readable(label: &str, path: &str) -> Result<(), ClientError> {
        File::open(path).map(|_| ()).map_err(|err| {
            ClientError::ResourceInit(format!("cannot read {label} '{path}': {err}"))
        })
    }
}

impl SharedResourceManager for ConnectionManager {
    fn initialize(&self, config: &ResolvedConfig) -> Result<(), ClientError> {
        let credentials = [
            ("certificate", &config.cert),
            ("private key", &config.key),
            ("root CA", &config.root_ca),
        ];
        for (label, path) in credentials {
            if let Some(path) = path {
                Self::check_readable(label, path)?;
            }
        }

        match (&config.endpoint, &config.thing_name) {
            (Some(endpoint), Some(thing_name)) => {
                info!("Connecting to {endpoint} as '{thing_name}'");
            }
            (Some(endpoint), None) => info!("Connecting to {endpoint}"),
            _ => debug!("No endpoint configured; shared connection stays local"),
        }

        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn disconnect(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            info!("Disconnected shared connection");
        } else {
            warn!("Disconnect requested but the shared connection was not open");
        }
    }
}
