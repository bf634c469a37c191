//! Secure Tunneling feature.
//!
//! In notification mode the feature waits for tunnel notifications for this
//! thing. In destination mode it connects straight to the local destination
//! port using the access token from the environment.
use std::sync::Arc;

use tracing::{debug, info};

use super::worker::FeatureWorker;
use crate::config::{ResolvedConfig, TunnelingConfig};
use crate::constants::{IDLE_FEATURE_TICK, TUNNELING_FEATURE_NAME};
use crate::error::FeatureError;
use crate::feature::{Feature, NotificationSink};
use crate::resources::SharedResourceManager;

/// How the tunnel gets opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TunnelMode {
    /// Wait for notifications that carry the tunnel details.
    Notification { thing_name: Option<String> },
    /// Connect directly to `localhost:port`.
    Destination { region: String, port: u16 },
}

impl TunnelMode {
    pub fn from_config(config: &ResolvedConfig) -> Result<Self, FeatureError> {
        let tunneling: &TunnelingConfig = &config.tunneling;
        if tunneling.subscribe_notification {
            return Ok(Self::Notification {
                thing_name: config.thing_name.clone(),
            });
        }

        match (&tunneling.region, tunneling.port) {
            (Some(region), Some(port)) => Ok(Self::Destination {
                region: region.clone(),
                port,
            }),
            _ => Err(FeatureError::new(
                TUNNELING_FEATURE_NAME,
                "init",
                "destination mode needs a region and a port",
            )),
        }
    }
}

#[derive(Default)]
pub struct TunnelingFeature {
    mode: Option<TunnelMode>,
    worker: Option<FeatureWorker>,
}

impl TunnelingFeature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Option<&TunnelMode> {
        self.mode.as_ref()
    }

    fn worker(&self, action: &'static str) -> Result<&FeatureWorker, FeatureError> {
        self.worker
            .as_ref()
            .ok_or_else(|| FeatureError::new(TUNNELING_FEATURE_NAME, action, "not initialised"))
    }
}

impl Feature for TunnelingFeature {
    fn name(&self) -> &str {
        TUNNELING_FEATURE_NAME
    }

    fn init(
        &mut self,
        _resources: Arc<dyn SharedResourceManager>,
        notifier: Arc<dyn NotificationSink>,
        config: &ResolvedConfig,
    ) -> Result<(), FeatureError> {
        self.mode = Some(TunnelMode::from_config(config)?);
        self.worker = Some(FeatureWorker::new(
            TUNNELING_FEATURE_NAME,
            IDLE_FEATURE_TICK,
            notifier,
        ));
        Ok(())
    }

    fn start(&self) -> Result<(), FeatureError> {
        let worker = self.worker("start")?;
        match &self.mode {
            Some(TunnelMode::Notification { thing_name }) => info!(
                "Subscribing to tunnel notifications for {}",
                thing_name.as_deref().unwrap_or("this device")
            ),
            Some(TunnelMode::Destination { region, port }) => {
                info!("Opening tunnel in {region} to localhost:{port}")
            }
            None => {}
        }
        worker.start(|| debug!("Tunnel idle"))
    }

    fn stop(&self) -> Result<(), FeatureError> {
        self.worker("stop")?.stop();
        Ok(())
    }
}
