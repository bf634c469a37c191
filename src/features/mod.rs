//! Built-in features and the factory that wires the enabled ones.
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::ResolvedConfig;
use crate::error::ClientError;
use crate::feature::{Feature, FeatureHandle, NotificationSink};
use crate::resources::SharedResourceManager;

pub mod device_defender;
pub mod jobs;
pub mod tunneling;
mod worker;

pub use device_defender::DeviceDefenderFeature;
pub use jobs::JobsFeature;
pub use tunneling::{TunnelMode, TunnelingFeature};

/// Initialises every feature enabled in `config`, in start order.
pub fn build_features(
    config: &ResolvedConfig,
    resources: Arc<dyn SharedResourceManager>,
    notifier: Arc<dyn NotificationSink>,
) -> Result<Vec<FeatureHandle>, ClientError> {
    let mut candidates: Vec<Box<dyn Feature>> = Vec::new();
    if config.jobs.enabled {
        candidates.push(Box::new(JobsFeature::new()));
    }
    if config.tunneling.enabled {
        candidates.push(Box::new(TunnelingFeature::new()));
    }
    if config.device_defender.enabled {
        candidates.push(Box::new(DeviceDefenderFeature::new()));
    }
    if config.fleet_provisioning.enabled {
        info!("Fleet Provisioning is configured but has no runtime feature; skipping");
    }

    let mut handles = Vec::with_capacity(candidates.len());
    for mut feature in candidates {
        debug!("Initialising {}", feature.name());
        feature.init(Arc::clone(&resources), Arc::clone(&notifier), config)?;
        handles.push(FeatureHandle::new(feature));
    }
    Ok(handles)
}
