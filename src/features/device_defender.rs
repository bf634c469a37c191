//! Device Defender feature: publishes a metrics report on a fixed interval.
use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tracing::info;

use super::worker::FeatureWorker;
use crate::config::ResolvedConfig;
use crate::constants::DEVICE_DEFENDER_FEATURE_NAME;
use crate::error::FeatureError;
use crate::feature::{Feature, NotificationSink};
use crate::resources::SharedResourceManager;

#[derive(Default)]
pub struct DeviceDefenderFeature {
    interval: Duration,
    reports: Arc<AtomicU64>,
    worker: Option<FeatureWorker>,
}

impl DeviceDefenderFeature {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of reports published since start.
    pub fn reports_published(&self) -> u64 {
        self.reports.load(Ordering::SeqCst)
    }

    fn worker(&self, action: &'static str) -> Result<&FeatureWorker, FeatureError> {
        self.worker.as_ref().ok_or_else(|| {
            FeatureError::new(DEVICE_DEFENDER_FEATURE_NAME, action, "not initialised")
        })
    }
}

impl Feature for DeviceDefenderFeature {
    fn name(&self) -> &str {
        DEVICE_DEFENDER_FEATURE_NAME
    }

    fn init(
        &mut self,
        _resources: Arc<dyn SharedResourceManager>,
        notifier: Arc<dyn NotificationSink>,
        config: &ResolvedConfig,
    ) -> Result<(), FeatureError> {
        let seconds = config.device_defender.interval_seconds;
        if seconds == 0 {
            return Err(FeatureError::new(
                DEVICE_DEFENDER_FEATURE_NAME,
                "init",
                "report interval must be greater than zero",
            ));
        }
        self.interval = Duration::from_secs(seconds);
        self.worker = Some(FeatureWorker::new(
            DEVICE_DEFENDER_FEATURE_NAME,
            self.interval,
            notifier,
        ));
        Ok(())
    }

    fn start(&self) -> Result<(), FeatureError> {
        let worker = self.worker("start")?;
        info!(
            "Publishing Device Defender reports every {}s",
            self.interval.as_secs()
        );
        let reports = Arc::clone(&self.reports);
        worker.start(move || {
            let count = reports.fetch_add(1, Ordering::SeqCst) + 1;
            info!("Published Device Defender report #{count}");
        })
    }

    fn stop(&self) -> Result<(), FeatureError> {
        self.worker("stop")?.stop();
        Ok(())
    }
}
