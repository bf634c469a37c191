//! Jobs feature: waits for job documents and runs handlers from the handler
//! directory.
use std::{path::PathBuf, sync::Arc};

use tracing::{debug, info, warn};

use super::worker::FeatureWorker;
use crate::config::ResolvedConfig;
use crate::constants::{IDLE_FEATURE_TICK, JOBS_FEATURE_NAME};
use crate::error::FeatureError;
use crate::feature::{Feature, NotificationSink};
use crate::resources::SharedResourceManager;

#[derive(Default)]
pub struct JobsFeature {
    handler_dir: Option<PathBuf>,
    worker: Option<FeatureWorker>,
}

impl JobsFeature {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Feature for JobsFeature {
    fn name(&self) -> &str {
        JOBS_FEATURE_NAME
    }

    fn init(
        &mut self,
        _resources: Arc<dyn SharedResourceManager>,
        notifier: Arc<dyn NotificationSink>,
        config: &ResolvedConfig,
    ) -> Result<(), FeatureError> {
        self.handler_dir = config.jobs.handler_dir.as_ref().map(PathBuf::from);
        if let Some(dir) = &self.handler_dir
            && !dir.is_dir()
        {
            warn!("Job handler directory {} does not exist", dir.display());
        }
        self.worker = Some(FeatureWorker::new(
            JOBS_FEATURE_NAME,
            IDLE_FEATURE_TICK,
            notifier,
        ));
        Ok(())
    }

    fn start(&self) -> Result<(), FeatureError> {
        let worker = self
            .worker
            .as_ref()
            .ok_or_else(|| FeatureError::new(JOBS_FEATURE_NAME, "start", "not initialised"))?;

        match &self.handler_dir {
            Some(dir) => info!("Jobs using handler directory {}", dir.display()),
            None => info!("Jobs running without a handler directory"),
        }
        worker.start(|| debug!("Waiting for pending jobs"))
    }

    fn stop(&self) -> Result<(), FeatureError> {
        let worker = self
            .worker
            .as_ref()
            .ok_or_else(|| FeatureError::new(JOBS_FEATURE_NAME, "stop", "not initialised"))?;
        worker.stop();
        Ok(())
    }
}
