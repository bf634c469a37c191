//! Background thread shared by the built-in features.
use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use tracing::debug;

use crate::error::FeatureError;
use crate::feature::{FeatureEvent, NotificationSink};

const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerState {
    Idle,
    Running,
    Stopped,
}

/// Runs a feature's periodic task on its own thread and reports the
/// lifecycle events the orchestrator expects.
///
/// `Started` is reported from the worker thread before the first tick and
/// `Stopped` once the loop has exited. Stopping a worker that never started
/// reports `Stopped` directly.
pub(crate) struct FeatureWorker {
    name: String,
    interval: Duration,
    notifier: Arc<dyn NotificationSink>,
    stop: Arc<AtomicBool>,
    state: Mutex<WorkerState>,
}

impl FeatureWorker {
    pub(crate) fn new(name: &str, interval: Duration, notifier: Arc<dyn NotificationSink>) -> Self {
        Self {
            name: name.to_string(),
            interval,
            notifier,
            stop: Arc::new(AtomicBool::new(false)),
            state: Mutex::new(WorkerState::Idle),
        }
    }

    /// Spawns the worker thread. `tick` runs once immediately and then once
    /// per interval until the worker is stopped.
    pub(crate) fn start<F>(&self, mut tick: F) -> Result<(), FeatureError>
    where
        F: FnMut() + Send + 'static,
    {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        if *state != WorkerState::Idle {
            return Err(FeatureError::new(&self.name, "start", "already started or stopped"));
        }

        let name = self.name.clone();
        let interval = self.interval;
        let notifier = Arc::clone(&self.notifier);
        let stop = Arc::clone(&self.stop);

        thread::Builder::new()
            .name(thread_name(&self.name))
            .spawn(move || {
                notifier.on_event(&name, FeatureEvent::Started);

                'run: while !stop.load(Ordering::SeqCst) {
                    tick();

                    let mut slept = Duration::ZERO;
                    while slept < interval {
                        if stop.load(Ordering::SeqCst) {
                            break 'run;
                        }
                        let step = interval.saturating_sub(slept).min(STOP_POLL_INTERVAL);
                        thread::sleep(step);
                        slept += step;
                    }
                }

                debug!("{name} worker exiting");
                notifier.on_event(&name, FeatureEvent::Stopped);
            })
            .map_err(|err| FeatureError::new(&self.name, "start", err.to_string()))?;

        *state = WorkerState::Running;
        Ok(())
    }

    /// Asks the worker to stop without waiting for it.
    pub(crate) fn stop(&self) {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        match *state {
            WorkerState::Running => {
                self.stop.store(true, Ordering::SeqCst);
                *state = WorkerState::Stopped;
            }
            WorkerState::Idle => {
                *state = WorkerState::Stopped;
                drop(state);
                self.notifier.on_event(&self.name, FeatureEvent::Stopped);
            }
            WorkerState::Stopped => {}
        }
    }
}

fn thread_name(feature: &str) -> String {
    feature.to_ascii_lowercase().replace(' ', "-")
}
