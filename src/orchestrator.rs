//! Feature lifecycle orchestration.
//!
//! The [`Orchestrator`] owns the registry of active features, applies the
//! policy table for feature notifications and drives a single, idempotent
//! shutdown. Notifications normally arrive over the control channel and are
//! handled by [`Orchestrator::run`], but every entry point takes `&self` and is
//! safe to call from any thread.
use std::sync::{Arc, Mutex, MutexGuard, mpsc::Receiver};

use tracing::{debug, error, info, warn};

use crate::error::ClientError;
use crate::feature::{
    ControlMessage, FeatureErrorKind, FeatureEvent, FeatureHandle, NotificationKind,
    NotificationSink,
};
use crate::logging::LogHandle;

/// Lifecycle of one orchestrator run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Starting,
    Running,
    ShuttingDown,
    Terminated,
}

/// How to treat a feature reporting activity after it was told to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strictness {
    /// Abort the process: the lifecycle ordering was violated.
    Strict,
    /// Log the error and carry on.
    Permissive,
}

impl Strictness {
    /// Strict in debug builds, permissive in release builds.
    pub const fn from_build() -> Self {
        if cfg!(debug_assertions) {
            Self::Strict
        } else {
            Self::Permissive
        }
    }
}

impl Default for Strictness {
    fn default() -> Self {
        Self::from_build()
    }
}

/// Process-level side effects of the orchestrator.
pub trait ProcessControl: Send + Sync {
    /// Flushes and releases logging output.
    fn release_logging(&self);
    /// Terminates the process with `code`.
    fn exit(&self, code: i32);
    /// Terminates the process abnormally.
    fn abort(&self);
}

/// [`ProcessControl`] backed by the real process.
pub struct SystemProcess {
    logging: LogHandle,
}

impl SystemProcess {
    pub fn new(logging: LogHandle) -> Self {
        Self { logging }
    }
}

impl ProcessControl for SystemProcess {
    fn release_logging(&self) {
        self.logging.flush();
    }

    fn exit(&self, code: i32) {
        std::process::exit(code);
    }

    fn abort(&self) {
        std::process::abort();
    }
}

/// Owns the feature registry and coordinates startup and shutdown.
///
/// When both locks are needed the registry lock is taken first.
pub struct Orchestrator {
    /// Active features in registration order.
    registry: Mutex<Vec<Arc<FeatureHandle>>>,
    state: Mutex<RunState>,
    strictness: Strictness,
    process: Arc<dyn ProcessControl>,
}

impl Orchestrator {
    pub fn new(strictness: Strictness, process: Arc<dyn ProcessControl>) -> Self {
        Self {
            registry: Mutex::new(Vec::new()),
            state: Mutex::new(RunState::Idle),
            strictness,
            process,
        }
    }

    fn lock_registry(&self) -> MutexGuard<'_, Vec<Arc<FeatureHandle>>> {
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_state(&self) -> MutexGuard<'_, RunState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> RunState {
        *self.lock_state()
    }

    pub fn is_terminated(&self) -> bool {
        self.state() == RunState::Terminated
    }

    /// Names of the features still registered, in registration order.
    pub fn active_features(&self) -> Vec<String> {
        self.lock_registry()
            .iter()
            .map(|handle| handle.name().to_string())
            .collect()
    }

    /// Adds a feature to the registry. Rejected once shutdown has begun.
    ///
    /// The run state is checked while the registry lock is held, so a handle
    /// is either in the shutdown snapshot or rejected.
    pub fn register(&self, handle: FeatureHandle) -> Result<(), ClientError> {
        let mut registry = self.lock_registry();
        let shutting_down = matches!(
            *self.lock_state(),
            RunState::ShuttingDown | RunState::Terminated
        );
        if shutting_down {
            return Err(ClientError::ShuttingDown(handle.name().to_string()));
        }

        if registry.iter().any(|existing| existing.name() == handle.name()) {
            return Err(ClientError::DuplicateFeature(handle.name().to_string()));
        }
        debug!("Registered feature {}", handle.name());
        registry.push(Arc::new(handle));
        Ok(())
    }

    /// Starts every registered feature in registration order.
    ///
    /// A feature that fails to start is removed from the registry. If nothing
    /// is left running the orchestrator shuts down.
    pub fn start_all(&self) {
        {
            let mut state = self.lock_state();
            if *state != RunState::Idle {
                warn!("start_all called in state {:?}; ignoring", *state);
                return;
            }
            *state = RunState::Starting;
        }

        let snapshot: Vec<Arc<FeatureHandle>> = self.lock_registry().clone();
        for handle in &snapshot {
            if matches!(
                self.state(),
                RunState::ShuttingDown | RunState::Terminated
            ) {
                debug!("Shutdown began during startup; not starting remaining features");
                return;
            }

            debug!("Starting {}", handle.name());
            if let Err(err) = handle.start() {
                error!("{err}");
                handle.mark_stopped();
                self.lock_registry()
                    .retain(|active| !Arc::ptr_eq(active, handle));
            }
        }

        // A feature may already have stopped and shut the run down.
        let nothing_running = {
            let registry = self.lock_registry();
            let mut state = self.lock_state();
            if *state == RunState::Starting {
                *state = RunState::Running;
                registry.is_empty()
            } else {
                false
            }
        };

        if nothing_running {
            info!("No features are running");
            self.shutdown();
        }
    }

    /// Handles a lifecycle event reported by `feature`.
    pub fn on_event(&self, feature: &str, event: FeatureEvent) {
        match event {
            FeatureEvent::Started => {
                info!("{feature} has started");
            }
            FeatureEvent::Stopped => {
                info!("{feature} has stopped");
                self.handle_feature_stopped(feature);
            }
            FeatureEvent::Other(kind) => {
                warn!("Unhandled event '{kind}' from feature {feature}");
            }
        }
    }

    fn handle_feature_stopped(&self, feature: &str) {
        let remaining = {
            let mut registry = self.lock_registry();
            let before = registry.len();
            registry.retain(|handle| {
                if handle.name() == feature {
                    handle.mark_stopped();
                    false
                } else {
                    true
                }
            });
            (registry.len() != before).then_some(registry.len())
        };

        match remaining {
            Some(0) => {
                info!("All features have stopped");
                self.shutdown();
            }
            Some(count) => debug!("{count} feature(s) still running"),
            None => debug!("Stop reported by unregistered feature {feature}"),
        }
    }

    /// Handles a runtime error reported by `feature`.
    pub fn on_error(&self, feature: &str, kind: FeatureErrorKind, message: &str) {
        match kind {
            FeatureErrorKind::SubscriptionRejected => {
                error!("Subscription rejected for {feature}: {message}");
            }
            FeatureErrorKind::MessageReceivedAfterShutdown => {
                error!("Received message after {feature} shut down: {message}");
                if self.strictness == Strictness::Strict {
                    error!(
                        "*** FATAL ERROR: Aborting program due to unrecoverable feature error! ***"
                    );
                    *self.lock_state() = RunState::Terminated;
                    self.process.release_logging();
                    self.process.abort();
                }
            }
            FeatureErrorKind::Other(kind) => {
                error!("Unhandled error '{kind}' from feature {feature}: {message}");
            }
        }
    }

    /// Shuts down every registered feature.
    ///
    /// The first call stops each feature from a snapshot taken under the
    /// registry lock, then releases logging. Any later call skips the
    /// features, releases logging and terminates the process.
    pub fn shutdown(&self) {
        let snapshot = {
            let registry = self.lock_registry();
            let mut state = self.lock_state();
            match *state {
                RunState::ShuttingDown | RunState::Terminated => None,
                _ => {
                    *state = RunState::ShuttingDown;
                    Some(registry.clone())
                }
            }
        };

        let Some(snapshot) = snapshot else {
            info!("Shutdown already in progress; terminating");
            *self.lock_state() = RunState::Terminated;
            self.process.release_logging();
            self.process.exit(0);
            return;
        };

        for handle in &snapshot {
            debug!("Attempting shutdown of {}", handle.name());
            if let Err(err) = handle.stop() {
                error!("{err}");
            }
        }
        self.process.release_logging();

        let registry = self.lock_registry();
        let mut state = self.lock_state();
        if registry.is_empty() && *state == RunState::ShuttingDown {
            *state = RunState::Terminated;
        }
    }

    /// Drains the control channel until the run terminates or every sender
    /// is gone.
    pub fn run(&self, receiver: Receiver<ControlMessage>) {
        while !self.is_terminated() {
            let Ok(message) = receiver.recv() else {
                debug!("Control channel closed");
                break;
            };
            self.dispatch(message);
        }
    }

    pub fn dispatch(&self, message: ControlMessage) {
        match message {
            ControlMessage::Shutdown => self.shutdown(),
            ControlMessage::Notification(notification) => match notification.kind {
                NotificationKind::Event(event) => {
                    self.on_event(&notification.feature, event)
                }
                NotificationKind::Error { kind, message } => {
                    self.on_error(&notification.feature, kind, &message)
                }
            },
        }
    }
}

impl NotificationSink for Orchestrator {
    fn on_event(&self, feature: &str, event: FeatureEvent) {
        Orchestrator::on_event(self, feature, event);
    }

    fn on_error(&self, feature: &str, kind: FeatureErrorKind, message: &str) {
        Orchestrator::on_error(self, feature, kind, message);
    }
}
