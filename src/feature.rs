//! The contract every feature implements, and the notification surface it
//! reports through.
use std::{
    fmt,
    sync::{Arc, Mutex, mpsc},
};

use crate::config::ResolvedConfig;
use crate::error::FeatureError;
use crate::resources::SharedResourceManager;

/// Lifecycle events a feature reports to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureEvent {
    /// Reported exactly once after a successful `start()`.
    Started,
    /// Reported exactly once after the feature has fully quiesced.
    Stopped,
    /// Anything else. Logged and ignored.
    Other(String),
}

/// Runtime errors a feature reports to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureErrorKind {
    /// A topic subscription was rejected. The feature keeps running.
    SubscriptionRejected,
    /// The feature saw traffic after it was asked to stop.
    MessageReceivedAfterShutdown,
    Other(String),
}

impl fmt::Display for FeatureErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubscriptionRejected => write!(f, "subscription rejected"),
            Self::MessageReceivedAfterShutdown => {
                write!(f, "message received after shutdown")
            }
            Self::Other(kind) => write!(f, "{kind}"),
        }
    }
}

/// Callback surface a feature uses to report lifecycle events and errors.
///
/// Implementations must be callable from any thread at any time, including
/// from inside a feature's own `stop()`.
pub trait NotificationSink: Send + Sync {
    fn on_event(&self, feature: &str, event: FeatureEvent);
    fn on_error(&self, feature: &str, kind: FeatureErrorKind, message: &str);
}

/// What a feature reported, as carried over the control channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationKind {
    Event(FeatureEvent),
    Error {
        kind: FeatureErrorKind,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub feature: String,
    pub kind: NotificationKind,
}

/// Messages consumed by the orchestrator's control loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    Notification(Notification),
    /// An external request (interrupt) to shut everything down.
    Shutdown,
}

/// Sending half of the control channel. Cloned into every feature and into the
/// signal bridge.
#[derive(Debug, Clone)]
pub struct ControlSender {
    tx: mpsc::Sender<ControlMessage>,
}

/// Creates the channel that feeds the orchestrator's control loop.
pub fn control_channel() -> (ControlSender, mpsc::Receiver<ControlMessage>) {
    let (tx, rx) = mpsc::channel();
    (ControlSender { tx }, rx)
}

impl ControlSender {
    /// Asks the orchestrator to shut down. Returns `false` once the control
    /// loop is gone.
    pub fn request_shutdown(&self) -> bool {
        self.tx.send(ControlMessage::Shutdown).is_ok()
    }

    fn send(&self, feature: &str, kind: NotificationKind) {
        let message = ControlMessage::Notification(Notification {
            feature: feature.to_string(),
            kind,
        });
        if self.tx.send(message).is_err() {
            tracing::debug!("Control loop has exited; dropping notification from {feature}");
        }
    }
}

impl NotificationSink for ControlSender {
    fn on_event(&self, feature: &str, event: FeatureEvent) {
        self.send(feature, NotificationKind::Event(event));
    }

    fn on_error(&self, feature: &str, kind: FeatureErrorKind, message: &str) {
        self.send(
            feature,
            NotificationKind::Error {
                kind,
                message: message.to_string(),
            },
        );
    }
}

/// A long-running capability managed by the orchestrator.
///
/// After a successful [`Feature::start`] the feature reports exactly one
/// [`FeatureEvent::Started`]; after [`Feature::stop`] it reports exactly one
/// [`FeatureEvent::Stopped`] once it has quiesced. `stop()` must return
/// promptly and must not wait on the orchestrator.
pub trait Feature: Send + Sync {
    fn name(&self) -> &str;

    fn init(
        &mut self,
        resources: Arc<dyn SharedResourceManager>,
        notifier: Arc<dyn NotificationSink>,
        config: &ResolvedConfig,
    ) -> Result<(), FeatureError>;

    fn start(&self) -> Result<(), FeatureError>;

    fn stop(&self) -> Result<(), FeatureError>;
}

/// Lifecycle state tracked for each registered feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureState {
    Created,
    Started,
    Stopped,
}

/// A feature owned by the orchestrator's registry.
pub struct FeatureHandle {
    name: String,
    feature: Box<dyn Feature>,
    state: Mutex<FeatureState>,
}

impl fmt::Debug for FeatureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureHandle")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish()
    }
}

impl FeatureHandle {
    pub fn new(feature: Box<dyn Feature>) -> Self {
        Self {
            name: feature.name().to_string(),
            feature,
            state: Mutex::new(FeatureState::Created),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> FeatureState {
        *self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Starts the feature if it has not been started or stopped yet.
    pub fn start(&self) -> Result<(), FeatureError> {
        {
            let state = self.state.lock().unwrap_or_else(|p| p.into_inner());
            if *state != FeatureState::Created {
                return Ok(());
            }
        }

        self.feature.start()?;
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        if *state == FeatureState::Created {
            *state = FeatureState::Started;
        }
        Ok(())
    }

    /// Requests a stop. A feature that already reported `Stopped` is not
    /// called again.
    pub fn stop(&self) -> Result<(), FeatureError> {
        if self.state() == FeatureState::Stopped {
            return Ok(());
        }
        self.feature.stop()
    }

    pub(crate) fn mark_stopped(&self) {
        *self.state.lock().unwrap_or_else(|p| p.into_inner()) = FeatureState::Stopped;
    }
}
