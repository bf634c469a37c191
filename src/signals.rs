//! Turns process signals into control-loop messages.
//!
//! [`SignalBridge::install`] masks the handled signals on the calling thread.
//! It must run on the main thread before any other thread is spawned so that
//! every thread inherits the mask and the signals are only ever observed by
//! the bridge thread through `sigwait`.
use std::{
    io,
    sync::Arc,
    thread::{self, JoinHandle},
};

use nix::errno::Errno;
use nix::sys::signal::{SigSet, Signal};
use tracing::{debug, info, warn};

use crate::error::ClientError;
use crate::feature::ControlSender;
use crate::resources::SharedResourceManager;

/// Signals consumed by the bridge.
const HANDLED_SIGNALS: [Signal; 3] = [Signal::SIGINT, Signal::SIGTERM, Signal::SIGHUP];

/// What the bridge loop should do after a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    /// Shutdown was requested; the bridge keeps listening so a repeated
    /// interrupt reaches the orchestrator as a second shutdown.
    ShutdownRequested,
    /// The signal was logged and ignored.
    Ignored,
    /// The control loop is gone; the bridge exits.
    Detached,
}

pub struct SignalBridge {
    set: SigSet,
}

impl SignalBridge {
    /// Blocks the handled signals on the calling thread.
    pub fn install() -> Result<Self, ClientError> {
        let mut set = SigSet::empty();
        for signal in HANDLED_SIGNALS {
            set.add(signal);
        }
        set.thread_block()?;
        debug!("Blocked {:?} for synchronous delivery", HANDLED_SIGNALS);
        Ok(Self { set })
    }

    /// Spawns the thread that waits for signals and forwards them.
    pub fn spawn(
        self,
        resources: Arc<dyn SharedResourceManager>,
        control: ControlSender,
    ) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("signal-bridge".into())
            .spawn(move || {
                loop {
                    let signal = match self.set.wait() {
                        Ok(signal) => signal,
                        Err(Errno::EINTR) => continue,
                        Err(err) => {
                            warn!("Waiting for signals failed: {err}");
                            return;
                        }
                    };

                    if handle_signal(signal, resources.as_ref(), &control)
                        == SignalOutcome::Detached
                    {
                        debug!("Control loop has exited; signal bridge stopping");
                        return;
                    }
                }
            })
    }
}

/// Whether `signal` asks the client to shut down.
pub fn is_interrupt(signal: Signal) -> bool {
    matches!(signal, Signal::SIGINT | Signal::SIGTERM)
}

/// Reacts to one received signal.
///
/// An interrupt disconnects the shared connection before shutdown is
/// requested, so features observe a closed transport while stopping.
pub fn handle_signal(
    signal: Signal,
    resources: &dyn SharedResourceManager,
    control: &ControlSender,
) -> SignalOutcome {
    if !is_interrupt(signal) {
        info!("Received {signal}; ignoring");
        return SignalOutcome::Ignored;
    }

    info!("Received {signal}; shutting down");
    resources.disconnect();
    if control.request_shutdown() {
        SignalOutcome::ShutdownRequested
    } else {
        SignalOutcome::Detached
    }
}
