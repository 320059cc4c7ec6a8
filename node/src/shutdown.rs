//! Shutdown coordination for the pulse node.
//!
//! The clock must stop for exactly one recorded cause: an OS signal, an
//! operator request, or the configured frame limit. [`ShutdownController`]
//! latches the first cause, fans it out to every subsystem, and ignores
//! later requests, so the run loop and the daemon can both ask "why are we
//! stopping" and log one consistent answer.

use std::sync::atomic::{AtomicU8, Ordering};

use tokio::signal;
use tokio::sync::broadcast;

/// Why the node is shutting down. The first cause wins; later requests are
/// dropped by the latch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ShutdownReason {
    /// SIGINT or SIGTERM delivered by the OS.
    Signal = 1,
    /// A programmatic `stop` from the embedding process.
    Operator = 2,
    /// The configured `maxFrames` bound was reached.
    FrameLimit = 3,
}

impl ShutdownReason {
    fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Signal),
            2 => Some(Self::Operator),
            3 => Some(Self::FrameLimit),
            _ => None,
        }
    }
}

impl std::fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Signal => write!(f, "signal"),
            Self::Operator => write!(f, "operator request"),
            Self::FrameLimit => write!(f, "frame limit"),
        }
    }
}

/// Latches the first shutdown cause and notifies every subscriber.
///
/// Subsystems call [`subscribe`](Self::subscribe) before their main loop
/// and treat a received reason as the cue to wind down. Requesting
/// shutdown twice is harmless: only the winning cause is broadcast.
pub struct ShutdownController {
    notify: broadcast::Sender<ShutdownReason>,
    cause: AtomicU8,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (notify, _) = broadcast::channel(1);
        Self {
            notify,
            cause: AtomicU8::new(0),
        }
    }

    /// Get a receiver that is handed the winning shutdown cause.
    pub fn subscribe(&self) -> broadcast::Receiver<ShutdownReason> {
        self.notify.subscribe()
    }

    /// Request shutdown for `reason`. Returns `true` if this call won the
    /// latch; a losing call changes nothing and notifies nobody.
    pub fn request(&self, reason: ShutdownReason) -> bool {
        let won = self
            .cause
            .compare_exchange(0, reason as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if won {
            let _ = self.notify.send(reason);
        }
        won
    }

    /// Whether any cause has latched yet. Late subscribers check this
    /// before blocking on their receiver.
    pub fn is_requested(&self) -> bool {
        self.cause.load(Ordering::Acquire) != 0
    }

    /// The latched cause, if any.
    pub fn reason(&self) -> Option<ShutdownReason> {
        ShutdownReason::from_u8(self.cause.load(Ordering::Acquire))
    }

    /// Block until the OS delivers SIGINT or SIGTERM, then latch
    /// [`ShutdownReason::Signal`].
    pub async fn wait_for_signal(&self) {
        let interrupt = signal::ctrl_c();

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "could not install SIGTERM handler");
                    std::future::pending::<()>().await
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = interrupt => tracing::info!("interrupt received, requesting shutdown"),
            _ = terminate => tracing::info!("terminate received, requesting shutdown"),
        }
        self.request(ShutdownReason::Signal);
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_cause_wins_the_latch() {
        let controller = ShutdownController::new();
        assert!(!controller.is_requested());
        assert!(controller.request(ShutdownReason::FrameLimit));
        assert!(!controller.request(ShutdownReason::Signal));
        assert_eq!(controller.reason(), Some(ShutdownReason::FrameLimit));
    }

    #[tokio::test]
    async fn subscribers_learn_the_winning_cause() {
        let controller = ShutdownController::new();
        let mut rx = controller.subscribe();
        controller.request(ShutdownReason::Operator);
        assert_eq!(rx.recv().await.unwrap(), ShutdownReason::Operator);
    }

    #[tokio::test]
    async fn losing_requests_notify_nobody() {
        let controller = ShutdownController::new();
        let mut rx = controller.subscribe();
        controller.request(ShutdownReason::Signal);
        controller.request(ShutdownReason::Operator);
        assert_eq!(rx.recv().await.unwrap(), ShutdownReason::Signal);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn late_subscriber_sees_the_flag() {
        let controller = ShutdownController::new();
        controller.request(ShutdownReason::Operator);
        // The broadcast is gone, but the latch is queryable.
        assert!(controller.is_requested());
        assert_eq!(controller.reason(), Some(ShutdownReason::Operator));
    }
}
