//! Graceful shutdown for the dirchain node.
//!
//! Listens for SIGINT/SIGTERM and broadcasts a one-shot shutdown signal to
//! every subsystem via a `tokio::sync::broadcast` channel.

use tokio::signal;
use tokio::sync::broadcast::{self, error::TryRecvError};

/// Coordinates graceful shutdown across all node subsystems.
///
/// Async tasks `select!` on a [`subscribe`](Self::subscribe)d receiver. The
/// validator loop polls a [`ShutdownSignal`] instead, which never blocks.
pub struct ShutdownController {
    tx: broadcast::Sender<()>,
}

impl ShutdownController {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Get a receiver that will be notified on shutdown.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.subscribe(),
            fired: false,
        }
    }

    /// Trigger shutdown programmatically.
    pub fn shutdown(&self) {
        let _ = self.tx.send(());
    }

    /// Wait for SIGTERM or SIGINT, then trigger shutdown.
    pub async fn wait_for_signal(&self) -> std::io::Result<()> {
        let ctrl_c = signal::ctrl_c();

        #[cfg(unix)]
        {
            let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;
            tokio::select! {
                r = ctrl_c => { r?; tracing::info!("received SIGINT, shutting down"); }
                _ = terminate.recv() => { tracing::info!("received SIGTERM, shutting down"); }
            }
        }

        #[cfg(not(unix))]
        {
            ctrl_c.await?;
            tracing::info!("received SIGINT, shutting down");
        }

        self.shutdown();
        Ok(())
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-blocking view of the shutdown signal. Once observed it stays set.
pub struct ShutdownSignal {
    rx: broadcast::Receiver<()>,
    fired: bool,
}

impl ShutdownSignal {
    pub fn is_triggered(&mut self) -> bool {
        if !self.fired {
            self.fired = match self.rx.try_recv() {
                Ok(()) => true,
                Err(TryRecvError::Empty) => false,
                // A dropped controller or a missed send both mean shutdown.
                Err(TryRecvError::Closed) | Err(TryRecvError::Lagged(_)) => true,
            };
        }
        self.fired
    }
}
