//! Cooperative shutdown for pipelines and binaries.
//!
//! A [`ShutdownHandle`] is cloned into every long-running loop. Loops check
//! it between iterations; binaries trip it from [`shutdown_signal`].
//!
//! ```ignore
//! let shutdown = ShutdownHandle::new();
//! let worker = tokio::spawn(pipeline.run(shutdown.clone(), handler));
//!
//! let signal = shutdown_signal().await;
//! shutdown.trigger(signal);
//! worker.await??;
//! ```

use std::fmt;
use tokio::sync::watch;

/// Why a shutdown was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// SIGINT (Ctrl+C)
    SigInt,
    /// SIGTERM
    SigTerm,
    /// Requested by code
    Manual,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SigInt => write!(f, "SIGINT (Ctrl+C)"),
            Self::SigTerm => write!(f, "SIGTERM"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

/// Handle for triggering and observing shutdown
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    sender: watch::Sender<Option<ShutdownSignal>>,
    receiver: watch::Receiver<Option<ShutdownSignal>>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(None);
        Self { sender, receiver }
    }

    pub fn shutdown(&self) {
        self.trigger(ShutdownSignal::Manual);
    }

    /// Request shutdown. The first signal wins.
    pub fn trigger(&self, signal: ShutdownSignal) {
        self.sender.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(signal);
                true
            } else {
                false
            }
        });
    }

    /// Wait until shutdown is requested
    pub async fn wait(&mut self) -> ShutdownSignal {
        loop {
            if let Some(signal) = *self.receiver.borrow_and_update() {
                return signal;
            }
            if self.receiver.changed().await.is_err() {
                return ShutdownSignal::Manual;
            }
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.receiver.borrow().is_some()
    }

    pub fn signal(&self) -> Option<ShutdownSignal> {
        *self.receiver.borrow()
    }
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Completes on SIGINT or SIGTERM.
///
/// If a handler cannot be installed, that signal is never observed and the
/// other one still is.
pub async fn shutdown_signal() -> ShutdownSignal {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => ShutdownSignal::SigInt,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<ShutdownSignal>().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                ShutdownSignal::SigTerm
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<ShutdownSignal>().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<ShutdownSignal>();

    tokio::select! {
        signal = ctrl_c => signal,
        signal = terminate => signal,
    }
}
