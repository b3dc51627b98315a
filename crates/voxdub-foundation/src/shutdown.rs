//! Process shutdown signalling.
//!
//! `ShutdownHandler::install` listens for Ctrl+C (and SIGTERM on unix) on a
//! background task and flips a watch channel; the main loop awaits
//! `ShutdownSignal::wait`.

use tokio::sync::watch;
use tracing::{error, info};

/// Installs the OS signal listeners and hands out the signal side.
pub struct ShutdownHandler;

impl ShutdownHandler {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self
    }

    /// Spawn the listener task and return the waitable signal.
    pub async fn install(self) -> ShutdownSignal {
        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            listen().await;
            let _ = tx.send(true);
        });
        ShutdownSignal { rx }
    }
}

#[cfg(unix)]
async fn listen() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!("failed to register SIGTERM handler: {}", e);
            wait_for_ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = wait_for_ctrl_c() => {}
        _ = sigterm.recv() => {
            info!("received SIGTERM, initiating shutdown");
        }
    }
}

#[cfg(not(unix))]
async fn listen() {
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received SIGINT (Ctrl+C), initiating shutdown"),
        Err(e) => error!("failed to listen for SIGINT: {}", e),
    }
}

/// Cloneable handle that resolves once shutdown has been requested.
#[derive(Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Completes when shutdown is signalled. Also completes if the listener
    /// task is gone, so callers never hang on a dead handler.
    pub async fn wait(&self) {
        let mut rx = self.rx.clone();
        if *rx.borrow() {
            return;
        }
        while rx.changed().await.is_ok() {
            if *rx.borrow() {
                return;
            }
        }
    }

    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Test-only trigger: a signal pair not wired to the OS.
    pub fn manual() -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        (tx, Self { rx })
    }
}
