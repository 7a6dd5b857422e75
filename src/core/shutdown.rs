//! Signal-driven shutdown for the demo runner
//!
//! Queue dispatchers and FT members run on their own OS threads; the
//! binary's main task only waits here for a signal (or a run deadline) and
//! then tears the queue group down explicitly.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Why the runner is shutting down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    Deadline,
    Requested,
}

/// Coordinates shutdown between signal handlers and the runner
#[derive(Clone)]
pub struct ShutdownCoordinator {
    shutdown_tx: broadcast::Sender<()>,
    shutdown_requested: Arc<AtomicBool>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(8);
        Self {
            shutdown_tx,
            shutdown_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    pub fn trigger_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::Release);
        let _ = self.shutdown_tx.send(());
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::Acquire)
    }

    /// Wait until shutdown is triggered or the optional deadline passes
    pub async fn wait(&self, deadline: Option<Duration>) -> ShutdownReason {
        let mut rx = self.subscribe();
        if self.is_shutdown_requested() {
            return ShutdownReason::Requested;
        }

        match deadline {
            Some(limit) => tokio::select! {
                _ = rx.recv() => ShutdownReason::Requested,
                _ = tokio::time::sleep(limit) => ShutdownReason::Deadline,
            },
            None => {
                let _ = rx.recv().await;
                ShutdownReason::Requested
            }
        }
    }

    /// Install SIGINT/SIGTERM (and Ctrl-C) handlers that trigger shutdown
    ///
    /// A second signal exits the process immediately with status 130.
    pub fn install_signal_handlers(&self) {
        let signal_count = Arc::new(AtomicUsize::new(0));

        #[cfg(unix)]
        {
            unsafe {
                libc::signal(libc::SIGPIPE, libc::SIG_DFL);
            }

            use tokio::signal::unix::{signal, SignalKind};
            for kind in [SignalKind::terminate(), SignalKind::hangup()] {
                let coordinator = self.clone();
                let counter = Arc::clone(&signal_count);
                tokio::spawn(async move {
                    if let Ok(mut sig) = signal(kind) {
                        while sig.recv().await.is_some() {
                            coordinator.on_signal(&counter);
                        }
                    }
                });
            }
        }

        let coordinator = self.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                coordinator.on_signal(&signal_count);
            }
        });
    }

    fn on_signal(&self, counter: &AtomicUsize) {
        let prev = counter.fetch_add(1, Ordering::AcqRel);
        if prev >= 1 {
            log::warn!("Second shutdown signal received; exiting");
            std::process::exit(130);
        }
        log::info!("Shutdown signal received");
        self.trigger_shutdown();
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
