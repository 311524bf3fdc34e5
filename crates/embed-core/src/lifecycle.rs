//! Lifecycle orchestration
//!
//! [`Orchestrator`] owns the one-time startup sequence, the periodic flush of
//! the document store and the ordered shutdown:
//!
//! 1. cancel the periodic flush and wait for it to stop,
//! 2. flush the store one last time (only if startup loaded it),
//! 3. release the platform connection.
//!
//! Shutdown runs under an async mutex, so concurrent triggers (a signal and
//! a fatal init error, say) execute the steps once; later callers wait for
//! the first to finish and return.

use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::extensions::{panic_message, ExtensionLoader};
use crate::storage::Backing;
use crate::store::DocumentStore;

/// Default period of the background flush.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(300);

/// The live connection to the chat platform, released last on shutdown.
pub trait PlatformConnection: Send + Sync + 'static {
    fn release(&self) -> impl Future<Output = ()> + Send;
}

/// What [`Orchestrator::initialize`] did
#[derive(Debug)]
pub enum InitOutcome {
    /// Startup completed; carries the extension report.
    Ready(ExtensionLoader),
    /// Startup already ran (or is running); nothing was done.
    AlreadyInitialized,
    /// Startup failed and shutdown has been performed.
    Failed(Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShutdownPhase {
    Running,
    Completed,
}

/// Startup-once initialization, periodic flush and ordered shutdown
pub struct Orchestrator<B: Backing, P: PlatformConnection> {
    store: Arc<DocumentStore<B>>,
    connection: P,
    flush_interval: Duration,
    initialized: AtomicBool,
    cancel: CancellationToken,
    flush_task: std::sync::Mutex<Option<JoinHandle<()>>>,
    phase: Mutex<ShutdownPhase>,
}

impl<B: Backing, P: PlatformConnection> Orchestrator<B, P> {
    pub fn new(store: Arc<DocumentStore<B>>, connection: P, flush_interval: Duration) -> Self {
        Self {
            store,
            connection,
            flush_interval,
            initialized: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            flush_task: std::sync::Mutex::new(None),
            phase: Mutex::new(ShutdownPhase::Running),
        }
    }

    pub fn store(&self) -> &Arc<DocumentStore<B>> {
        &self.store
    }

    /// Token cancelled when shutdown begins. Background tasks owned by other
    /// components should derive a child token from it.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn is_shutting_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Run the startup sequence once: load the store, run extension
    /// discovery, start the periodic flush. On any failure the process is
    /// shut down instead of being left half-initialized.
    pub async fn initialize<F>(&self, discover: F) -> InitOutcome
    where
        F: FnOnce() -> Result<ExtensionLoader>,
    {
        if self.initialized.swap(true, Ordering::SeqCst) {
            debug!("Initialization already performed, skipping");
            return InitOutcome::AlreadyInitialized;
        }
        if self.is_shutting_down() {
            return InitOutcome::Failed(Error::FatalInit(
                "shutdown already in progress".to_string(),
            ));
        }

        self.store.load().await;

        let discovered = match catch_unwind(AssertUnwindSafe(discover)) {
            Ok(result) => result,
            Err(payload) => Err(Error::FatalInit(format!(
                "extension discovery panicked: {}",
                panic_message(payload.as_ref())
            ))),
        };

        let loader = match discovered {
            Ok(loader) => loader,
            Err(e) => {
                error!("Initialization failed, shutting down: {}", e);
                self.shutdown().await;
                return InitOutcome::Failed(e);
            }
        };

        for (name, reason) in loader.failed() {
            warn!(extension = %name, "Extension failed to load: {}", reason);
        }

        self.start_periodic_flush();
        info!("Ready ({})", loader.summary());
        InitOutcome::Ready(loader)
    }

    fn start_periodic_flush(&self) {
        let store = Arc::clone(&self.store);
        let cancel = self.cancel.clone();
        let interval = self.flush_interval;

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {
                        if store.save().await {
                            debug!("Periodic flush complete");
                        } else {
                            warn!("Periodic flush failed; will retry next interval");
                        }
                    }
                }
            }
            debug!("Periodic flush stopped");
        });

        let mut slot = self
            .flush_task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(handle);
    }

    /// Cancel the periodic flush, flush once more, release the connection.
    /// Safe to call any number of times; only the first call does the work.
    /// Returns whether this call performed the sequence.
    pub async fn shutdown(&self) -> bool {
        let mut phase = self.phase.lock().await;
        if *phase == ShutdownPhase::Completed {
            debug!("Shutdown already completed");
            return false;
        }

        info!("Shutting down");
        self.cancel.cancel();

        let handle = self
            .flush_task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    error!("Periodic flush task ended abnormally: {}", e);
                }
            }
        }

        if !self.store.is_loaded() {
            info!("Document store was never loaded, skipping final flush");
        } else if self.store.save().await {
            info!("Final flush complete");
        } else {
            error!("Final flush failed; recent changes may be lost");
        }

        self.connection.release().await;
        *phase = ShutdownPhase::Completed;
        info!("Shutdown complete");
        true
    }
}
