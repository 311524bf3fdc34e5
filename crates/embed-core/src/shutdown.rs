//! Process-scoped shutdown callbacks and termination-signal handling.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{error, info, warn};

use crate::extensions::panic_message;

type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Ordered set of zero-argument actions run once on the first shutdown
/// trigger.
///
/// Built once in `main` and handed to whoever needs to register work.
/// Clones share the same set.
#[derive(Clone)]
pub struct ShutdownCallbacks {
    inner: Arc<Inner>,
}

struct Inner {
    // `None` once the callbacks have run.
    callbacks: Mutex<Option<Vec<Callback>>>,
    ran: AtomicBool,
    handler_installed: AtomicBool,
}

impl ShutdownCallbacks {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                callbacks: Mutex::new(Some(Vec::new())),
                ran: AtomicBool::new(false),
                handler_installed: AtomicBool::new(false),
            }),
        }
    }

    /// Append a callback. Registering after the callbacks have run is a
    /// no-op (logged).
    pub fn register<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut guard = lock(&self.inner.callbacks);
        match guard.as_mut() {
            Some(callbacks) => callbacks.push(Box::new(callback)),
            None => warn!("Shutdown callback registered after shutdown ran; ignoring"),
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.inner.callbacks).as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_run(&self) -> bool {
        self.inner.ran.load(Ordering::SeqCst)
    }

    /// Run every callback in registration order. Only the first call does
    /// anything; a panicking callback is logged and the rest still run.
    /// Returns whether this call ran the callbacks.
    pub fn run(&self) -> bool {
        if self.inner.ran.swap(true, Ordering::SeqCst) {
            return false;
        }
        let callbacks = lock(&self.inner.callbacks).take().unwrap_or_default();

        for (index, callback) in callbacks.into_iter().enumerate() {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(callback)) {
                error!(
                    "Shutdown callback #{} panicked: {}",
                    index,
                    panic_message(payload.as_ref())
                );
            }
        }
        true
    }

    /// Spawn a task that runs the callbacks when SIGINT or SIGTERM arrives.
    /// Installing more than once is a no-op; returns whether this call
    /// installed the handler.
    pub fn install_signal_handler(&self) -> bool {
        if self.inner.handler_installed.swap(true, Ordering::SeqCst) {
            return false;
        }
        let callbacks = self.clone();
        tokio::spawn(async move {
            let signal = shutdown_signal().await;
            info!(
                %signal,
                callbacks = callbacks.len(),
                "Shutdown signal received, running shutdown callbacks"
            );
            callbacks.run();
        });
        true
    }
}

impl Default for ShutdownCallbacks {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    // Callbacks run outside the lock; a poisoned guard still holds a valid list.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Termination signal that triggered shutdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    Interrupt,
    Terminate,
}

impl fmt::Display for TerminationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationSignal::Interrupt => write!(f, "SIGINT"),
            TerminationSignal::Terminate => write!(f, "SIGTERM"),
        }
    }
}

/// Wait for SIGINT (Ctrl+C) or, on Unix, SIGTERM. A signal that cannot be
/// listened for is logged and never fires; the other still can.
pub async fn shutdown_signal() -> TerminationSignal {
    let interrupt = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => TerminationSignal::Interrupt,
            Err(e) => {
                warn!("Cannot listen for Ctrl+C, shutdown needs SIGTERM: {}", e);
                std::future::pending::<TerminationSignal>().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => match stream.recv().await {
                Some(()) => TerminationSignal::Terminate,
                None => std::future::pending::<TerminationSignal>().await,
            },
            Err(e) => {
                warn!("Cannot listen for SIGTERM, shutdown needs Ctrl+C: {}", e);
                std::future::pending::<TerminationSignal>().await
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<TerminationSignal>();

    tokio::select! {
        signal = interrupt => signal,
        signal = terminate => signal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runs_in_registration_order_once() {
        let callbacks = ShutdownCallbacks::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let log = log.clone();
            callbacks.register(move || log.lock().unwrap().push(i));
        }
        assert_eq!(callbacks.len(), 3);

        assert!(callbacks.run());
        assert!(!callbacks.run());
        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2]);
        assert!(callbacks.has_run());
    }

    #[test]
    fn test_panicking_callback_does_not_stop_others() {
        let callbacks = ShutdownCallbacks::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let first = log.clone();
        callbacks.register(move || first.lock().unwrap().push("first"));
        callbacks.register(|| panic!("callback failure"));
        let last = log.clone();
        callbacks.register(move || last.lock().unwrap().push("last"));

        callbacks.run();
        assert_eq!(*log.lock().unwrap(), vec!["first", "last"]);
    }

    #[test]
    fn test_clones_share_state() {
        let callbacks = ShutdownCallbacks::new();
        let clone = callbacks.clone();
        let hit = Arc::new(AtomicBool::new(false));
        let h = hit.clone();
        clone.register(move || h.store(true, Ordering::SeqCst));

        callbacks.run();
        assert!(hit.load(Ordering::SeqCst));
        assert!(clone.has_run());
    }

    #[test]
    fn test_register_after_run_is_ignored() {
        let callbacks = ShutdownCallbacks::new();
        callbacks.run();
        callbacks.register(|| panic!("must not run"));
        assert!(callbacks.is_empty());
        assert!(!callbacks.run());
    }

    #[test]
    fn test_signal_names() {
        assert_eq!(TerminationSignal::Interrupt.to_string(), "SIGINT");
        assert_eq!(TerminationSignal::Terminate.to_string(), "SIGTERM");
    }

    #[tokio::test]
    async fn test_install_signal_handler_is_idempotent() {
        let callbacks = ShutdownCallbacks::new();
        assert!(callbacks.install_signal_handler());
        assert!(!callbacks.install_signal_handler());
        assert!(!callbacks.clone().install_signal_handler());
    }
}
