//! Run-wide cancellation
//!
//! One sender owned by the orchestrator, one receiver per background task.
//! The first reason set wins; later triggers are ignored.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

/// Why the run is stopping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Overall run deadline elapsed
    Deadline,
    /// Ctrl+C / SIGTERM
    Interrupted,
    /// A fatal error in another task
    Aborted,
    /// The run finished normally
    Completed,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::Deadline => "deadline elapsed",
            StopReason::Interrupted => "interrupted",
            StopReason::Aborted => "aborted",
            StopReason::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// Owning side of the cancellation channel
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<Option<StopReason>>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Signal every subscriber. Returns false if a reason was already set.
    pub fn trigger(&self, reason: StopReason) -> bool {
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        })
    }

    pub fn reason(&self) -> Option<StopReason> {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side handed to each background task
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<Option<StopReason>>,
}

impl ShutdownSignal {
    /// Resolves once a stop reason is set, including one set before the call
    pub async fn recv(&mut self) -> StopReason {
        let reason = match self.rx.wait_for(Option::is_some).await {
            Ok(reason) => *reason,
            Err(_) => None,
        };
        match reason {
            Some(reason) => reason,
            // every Shutdown handle dropped: nobody can stop us any more
            None => std::future::pending().await,
        }
    }

    pub fn reason(&self) -> Option<StopReason> {
        *self.rx.borrow()
    }
}
