//! Human-readable progress lines
//!
//! Components push [`Progress`] events into a channel; the binary prints them
//! to stdout in arrival order. Tests read the same channel.

use std::fmt;

use alloy::primitives::U256;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::types::{RunSummary, StatusRecord, SubmittedTransfer, TransferStatus};

/// What one status poll found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusReport {
    /// The indexer has no record of the transaction yet
    NotIndexed,
    /// Status of the first record returned
    Status(TransferStatus),
}

impl StatusReport {
    pub fn from_records(records: &[StatusRecord]) -> Self {
        match records.first() {
            Some(record) => StatusReport::Status(record.status.clone()),
            None => StatusReport::NotIndexed,
        }
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusReport::NotIndexed => f.write_str("not yet indexed"),
            StatusReport::Status(status) => write!(f, "{}", status),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    Baseline(U256),
    Submitted(SubmittedTransfer),
    Unchanged { attempt: u32, max_attempts: u32 },
    Changed(U256),
    StillPending { polls: u32 },
    /// Destination reads kept failing; only the status indexer is followed
    DestinationUnreadable,
    Status(StatusReport),
    Summary(RunSummary),
    Executed { destination_tx: Option<String> },
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Progress::Baseline(value) => write!(f, "Value before bridging: {}", value),
            Progress::Submitted(submitted) => write!(
                f,
                "Transfer submitted: 0x{:x} (fee {} wei)",
                submitted.tx_hash, submitted.fee
            ),
            Progress::Unchanged {
                attempt,
                max_attempts,
            } => write!(
                f,
                "Destination value unchanged (attempt {}/{}), waiting...",
                attempt, max_attempts
            ),
            Progress::Changed(value) => write!(f, "Destination value changed to {}", value),
            Progress::StillPending { polls } => write!(
                f,
                "Destination value unchanged after {} polls; the transfer may still be in flight",
                polls
            ),
            Progress::DestinationUnreadable => f.write_str(
                "Destination value could not be read; waiting for the status indexer",
            ),
            Progress::Status(report) => write!(f, "Transfer status: {}", report),
            Progress::Summary(summary) => write!(f, "Summary: {}", summary),
            Progress::Executed {
                destination_tx: Some(tx),
            } => write!(f, "Transfer executed on destination chain: {}", tx),
            Progress::Executed {
                destination_tx: None,
            } => f.write_str("Transfer executed on destination chain"),
        }
    }
}

/// Sending side of the progress channel. Dropped receivers are ignored.
#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: Option<mpsc::UnboundedSender<Progress>>,
}

impl ProgressSender {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Progress>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// Sender that discards everything
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn send(&self, event: Progress) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}

/// Background task emitting progress lines in arrival order
pub struct ProgressPrinter {
    handle: JoinHandle<()>,
}

impl ProgressPrinter {
    /// Print every event to stdout
    pub fn spawn(rx: mpsc::UnboundedReceiver<Progress>) -> Self {
        Self::spawn_with(rx, |event| println!("{}", event))
    }

    pub fn spawn_with<F>(mut rx: mpsc::UnboundedReceiver<Progress>, mut emit: F) -> Self
    where
        F: FnMut(&Progress) + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                emit(&event);
            }
        });
        Self { handle }
    }

    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Wait until every sender is gone and the queue is drained. Returns
    /// false, after logging, if the task panicked or was aborted.
    pub async fn join(self) -> bool {
        match self.handle.await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Progress printer ended abnormally");
                false
            }
        }
    }
}
