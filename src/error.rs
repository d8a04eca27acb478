//! Error taxonomy for a bridged call run
//!
//! Each failure class the run can hit has its own type so callers can tell a
//! transport hiccup from a fatal submission problem. The binary converts all of
//! them into `eyre::Report` at the top level.

use std::fmt;
use std::time::Duration;

use alloy::primitives::TxHash;
use thiserror::Error;

use crate::shutdown::StopReason;

/// Boxed underlying cause carried by the error types below.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Configuration could not be assembled. Raised before any network activity.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("failed to load .env file")]
    DotEnv(#[from] dotenvy::Error),
}

/// Step of the submission pipeline that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStage {
    Descriptor,
    FeeQuote,
    Build,
    Sign,
    Broadcast,
}

impl fmt::Display for SubmissionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SubmissionStage::Descriptor => "descriptor",
            SubmissionStage::FeeQuote => "fee quote",
            SubmissionStage::Build => "build",
            SubmissionStage::Sign => "sign",
            SubmissionStage::Broadcast => "broadcast",
        };
        f.write_str(name)
    }
}

/// The bridging transaction could not be submitted. Fatal to the run.
#[derive(Debug, Error)]
#[error("transfer submission failed at {stage} stage")]
pub struct SubmissionError {
    pub stage: SubmissionStage,
    #[source]
    pub source: BoxError,
}

impl SubmissionError {
    pub fn new(stage: SubmissionStage, source: eyre::Report) -> Self {
        Self {
            stage,
            source: source.into(),
        }
    }
}

/// Which destination read failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPhase {
    /// Value read before submission
    Baseline,
    /// Poll made by the completion watcher
    Poll { attempt: u32 },
    /// Value read after the watcher finished
    Final,
}

impl fmt::Display for ReadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadPhase::Baseline => f.write_str("baseline read"),
            ReadPhase::Poll { attempt } => write!(f, "poll {}", attempt),
            ReadPhase::Final => f.write_str("final read"),
        }
    }
}

/// Reading the destination contract failed. This is a transport problem and is
/// never conflated with "value unchanged".
#[derive(Debug, Error)]
#[error("destination value {phase} failed")]
pub struct WatchReadError {
    pub phase: ReadPhase,
    #[source]
    pub source: BoxError,
}

impl WatchReadError {
    pub fn new(phase: ReadPhase, source: eyre::Report) -> Self {
        Self {
            phase,
            source: source.into(),
        }
    }
}

/// Querying the status indexer failed. Logged and retried on the next tick.
#[derive(Debug, Error)]
pub enum StatusQueryError {
    #[error("status request failed")]
    Request(#[from] reqwest::Error),

    #[error("status API returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("malformed status response")]
    Decode(#[from] serde_json::Error),
}

/// Why a run ended without the transfer being reported executed
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error(transparent)]
    WatchRead(#[from] WatchReadError),

    #[error("run stopped before the transfer was submitted: {0}")]
    NotSubmitted(StopReason),

    #[error("run deadline of {0:?} elapsed before transfer {1} was reported executed")]
    Deadline(Duration, TxHash),

    #[error("run interrupted before transfer {0} was reported executed")]
    Interrupted(TxHash),

    #[error("background task failed: {0}")]
    Task(String),
}
