//! Shared types for a bridged call run

use std::fmt;

use alloy::primitives::{Address, Bytes, FixedBytes, TxHash, U256};
use serde::Deserialize;

/// A cross-chain contract call to hand to the bridge. Built once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    /// Depositor on the source chain (the signer)
    pub sender: Address,
    /// Bridge domain ID of the destination chain
    pub destination_domain_id: u8,
    /// Selects the bridge handler that processes the transfer
    pub resource_id: FixedBytes<32>,
    /// Contract invoked on the destination chain
    pub target_contract: Address,
    /// Function selector invoked on `target_contract`
    pub target_function: FixedBytes<4>,
    /// Extra call data appended after the depositor address
    pub payload: Bytes,
    /// Execution gas budget for the destination handler, carried in the deposit data
    pub max_fee: U256,
}

/// Bridge-specific encoding of a [`TransferRequest`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferDescriptor {
    pub request: TransferRequest,
    pub deposit_data: Bytes,
    pub fee_data: Bytes,
}

/// A broadcast bridging transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmittedTransfer {
    pub tx_hash: TxHash,
    /// Fee paid with the deposit, in wei
    pub fee: U256,
}

/// Lifecycle state reported by the status indexer
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum TransferStatus {
    Pending,
    Executed,
    Failed,
    Other(String),
}

impl TransferStatus {
    /// Whether polling can stop
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferStatus::Executed)
    }

    pub fn as_str(&self) -> &str {
        match self {
            TransferStatus::Pending => "pending",
            TransferStatus::Executed => "executed",
            TransferStatus::Failed => "failed",
            TransferStatus::Other(s) => s,
        }
    }
}

impl From<String> for TransferStatus {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "pending" => TransferStatus::Pending,
            "executed" => TransferStatus::Executed,
            "failed" => TransferStatus::Failed,
            _ => TransferStatus::Other(s),
        }
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One transfer record from the status indexer
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRecord {
    pub status: TransferStatus,
    #[serde(default)]
    pub deposit_nonce: Option<u64>,
    #[serde(default)]
    pub execution: Option<ExecutionInfo>,
}

/// Destination-side execution details, present once executed
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionInfo {
    #[serde(default)]
    pub tx_hash: Option<String>,
}

impl StatusRecord {
    pub fn execution_tx_hash(&self) -> Option<&str> {
        self.execution.as_ref().and_then(|e| e.tx_hash.as_deref())
    }
}

/// How the completion watcher finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    /// Destination value differs from the baseline
    Changed { value: U256, polls: u32 },
    /// Attempts exhausted with the value unchanged. The transfer may still be
    /// in flight.
    TimedOut { polls: u32 },
    /// Stopped by the run's shutdown signal
    Cancelled { polls: u32 },
}

impl WatchOutcome {
    pub fn polls(&self) -> u32 {
        match self {
            WatchOutcome::Changed { polls, .. }
            | WatchOutcome::TimedOut { polls }
            | WatchOutcome::Cancelled { polls } => *polls,
        }
    }
}

/// What the run learned once the completion watcher finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub baseline: U256,
    pub fee: U256,
    pub tx_hash: TxHash,
    /// `None` when every final read failed
    pub final_value: Option<U256>,
    pub watch: WatchOutcome,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "value before: {}, fee: {} wei, tx: 0x{:x}, value after: ",
            self.baseline, self.fee, self.tx_hash
        )?;
        match self.final_value {
            Some(value) => write!(f, "{}", value),
            None => f.write_str("unavailable"),
        }
    }
}
