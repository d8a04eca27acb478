//! Status indexer client and poller
//!
//! The poller runs next to the completion watcher and reports what the bridge's
//! indexer knows about the source transaction. It stops when the indexer
//! reports the transfer executed or when the run's shutdown signal fires.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::TxHash;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::StatusQueryError;
use crate::progress::{Progress, ProgressSender, StatusReport};
use crate::shutdown::{ShutdownSignal, StopReason};
use crate::types::{StatusRecord, TransferStatus};

/// Default cadence of status queries
pub const DEFAULT_STATUS_INTERVAL: Duration = Duration::from_millis(5_000);

/// Query side of the bridge's status indexer
#[async_trait]
pub trait StatusApi: Send + Sync {
    /// All transfer records the indexer holds for a source transaction
    async fn transfer_status(&self, tx_hash: TxHash)
        -> Result<Vec<StatusRecord>, StatusQueryError>;
}

#[async_trait]
impl<T: StatusApi + ?Sized> StatusApi for Arc<T> {
    async fn transfer_status(
        &self,
        tx_hash: TxHash,
    ) -> Result<Vec<StatusRecord>, StatusQueryError> {
        (**self).transfer_status(tx_hash).await
    }
}

/// Indexer responses come back either as a list or as a single record
#[derive(Deserialize)]
#[serde(untagged)]
enum StatusBody {
    Many(Vec<StatusRecord>),
    One(StatusRecord),
}

/// Decode an indexer response body
pub fn parse_status_body(body: &str) -> Result<Vec<StatusRecord>, StatusQueryError> {
    let records = match serde_json::from_str::<StatusBody>(body)? {
        StatusBody::Many(records) => records,
        StatusBody::One(record) => vec![record],
    };
    Ok(records)
}

/// HTTP client for the indexer's transfer endpoint
#[derive(Debug, Clone)]
pub struct IndexerClient {
    client: Client,
    base_url: String,
}

impl IndexerClient {
    pub fn new(base_url: &str) -> Result<Self, StatusQueryError> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn transfer_url(&self, tx_hash: TxHash) -> String {
        format!("{}/api/transfers/txHash/0x{:x}", self.base_url, tx_hash)
    }
}

#[async_trait]
impl StatusApi for IndexerClient {
    async fn transfer_status(
        &self,
        tx_hash: TxHash,
    ) -> Result<Vec<StatusRecord>, StatusQueryError> {
        let url = self.transfer_url(tx_hash);
        let resp = self.client.get(&url).send().await?;

        // the indexer answers 404 until it has seen the deposit
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(StatusQueryError::HttpStatus { status, body });
        }

        let body = resp.text().await?;
        parse_status_body(&body)
    }
}

/// How the status poller finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusOutcome {
    /// Indexer reported the terminal status
    Terminal(StatusRecord),
    /// Stopped by the run's shutdown signal
    Cancelled(StopReason),
}

/// Periodically queries a [`StatusApi`] until the transfer is executed
pub struct StatusPoller<A> {
    api: A,
    interval: Duration,
    progress: ProgressSender,
}

impl<A: StatusApi> StatusPoller<A> {
    pub fn new(api: A, interval: Duration, progress: ProgressSender) -> Self {
        Self {
            api,
            interval,
            progress,
        }
    }

    /// Poll until a terminal status or shutdown. Query errors never end the
    /// loop.
    pub async fn run(&self, tx_hash: TxHash, mut shutdown: ShutdownSignal) -> StatusOutcome {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            tx_hash = %tx_hash,
            interval_ms = self.interval.as_millis() as u64,
            "Status poller started"
        );

        loop {
            tokio::select! {
                reason = shutdown.recv() => {
                    info!(reason = %reason, "Status poller stopped");
                    return StatusOutcome::Cancelled(reason);
                }
                _ = ticker.tick() => {}
            }

            let records = match self.api.transfer_status(tx_hash).await {
                Ok(records) => records,
                Err(e) => {
                    warn!(error = %e, tx_hash = %tx_hash, "Status query failed, retrying next tick");
                    continue;
                }
            };

            let report = StatusReport::from_records(&records);
            debug!(report = %report, records = records.len(), "Status polled");
            self.progress.send(Progress::Status(report));

            let Some(first) = records.into_iter().next() else {
                continue;
            };

            if first.status.is_terminal() {
                info!(
                    tx_hash = %tx_hash,
                    destination_tx = ?first.execution_tx_hash(),
                    "Transfer executed"
                );
                self.progress.send(Progress::Executed {
                    destination_tx: first.execution_tx_hash().map(str::to_string),
                });
                return StatusOutcome::Terminal(first);
            }
            if first.status == TransferStatus::Failed {
                warn!(tx_hash = %tx_hash, "Indexer reports the transfer failed");
            }
        }
    }
}
