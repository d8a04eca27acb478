//! Run orchestration
//!
//! One run is: baseline read, submission, then the completion watcher and the
//! status poller side by side. The watcher's outcome produces the summary; the
//! run itself ends when the poller sees the transfer executed, the overall
//! deadline passes, or the run is interrupted.
//!
//! Both background tasks share one [`Shutdown`]. The deadline task and the
//! binary's signal handler trigger it; the orchestrator triggers it itself
//! when it is done. A stop requested before submission ends the run without
//! broadcasting anything. Destination read failures after submission never end
//! the run; only the poller, the deadline or an interrupt do.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{TxHash, U256};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::bridge::BridgeSdk;
use crate::chain::{DestinationReader, SourceChain};
use crate::config::Config;
use crate::error::{ReadPhase, RunError, WatchReadError};
use crate::progress::{Progress, ProgressSender};
use crate::shutdown::{Shutdown, ShutdownSignal, StopReason};
use crate::status::{StatusApi, StatusOutcome, StatusPoller};
use crate::submission::submit_transfer;
use crate::types::{RunSummary, StatusRecord, TransferRequest, WatchOutcome};
use crate::watcher::{CompletionWatcher, WatchConfig};

/// Timing knobs for one run
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub watch: WatchConfig,
    pub status_interval: Duration,
    pub run_timeout: Duration,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            watch: WatchConfig::default(),
            status_interval: crate::status::DEFAULT_STATUS_INTERVAL,
            run_timeout: Duration::from_secs(30 * 60),
        }
    }
}

impl From<&Config> for RunSettings {
    fn from(config: &Config) -> Self {
        Self {
            watch: config.watch_config(),
            status_interval: config.status_poll_interval(),
            run_timeout: config.run_timeout(),
        }
    }
}

/// Everything a successful run learned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// `None` when the destination value could not be watched
    pub summary: Option<RunSummary>,
    /// The record the indexer reported as executed
    pub status: StatusRecord,
}

pub struct Orchestrator<B, S, D, A> {
    sdk: B,
    source: S,
    destination: Arc<D>,
    status_api: Arc<A>,
    settings: RunSettings,
    progress: ProgressSender,
    shutdown: Shutdown,
}

impl<B, S, D, A> Orchestrator<B, S, D, A>
where
    B: BridgeSdk,
    S: SourceChain,
    D: DestinationReader + 'static,
    A: StatusApi + 'static,
{
    pub fn new(
        sdk: B,
        source: S,
        destination: D,
        status_api: A,
        settings: RunSettings,
        progress: ProgressSender,
    ) -> Self {
        Self {
            sdk,
            source,
            destination: Arc::new(destination),
            status_api: Arc::new(status_api),
            settings,
            progress,
            shutdown: Shutdown::new(),
        }
    }

    /// Handle for stopping the run from outside, e.g. on Ctrl+C
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Perform one bridged call and follow it to completion
    pub async fn run(&self, request: &TransferRequest) -> Result<RunReport, RunError> {
        let mut signal = self.shutdown.subscribe();
        let baseline = tokio::select! {
            biased;
            reason = signal.recv() => {
                info!(reason = %reason, "Run stopped before submission");
                return Err(RunError::NotSubmitted(reason));
            }
            read = self.destination.read_value() => {
                read.map_err(|e| WatchReadError::new(ReadPhase::Baseline, e))?
            }
        };
        info!(baseline = %baseline, "Baseline destination value read");
        self.progress.send(Progress::Baseline(baseline));

        // last point at which nothing irreversible has happened
        if let Some(reason) = self.shutdown.reason() {
            info!(reason = %reason, "Run stopped before submission");
            return Err(RunError::NotSubmitted(reason));
        }

        let submitted = submit_transfer(&self.sdk, &self.source, request).await?;
        self.progress.send(Progress::Submitted(submitted));
        let tx_hash = submitted.tx_hash;

        let deadline = self.spawn_deadline();
        let poller = self.spawn_status_poller(tx_hash);
        let watcher = self.spawn_watcher(baseline);

        let summary = match watcher.await {
            Ok(Ok(WatchOutcome::Cancelled { polls })) => {
                let reason = self.stop_reason();
                warn!(reason = %reason, polls = polls, "Completion watch cancelled");
                return Err(self.finish(deadline, poller, self.stopped(reason, tx_hash)).await);
            }
            Ok(Ok(watch)) => {
                let final_value = self.read_final_value(&mut signal).await;
                let summary = RunSummary {
                    baseline,
                    fee: submitted.fee,
                    tx_hash,
                    final_value,
                    watch,
                };
                info!(
                    baseline = %baseline,
                    final_value = ?final_value,
                    polls = watch.polls(),
                    "Completion watch finished"
                );
                self.progress.send(Progress::Summary(summary));
                Some(summary)
            }
            Ok(Err(e)) => {
                // the indexer still decides how the run ends
                error!(error = %e, "Completion watch failed, following status only");
                self.progress.send(Progress::DestinationUnreadable);
                None
            }
            Err(e) => {
                let err = RunError::Task(format!("completion watcher: {}", e));
                return Err(self.finish(deadline, poller, err).await);
            }
        };

        let outcome = poller.await;
        self.shutdown.trigger(StopReason::Completed);
        deadline.abort();

        match outcome {
            Ok(StatusOutcome::Terminal(status)) => {
                info!(tx_hash = %tx_hash, "Run complete");
                Ok(RunReport { summary, status })
            }
            Ok(StatusOutcome::Cancelled(reason)) => Err(self.stopped(reason, tx_hash)),
            Err(e) => Err(RunError::Task(format!("status poller: {}", e))),
        }
    }

    /// Read the destination value once more, retrying failures under the
    /// watcher's read-error budget. `None` if every attempt failed or the run
    /// was stopped meanwhile.
    async fn read_final_value(&self, signal: &mut ShutdownSignal) -> Option<U256> {
        let budget = self.settings.watch.max_read_errors;
        let mut failures = 0u32;

        loop {
            match self.destination.read_value().await {
                Ok(value) => return Some(value),
                Err(e) => {
                    failures += 1;
                    let err = WatchReadError::new(ReadPhase::Final, e);
                    if failures > budget {
                        warn!(error = %err, failures = failures, "Final destination value unavailable");
                        return None;
                    }
                    warn!(error = %err, failures = failures, "Final destination read failed, retrying");
                }
            }

            tokio::select! {
                _ = signal.recv() => return None,
                _ = tokio::time::sleep(self.settings.watch.poll_interval) => {}
            }
        }
    }

    fn spawn_deadline(&self) -> JoinHandle<()> {
        let shutdown = self.shutdown.clone();
        let timeout = self.settings.run_timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if shutdown.trigger(StopReason::Deadline) {
                warn!(timeout_ms = timeout.as_millis() as u64, "Run deadline elapsed");
            }
        })
    }

    fn spawn_status_poller(&self, tx_hash: TxHash) -> JoinHandle<StatusOutcome> {
        let poller = StatusPoller::new(
            Arc::clone(&self.status_api),
            self.settings.status_interval,
            self.progress.clone(),
        );
        let signal = self.shutdown.subscribe();
        tokio::spawn(async move { poller.run(tx_hash, signal).await })
    }

    fn spawn_watcher(&self, baseline: U256) -> JoinHandle<Result<WatchOutcome, WatchReadError>> {
        let watcher = CompletionWatcher::new(
            Arc::clone(&self.destination),
            self.settings.watch.clone(),
            self.progress.clone(),
        );
        let signal = self.shutdown.subscribe();
        tokio::spawn(async move { watcher.watch(baseline, signal).await })
    }

    /// Stop the remaining tasks and hand back the error that ended the run
    async fn finish(
        &self,
        deadline: JoinHandle<()>,
        poller: JoinHandle<StatusOutcome>,
        err: RunError,
    ) -> RunError {
        self.shutdown.trigger(StopReason::Aborted);
        deadline.abort();
        if let Err(e) = poller.await {
            warn!(error = %e, "Status poller ended abnormally");
        }
        err
    }

    fn stop_reason(&self) -> StopReason {
        self.shutdown.reason().unwrap_or(StopReason::Aborted)
    }

    fn stopped(&self, reason: StopReason, tx_hash: TxHash) -> RunError {
        match reason {
            StopReason::Deadline => RunError::Deadline(self.settings.run_timeout, tx_hash),
            StopReason::Interrupted => RunError::Interrupted(tx_hash),
            other => RunError::Task(format!("run stopped early: {}", other)),
        }
    }
}
