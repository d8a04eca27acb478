//! Destination-value completion watcher
//!
//! Detects that a bridged call took effect by polling the destination contract
//! until its value moves away from the baseline read before submission.
//!
//! # Polling Rules
//!
//! Each tick sleeps `poll_interval` and then reads. An unchanged value consumes
//! one attempt; once the attempt counter exceeds `max_attempts` the watcher gives
//! up with [`WatchOutcome::TimedOut`]. With reads succeeding that is at most
//! `max_attempts + 1` reads and `(max_attempts + 1) * poll_interval` of waiting.
//!
//! A failed read is not an unchanged value. It does not consume an attempt and
//! is retried on the next tick; `max_read_errors` failures in total end the
//! watch with a [`WatchReadError`].

use std::time::Duration;

use alloy::primitives::U256;
use tracing::{debug, info, warn};

use crate::chain::DestinationReader;
use crate::error::{ReadPhase, WatchReadError};
use crate::progress::{Progress, ProgressSender};
use crate::shutdown::ShutdownSignal;
use crate::types::WatchOutcome;

/// Watcher configuration
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Sleep before each read
    pub poll_interval: Duration,
    /// Unchanged reads tolerated before giving up (the last one excluded)
    pub max_attempts: u32,
    /// Failed reads tolerated over the whole watch
    pub max_read_errors: u32,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(15_000),
            max_attempts: 8,
            max_read_errors: 3,
        }
    }
}

impl WatchConfig {
    /// Longest the watcher can run when every read succeeds. Saturates at
    /// `Duration::MAX`.
    pub fn max_duration(&self) -> Duration {
        self.poll_interval
            .checked_mul(self.max_attempts.saturating_add(1))
            .unwrap_or(Duration::MAX)
    }
}

/// Loop state, owned by a single watch
#[derive(Debug, Clone)]
pub struct WatchState {
    pub baseline: U256,
    pub current_attempt: u32,
    pub max_attempts: u32,
    pub poll_interval: Duration,
    reads: u32,
    read_errors: u32,
}

impl WatchState {
    pub fn new(baseline: U256, config: &WatchConfig) -> Self {
        Self {
            baseline,
            current_attempt: 0,
            max_attempts: config.max_attempts,
            poll_interval: config.poll_interval,
            reads: 0,
            read_errors: 0,
        }
    }

    /// Successful reads so far
    pub fn reads(&self) -> u32 {
        self.reads
    }

    /// Record a successful read, returning whether it differs from the baseline
    fn observe(&mut self, value: U256) -> bool {
        self.reads = self.reads.saturating_add(1);
        if value != self.baseline {
            return true;
        }
        self.current_attempt = self.current_attempt.saturating_add(1);
        false
    }

    fn is_exhausted(&self) -> bool {
        self.current_attempt > self.max_attempts
    }
}

/// Polls a [`DestinationReader`] until its value changes
pub struct CompletionWatcher<R> {
    reader: R,
    config: WatchConfig,
    progress: ProgressSender,
}

impl<R: DestinationReader> CompletionWatcher<R> {
    pub fn new(reader: R, config: WatchConfig, progress: ProgressSender) -> Self {
        Self {
            reader,
            config,
            progress,
        }
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// Watch for the destination value to leave `baseline`
    pub async fn watch(
        &self,
        baseline: U256,
        mut shutdown: ShutdownSignal,
    ) -> Result<WatchOutcome, WatchReadError> {
        let mut state = WatchState::new(baseline, &self.config);

        info!(
            baseline = %baseline,
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            max_attempts = self.config.max_attempts,
            "Watching destination value"
        );

        loop {
            tokio::select! {
                reason = shutdown.recv() => {
                    info!(reason = %reason, reads = state.reads(), "Completion watcher stopped");
                    return Ok(WatchOutcome::Cancelled { polls: state.reads() });
                }
                _ = tokio::time::sleep(state.poll_interval) => {}
            }

            let value = match self.reader.read_value().await {
                Ok(value) => value,
                Err(e) => {
                    state.read_errors += 1;
                    let phase = ReadPhase::Poll {
                        attempt: state.current_attempt.saturating_add(1),
                    };
                    if state.read_errors > self.config.max_read_errors {
                        return Err(WatchReadError::new(phase, e));
                    }
                    warn!(
                        error = %e,
                        read_errors = state.read_errors,
                        max_read_errors = self.config.max_read_errors,
                        "Destination read failed, retrying next tick"
                    );
                    continue;
                }
            };

            if state.observe(value) {
                info!(value = %value, reads = state.reads(), "Destination value changed");
                self.progress.send(Progress::Changed(value));
                return Ok(WatchOutcome::Changed {
                    value,
                    polls: state.reads(),
                });
            }

            debug!(
                value = %value,
                attempt = state.current_attempt,
                "Destination value unchanged"
            );

            if state.is_exhausted() {
                warn!(
                    reads = state.reads(),
                    "Destination value never changed, giving up"
                );
                self.progress.send(Progress::StillPending {
                    polls: state.reads(),
                });
                return Ok(WatchOutcome::TimedOut {
                    polls: state.reads(),
                });
            }

            self.progress.send(Progress::Unchanged {
                attempt: state.current_attempt,
                max_attempts: state.max_attempts,
            });
        }
    }
}
