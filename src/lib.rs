//! Cross-chain contract call watcher
//!
//! Submits one bridged contract call from a source EVM chain through a
//! generic-message bridge, then follows it two ways at once: by polling the
//! destination contract until its value changes, and by polling the bridge's
//! status indexer until the transfer is reported executed.
//!
//! # Modules
//!
//! - [`submission`] - descriptor, fee quote, build, sign, broadcast
//! - [`watcher`] - destination-value completion watcher
//! - [`status`] - status indexer client and poller
//! - [`orchestrator`] - one full run, with the shared deadline
//! - [`bridge`] / [`chain`] - the seams to the bridge contracts and the chains

pub mod bridge;
pub mod chain;
pub mod config;
pub mod constants;
pub mod error;
pub mod orchestrator;
pub mod progress;
pub mod shutdown;
pub mod status;
pub mod submission;
pub mod types;
pub mod watcher;

pub use config::Config;
pub use error::RunError;
pub use orchestrator::{Orchestrator, RunReport, RunSettings};
