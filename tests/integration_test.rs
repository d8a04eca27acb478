//! Integration tests for the cross-chain call watcher
//!
//! The `live` tests need real infrastructure and are ignored by default:
//! - Source and destination RPC endpoints (defaults: public testnet nodes)
//! - The bridge status indexer
//!
//! Run with: cargo test --test integration_test -- --ignored --nocapture
//!
//! Optional environment variables:
//! - SOURCE_EVM_URL
//! - DESTINATION_EVM_URL
//! - STATUS_API_URL
//!
//! The `pipeline` tests drive the library end to end against in-memory chains
//! and always run.

use std::env;
use std::time::Duration;

use xcall_watcher::constants::{
    DEFAULT_DESTINATION_RPC_URL, DEFAULT_SOURCE_RPC_URL, DEFAULT_STATUS_API_URL,
};

fn source_rpc_url() -> String {
    env::var("SOURCE_EVM_URL").unwrap_or_else(|_| DEFAULT_SOURCE_RPC_URL.to_string())
}

fn destination_rpc_url() -> String {
    env::var("DESTINATION_EVM_URL").unwrap_or_else(|_| DEFAULT_DESTINATION_RPC_URL.to_string())
}

fn status_api_url() -> String {
    env::var("STATUS_API_URL").unwrap_or_else(|_| DEFAULT_STATUS_API_URL.to_string())
}

// ============================================================================
// Live Connectivity Tests
// ============================================================================

mod live {
    use super::*;
    use alloy::primitives::TxHash;
    use xcall_watcher::chain::{DestinationReader, EvmDestination};
    use xcall_watcher::constants::TARGET_CONTRACT_ADDRESS;
    use xcall_watcher::status::{IndexerClient, StatusApi};

    #[tokio::test]
    #[ignore = "requires source chain RPC"]
    async fn test_source_rpc_connectivity() {
        let client = reqwest::Client::new();
        let url = source_rpc_url();

        let response = client
            .post(&url)
            .header("Content-Type", "application/json")
            .body(r#"{"jsonrpc":"2.0","method":"eth_chainId","params":[],"id":1}"#)
            .timeout(Duration::from_secs(10))
            .send()
            .await;

        match response {
            Ok(resp) => {
                assert!(resp.status().is_success(), "Source RPC returned error status");
                let json: serde_json::Value = resp.json().await.unwrap();
                assert!(json["result"].is_string(), "Expected chain id result");
                println!("Source chain id: {}", json["result"]);
            }
            Err(e) => panic!("Failed to connect to source RPC at {}: {}", url, e),
        }
    }

    #[tokio::test]
    #[ignore = "requires destination chain RPC"]
    async fn test_destination_value_readable() {
        let reader = EvmDestination::new(&destination_rpc_url(), TARGET_CONTRACT_ADDRESS)
            .expect("destination reader");

        let value = reader.read_value().await.expect("retrieve() call");
        println!("Destination value: {}", value);
    }

    #[tokio::test]
    #[ignore = "requires bridge status indexer"]
    async fn test_indexer_unknown_tx_is_empty() {
        let client = IndexerClient::new(&status_api_url()).expect("indexer client");

        let records = client
            .transfer_status(TxHash::repeat_byte(0x42))
            .await
            .expect("status query");
        assert!(records.is_empty(), "unknown tx should not be indexed");
    }
}

// ============================================================================
// Pipeline Tests (in-memory chains)
// ============================================================================

mod pipeline {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    use alloy::primitives::{Address, TxHash, U256};
    use alloy::rpc::types::TransactionRequest;
    use alloy::signers::local::PrivateKeySigner;
    use async_trait::async_trait;

    use xcall_watcher::bridge::{build_deposit_transaction, BridgeSdk};
    use xcall_watcher::chain::{DestinationReader, SourceChain};
    use xcall_watcher::constants::{BRIDGE_ADDRESS, SOURCE_DOMAIN_ID};
    use xcall_watcher::error::{ConfigError, StatusQueryError};
    use xcall_watcher::progress::ProgressSender;
    use xcall_watcher::status::{parse_status_body, StatusApi};
    use xcall_watcher::types::{
        StatusRecord, TransferDescriptor, TransferRequest, WatchOutcome,
    };
    use xcall_watcher::{Config, Orchestrator, RunError, RunSettings};

    // Anvil's first dev account
    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn config() -> Config {
        Config::from_lookup(|key| match key {
            "PRIVATE_KEY" => Some(TEST_KEY.to_string()),
            _ => None,
        })
        .unwrap()
    }

    /// Bridge SDK that encodes like the real one but quotes a fixed fee
    struct LocalBridge;

    #[async_trait]
    impl BridgeSdk for LocalBridge {
        fn build_descriptor(&self, request: &TransferRequest) -> eyre::Result<TransferDescriptor> {
            assert_ne!(request.destination_domain_id, SOURCE_DOMAIN_ID);
            Ok(TransferDescriptor {
                request: request.clone(),
                deposit_data: xcall_watcher::bridge::encode_generic_deposit_data(request),
                fee_data: Default::default(),
            })
        }

        async fn quote_fee(&self, _descriptor: &TransferDescriptor) -> eyre::Result<U256> {
            Ok(U256::from(100_000_000_000_000u64))
        }

        fn build_transaction(
            &self,
            descriptor: &TransferDescriptor,
            fee: U256,
        ) -> eyre::Result<TransactionRequest> {
            Ok(build_deposit_transaction(BRIDGE_ADDRESS, descriptor, fee))
        }
    }

    /// Source chain that records what it broadcasts
    struct LocalSource {
        sender: Address,
        sent: Mutex<Vec<TransactionRequest>>,
    }

    #[async_trait]
    impl SourceChain for LocalSource {
        type Signed = TransactionRequest;

        fn sender(&self) -> Address {
            self.sender
        }

        async fn sign(&self, tx: TransactionRequest) -> eyre::Result<TransactionRequest> {
            Ok(tx)
        }

        async fn broadcast(&self, signed: TransactionRequest) -> eyre::Result<TxHash> {
            self.sent.lock().unwrap().push(signed);
            Ok(TxHash::repeat_byte(0x77))
        }
    }

    /// Destination contract whose value is bumped once after `delay_reads` reads
    struct LocalDestination {
        value: u64,
        delay_reads: u32,
        reads: AtomicU32,
    }

    #[async_trait]
    impl DestinationReader for LocalDestination {
        async fn read_value(&self) -> eyre::Result<U256> {
            let n = self.reads.fetch_add(1, Ordering::SeqCst);
            if n > self.delay_reads {
                Ok(U256::from(self.value + 1))
            } else {
                Ok(U256::from(self.value))
            }
        }
    }

    /// Indexer that replays JSON bodies
    struct LocalIndexer {
        bodies: Mutex<VecDeque<&'static str>>,
        last: &'static str,
    }

    #[async_trait]
    impl StatusApi for LocalIndexer {
        async fn transfer_status(
            &self,
            _tx_hash: TxHash,
        ) -> Result<Vec<StatusRecord>, StatusQueryError> {
            let body = self.bodies.lock().unwrap().pop_front().unwrap_or(self.last);
            parse_status_body(body)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_bridged_call_runs_to_execution() {
        let config = config();
        let request = config.transfer_request().unwrap();
        let sender = config.signer().unwrap().address();

        let source = Arc::new(LocalSource {
            sender,
            sent: Mutex::new(Vec::new()),
        });
        let indexer = LocalIndexer {
            bodies: Mutex::new(VecDeque::from(vec!["[]", "[]", "[]", "[]", r#"[{"status":"pending"}]"#])),
            last: r#"[{"status":"executed","execution":{"txHash":"0xdead"}}]"#,
        };
        let destination = LocalDestination {
            value: 104,
            // baseline plus two unchanged polls
            delay_reads: 2,
            reads: AtomicU32::new(0),
        };
        let (progress, mut rx) = ProgressSender::channel();

        let orchestrator = Orchestrator::new(
            LocalBridge,
            SharedSource(Arc::clone(&source)),
            destination,
            indexer,
            RunSettings::from(&config),
            progress,
        );

        let report = orchestrator.run(&request).await.unwrap();
        let summary = report.summary.expect("destination watch finished");

        assert_eq!(
            summary.watch,
            WatchOutcome::Changed {
                value: U256::from(105u64),
                polls: 3
            }
        );
        assert_eq!(summary.final_value, Some(U256::from(105u64)));
        assert_eq!(report.status.execution_tx_hash(), Some("0xdead"));

        let sent = source.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].value, Some(summary.fee));

        drop(orchestrator);
        let mut lines = Vec::new();
        while let Some(event) = rx.recv().await {
            lines.push(event.to_string());
        }
        assert_eq!(lines[0], "Value before bridging: 104");
        let statuses: Vec<_> = lines
            .iter()
            .filter(|line| line.starts_with("Transfer status: "))
            .map(String::as_str)
            .collect();
        assert_eq!(
            statuses,
            vec![
                "Transfer status: not yet indexed",
                "Transfer status: not yet indexed",
                "Transfer status: not yet indexed",
                "Transfer status: not yet indexed",
                "Transfer status: pending",
                "Transfer status: executed",
            ]
        );
        assert!(lines.iter().any(|line| line.starts_with("Summary: value before: 104")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unexecuted_transfer_hits_deadline() {
        let config = Config::from_lookup(|key| match key {
            "PRIVATE_KEY" => Some(TEST_KEY.to_string()),
            "RUN_TIMEOUT_MS" => Some("120000".to_string()),
            _ => None,
        })
        .unwrap();
        let request = config.transfer_request().unwrap();

        let orchestrator = Orchestrator::new(
            LocalBridge,
            SharedSource(Arc::new(LocalSource {
                sender: request.sender,
                sent: Mutex::new(Vec::new()),
            })),
            LocalDestination {
                value: 7,
                delay_reads: u32::MAX,
                reads: AtomicU32::new(0),
            },
            LocalIndexer {
                bodies: Mutex::new(VecDeque::new()),
                last: r#"{"status":"pending"}"#,
            },
            RunSettings::from(&config),
            ProgressSender::disabled(),
        );

        let err = orchestrator.run(&request).await.unwrap_err();

        assert!(matches!(err, RunError::Deadline(timeout, _) if timeout == Duration::from_secs(120)));
    }

    #[test]
    fn test_missing_key_fails_before_any_network() {
        let err = Config::from_lookup(|_| None).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("PRIVATE_KEY")));
    }

    #[test]
    fn test_random_key_builds_request_for_its_address() {
        let signer = PrivateKeySigner::random();
        let key = hex::encode(signer.to_bytes());
        let config = Config::from_lookup(move |name| match name {
            "PRIVATE_KEY" => Some(key.clone()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.transfer_request().unwrap().sender, signer.address());
    }

    /// Lets the test keep a handle on the source after handing it over
    struct SharedSource(Arc<LocalSource>);

    #[async_trait]
    impl SourceChain for SharedSource {
        type Signed = TransactionRequest;

        fn sender(&self) -> Address {
            self.0.sender()
        }

        async fn sign(&self, tx: TransactionRequest) -> eyre::Result<TransactionRequest> {
            self.0.sign(tx).await
        }

        async fn broadcast(&self, signed: TransactionRequest) -> eyre::Result<TxHash> {
            self.0.broadcast(signed).await
        }
    }
}
