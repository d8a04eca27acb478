//! Chain connections
//!
//! Read access to the destination chain and signed writes to the source chain.
//!
//! # Transaction Building
//!
//! [`EvmSource`] fills nonce (pending), chain ID, gas limit and EIP-1559 fees
//! itself before signing, so signing and broadcasting stay two separate steps
//! and a failure can be attributed to the right one.
//!
//! # Usage
//!
//! ```ignore
//! let destination = EvmDestination::new(&config.destination_rpc_url, TARGET_CONTRACT_ADDRESS)?;
//! let value = destination.read_value().await?;
//! ```

use std::sync::Arc;

use alloy::consensus::TxEnvelope;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use alloy::transports::http::{Client, Http};
use async_trait::async_trait;
use eyre::{eyre, Result, WrapErr};
use tracing::{debug, info};

sol! {
    /// Contract invoked by the bridged call on the destination chain
    #[sol(rpc)]
    contract TargetContract {
        /// Entry point called by the generic handler; the depositor is prepended
        function increment(address depositor) external;

        /// Current stored value
        function retrieve() external view returns (uint256);
    }
}

/// Read side of the destination chain
#[async_trait]
pub trait DestinationReader: Send + Sync {
    /// Current value of the watched contract
    async fn read_value(&self) -> Result<U256>;
}

#[async_trait]
impl<T: DestinationReader + ?Sized> DestinationReader for Arc<T> {
    async fn read_value(&self) -> Result<U256> {
        (**self).read_value().await
    }
}

/// Write side of the source chain
#[async_trait]
pub trait SourceChain: Send + Sync {
    /// Signed form of a transaction, ready to broadcast
    type Signed: Send;

    /// Address the credential signs for
    fn sender(&self) -> Address;

    /// Complete and sign a transaction request
    async fn sign(&self, tx: TransactionRequest) -> Result<Self::Signed>;

    /// Broadcast a signed transaction, returning its hash
    async fn broadcast(&self, signed: Self::Signed) -> Result<TxHash>;
}

/// Destination chain reader backed by an HTTP provider
pub struct EvmDestination {
    provider: RootProvider<Http<Client>>,
    target: Address,
}

impl EvmDestination {
    pub fn new(rpc_url: &str, target: Address) -> Result<Self> {
        let provider = ProviderBuilder::new().on_http(
            rpc_url
                .parse()
                .map_err(|e| eyre!("Invalid destination RPC URL: {}", e))?,
        );

        info!(rpc_url = %rpc_url, target = %target, "Destination reader initialized");

        Ok(Self { provider, target })
    }

    pub fn target(&self) -> Address {
        self.target
    }
}

#[async_trait]
impl DestinationReader for EvmDestination {
    async fn read_value(&self) -> Result<U256> {
        let contract = TargetContract::new(self.target, &self.provider);

        let value = contract
            .retrieve()
            .call()
            .await
            .map_err(|e| eyre!("Failed to call retrieve(): {}", e))?
            ._0;

        debug!(target = %self.target, value = %value, "Read destination value");
        Ok(value)
    }
}

/// Source chain writer holding the sender's key
pub struct EvmSource {
    provider: RootProvider<Http<Client>>,
    signer: PrivateKeySigner,
    wallet: EthereumWallet,
}

impl EvmSource {
    pub fn new(rpc_url: &str, signer: PrivateKeySigner) -> Result<Self> {
        let provider = ProviderBuilder::new().on_http(
            rpc_url
                .parse()
                .map_err(|e| eyre!("Invalid source RPC URL: {}", e))?,
        );
        let wallet = EthereumWallet::from(signer.clone());

        info!(rpc_url = %rpc_url, sender = %signer.address(), "Source chain client initialized");

        Ok(Self {
            provider,
            signer,
            wallet,
        })
    }

    /// Provider for read-only calls against the source chain
    pub fn provider(&self) -> &RootProvider<Http<Client>> {
        &self.provider
    }
}

#[async_trait]
impl SourceChain for EvmSource {
    type Signed = TxEnvelope;

    fn sender(&self) -> Address {
        self.signer.address()
    }

    async fn sign(&self, tx: TransactionRequest) -> Result<TxEnvelope> {
        let from = self.sender();

        let nonce = self
            .provider
            .get_transaction_count(from)
            .pending()
            .await
            .wrap_err("Failed to fetch pending nonce")?;
        let chain_id = self
            .provider
            .get_chain_id()
            .await
            .wrap_err("Failed to fetch chain ID")?;

        let tx = tx.with_from(from).with_nonce(nonce).with_chain_id(chain_id);

        let gas_limit = self
            .provider
            .estimate_gas(&tx)
            .await
            .wrap_err("Failed to estimate gas")?;
        let fees = self
            .provider
            .estimate_eip1559_fees(None)
            .await
            .wrap_err("Failed to estimate EIP-1559 fees")?;

        debug!(
            nonce = nonce,
            chain_id = chain_id,
            gas_limit = gas_limit,
            max_fee_per_gas = fees.max_fee_per_gas,
            "Signing transaction"
        );

        tx.with_gas_limit(gas_limit)
            .with_max_fee_per_gas(fees.max_fee_per_gas)
            .with_max_priority_fee_per_gas(fees.max_priority_fee_per_gas)
            .build(&self.wallet)
            .await
            .map_err(|e| eyre!("Failed to sign transaction: {}", e))
    }

    async fn broadcast(&self, signed: TxEnvelope) -> Result<TxHash> {
        let pending = self
            .provider
            .send_tx_envelope(signed)
            .await
            .map_err(|e| eyre!("Failed to send transaction: {}", e))?;

        let tx_hash = *pending.tx_hash();
        info!(tx_hash = %tx_hash, "Transaction broadcast");
        Ok(tx_hash)
    }
}
