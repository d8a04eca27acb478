//! Bridge SDK seam
//!
//! Turns a [`TransferRequest`] into something the source chain can execute.
//! The bridge's contracts own fee computation; [`EvmBridgeSdk`] only asks the
//! fee handler router for a quote and encodes the `deposit` call.

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::RootProvider;
use alloy::rpc::types::TransactionRequest;
use alloy::sol;
use alloy::sol_types::SolCall;
use alloy::transports::http::{Client, Http};
use async_trait::async_trait;
use eyre::{eyre, Result};
use tracing::debug;

use crate::types::{TransferDescriptor, TransferRequest};

sol! {
    /// Bridge entry point on the source chain
    #[sol(rpc)]
    contract Bridge {
        function deposit(
            uint8 destinationDomainID,
            bytes32 resourceID,
            bytes calldata depositData,
            bytes calldata feeData
        ) external payable returns (uint64 depositNonce, bytes memory handlerResponse);
    }

    /// Routes fee quotes to the handler registered for a resource
    #[sol(rpc)]
    contract FeeHandlerRouter {
        function calculateFee(
            address sender,
            uint8 fromDomainID,
            uint8 destinationDomainID,
            bytes32 resourceID,
            bytes calldata depositData,
            bytes calldata feeData
        ) external view returns (uint256 fee, address tokenAddress);
    }
}

/// The three things asked of a bridging SDK
#[async_trait]
pub trait BridgeSdk: Send + Sync {
    /// Encode a request into the bridge's transfer descriptor
    fn build_descriptor(&self, request: &TransferRequest) -> Result<TransferDescriptor>;

    /// Ask the bridge what it charges for a descriptor, in wei
    async fn quote_fee(&self, descriptor: &TransferDescriptor) -> Result<U256>;

    /// Unsigned transaction paying `fee` for the descriptor
    fn build_transaction(
        &self,
        descriptor: &TransferDescriptor,
        fee: U256,
    ) -> Result<TransactionRequest>;
}

/// Encode the generic-message deposit data for a request.
///
/// Layout:
///   [0..32]   maxFee           (uint256, big-endian)
///   [32..34]  selector length  (uint16, big-endian)
///   selector
///   target length (uint8), target address
///   depositor length (uint8), depositor address
///   payload
pub fn encode_generic_deposit_data(request: &TransferRequest) -> Bytes {
    let selector = request.target_function.as_slice();
    let target = request.target_contract.as_slice();
    let depositor = request.sender.as_slice();

    let mut data = Vec::with_capacity(
        32 + 2 + selector.len() + 1 + target.len() + 1 + depositor.len() + request.payload.len(),
    );
    data.extend_from_slice(&request.max_fee.to_be_bytes::<32>());
    data.extend_from_slice(&(selector.len() as u16).to_be_bytes());
    data.extend_from_slice(selector);
    data.push(target.len() as u8);
    data.extend_from_slice(target);
    data.push(depositor.len() as u8);
    data.extend_from_slice(depositor);
    data.extend_from_slice(&request.payload);

    Bytes::from(data)
}

/// Bridge SDK speaking directly to the bridge contracts on an EVM source chain
pub struct EvmBridgeSdk {
    provider: RootProvider<Http<Client>>,
    bridge_address: Address,
    fee_router_address: Address,
    source_domain_id: u8,
}

impl EvmBridgeSdk {
    pub fn new(
        provider: RootProvider<Http<Client>>,
        bridge_address: Address,
        fee_router_address: Address,
        source_domain_id: u8,
    ) -> Self {
        Self {
            provider,
            bridge_address,
            fee_router_address,
            source_domain_id,
        }
    }
}

#[async_trait]
impl BridgeSdk for EvmBridgeSdk {
    fn build_descriptor(&self, request: &TransferRequest) -> Result<TransferDescriptor> {
        if request.destination_domain_id == self.source_domain_id {
            return Err(eyre!(
                "Destination domain {} is the source domain",
                request.destination_domain_id
            ));
        }

        Ok(TransferDescriptor {
            request: request.clone(),
            deposit_data: encode_generic_deposit_data(request),
            fee_data: Bytes::new(),
        })
    }

    async fn quote_fee(&self, descriptor: &TransferDescriptor) -> Result<U256> {
        let router = FeeHandlerRouter::new(self.fee_router_address, &self.provider);
        let request = &descriptor.request;

        let quote = router
            .calculateFee(
                request.sender,
                self.source_domain_id,
                request.destination_domain_id,
                request.resource_id,
                descriptor.deposit_data.clone(),
                descriptor.fee_data.clone(),
            )
            .call()
            .await
            .map_err(|e| eyre!("Failed to query fee: {}", e))?;

        // Fees are paid as msg.value; token-denominated fees need an ERC20 approval
        // this tool does not make.
        if quote.tokenAddress != Address::ZERO {
            return Err(eyre!(
                "Fee is charged in token {}, only native fees are supported",
                quote.tokenAddress
            ));
        }

        debug!(fee = %quote.fee, "Fee quoted");
        Ok(quote.fee)
    }

    fn build_transaction(
        &self,
        descriptor: &TransferDescriptor,
        fee: U256,
    ) -> Result<TransactionRequest> {
        Ok(build_deposit_transaction(self.bridge_address, descriptor, fee))
    }
}

/// `deposit` call on the bridge paying `fee` as value
pub fn build_deposit_transaction(
    bridge_address: Address,
    descriptor: &TransferDescriptor,
    fee: U256,
) -> TransactionRequest {
    let call = Bridge::depositCall {
        destinationDomainID: descriptor.request.destination_domain_id,
        resourceID: descriptor.request.resource_id,
        depositData: descriptor.deposit_data.clone(),
        feeData: descriptor.fee_data.clone(),
    };

    TransactionRequest::default()
        .with_from(descriptor.request.sender)
        .with_to(bridge_address)
        .with_input(call.abi_encode())
        .with_value(fee)
}
