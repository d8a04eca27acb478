//! Transfer submission
//!
//! descriptor → fee quote → raw transaction → sign → broadcast. One broadcast
//! per call and no retries: a resubmission with a fresh nonce would double the
//! transfer, so retrying is left to the caller.

use eyre::eyre;
use tracing::info;

use crate::bridge::BridgeSdk;
use crate::chain::SourceChain;
use crate::error::{SubmissionError, SubmissionStage};
use crate::types::{SubmittedTransfer, TransferRequest};

/// Submit a bridging transfer on the source chain
pub async fn submit_transfer<B, S>(
    sdk: &B,
    source: &S,
    request: &TransferRequest,
) -> Result<SubmittedTransfer, SubmissionError>
where
    B: BridgeSdk + ?Sized,
    S: SourceChain + ?Sized,
{
    if request.sender != source.sender() {
        return Err(SubmissionError::new(
            SubmissionStage::Descriptor,
            eyre!(
                "Request sender {} does not match signing key {}",
                request.sender,
                source.sender()
            ),
        ));
    }

    let descriptor = sdk
        .build_descriptor(request)
        .map_err(|e| SubmissionError::new(SubmissionStage::Descriptor, e))?;

    let fee = sdk
        .quote_fee(&descriptor)
        .await
        .map_err(|e| SubmissionError::new(SubmissionStage::FeeQuote, e))?;

    info!(
        fee = %fee,
        destination_domain = request.destination_domain_id,
        resource_id = %hex::encode(request.resource_id),
        "Bridge fee quoted"
    );

    let tx = sdk
        .build_transaction(&descriptor, fee)
        .map_err(|e| SubmissionError::new(SubmissionStage::Build, e))?;

    let signed = source
        .sign(tx)
        .await
        .map_err(|e| SubmissionError::new(SubmissionStage::Sign, e))?;

    let tx_hash = source
        .broadcast(signed)
        .await
        .map_err(|e| SubmissionError::new(SubmissionStage::Broadcast, e))?;

    info!(tx_hash = %tx_hash, fee = %fee, "Bridging transfer submitted");

    Ok(SubmittedTransfer { tx_hash, fee })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{build_deposit_transaction, encode_generic_deposit_data};
    use crate::types::TransferDescriptor;
    use alloy::primitives::{address, b256, Address, Bytes, FixedBytes, TxHash, U256};
    use alloy::rpc::types::TransactionRequest;
    use async_trait::async_trait;
    use std::sync::Mutex;

    const SENDER: Address = address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266");
    const BRIDGE: Address = address!("4cf326d3817558038d6befea1a5936e6bcff5a2e");

    fn request() -> TransferRequest {
        TransferRequest {
            sender: SENDER,
            destination_domain_id: 3,
            resource_id: b256!(
                "0000000000000000000000000000000000000000000000000000000000000500"
            ),
            target_contract: address!("5fbdb2315678afecb367f032d93f642f64180aa3"),
            target_function: FixedBytes([0xd0, 0x9d, 0xe0, 0x8a]),
            payload: Bytes::new(),
            max_fee: U256::from(3_000_000u64),
        }
    }

    struct FakeSdk {
        fee: Option<u64>,
    }

    #[async_trait]
    impl BridgeSdk for FakeSdk {
        fn build_descriptor(&self, request: &TransferRequest) -> eyre::Result<TransferDescriptor> {
            Ok(TransferDescriptor {
                request: request.clone(),
                deposit_data: encode_generic_deposit_data(request),
                fee_data: Bytes::new(),
            })
        }

        async fn quote_fee(&self, _descriptor: &TransferDescriptor) -> eyre::Result<U256> {
            self.fee
                .map(U256::from)
                .ok_or_else(|| eyre!("fee handler not registered"))
        }

        fn build_transaction(
            &self,
            descriptor: &TransferDescriptor,
            fee: U256,
        ) -> eyre::Result<TransactionRequest> {
            Ok(build_deposit_transaction(BRIDGE, descriptor, fee))
        }
    }

    #[derive(Default)]
    struct FakeSource {
        fail_broadcast: bool,
        broadcasts: Mutex<Vec<TransactionRequest>>,
    }

    #[async_trait]
    impl SourceChain for FakeSource {
        type Signed = TransactionRequest;

        fn sender(&self) -> Address {
            SENDER
        }

        async fn sign(&self, tx: TransactionRequest) -> eyre::Result<TransactionRequest> {
            Ok(tx)
        }

        async fn broadcast(&self, signed: TransactionRequest) -> eyre::Result<TxHash> {
            if self.fail_broadcast {
                return Err(eyre!("insufficient funds for gas * price + value"));
            }
            self.broadcasts.lock().unwrap().push(signed);
            Ok(TxHash::repeat_byte(0xab))
        }
    }

    #[tokio::test]
    async fn test_submit_broadcasts_once_with_quoted_fee() {
        let sdk = FakeSdk { fee: Some(1_500) };
        let source = FakeSource::default();

        let submitted = submit_transfer(&sdk, &source, &request()).await.unwrap();

        assert_eq!(submitted.tx_hash, TxHash::repeat_byte(0xab));
        assert_eq!(submitted.fee, U256::from(1_500u64));

        let sent = source.broadcasts.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].value, Some(U256::from(1_500u64)));
    }

    #[tokio::test]
    async fn test_fee_quote_failure_is_staged() {
        let sdk = FakeSdk { fee: None };
        let source = FakeSource::default();

        let err = submit_transfer(&sdk, &source, &request()).await.unwrap_err();

        assert_eq!(err.stage, SubmissionStage::FeeQuote);
        assert!(source.broadcasts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_failure_is_staged() {
        let sdk = FakeSdk { fee: Some(1) };
        let source = FakeSource {
            fail_broadcast: true,
            ..Default::default()
        };

        let err = submit_transfer(&sdk, &source, &request()).await.unwrap_err();

        assert_eq!(err.stage, SubmissionStage::Broadcast);
        assert!(err.source.to_string().contains("insufficient funds"));
    }

    #[tokio::test]
    async fn test_sender_mismatch_rejected_before_signing() {
        let sdk = FakeSdk { fee: Some(1) };
        let source = FakeSource::default();
        let mut req = request();
        req.sender = Address::repeat_byte(0x11);

        let err = submit_transfer(&sdk, &source, &req).await.unwrap_err();

        assert_eq!(err.stage, SubmissionStage::Descriptor);
        assert!(source.broadcasts.lock().unwrap().is_empty());
    }
}
