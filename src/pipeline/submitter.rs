//! Transaction Builder & Submitter
//!
//! The single path every write takes: fetch nonce, encode, pre-flight gas
//! estimation, sign, broadcast, wait for the receipt. Nonce correctness
//! relies on callers never running two of these concurrently.

use crate::chain::ChainClient;
use crate::error::StageError;
use crate::types::{FeeEstimate, TxReceipt, TxRequest};
use alloy::consensus::{SignableTransaction, TxEip1559, TxEnvelope};
use alloy::eips::eip2718::Encodable2718;
use alloy::network::TxSignerSync;
use alloy::primitives::{Address, Bytes, TxKind, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::SolCall;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Encoded contract call plus a short label for logs
#[derive(Debug, Clone)]
pub struct ContractCall {
    pub to: Address,
    pub input: Bytes,
    pub label: &'static str,
}

impl ContractCall {
    pub fn new<T: SolCall>(to: Address, call: &T, label: &'static str) -> Self {
        Self {
            to,
            input: call.abi_encode().into(),
            label,
        }
    }
}

pub struct TxSubmitter<C> {
    chain: Arc<C>,
    signer: PrivateKeySigner,
    chain_id: u64,
    confirmation_timeout: Duration,
}

impl<C: ChainClient> TxSubmitter<C> {
    pub fn new(
        chain: Arc<C>,
        signer: PrivateKeySigner,
        chain_id: u64,
        confirmation_timeout: Duration,
    ) -> Self {
        Self {
            chain,
            signer,
            chain_id,
            confirmation_timeout,
        }
    }

    pub fn sender(&self) -> Address {
        self.signer.address()
    }

    /// Broadcast `call` and block until it is confirmed.
    /// Nothing is broadcast if gas estimation fails.
    pub async fn build_and_send(&self, call: ContractCall) -> Result<TxReceipt, StageError> {
        let from = self.sender();
        let nonce = self.chain.next_nonce(from).await?;

        let request = TxRequest {
            to: call.to,
            input: call.input,
            nonce,
            from,
            chain_id: self.chain_id,
        };

        let gas_limit = self.chain.estimate_gas(&request).await?;
        let fees = self.chain.fee_estimate().await?;
        debug!(
            "{}: nonce={} gas={} max_fee={} priority={}",
            call.label, nonce, gas_limit, fees.max_fee_per_gas, fees.max_priority_fee_per_gas
        );

        let raw = self.sign(&request, gas_limit, fees)?;
        let hash = self.chain.submit_raw(&raw).await?;
        info!("{} tx submitted: {}", call.label, hash);

        let receipt = self
            .chain
            .wait_for_receipt(hash, self.confirmation_timeout)
            .await?;

        if !receipt.status {
            return Err(StageError::Reverted { hash });
        }
        Ok(receipt)
    }

    fn sign(
        &self,
        request: &TxRequest,
        gas_limit: u64,
        fees: FeeEstimate,
    ) -> Result<Vec<u8>, StageError> {
        let mut tx = TxEip1559 {
            chain_id: request.chain_id,
            nonce: request.nonce,
            gas_limit,
            max_fee_per_gas: fees.max_fee_per_gas,
            max_priority_fee_per_gas: fees.max_priority_fee_per_gas,
            to: TxKind::Call(request.to),
            value: U256::ZERO,
            access_list: Default::default(),
            input: request.input.clone(),
        };

        let sig = TxSignerSync::sign_transaction_sync(&self.signer, &mut tx)
            .map_err(|e| StageError::Signing(e.to_string()))?;
        let signed: TxEnvelope = tx.into_signed(sig).into();
        Ok(signed.encoded_2718())
    }
}
