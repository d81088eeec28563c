//! Chain Client
//!
//! Read/write access to the ledger as seen by the pipeline: ERC20 reads,
//! router quotes, nonce lookup, gas and fee estimation, raw submission and
//! receipt polling. Every call is awaited to completion before the caller
//! moves on.

pub mod keystore;
pub mod rpc;

#[cfg(test)]
pub(crate) mod mock;

use crate::error::ChainError;
use crate::types::{FeeEstimate, TxReceipt, TxRequest};
use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;
use std::time::Duration;

pub use keystore::load_signer;
pub use rpc::RpcChainClient;

#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, ChainError>;

    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, ChainError>;

    async fn total_supply(&self, token: Address) -> Result<U256, ChainError>;

    async fn symbol(&self, token: Address) -> Result<String, ChainError>;

    /// Router quote along `path`; one amount per hop, input first.
    async fn amounts_out(
        &self,
        router: Address,
        amount_in: U256,
        path: &[Address],
    ) -> Result<Vec<U256>, ChainError>;

    async fn next_nonce(&self, owner: Address) -> Result<u64, ChainError>;

    /// Fails with `ChainError::Estimation` if the call would revert.
    async fn estimate_gas(&self, tx: &TxRequest) -> Result<u64, ChainError>;

    async fn fee_estimate(&self) -> Result<FeeEstimate, ChainError>;

    async fn submit_raw(&self, raw: &[u8]) -> Result<TxHash, ChainError>;

    /// Fails with `ChainError::ConfirmationTimeout` if no receipt shows up in time.
    async fn wait_for_receipt(&self, hash: TxHash, timeout: Duration)
        -> Result<TxReceipt, ChainError>;
}
