//! Pipeline error taxonomy
//!
//! `ChainError` covers failures reported by the chain client; `StageError`
//! is what a pipeline stage hands back to the orchestrator, which decides
//! per kind whether the token ends in failure or at a benign checkpoint.

use alloy::primitives::{Address, TxHash, U256};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// Endpoint unreachable or connection dropped. The RPC client retries
    /// these against the next configured endpoint.
    #[error("transport error on {endpoint}: {message}")]
    Transport { endpoint: String, message: String },

    #[error("node returned an error: {0}")]
    Node(String),

    /// The call would revert; nothing was broadcast.
    #[error("gas estimation failed (call would revert): {0}")]
    Estimation(String),

    /// Broadcast succeeded but no receipt was seen in time. The final state
    /// of the transaction is unknown.
    #[error("transaction {hash} not confirmed within {timeout_secs}s")]
    ConfirmationTimeout { hash: TxHash, timeout_secs: u64 },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("all RPC endpoints failed for {0}")]
    Exhausted(String),
}

impl ChainError {
    /// True when another endpoint might give a different answer.
    pub fn is_transport(&self) -> bool {
        matches!(self, ChainError::Transport { .. })
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("no swap route quoted: {0}")]
    QuoteUnavailable(String),

    #[error("no LP mint transfer to the wallet found in receipt {tx_hash}")]
    MintNotFound { tx_hash: TxHash },

    #[error("LP balance {balance} of {lp_token} is below minted amount {minted}")]
    InsufficientLpBalance {
        lp_token: Address,
        balance: U256,
        minted: U256,
    },

    #[error("transaction {hash} reverted")]
    Reverted { hash: TxHash },

    #[error("signing failed: {0}")]
    Signing(String),
}

impl StageError {
    /// Expected outcomes that end a token's run without being a fault.
    pub fn is_expected(&self) -> bool {
        matches!(self, StageError::InsufficientLpBalance { .. })
    }
}
