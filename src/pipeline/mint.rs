//! Mint-Event Extractor
//!
//! Recovers the LP token and minted amount from an addLiquidity receipt.
//!
//! Scans logs in order for ERC20 `Transfer` events and takes the first one
//! that is either a mint (`from` is the zero address) or a credit to the
//! owner (`to` is the owner). Some LP tokens mint straight to the provider,
//! others route through an intermediate hop first, hence the two-sided
//! match. The first match wins with no further disambiguation.
//!
//! Layout of a Transfer log:
//!     topics[0] = keccak256("Transfer(address,address,uint256)")
//!     topics[1] = from (left-padded to 32 bytes)
//!     topics[2] = to   (left-padded to 32 bytes)
//!     data      = value (uint256, big-endian)

use crate::contracts::IERC20;
use crate::error::StageError;
use crate::types::{EventLogEntry, MintResult, TxReceipt};
use alloy::primitives::{Address, U256};
use alloy::sol_types::SolEvent;
use tracing::trace;

/// Decoded ERC20 Transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferLog {
    pub token: Address,
    pub from: Address,
    pub to: Address,
    pub value: U256,
}

/// Decode an ERC20 Transfer. Returns None for other events and for
/// Transfer-shaped logs that are not ERC20 (ERC721 indexes a fourth topic)
/// or whose data is not a single 32-byte word.
pub fn decode_transfer(entry: &EventLogEntry) -> Option<TransferLog> {
    if entry.topics.first() != Some(&IERC20::Transfer::SIGNATURE_HASH) {
        return None;
    }
    if entry.topics.len() != 3 {
        trace!(
            "Skipping Transfer from {} with {} topics",
            entry.address,
            entry.topics.len()
        );
        return None;
    }
    if entry.data.len() != 32 {
        trace!(
            "Skipping Transfer from {} with {} data bytes",
            entry.address,
            entry.data.len()
        );
        return None;
    }

    let value = U256::from_be_slice(&entry.data);
    Some(TransferLog {
        token: entry.address,
        from: Address::from_word(entry.topics[1]),
        to: Address::from_word(entry.topics[2]),
        value,
    })
}

pub fn extract_mint(receipt: &TxReceipt, owner: Address) -> Result<MintResult, StageError> {
    receipt
        .logs
        .iter()
        .filter_map(decode_transfer)
        .find(|t| t.from == Address::ZERO || t.to == owner)
        .map(|t| MintResult {
            lp_token: t.token,
            amount: t.value,
        })
        .ok_or(StageError::MintNotFound {
            tx_hash: receipt.tx_hash,
        })
}
