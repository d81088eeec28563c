//! Burn Stage
//!
//! Sends exactly the amount minted in this run to the burn address, never
//! the wallet's whole LP balance. If the wallet holds less LP than was
//! minted, nothing is sent.

use super::submitter::ContractCall;
use super::PipelineContext;
use crate::chain::ChainClient;
use crate::contracts::IERC20;
use crate::error::StageError;
use crate::types::{MintResult, TxReceipt};
use alloy::primitives::Address;
use tracing::debug;

pub async fn burn_lp<C: ChainClient>(
    ctx: &PipelineContext<C>,
    mint: &MintResult,
    owner: Address,
    burn_address: Address,
) -> Result<TxReceipt, StageError> {
    let balance = ctx.chain.balance_of(mint.lp_token, owner).await?;
    if balance < mint.amount {
        return Err(StageError::InsufficientLpBalance {
            lp_token: mint.lp_token,
            balance,
            minted: mint.amount,
        });
    }
    debug!("LP balance {} covers minted {}", balance, mint.amount);

    let call = ContractCall::new(
        mint.lp_token,
        &IERC20::transferCall {
            to: burn_address,
            amount: mint.amount,
        },
        "burn transfer",
    );
    ctx.submitter.build_and_send(call).await
}
