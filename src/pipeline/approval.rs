//! Approval Manager
//!
//! Raises a spender's allowance only when the owner's balance exceeds it.
//! Approvals are for the token's full total supply so later runs rarely
//! need another one.

use super::submitter::ContractCall;
use super::PipelineContext;
use crate::chain::ChainClient;
use crate::contracts::IERC20;
use crate::error::StageError;
use crate::types::AllowanceCheck;
use alloy::primitives::{Address, TxHash, U256};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalAction {
    AlreadyApproved,
    Approved { tx_hash: TxHash, amount: U256 },
}

pub async fn check_allowance<C: ChainClient>(
    chain: &C,
    owner: Address,
    spender: Address,
    token: Address,
) -> Result<AllowanceCheck, StageError> {
    let balance = chain.balance_of(token, owner).await?;
    let allowance = chain.allowance(token, owner, spender).await?;
    Ok(AllowanceCheck {
        owner,
        spender,
        token,
        balance,
        allowance,
    })
}

pub async fn ensure_approved<C: ChainClient>(
    ctx: &PipelineContext<C>,
    owner: Address,
    spender: Address,
    token: Address,
) -> Result<ApprovalAction, StageError> {
    let check = check_allowance(ctx.chain.as_ref(), owner, spender, token).await?;
    if !check.needs_approval() {
        debug!(
            "Allowance sufficient for {}: {} >= {}",
            token, check.allowance, check.balance
        );
        return Ok(ApprovalAction::AlreadyApproved);
    }

    let amount = ctx.chain.total_supply(token).await?;
    let call = ContractCall::new(token, &IERC20::approveCall { spender, amount }, "approve");
    let receipt = ctx.submitter.build_and_send(call).await?;

    info!(
        "Approval confirmed for {} -> {}: {}",
        token, spender, receipt.tx_hash
    );
    Ok(ApprovalAction::Approved {
        tx_hash: receipt.tx_hash,
        amount,
    })
}
