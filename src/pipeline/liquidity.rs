//! Liquidity Provisioning Stage
//!
//! Approves the router for both sides of the pair, quotes the pair-token
//! amount along `[token_in, intermediate, pair_token]` and submits
//! `addLiquidity` with the wallet as recipient.
//!
//! Both minimum-amount guards are zero, so the add accepts any price the
//! pool gives at inclusion time. This matches the established behaviour of
//! the bot and is logged as a risk at the start of every run.

use super::approval::{ensure_approved, ApprovalAction};
use super::submitter::ContractCall;
use super::PipelineContext;
use crate::chain::ChainClient;
use crate::contracts::IUniswapV2Router02;
use crate::error::StageError;
use crate::types::TxReceipt;
use alloy::primitives::{Address, U256};
use thiserror::Error;
use tracing::{debug, info};

/// Which half of provisioning failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LiquidityError {
    #[error("could not approve token spender: {0}")]
    Approval(StageError),

    #[error("could not add liquidity: {0}")]
    Provision(StageError),
}

/// Parameters of one addLiquidity call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquidityPlan {
    pub token_a: Address,
    pub token_b: Address,
    pub amount_a_desired: U256,
    pub amount_b_desired: U256,
    pub deadline: u64,
}

impl LiquidityPlan {
    /// Build from a router quote; the last hop's amount is the pair-token side.
    pub fn from_quote(
        token_a: Address,
        token_b: Address,
        amounts: &[U256],
        deadline: u64,
    ) -> Result<Self, StageError> {
        let (first, last) = match (amounts.first(), amounts.last()) {
            (Some(first), Some(last)) if amounts.len() >= 2 => (*first, *last),
            _ => {
                return Err(StageError::QuoteUnavailable(format!(
                    "router returned {} amounts",
                    amounts.len()
                )))
            }
        };
        if last.is_zero() {
            return Err(StageError::QuoteUnavailable(
                "quoted output is zero".to_string(),
            ));
        }

        Ok(Self {
            token_a,
            token_b,
            amount_a_desired: first,
            amount_b_desired: last,
            deadline,
        })
    }

    pub fn to_call(&self, recipient: Address) -> IUniswapV2Router02::addLiquidityCall {
        IUniswapV2Router02::addLiquidityCall {
            tokenA: self.token_a,
            tokenB: self.token_b,
            amountADesired: self.amount_a_desired,
            amountBDesired: self.amount_b_desired,
            amountAMin: U256::ZERO,
            amountBMin: U256::ZERO,
            to: recipient,
            deadline: U256::from(self.deadline),
        }
    }
}

/// Approve the router for `token_in`, then for the pair token. Stops at the
/// first failure.
pub async fn approve_router<C: ChainClient>(
    ctx: &PipelineContext<C>,
    token_in: Address,
) -> Result<(), StageError> {
    let settings = &ctx.settings;
    for token in [token_in, settings.pair_token] {
        if let ApprovalAction::Approved { tx_hash, .. } =
            ensure_approved(ctx, settings.wallet, settings.router, token).await?
        {
            info!(
                "Approved router {} as spender for {} ({})",
                settings.router, token, tx_hash
            );
        }
    }
    Ok(())
}

pub async fn provide_liquidity<C: ChainClient>(
    ctx: &PipelineContext<C>,
    token_in: Address,
    amount_in: U256,
) -> Result<TxReceipt, LiquidityError> {
    approve_router(ctx, token_in)
        .await
        .map_err(LiquidityError::Approval)?;

    let settings = &ctx.settings;
    let path = [token_in, settings.intermediate_token, settings.pair_token];
    let amounts = ctx
        .chain
        .amounts_out(settings.router, amount_in, &path)
        .await
        .map_err(|e| LiquidityError::Provision(StageError::QuoteUnavailable(e.to_string())))?;

    let plan = LiquidityPlan::from_quote(token_in, settings.pair_token, &amounts, ctx.deadline())
        .map_err(LiquidityError::Provision)?;
    debug!(
        "addLiquidity plan: {} {} + {} {} (deadline {})",
        plan.amount_a_desired, plan.token_a, plan.amount_b_desired, plan.token_b, plan.deadline
    );

    let call = ContractCall::new(
        settings.router,
        &plan.to_call(settings.wallet),
        "addLiquidity",
    );
    ctx.submitter
        .build_and_send(call)
        .await
        .map_err(LiquidityError::Provision)
}
