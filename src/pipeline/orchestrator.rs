//! Pipeline Orchestrator
//!
//! Walks the reward token list one token at a time:
//!
//!   Start → BalanceChecked → Skipped                      (zero balance)
//!                          → Approved → LiquidityProvided → MintExtracted → Burned
//!
//! Any stage failure moves that token to `Ended` with the failure logged
//! and the run continues with the next token. The outcome keeps the last
//! stage completed so the log shows where it stopped. Nothing is retried
//! within a run and no token's failure stops the batch.

use super::burn::burn_lp;
use super::liquidity::{provide_liquidity, LiquidityError};
use super::mint::extract_mint;
use super::PipelineContext;
use crate::chain::ChainClient;
use crate::error::StageError;
use crate::types::{PipelineOutcome, RewardTokenConfig, RunSummary, Stage, TokenTask};
use tracing::{error, info, warn};

pub struct BurnPipeline<C> {
    ctx: PipelineContext<C>,
}

impl<C: ChainClient> BurnPipeline<C> {
    pub fn new(ctx: PipelineContext<C>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &PipelineContext<C> {
        &self.ctx
    }

    /// Resolve symbols for every configured token. A failed symbol read
    /// falls back to the configured label, then to the address.
    pub async fn load_tasks(&self, tokens: &[RewardTokenConfig]) -> Vec<TokenTask> {
        let mut tasks = Vec::with_capacity(tokens.len());
        for token in tokens {
            let symbol = match self.ctx.chain.symbol(token.address).await {
                Ok(symbol) => symbol,
                Err(e) => {
                    let fallback = token
                        .label
                        .clone()
                        .unwrap_or_else(|| token.address.to_string());
                    warn!(
                        "Could not read symbol for {} ({}); using {}",
                        token.address, e, fallback
                    );
                    fallback
                }
            };
            tasks.push(TokenTask::new(token.address, symbol));
        }
        tasks
    }

    /// Run every task in order. Always completes the full list.
    pub async fn run(&self, tasks: &[TokenTask]) -> RunSummary {
        warn!("addLiquidity is submitted with zero minimum amounts (no slippage protection)");

        let mut summary = RunSummary::default();
        for task in tasks {
            let outcome = self.run_token(task).await;
            summary.record(outcome);
        }

        info!(
            "Run complete: {} tokens | {} burned | {} skipped | {} LP short | {} failed",
            summary.total(),
            summary.burned,
            summary.skipped,
            summary.short_circuited,
            summary.failed
        );
        summary
    }

    pub async fn run_token(&self, task: &TokenTask) -> PipelineOutcome {
        let settings = &self.ctx.settings;
        let mut stage = Stage::Start;

        let balance = match self.ctx.chain.balance_of(task.address, settings.wallet).await {
            Ok(balance) => balance,
            Err(e) => return self.fail(task, stage, StageError::from(e)),
        };
        stage = Stage::BalanceChecked;

        if balance.is_zero() {
            info!("No balance found for {}. Skipping...", task.symbol);
            return PipelineOutcome::skipped(task);
        }
        info!("Adding LP for {} (balance {})...", task.symbol, balance);

        let receipt = match provide_liquidity(&self.ctx, task.address, balance).await {
            Ok(receipt) => receipt,
            Err(LiquidityError::Approval(e)) => return self.fail(task, stage, e),
            Err(LiquidityError::Provision(e)) => return self.fail(task, Stage::Approved, e),
        };
        stage = Stage::LiquidityProvided;
        info!("Added LP for {} ({})", task.symbol, receipt.tx_hash);

        let mint = match extract_mint(&receipt, settings.wallet) {
            Ok(mint) => mint,
            Err(e) => return self.fail(task, stage, e),
        };
        stage = Stage::MintExtracted;
        info!(
            "Minted {} LP tokens of {} for {}",
            mint.amount, mint.lp_token, task.symbol
        );

        match burn_lp(&self.ctx, &mint, settings.wallet, settings.burn_address).await {
            Ok(burn) => {
                info!(
                    "Transferred {} LP tokens to {} ({})",
                    mint.amount, settings.burn_address, burn.tx_hash
                );
                PipelineOutcome {
                    symbol: task.symbol.clone(),
                    token: task.address,
                    stage: Stage::Burned,
                    success: true,
                    error: None,
                    burn_tx: Some(burn.tx_hash),
                    burned: Some(mint.amount),
                }
            }
            Err(e) if e.is_expected() => {
                info!("Not burning LP for {}: {}", task.symbol, e);
                PipelineOutcome {
                    symbol: task.symbol.clone(),
                    token: task.address,
                    stage,
                    success: true,
                    error: Some(e.to_string()),
                    burn_tx: None,
                    burned: None,
                }
            }
            Err(e) => self.fail(task, stage, e),
        }
    }

    fn fail(&self, task: &TokenTask, stage: Stage, err: StageError) -> PipelineOutcome {
        error!(
            "{} ({}) failed after stage {}, ended: {}",
            task.symbol, task.address, stage, err
        );
        PipelineOutcome::failed(task, stage, err.to_string())
    }
}
