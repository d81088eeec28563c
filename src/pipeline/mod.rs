//! LP burn pipeline
//!
//! Stages run strictly one after another for one token at a time. All of
//! them share a `PipelineContext`: the chain client, the single transaction
//! submitter for the configured wallet, and the static settings.

pub mod approval;
pub mod burn;
pub mod liquidity;
pub mod mint;
pub mod orchestrator;
pub mod submitter;

pub use approval::{check_allowance, ensure_approved, ApprovalAction};
pub use burn::burn_lp;
pub use liquidity::{provide_liquidity, LiquidityError, LiquidityPlan};
pub use mint::{decode_transfer, extract_mint, TransferLog};
pub use orchestrator::BurnPipeline;
pub use submitter::{ContractCall, TxSubmitter};

use crate::chain::ChainClient;
use crate::types::BurnConfig;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use std::sync::Arc;
use std::time::Duration;

/// Addresses and timing every stage needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    pub wallet: Address,
    pub burn_address: Address,
    pub chain_id: u64,
    pub router: Address,
    pub pair_token: Address,
    pub intermediate_token: Address,
    pub confirmation_timeout: Duration,
    pub deadline_secs: u64,
}

impl PipelineSettings {
    pub fn from_config(config: &BurnConfig) -> Self {
        Self {
            wallet: config.wallet_address,
            burn_address: config.burn_address,
            chain_id: config.chain_id,
            router: config.router,
            pair_token: config.pair_token,
            intermediate_token: config.intermediate_token,
            confirmation_timeout: config.confirmation_timeout,
            deadline_secs: config.deadline_secs,
        }
    }
}

pub struct PipelineContext<C> {
    pub chain: Arc<C>,
    pub submitter: TxSubmitter<C>,
    pub settings: PipelineSettings,
}

impl<C: ChainClient> PipelineContext<C> {
    pub fn new(chain: Arc<C>, signer: PrivateKeySigner, settings: PipelineSettings) -> Self {
        let submitter = TxSubmitter::new(
            Arc::clone(&chain),
            signer,
            settings.chain_id,
            settings.confirmation_timeout,
        );
        Self {
            chain,
            submitter,
            settings,
        }
    }

    /// Unix timestamp after which the router rejects an add.
    pub fn deadline(&self) -> u64 {
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        now + self.settings.deadline_secs
    }
}
