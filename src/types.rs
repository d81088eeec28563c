// Core data structures for the LP burn pipeline

use alloy::primitives::{Address, Bytes, TxHash, B256, U256};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// One reward token to process in a batch run.
/// Symbol is read once at batch start and reused for every log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenTask {
    pub address: Address,
    pub symbol: String,
}

impl TokenTask {
    pub fn new(address: Address, symbol: String) -> Self {
        Self { address, symbol }
    }
}

/// Snapshot used to decide whether a spender needs a fresh approval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowanceCheck {
    pub owner: Address,
    pub spender: Address,
    pub token: Address,
    pub balance: U256,
    pub allowance: U256,
}

impl AllowanceCheck {
    pub fn needs_approval(&self) -> bool {
        self.balance > self.allowance
    }
}

/// Unsigned call as handed to gas estimation. Built fresh for every write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    pub to: Address,
    pub input: Bytes,
    pub nonce: u64,
    pub from: Address,
    pub chain_id: u64,
}

/// EIP-1559 fee pair from the node's fee estimator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeEstimate {
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
}

/// Raw event log as emitted by a contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventLogEntry {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
}

/// Confirmed transaction record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub status: bool,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    pub logs: Vec<EventLogEntry>,
}

/// LP tokens minted by one add-liquidity transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintResult {
    pub lp_token: Address,
    pub amount: U256,
}

/// Per-token pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Start,
    BalanceChecked,
    Skipped,
    Approved,
    LiquidityProvided,
    MintExtracted,
    Burned,
    Ended,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Stage::Start => "start",
            Stage::BalanceChecked => "balance-checked",
            Stage::Skipped => "skipped",
            Stage::Approved => "approved",
            Stage::LiquidityProvided => "liquidity-provided",
            Stage::MintExtracted => "mint-extracted",
            Stage::Burned => "burned",
            Stage::Ended => "ended",
        };
        f.pad(name)
    }
}

/// Result of one token's pipeline run. Logged, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome {
    pub symbol: String,
    pub token: Address,
    /// Last stage completed before the run for this token stopped
    pub stage: Stage,
    pub success: bool,
    pub error: Option<String>,
    pub burn_tx: Option<TxHash>,
    pub burned: Option<U256>,
}

impl PipelineOutcome {
    pub fn skipped(task: &TokenTask) -> Self {
        Self {
            symbol: task.symbol.clone(),
            token: task.address,
            stage: Stage::Skipped,
            success: true,
            error: None,
            burn_tx: None,
            burned: None,
        }
    }

    pub fn failed(task: &TokenTask, stage: Stage, error: String) -> Self {
        Self {
            symbol: task.symbol.clone(),
            token: task.address,
            stage,
            success: false,
            error: Some(error),
            burn_tx: None,
            burned: None,
        }
    }

    /// Terminal state of the per-token state machine. Anything that stopped
    /// short of a burn, other than a zero-balance skip, is `Ended`.
    pub fn terminal_state(&self) -> Stage {
        match self.stage {
            Stage::Skipped | Stage::Burned => self.stage,
            _ => Stage::Ended,
        }
    }
}

/// Counters over a whole batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub skipped: usize,
    pub burned: usize,
    /// Ended at the LP balance re-check without submitting a burn
    pub short_circuited: usize,
    pub failed: usize,
    pub outcomes: Vec<PipelineOutcome>,
}

impl RunSummary {
    pub fn record(&mut self, outcome: PipelineOutcome) {
        match (outcome.success, outcome.terminal_state()) {
            (true, Stage::Skipped) => self.skipped += 1,
            (true, Stage::Burned) => self.burned += 1,
            (true, _) => self.short_circuited += 1,
            (false, _) => self.failed += 1,
        }
        self.outcomes.push(outcome);
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }
}

/// Reward token entry from the token list file
#[derive(Debug, Clone, Deserialize)]
pub struct RewardTokenConfig {
    pub address: Address,
    /// Used in logs when the on-chain symbol() read fails
    pub label: Option<String>,
}

/// Bot configuration
#[derive(Debug, Clone)]
pub struct BurnConfig {
    // Network
    pub chain_id: u64,
    pub rpc_urls: Vec<String>,

    // Wallet
    pub wallet_address: Address,
    pub burn_address: Address,
    pub keystore_secret: String,
    pub keystore_path: std::path::PathBuf,

    // Contracts
    pub router: Address,
    pub pair_token: Address,
    pub intermediate_token: Address,
    pub reward_tokens: Vec<RewardTokenConfig>,

    // Timing
    pub confirmation_timeout: Duration,
    pub receipt_poll_interval: Duration,
    pub deadline_secs: u64,
}
