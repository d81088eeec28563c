//! LP Burn Bot Library
//!
//! Turns reward-token balances into pair liquidity and sends exactly the
//! LP tokens minted by each add to a burn address.
//!
//! Created: 2026-10-18

pub mod chain;
pub mod config;
pub mod contracts;
pub mod error;
pub mod pipeline;
pub mod types;

// Re-export commonly used types
pub use chain::{load_signer, ChainClient, RpcChainClient};
pub use config::load_config;
pub use error::{ChainError, StageError};
pub use pipeline::{BurnPipeline, PipelineContext, PipelineSettings};
pub use types::{BurnConfig, PipelineOutcome, RunSummary, Stage, TokenTask};
