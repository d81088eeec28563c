//! LP Burn Bot
//!
//! One batch per invocation: for every configured reward token with a
//! nonzero balance, approve the router, add liquidity against the pair
//! token and transfer the freshly minted LP to the burn address.
//!
//! Setup failures (config, keystore, RPC) abort with a nonzero exit.
//! Once the token loop starts, the batch always runs to the end and the
//! process exits 0; per-token failures are only logged.
//!
//! Created: 2026-10-18

use anyhow::{bail, Result};
use clap::Parser;
use lp_burn_bot::{
    load_config, load_signer, BurnPipeline, PipelineContext, PipelineSettings, RpcChainClient,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Reward token LP burner
#[derive(Parser)]
#[command(name = "lp-burn-bot")]
struct Args {
    /// Path to the .env file (defaults to ./.env when present)
    #[arg(long, env = "ENV_FILE")]
    env_file: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if args.log_json {
        fmt().json().with_env_filter(filter).init();
    } else {
        fmt().with_env_filter(filter).with_target(false).init();
    }

    info!("===========================================");
    info!("   LP Burn Bot v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");

    let config = load_config(args.env_file.as_deref())?;
    info!(
        "Configuration loaded (chain_id: {}, {} reward tokens, {} RPC endpoints)",
        config.chain_id,
        config.reward_tokens.len(),
        config.rpc_urls.len()
    );
    info!("Router: {}", config.router);
    info!("Pair token: {} via {}", config.pair_token, config.intermediate_token);
    info!("Burn address: {}", config.burn_address);

    let signer = load_signer(
        &config.keystore_path,
        &config.keystore_secret,
        config.wallet_address,
    )?;

    let chain = RpcChainClient::connect(&config.rpc_urls, config.receipt_poll_interval)?;
    match chain.fetch_chain_id().await {
        Ok(id) if id == config.chain_id => info!("Connected! chain_id {}", id),
        Ok(id) => bail!(
            "RPC reports chain_id {} but config expects {}",
            id,
            config.chain_id
        ),
        Err(e) => bail!("No RPC endpoint reachable: {}", e),
    }

    let ctx = PipelineContext::new(
        Arc::new(chain),
        signer,
        PipelineSettings::from_config(&config),
    );
    let pipeline = BurnPipeline::new(ctx);

    let tasks = pipeline.load_tasks(&config.reward_tokens).await;
    let summary = pipeline.run(&tasks).await;

    for outcome in &summary.outcomes {
        match (&outcome.error, outcome.success) {
            (Some(e), false) => warn!("  {:<16} {:<20} {}", outcome.symbol, outcome.stage, e),
            _ => info!("  {:<16} {}", outcome.symbol, outcome.terminal_state()),
        }
    }
    info!("===========================================");

    Ok(())
}
