//! Configuration management
//!
//! Secrets and addresses come from a .env file; the token list and router
//! addresses from a TOML file; RPC endpoints from a JSON array of URLs.
//! Every failure here is setup-fatal.

use crate::types::{BurnConfig, RewardTokenConfig};
use alloy::primitives::Address;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_CHAIN_ID: u64 = 369;
pub const DEFAULT_CONFIG_FILE: &str = "config/tokens.toml";
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Passphrase shipped in the sample .env; refused at startup
const PLACEHOLDER_SECRET: &str = "changeme";

/// Token list file
#[derive(Debug, Clone, Deserialize)]
pub struct TokenListFile {
    pub router: Address,
    pub pair_token: Address,
    pub intermediate_token: Address,
    #[serde(rename = "reward_token", default)]
    pub reward_tokens: Vec<RewardTokenConfig>,
    #[serde(default = "default_confirmation_timeout")]
    pub confirmation_timeout_secs: u64,
    #[serde(default = "default_deadline")]
    pub deadline_secs: u64,
    #[serde(default = "default_poll_interval")]
    pub receipt_poll_interval_ms: u64,
}

fn default_confirmation_timeout() -> u64 {
    120
}

fn default_deadline() -> u64 {
    300
}

fn default_poll_interval() -> u64 {
    2000
}

impl TokenListFile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read token list: {}", path.as_ref().display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse token list TOML")
    }
}

/// Load the RPC endpoint list (JSON array of URLs, tried in order)
pub fn load_rpc_servers<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path.as_ref()).with_context(|| {
        format!(
            "Failed to read RPC server list: {}",
            path.as_ref().display()
        )
    })?;
    let urls: Vec<String> =
        serde_json::from_str(&content).context("RPC server list must be a JSON array of URLs")?;
    Ok(urls)
}

/// Load configuration from the process environment (after reading `env_file`)
pub fn load_config(env_file: Option<&Path>) -> Result<BurnConfig> {
    match env_file {
        Some(path) => {
            dotenv::from_path(path)
                .with_context(|| format!("Failed to load env file: {}", path.display()))?;
        }
        None => {
            dotenv::dotenv().ok();
        }
    }

    let lookup = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());

    let data_dir =
        PathBuf::from(lookup("DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()));
    let config_file = lookup("CONFIG_FILE").unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());
    let rpc_file = lookup("RPC_SERVERS_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|| data_dir.join("rpc_servers.json"));

    let tokens = TokenListFile::load(&config_file)?;
    let rpc_urls = load_rpc_servers(&rpc_file)?;

    build_config(lookup, &data_dir, tokens, rpc_urls)
}

/// Assemble and validate a config from already-loaded pieces
pub fn build_config<F>(
    lookup: F,
    data_dir: &Path,
    tokens: TokenListFile,
    rpc_urls: Vec<String>,
) -> Result<BurnConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let secret = lookup("SECRET").context("SECRET not set")?;
    if secret == PLACEHOLDER_SECRET {
        bail!("SECRET is still the placeholder value; set your own passphrase in .env");
    }

    let wallet_raw = lookup("WALLET_ADDRESS").context("WALLET_ADDRESS not set")?;
    let wallet_address = Address::from_str(wallet_raw.trim())
        .with_context(|| format!("Invalid WALLET_ADDRESS: {}", wallet_raw))?;

    let burn_raw = lookup("BURN_ADDRESS").context("BURN_ADDRESS not set")?;
    let burn_address = Address::from_str(burn_raw.trim())
        .with_context(|| format!("Invalid BURN_ADDRESS: {}", burn_raw))?;

    let chain_id = match lookup("CHAIN_ID") {
        Some(v) => v.trim().parse().with_context(|| format!("Invalid CHAIN_ID: {}", v))?,
        None => DEFAULT_CHAIN_ID,
    };

    let keystore_path = data_dir
        .join("wallets")
        .join(wallet_raw.trim())
        .join("keystore");

    let config = BurnConfig {
        chain_id,
        rpc_urls,
        wallet_address,
        burn_address,
        keystore_secret: secret,
        keystore_path,
        router: tokens.router,
        pair_token: tokens.pair_token,
        intermediate_token: tokens.intermediate_token,
        reward_tokens: tokens.reward_tokens,
        confirmation_timeout: Duration::from_secs(tokens.confirmation_timeout_secs),
        receipt_poll_interval: Duration::from_millis(tokens.receipt_poll_interval_ms),
        deadline_secs: tokens.deadline_secs,
    };

    validate(&config)?;
    Ok(config)
}

fn validate(config: &BurnConfig) -> Result<()> {
    if config.rpc_urls.is_empty() {
        bail!("RPC server list is empty");
    }
    if config.reward_tokens.is_empty() {
        bail!("No reward tokens configured");
    }
    if config.burn_address == config.wallet_address {
        bail!("BURN_ADDRESS must differ from WALLET_ADDRESS");
    }
    if config.confirmation_timeout.is_zero() {
        bail!("confirmation_timeout_secs must be greater than zero");
    }

    let mut seen = HashSet::new();
    for token in &config.reward_tokens {
        if !seen.insert(token.address) {
            bail!("Reward token listed twice: {}", token.address);
        }
    }
    Ok(())
}
