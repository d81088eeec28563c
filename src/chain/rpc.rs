//! JSON-RPC chain client with ordered endpoint fallback
//!
//! Each call goes to the first endpoint; transport failures (connection
//! refused, timeouts, dropped sockets) move on to the next endpoint in the
//! list. Errors answered by a node, such as an execution revert, are
//! returned as-is since another node would give the same answer.

use super::ChainClient;
use crate::contracts::{IUniswapV2Router02, IERC20};
use crate::error::ChainError;
use crate::types::{EventLogEntry, FeeEstimate, TxReceipt, TxRequest};
use alloy::network::Ethereum;
use alloy::primitives::{keccak256, Address, TxHash, U256};
use alloy::providers::{Provider, RootProvider};
use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
use alloy::transports::http::reqwest::Url;
use alloy::transports::{RpcError, TransportErrorKind};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

pub type HttpProvider = RootProvider<Ethereum>;

#[derive(Debug)]
struct Endpoint {
    url: String,
    provider: HttpProvider,
}

#[derive(Debug)]
pub struct RpcChainClient {
    endpoints: Vec<Endpoint>,
    poll_interval: Duration,
}

impl RpcChainClient {
    /// Build HTTP providers for every URL, preserving order
    pub fn connect(urls: &[String], poll_interval: Duration) -> Result<Self> {
        if urls.is_empty() {
            bail!("At least one RPC endpoint is required");
        }

        let mut endpoints = Vec::with_capacity(urls.len());
        for url in urls {
            let parsed: Url = url
                .parse()
                .with_context(|| format!("Invalid RPC URL: {}", url))?;
            endpoints.push(Endpoint {
                url: url.clone(),
                provider: RootProvider::new_http(parsed),
            });
        }

        info!(
            "RPC client ready: {} endpoint(s), primary {}",
            endpoints.len(),
            short_url(&endpoints[0].url)
        );
        Ok(Self {
            endpoints,
            poll_interval,
        })
    }

    /// Verify at least one endpoint answers; returns the chain id it reports
    pub async fn fetch_chain_id(&self) -> Result<u64, ChainError> {
        self.with_fallback("eth_chainId", |provider, url| async move {
            provider.get_chain_id().await.map_err(|e| classify_rpc(&url, e))
        })
        .await
    }

    async fn with_fallback<T, F, Fut>(&self, what: &str, op: F) -> Result<T, ChainError>
    where
        F: Fn(HttpProvider, String) -> Fut,
        Fut: Future<Output = Result<T, ChainError>>,
    {
        first_answer(what, &self.endpoints, |endpoint| {
            op(endpoint.provider.clone(), endpoint.url.clone())
        })
        .await
    }

    async fn receipt_once(&self, hash: TxHash) -> Result<Option<TransactionReceipt>, ChainError> {
        self.with_fallback("eth_getTransactionReceipt", |provider, url| async move {
            provider
                .get_transaction_receipt(hash)
                .await
                .map_err(|e| classify_rpc(&url, e))
        })
        .await
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, ChainError> {
        self.with_fallback("balanceOf", |provider, url| async move {
            IERC20::new(token, provider)
                .balanceOf(owner)
                .call()
                .await
                .map_err(|e| classify_contract(&url, e))
        })
        .await
    }

    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, ChainError> {
        self.with_fallback("allowance", |provider, url| async move {
            IERC20::new(token, provider)
                .allowance(owner, spender)
                .call()
                .await
                .map_err(|e| classify_contract(&url, e))
        })
        .await
    }

    async fn total_supply(&self, token: Address) -> Result<U256, ChainError> {
        self.with_fallback("totalSupply", |provider, url| async move {
            IERC20::new(token, provider)
                .totalSupply()
                .call()
                .await
                .map_err(|e| classify_contract(&url, e))
        })
        .await
    }

    async fn symbol(&self, token: Address) -> Result<String, ChainError> {
        self.with_fallback("symbol", |provider, url| async move {
            IERC20::new(token, provider)
                .symbol()
                .call()
                .await
                .map_err(|e| classify_contract(&url, e))
        })
        .await
    }

    async fn amounts_out(
        &self,
        router: Address,
        amount_in: U256,
        path: &[Address],
    ) -> Result<Vec<U256>, ChainError> {
        let path = path.to_vec();
        self.with_fallback("getAmountsOut", |provider, url| {
            let path = path.clone();
            async move {
                IUniswapV2Router02::new(router, provider)
                    .getAmountsOut(amount_in, path)
                    .call()
                    .await
                    .map_err(|e| classify_contract(&url, e))
            }
        })
        .await
    }

    async fn next_nonce(&self, owner: Address) -> Result<u64, ChainError> {
        self.with_fallback("eth_getTransactionCount", |provider, url| async move {
            provider
                .get_transaction_count(owner)
                .await
                .map_err(|e| classify_rpc(&url, e))
        })
        .await
    }

    async fn estimate_gas(&self, tx: &TxRequest) -> Result<u64, ChainError> {
        let request = TransactionRequest {
            chain_id: Some(tx.chain_id),
            ..Default::default()
        }
        .from(tx.from)
        .to(tx.to)
        .nonce(tx.nonce)
        .input(tx.input.clone().into());

        self.with_fallback("eth_estimateGas", |provider, url| {
            let request = request.clone();
            async move {
                provider.estimate_gas(request).await.map_err(|e| match e {
                    RpcError::ErrorResp(payload) => ChainError::Estimation(payload.to_string()),
                    other => classify_rpc(&url, other),
                })
            }
        })
        .await
    }

    async fn fee_estimate(&self) -> Result<FeeEstimate, ChainError> {
        self.with_fallback("eth_feeHistory", |provider, url| async move {
            let fees = provider
                .estimate_eip1559_fees()
                .await
                .map_err(|e| classify_rpc(&url, e))?;
            Ok(FeeEstimate {
                max_fee_per_gas: fees.max_fee_per_gas,
                max_priority_fee_per_gas: fees.max_priority_fee_per_gas,
            })
        })
        .await
    }

    async fn submit_raw(&self, raw: &[u8]) -> Result<TxHash, ChainError> {
        let local_hash = keccak256(raw);
        let raw = raw.to_vec();
        self.with_fallback("eth_sendRawTransaction", |provider, url| {
            let raw = raw.clone();
            async move {
                let sent = match provider.send_raw_transaction(&raw).await {
                    Ok(pending) => Ok(*pending.tx_hash()),
                    Err(e) => Err(classify_rpc(&url, e)),
                };
                accept_known(sent, local_hash)
            }
        })
        .await
    }

    async fn wait_for_receipt(
        &self,
        hash: TxHash,
        timeout: Duration,
    ) -> Result<TxReceipt, ChainError> {
        let poll = async {
            loop {
                match self.receipt_once(hash).await {
                    Ok(Some(receipt)) => return convert_receipt(&receipt),
                    Ok(None) => debug!("Receipt for {} not available yet", hash),
                    Err(e) => warn!("Receipt poll for {} failed: {}", hash, e),
                }
                sleep(self.poll_interval).await;
            }
        };

        match tokio::time::timeout(timeout, poll).await {
            Ok(receipt) => Ok(receipt),
            Err(_) => Err(ChainError::ConfirmationTimeout {
                hash,
                timeout_secs: timeout.as_secs(),
            }),
        }
    }
}

/// Try `op` against each endpoint in order. Only transport failures move
/// on to the next endpoint; any other error is final.
async fn first_answer<E, T, F, Fut>(
    what: &str,
    endpoints: &[E],
    op: F,
) -> Result<T, ChainError>
where
    F: Fn(&E) -> Fut,
    Fut: Future<Output = Result<T, ChainError>>,
{
    for endpoint in endpoints {
        match op(endpoint).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transport() => {
                warn!("{} failed: {}; trying next endpoint", what, e);
            }
            Err(e) => return Err(e),
        }
    }
    Err(ChainError::Exhausted(what.to_string()))
}

/// A node that already holds the transaction (a previous endpoint relayed
/// it before failing) rejects the resend. The transaction is in the pool.
fn accept_known(
    sent: Result<TxHash, ChainError>,
    local_hash: TxHash,
) -> Result<TxHash, ChainError> {
    match sent {
        Err(ChainError::Node(msg)) if is_already_known(&msg) => {
            debug!("Transaction {} already known to node", local_hash);
            Ok(local_hash)
        }
        other => other,
    }
}

fn is_already_known(msg: &str) -> bool {
    let msg = msg.to_ascii_lowercase();
    msg.contains("already known") || msg.contains("known transaction")
}

fn convert_receipt(receipt: &TransactionReceipt) -> TxReceipt {
    let logs = receipt
        .inner
        .logs()
        .iter()
        .map(|log| EventLogEntry {
            address: log.address(),
            topics: log.topics().to_vec(),
            data: log.inner.data.data.clone(),
        })
        .collect();

    TxReceipt {
        tx_hash: receipt.transaction_hash,
        status: receipt.status(),
        block_number: receipt.block_number,
        gas_used: receipt.gas_used as u64,
        logs,
    }
}

/// Node-answered errors are final; anything else is the transport's fault
fn classify_rpc(url: &str, err: RpcError<TransportErrorKind>) -> ChainError {
    match err {
        RpcError::ErrorResp(payload) => ChainError::Node(payload.to_string()),
        RpcError::DeserError { err, .. } => ChainError::Decode(err.to_string()),
        other => ChainError::Transport {
            endpoint: short_url(url),
            message: other.to_string(),
        },
    }
}

fn classify_contract(url: &str, err: alloy::contract::Error) -> ChainError {
    match err {
        alloy::contract::Error::TransportError(e) => classify_rpc(url, e),
        other => ChainError::Decode(other.to_string()),
    }
}

/// Endpoint URLs often embed API keys; only log the host part
fn short_url(url: &str) -> String {
    match url.parse::<Url>() {
        Ok(parsed) => format!("{}://{}", parsed.scheme(), parsed.host_str().unwrap_or("?")),
        Err(_) => url.chars().take(30).collect(),
    }
}
