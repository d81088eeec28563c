//! In-memory chain for the pipeline tests
//!
//! Decodes every signed transaction it receives and applies the ERC20 and
//! router calls the pipeline makes to a small balance/allowance ledger, so
//! tests can assert on both the broadcast sequence and the resulting state.

use super::ChainClient;
use crate::contracts::{IERC20, IUniswapV2Router02};
use crate::error::ChainError;
use crate::pipeline::{PipelineContext, PipelineSettings};
use crate::types::{EventLogEntry, FeeEstimate, TxReceipt, TxRequest};
use alloy::consensus::{Transaction, TxEnvelope};
use alloy::eips::eip2718::Decodable2718;
use alloy::primitives::{keccak256, Address, Bytes, TxHash, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::{SolCall, SolEvent};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Decoded view of a broadcast transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmittedTx {
    Approve {
        token: Address,
        spender: Address,
        amount: U256,
    },
    AddLiquidity {
        token_a: Address,
        token_b: Address,
        amount_a: U256,
        amount_b: U256,
        amount_a_min: U256,
        amount_b_min: U256,
        to: Address,
        deadline: U256,
    },
    Transfer {
        token: Address,
        to: Address,
        amount: U256,
    },
}

#[derive(Default)]
struct MockState {
    balances: HashMap<(Address, Address), U256>,
    allowances: HashMap<(Address, Address, Address), U256>,
    supplies: HashMap<Address, U256>,
    symbols: HashMap<Address, String>,
    nonce: u64,
    block: u64,
    receipts: HashMap<TxHash, TxReceipt>,
    submitted: Vec<SubmittedTx>,
    failing_quotes: HashSet<Address>,
    reverting_selectors: HashSet<[u8; 4]>,
    withhold_receipts: bool,
    fail_receipts: bool,
    suppress_mint_log: bool,
    drain_after_mint: Option<U256>,
    last_minted: Option<U256>,
}

pub struct MockChain {
    owner: Address,
    state: Mutex<MockState>,
}

impl MockChain {
    pub const REWARD_SYMBOL: &'static str = "ATROPA";

    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            state: Mutex::new(MockState::default()),
        }
    }

    /// Pair (and LP token) address for two tokens, independent of order.
    pub fn lp_address(a: Address, b: Address) -> Address {
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let mut seed = Vec::with_capacity(40);
        seed.extend_from_slice(lo.as_slice());
        seed.extend_from_slice(hi.as_slice());
        Address::from_word(keccak256(seed))
    }

    /// Register a token with the owner's balance and total supply.
    pub fn add_token(&self, token: Address, symbol: &str, balance: U256, supply: U256) {
        let mut s = self.state.lock().unwrap();
        s.symbols.insert(token, symbol.to_string());
        s.supplies.insert(token, supply);
        s.balances.insert((token, self.owner), balance);
    }

    pub fn set_balance(&self, token: Address, owner: Address, amount: U256) {
        self.state.lock().unwrap().balances.insert((token, owner), amount);
    }

    pub fn set_allowance(&self, token: Address, owner: Address, spender: Address, amount: U256) {
        self.state
            .lock()
            .unwrap()
            .allowances
            .insert((token, owner, spender), amount);
    }

    pub fn balance(&self, token: Address, owner: Address) -> U256 {
        self.state.lock().unwrap().balance(token, owner)
    }

    pub fn allowance_of(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.state
            .lock()
            .unwrap()
            .allowances
            .get(&(token, owner, spender))
            .copied()
            .unwrap_or_default()
    }

    pub fn total_supply_of(&self, token: Address) -> U256 {
        self.state.lock().unwrap().supplies.get(&token).copied().unwrap_or_default()
    }

    /// Confirmed nonce of the owner
    pub fn nonce(&self) -> u64 {
        self.state.lock().unwrap().nonce
    }

    pub fn submitted(&self) -> Vec<SubmittedTx> {
        self.state.lock().unwrap().submitted.clone()
    }

    pub fn last_minted(&self) -> Option<U256> {
        self.state.lock().unwrap().last_minted
    }

    /// Gas estimation for calls with this selector reports a revert.
    pub fn revert_selector(&self, selector: [u8; 4]) {
        self.state.lock().unwrap().reverting_selectors.insert(selector);
    }

    /// Quotes starting at `token` revert.
    pub fn fail_quote(&self, token: Address) {
        self.state.lock().unwrap().failing_quotes.insert(token);
    }

    /// Transactions are accepted but never confirmed.
    pub fn withhold_receipts(&self) {
        self.state.lock().unwrap().withhold_receipts = true;
    }

    /// Transactions are mined with status 0 and leave state untouched.
    pub fn fail_receipts(&self) {
        self.state.lock().unwrap().fail_receipts = true;
    }

    /// addLiquidity receipts omit the LP mint Transfer.
    pub fn suppress_mint_log(&self) {
        self.state.lock().unwrap().suppress_mint_log = true;
    }

    /// After each mint, move `amount` LP out of the recipient's balance.
    pub fn drain_lp_after_mint(&self, amount: U256) {
        self.state.lock().unwrap().drain_after_mint = Some(amount);
    }
}

fn transfer_log(token: Address, from: Address, to: Address, value: U256) -> EventLogEntry {
    EventLogEntry {
        address: token,
        topics: vec![
            IERC20::Transfer::SIGNATURE_HASH,
            from.into_word(),
            to.into_word(),
        ],
        data: Bytes::from(value.to_be_bytes::<32>().to_vec()),
    }
}

impl MockState {
    fn balance(&self, token: Address, owner: Address) -> U256 {
        self.balances.get(&(token, owner)).copied().unwrap_or_default()
    }

    fn move_balance(&mut self, token: Address, from: Address, to: Address, amount: U256) {
        let from_bal = self.balance(token, from);
        self.balances.insert((token, from), from_bal.saturating_sub(amount));
        let to_bal = self.balance(token, to);
        self.balances.insert((token, to), to_bal + amount);
    }

    /// Decode and apply one call from `from`. Returns the decoded call and
    /// the logs it emits.
    fn apply(
        &mut self,
        from: Address,
        target: Address,
        input: &[u8],
    ) -> Result<(SubmittedTx, Vec<EventLogEntry>), ChainError> {
        let decode = |e: alloy::sol_types::Error| ChainError::Decode(e.to_string());
        let selector: [u8; 4] = input
            .get(..4)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| ChainError::Decode("short calldata".into()))?;

        if selector == IERC20::approveCall::SELECTOR {
            let call = IERC20::approveCall::abi_decode(input).map_err(decode)?;
            self.allowances.insert((target, from, call.spender), call.amount);
            let tx = SubmittedTx::Approve {
                token: target,
                spender: call.spender,
                amount: call.amount,
            };
            Ok((tx, vec![]))
        } else if selector == IERC20::transferCall::SELECTOR {
            let call = IERC20::transferCall::abi_decode(input).map_err(decode)?;
            self.move_balance(target, from, call.to, call.amount);
            let log = transfer_log(target, from, call.to, call.amount);
            let tx = SubmittedTx::Transfer {
                token: target,
                to: call.to,
                amount: call.amount,
            };
            Ok((tx, vec![log]))
        } else if selector == IUniswapV2Router02::addLiquidityCall::SELECTOR {
            let call =
                IUniswapV2Router02::addLiquidityCall::abi_decode(input).map_err(decode)?;
            let pair = MockChain::lp_address(call.tokenA, call.tokenB);
            let used_a = call.amountADesired.min(self.balance(call.tokenA, from));
            let used_b = call.amountBDesired.min(self.balance(call.tokenB, from));
            self.move_balance(call.tokenA, from, pair, used_a);
            self.move_balance(call.tokenB, from, pair, used_b);

            let minted = (used_a + used_b) / U256::from(2u64);
            let credited = self.balance(pair, call.to);
            self.balances.insert((pair, call.to), credited + minted);
            if let Some(drain) = self.drain_after_mint {
                self.move_balance(pair, call.to, Address::repeat_byte(0xdd), drain);
            }
            self.last_minted = Some(minted);

            let mut logs = vec![
                transfer_log(call.tokenA, from, pair, used_a),
                transfer_log(call.tokenB, from, pair, used_b),
            ];
            if !self.suppress_mint_log {
                logs.push(transfer_log(pair, Address::ZERO, call.to, minted));
            }
            logs.push(EventLogEntry {
                address: pair,
                topics: vec![keccak256(b"Sync(uint112,uint112)")],
                data: Bytes::from(vec![0u8; 64]),
            });

            let tx = SubmittedTx::AddLiquidity {
                token_a: call.tokenA,
                token_b: call.tokenB,
                amount_a: call.amountADesired,
                amount_b: call.amountBDesired,
                amount_a_min: call.amountAMin,
                amount_b_min: call.amountBMin,
                to: call.to,
                deadline: call.deadline,
            };
            Ok((tx, logs))
        } else {
            Err(ChainError::Decode(format!("unknown selector {:02x?}", selector)))
        }
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256, ChainError> {
        Ok(self.balance(token, owner))
    }

    async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, ChainError> {
        Ok(self.allowance_of(token, owner, spender))
    }

    async fn total_supply(&self, token: Address) -> Result<U256, ChainError> {
        Ok(self.total_supply_of(token))
    }

    async fn symbol(&self, token: Address) -> Result<String, ChainError> {
        self.state
            .lock()
            .unwrap()
            .symbols
            .get(&token)
            .cloned()
            .ok_or_else(|| ChainError::Decode(format!("no symbol() on {}", token)))
    }

    async fn amounts_out(
        &self,
        _router: Address,
        amount_in: U256,
        path: &[Address],
    ) -> Result<Vec<U256>, ChainError> {
        let s = self.state.lock().unwrap();
        if path.first().map_or(true, |t| s.failing_quotes.contains(t)) {
            return Err(ChainError::Node("execution reverted: INSUFFICIENT_LIQUIDITY".into()));
        }
        Ok((0..path.len())
            .map(|i| amount_in * U256::from(i as u64 + 1))
            .collect())
    }

    async fn next_nonce(&self, _owner: Address) -> Result<u64, ChainError> {
        Ok(self.nonce())
    }

    async fn estimate_gas(&self, tx: &TxRequest) -> Result<u64, ChainError> {
        let s = self.state.lock().unwrap();
        let selector: Option<[u8; 4]> = tx.input.get(..4).and_then(|b| b.try_into().ok());
        if selector.is_some_and(|sel| s.reverting_selectors.contains(&sel)) {
            return Err(ChainError::Estimation("execution reverted".into()));
        }
        if selector == Some(IERC20::transferCall::SELECTOR) {
            if let Ok(call) = IERC20::transferCall::abi_decode(&tx.input) {
                if s.balance(tx.to, tx.from) < call.amount {
                    return Err(ChainError::Estimation(
                        "execution reverted: transfer amount exceeds balance".into(),
                    ));
                }
            }
        }
        Ok(120_000)
    }

    async fn fee_estimate(&self) -> Result<FeeEstimate, ChainError> {
        Ok(FeeEstimate {
            max_fee_per_gas: 2_000_000_000_000,
            max_priority_fee_per_gas: 1_000_000_000,
        })
    }

    async fn submit_raw(&self, raw: &[u8]) -> Result<TxHash, ChainError> {
        let envelope = TxEnvelope::decode_2718(&mut &raw[..])
            .map_err(|e| ChainError::Decode(e.to_string()))?;
        let hash: TxHash = *envelope.tx_hash();
        let target = envelope
            .to()
            .ok_or_else(|| ChainError::Node("contract creation not supported".into()))?;

        let mut s = self.state.lock().unwrap();
        if envelope.nonce() != s.nonce {
            return Err(ChainError::Node(format!(
                "nonce mismatch: got {}, expected {}",
                envelope.nonce(),
                s.nonce
            )));
        }
        s.nonce += 1;

        let (tx, logs) = if s.fail_receipts {
            // Record the call without touching balances
            let mut scratch = MockState {
                balances: s.balances.clone(),
                ..Default::default()
            };
            let (tx, _) = scratch.apply(self.owner, target, envelope.input())?;
            (tx, vec![])
        } else {
            s.apply(self.owner, target, envelope.input())?
        };
        s.submitted.push(tx);

        if !s.withhold_receipts {
            s.block += 1;
            let receipt = TxReceipt {
                tx_hash: hash,
                status: !s.fail_receipts,
                block_number: Some(s.block),
                gas_used: 100_000,
                logs,
            };
            s.receipts.insert(hash, receipt);
        }
        Ok(hash)
    }

    async fn wait_for_receipt(
        &self,
        hash: TxHash,
        timeout: Duration,
    ) -> Result<TxReceipt, ChainError> {
        self.state
            .lock()
            .unwrap()
            .receipts
            .get(&hash)
            .cloned()
            .ok_or(ChainError::ConfirmationTimeout {
                hash,
                timeout_secs: timeout.as_secs(),
            })
    }
}

/// Wallet, tokens and pipeline context wired to one `MockChain`.
/// The owner starts with no balances and no allowances.
pub struct TestBed {
    pub chain: Arc<MockChain>,
    pub ctx: PipelineContext<MockChain>,
    pub owner: Address,
    pub router: Address,
    pub reward: Address,
    pub pair_token: Address,
    pub intermediate: Address,
    pub lp: Address,
    pub burn: Address,
}

impl TestBed {
    pub fn new() -> Self {
        let signer = PrivateKeySigner::random();
        let owner = signer.address();
        let chain = Arc::new(MockChain::new(owner));

        let reward = Address::repeat_byte(0xa1);
        let pair_token = Address::repeat_byte(0xf0);
        let intermediate = Address::repeat_byte(0xe0);
        let router = Address::repeat_byte(0x16);
        let burn = Address::repeat_byte(0xde);
        let supply = U256::from(10u64).pow(U256::from(24u64));

        chain.add_token(reward, MockChain::REWARD_SYMBOL, U256::ZERO, supply);
        chain.add_token(pair_token, "FRENS", U256::ZERO, supply);
        chain.add_token(intermediate, "WPLS", U256::ZERO, supply);

        let settings = PipelineSettings {
            wallet: owner,
            burn_address: burn,
            chain_id: 369,
            router,
            pair_token,
            intermediate_token: intermediate,
            confirmation_timeout: Duration::from_secs(120),
            deadline_secs: 300,
        };
        let ctx = PipelineContext::new(Arc::clone(&chain), signer, settings);

        Self {
            chain,
            ctx,
            owner,
            router,
            reward,
            pair_token,
            intermediate,
            lp: MockChain::lp_address(reward, pair_token),
            burn,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::consensus::{SignableTransaction, TxEip1559};
    use alloy::eips::eip2718::Encodable2718;
    use alloy::network::TxSignerSync;
    use alloy::primitives::TxKind;

    #[test]
    fn test_lp_address_is_order_independent() {
        let a = Address::repeat_byte(1);
        let b = Address::repeat_byte(2);
        assert_eq!(MockChain::lp_address(a, b), MockChain::lp_address(b, a));
        assert_ne!(MockChain::lp_address(a, b), Address::ZERO);
    }

    #[tokio::test]
    async fn test_submitted_nonce_must_match() {
        let signer = PrivateKeySigner::random();
        let chain = MockChain::new(signer.address());
        let token = Address::repeat_byte(0xaa);
        chain.add_token(token, "TKN", U256::ZERO, U256::from(1u64));

        let mut tx = TxEip1559 {
            chain_id: 369,
            nonce: 5,
            gas_limit: 60_000,
            to: TxKind::Call(token),
            input: IERC20::approveCall {
                spender: Address::repeat_byte(0xbb),
                amount: U256::from(1u64),
            }
            .abi_encode()
            .into(),
            ..Default::default()
        };
        let sig = signer.sign_transaction_sync(&mut tx).unwrap();
        let raw = TxEnvelope::from(tx.into_signed(sig)).encoded_2718();

        let result = chain.submit_raw(&raw).await;

        assert!(matches!(result, Err(ChainError::Node(_))));
        assert!(chain.submitted().is_empty());
    }
}
