#![allow(dead_code)]

use alloy::rpc::types::Log;
use alloy::sol_types::{SolCall, SolEvent, SolValue};
use alloy_primitives::{Address, B256, Bytes, LogData, U256};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use wallet_tracker::chain::{ChainBlock, ChainReader, ChainReceipt, ChainTransaction};
use wallet_tracker::error::{ChainError, NotifyError};
use wallet_tracker::events::{erc20, erc721};
use wallet_tracker::notifier::{Notification, Notifier};
use wallet_tracker::repository::Database;
use wallet_tracker::store::SqliteStore;
use wallet_tracker::{Dispatcher, DispatcherSettings, TrackerContext};

pub const WEI_PER_UNIT: u64 = 1_000_000_000_000_000_000;

#[derive(Default)]
struct State {
    head: u64,
    blocks: HashMap<u64, Vec<ChainTransaction>>,
    receipts: HashMap<B256, ChainReceipt>,
    failing_receipts: HashSet<B256>,
    failing_blocks: HashSet<u64>,
    stalled_blocks: bool,
    logs: Vec<Log>,
    calls: HashMap<(Address, [u8; 4]), Bytes>,
    unreachable_contracts: HashSet<Address>,
    static_calls: usize,
    balances: HashMap<Address, U256>,
}

/// In-memory chain: every block up to `head` exists, empty unless populated.
#[derive(Default)]
pub struct FakeChain {
    state: Mutex<State>,
}

impl FakeChain {
    pub fn new(head: u64) -> Self {
        let chain = Self::default();
        chain.set_head(head);
        chain
    }

    pub fn set_head(&self, head: u64) {
        self.state.lock().unwrap().head = head;
    }

    pub fn add_tx(&self, block: u64, tx: ChainTransaction, receipt: ChainReceipt) {
        let mut state = self.state.lock().unwrap();
        state.receipts.insert(tx.hash, receipt);
        state.blocks.entry(block).or_default().push(tx);
    }

    pub fn add_log(&self, log: Log) {
        self.state.lock().unwrap().logs.push(log);
    }

    pub fn fail_receipt(&self, hash: B256) {
        self.state.lock().unwrap().failing_receipts.insert(hash);
    }

    pub fn heal_receipt(&self, hash: B256) {
        self.state.lock().unwrap().failing_receipts.remove(&hash);
    }

    pub fn fail_block(&self, number: u64, failing: bool) {
        let mut state = self.state.lock().unwrap();
        if failing {
            state.failing_blocks.insert(number);
        } else {
            state.failing_blocks.remove(&number);
        }
    }

    /// While set, block fetches never complete.
    pub fn stall_blocks(&self, stalled: bool) {
        self.state.lock().unwrap().stalled_blocks = stalled;
    }

    pub fn answer_call(&self, contract: Address, selector: [u8; 4], output: Vec<u8>) {
        self.state
            .lock()
            .unwrap()
            .calls
            .insert((contract, selector), output.into());
    }

    /// Answers the fungible metadata calls for `token`.
    pub fn erc20_metadata(&self, token: Address, name: &str, symbol: &str, decimals: u8) {
        let name = (name.to_string(),).abi_encode_params();
        let symbol = (symbol.to_string(),).abi_encode_params();
        self.answer_call(token, erc20::nameCall::SELECTOR, name);
        self.answer_call(token, erc20::symbolCall::SELECTOR, symbol);
        let decimals = (U256::from(decimals),).abi_encode_params();
        self.answer_call(token, erc20::decimalsCall::SELECTOR, decimals);
    }

    /// Answers `name` and `symbol` only, like most NFT contracts.
    pub fn nft_metadata(&self, token: Address, name: &str, symbol: &str) {
        let name = (name.to_string(),).abi_encode_params();
        let symbol = (symbol.to_string(),).abi_encode_params();
        self.answer_call(token, erc20::nameCall::SELECTOR, name);
        self.answer_call(token, erc20::symbolCall::SELECTOR, symbol);
    }

    pub fn set_unreachable(&self, contract: Address, unreachable: bool) {
        let mut state = self.state.lock().unwrap();
        if unreachable {
            state.unreachable_contracts.insert(contract);
        } else {
            state.unreachable_contracts.remove(&contract);
        }
    }

    pub fn static_calls(&self) -> usize {
        self.state.lock().unwrap().static_calls
    }

    pub fn set_balance(&self, address: Address, wei: U256) {
        self.state.lock().unwrap().balances.insert(address, wei);
    }
}

#[async_trait]
impl ChainReader for FakeChain {
    async fn head_height(&self) -> Result<u64, ChainError> {
        Ok(self.state.lock().unwrap().head)
    }

    async fn block_with_transactions(&self, number: u64) -> Result<ChainBlock, ChainError> {
        let stalled = self.state.lock().unwrap().stalled_blocks;
        if stalled {
            std::future::pending::<()>().await;
        }
        let state = self.state.lock().unwrap();
        if state.failing_blocks.contains(&number) {
            return Err(ChainError::transient("eth_getBlockByNumber", "connection reset"));
        }
        if number > state.head {
            return Err(ChainError::MissingBlock(number));
        }
        Ok(ChainBlock {
            number,
            transactions: state.blocks.get(&number).cloned().unwrap_or_default(),
        })
    }

    async fn logs_in_range(
        &self,
        from_block: u64,
        to_block: u64,
        topic0: B256,
    ) -> Result<Vec<Log>, ChainError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .logs
            .iter()
            .filter(|log| {
                let block = log.block_number.unwrap_or_default();
                block >= from_block && block <= to_block && log.topics().first() == Some(&topic0)
            })
            .cloned()
            .collect())
    }

    async fn receipt(&self, tx_hash: B256) -> Result<ChainReceipt, ChainError> {
        let state = self.state.lock().unwrap();
        if state.failing_receipts.contains(&tx_hash) {
            return Err(ChainError::transient(
                "eth_getTransactionReceipt",
                "connection reset",
            ));
        }
        state
            .receipts
            .get(&tx_hash)
            .copied()
            .ok_or(ChainError::MissingReceipt(tx_hash))
    }

    async fn static_call(&self, address: Address, calldata: Bytes) -> Result<Bytes, ChainError> {
        let mut state = self.state.lock().unwrap();
        state.static_calls += 1;
        if state.unreachable_contracts.contains(&address) {
            return Err(ChainError::transient("eth_call", "request timed out"));
        }
        let selector: [u8; 4] = calldata[..4].try_into().unwrap();
        state
            .calls
            .get(&(address, selector))
            .cloned()
            .ok_or(ChainError::CallReverted { address })
    }

    async fn native_balance(&self, address: Address) -> Result<U256, ChainError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .balances
            .get(&address)
            .copied()
            .unwrap_or_default())
    }
}

/// Remembers every delivery; can be switched to fail.
#[derive(Default)]
pub struct RecordingNotifier {
    delivered: Mutex<Vec<(i64, Notification)>>,
    failing: Mutex<bool>,
}

impl RecordingNotifier {
    pub fn delivered(&self) -> Vec<(i64, Notification)> {
        self.delivered.lock().unwrap().clone()
    }

    pub fn activity_count(&self) -> usize {
        self.delivered()
            .iter()
            .filter(|(_, n)| matches!(n, Notification::Activity { .. }))
            .count()
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(
        &self,
        owner_id: i64,
        notification: &Notification,
    ) -> Result<(), NotifyError> {
        if *self.failing.lock().unwrap() {
            return Err(NotifyError::DeliveryFailed("bot unavailable".into()));
        }
        self.delivered
            .lock()
            .unwrap()
            .push((owner_id, notification.clone()));
        Ok(())
    }
}

pub struct Harness {
    pub chain: Arc<FakeChain>,
    pub notifier: Arc<RecordingNotifier>,
    pub store: Arc<SqliteStore>,
    pub db: Database,
    pub dispatcher: Dispatcher,
}

impl Harness {
    pub fn new(head: u64) -> Self {
        Self::with_settings(head, DispatcherSettings::default())
    }

    pub fn with_settings(head: u64, settings: DispatcherSettings) -> Self {
        let chain = Arc::new(FakeChain::new(head));
        let notifier = Arc::new(RecordingNotifier::default());
        let db = Database::in_memory().unwrap();
        let store = Arc::new(SqliteStore::new(db.clone()));
        let ctx = TrackerContext::new(chain.clone(), store.clone(), notifier.clone());
        let dispatcher = Dispatcher::new(ctx, settings);
        Self {
            chain,
            notifier,
            store,
            db,
            dispatcher,
        }
    }
}

pub fn tx(
    hash: u8,
    from: Address,
    to: Option<Address>,
    value: U256,
    input: Bytes,
) -> ChainTransaction {
    ChainTransaction {
        hash: B256::repeat_byte(hash),
        from,
        to,
        value,
        input,
    }
}

pub fn receipt(gas_used: u64) -> ChainReceipt {
    ChainReceipt {
        gas_used,
        contract_address: None,
    }
}

pub fn units(whole: u64, micros: u64) -> U256 {
    U256::from(whole) * U256::from(WEI_PER_UNIT)
        + U256::from(micros) * U256::from(1_000_000_000_000u64)
}

fn log(token: Address, data: LogData, tx_hash: B256, block: u64) -> Log {
    Log {
        inner: alloy_primitives::Log {
            address: token,
            data,
        },
        block_number: Some(block),
        transaction_hash: Some(tx_hash),
        log_index: Some(0),
        ..Default::default()
    }
}

pub fn erc20_log(
    token: Address,
    from: Address,
    to: Address,
    value: u64,
    tx_hash: B256,
    block: u64,
) -> Log {
    let event = erc20::Transfer {
        from,
        to,
        value: U256::from(value),
    };
    log(token, event.encode_log_data(), tx_hash, block)
}

pub fn erc721_log(
    token: Address,
    from: Address,
    to: Address,
    id: u64,
    tx_hash: B256,
    block: u64,
) -> Log {
    let event = erc721::Transfer {
        from,
        to,
        tokenId: U256::from(id),
    };
    log(token, event.encode_log_data(), tx_hash, block)
}
