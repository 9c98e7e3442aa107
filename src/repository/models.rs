use crate::activity::ActivityEvent;
use alloy_primitives::{Address, U256};
use serde::Serialize;

/// An address a user asked to monitor. `last_processed_block == 0` means
/// the address has never been scanned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackedAddress {
    pub address: Address,
    pub owner_id: i64,
    pub last_processed_block: u64,
}

impl TrackedAddress {
    pub fn new(address: Address, owner_id: i64) -> Self {
        Self {
            address,
            owner_id,
            last_processed_block: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredActivity {
    pub address: Address,
    pub owner_id: i64,
    pub event: ActivityEvent,
    pub recorded_at: String,
}

/// One point of an address's balance series; `token_address` is `None` for
/// the native currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceSnapshot {
    pub address: Address,
    pub owner_id: i64,
    pub token_address: Option<Address>,
    pub balance: U256,
    pub block_number: u64,
    pub observed_at: String,
}
