//! Read-only view of the chain used by the scanners.
//!
//! [`RpcClient`](crate::rpc::RpcClient) is the production implementation;
//! tests drive the engine with in-memory fakes.

use crate::error::ChainError;
use alloy::rpc::types::Log;
use alloy_primitives::{Address, B256, Bytes, U256};
use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainTransaction {
    pub hash: B256,
    pub from: Address,
    /// `None` for contract-creation transactions.
    pub to: Option<Address>,
    pub value: U256,
    pub input: Bytes,
}

impl ChainTransaction {
    /// First four bytes of the calldata, if any.
    pub fn selector(&self) -> Option<[u8; 4]> {
        self.input.get(..4).and_then(|s| s.try_into().ok())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainBlock {
    pub number: u64,
    pub transactions: Vec<ChainTransaction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainReceipt {
    pub gas_used: u64,
    pub contract_address: Option<Address>,
}

#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn head_height(&self) -> Result<u64, ChainError>;

    async fn block_with_transactions(&self, number: u64) -> Result<ChainBlock, ChainError>;

    /// All logs in `[from_block, to_block]` whose first topic is `topic0`.
    async fn logs_in_range(
        &self,
        from_block: u64,
        to_block: u64,
        topic0: B256,
    ) -> Result<Vec<Log>, ChainError>;

    async fn receipt(&self, tx_hash: B256) -> Result<ChainReceipt, ChainError>;

    /// `eth_call` against the latest block; a revert yields
    /// [`ChainError::CallReverted`].
    async fn static_call(&self, address: Address, calldata: Bytes) -> Result<Bytes, ChainError>;

    async fn native_balance(&self, address: Address) -> Result<U256, ChainError>;
}
