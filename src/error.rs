use alloy_primitives::{Address, B256};
use std::time::Duration;
use thiserror::Error;

/// Failures surfaced by a [`ChainReader`](crate::chain::ChainReader).
#[derive(Debug, Error)]
pub enum ChainError {
    /// Timeout or connection failure that survived the client's retries.
    #[error("RPC request `{method}` failed: {reason}")]
    Transient { method: &'static str, reason: String },

    #[error("call to {address} reverted")]
    CallReverted { address: Address },

    #[error("block {0} not found")]
    MissingBlock(u64),

    #[error("receipt for transaction {0} not found")]
    MissingReceipt(B256),
}

impl ChainError {
    pub fn transient(method: &'static str, reason: impl ToString) -> Self {
        ChainError::Transient {
            method,
            reason: reason.to_string(),
        }
    }
}

/// A single log that could not be turned into a transfer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("log has no topics")]
    Anonymous,

    #[error("unrecognised event signature {0}")]
    UnknownSignature(B256),

    #[error("event {event} has {topics} topics, no known standard matches")]
    UnexpectedShape { event: &'static str, topics: usize },

    #[error("malformed {event} payload: {reason}")]
    Malformed { event: &'static str, reason: String },

    #[error("log is missing {0}")]
    MissingField(&'static str),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Backend(#[from] anyhow::Error),

    #[error("storage task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Backend(e.into())
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification delivery failed: {0}")]
    DeliveryFailed(String),
}

/// Reason a scanner or cycle step did not complete.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}
