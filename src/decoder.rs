//! Classifies raw logs into token transfers.
//!
//! Classification goes by topic0 *and* the number of indexed topics, never by
//! trusting whichever ABI happens to decode: ERC-20 and ERC-721 emit the same
//! `Transfer` signature and differ only in whether the third argument is
//! indexed.

use crate::error::DecodeError;
use crate::events::{
    TRANSFER_BATCH_TOPIC, TRANSFER_SINGLE_TOPIC, TRANSFER_TOPIC, erc20, erc721, erc1155,
};
use alloy::rpc::types::Log;
use alloy::sol_types::SolEvent;
use alloy_primitives::{Address, B256, U256};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferKind {
    Fungible {
        amount: U256,
    },
    NonFungible {
        token_id: U256,
    },
    MultiToken {
        operator: Address,
        ids: Vec<U256>,
        values: Vec<U256>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedTransfer {
    pub token: Address,
    pub from: Address,
    pub to: Address,
    pub kind: TransferKind,
    pub tx_hash: B256,
    pub block: u64,
    pub log_index: u64,
}

impl DecodedTransfer {
    pub fn involves(&self, address: Address) -> bool {
        self.from == address || self.to == address
    }
}

fn malformed(event: &'static str) -> impl FnOnce(alloy::sol_types::Error) -> DecodeError {
    move |e| DecodeError::Malformed {
        event,
        reason: e.to_string(),
    }
}

pub fn decode_log(log: &Log) -> Result<DecodedTransfer, DecodeError> {
    let topics = log.topics();
    let data = &log.data().data;
    let topic0 = *topics.first().ok_or(DecodeError::Anonymous)?;

    let (from, to, kind) = if topic0 == TRANSFER_TOPIC {
        match topics.len() {
            3 => {
                let event = erc20::Transfer::decode_raw_log(topics, data)
                    .map_err(malformed("ERC-20 Transfer"))?;
                (
                    event.from,
                    event.to,
                    TransferKind::Fungible {
                        amount: event.value,
                    },
                )
            }
            4 => {
                let event = erc721::Transfer::decode_raw_log(topics, data)
                    .map_err(malformed("ERC-721 Transfer"))?;
                (
                    event.from,
                    event.to,
                    TransferKind::NonFungible {
                        token_id: event.tokenId,
                    },
                )
            }
            n => {
                return Err(DecodeError::UnexpectedShape {
                    event: "Transfer",
                    topics: n,
                });
            }
        }
    } else if topic0 == TRANSFER_SINGLE_TOPIC {
        if topics.len() != 4 {
            return Err(DecodeError::UnexpectedShape {
                event: "TransferSingle",
                topics: topics.len(),
            });
        }
        let event = erc1155::TransferSingle::decode_raw_log(topics, data)
            .map_err(malformed("TransferSingle"))?;
        (
            event.from,
            event.to,
            TransferKind::MultiToken {
                operator: event.operator,
                ids: vec![event.id],
                values: vec![event.value],
            },
        )
    } else if topic0 == TRANSFER_BATCH_TOPIC {
        if topics.len() != 4 {
            return Err(DecodeError::UnexpectedShape {
                event: "TransferBatch",
                topics: topics.len(),
            });
        }
        let event = erc1155::TransferBatch::decode_raw_log(topics, data)
            .map_err(malformed("TransferBatch"))?;
        if event.ids.len() != event.values.len() {
            return Err(DecodeError::Malformed {
                event: "TransferBatch",
                reason: format!(
                    "{} ids but {} values",
                    event.ids.len(),
                    event.values.len()
                ),
            });
        }
        (
            event.from,
            event.to,
            TransferKind::MultiToken {
                operator: event.operator,
                ids: event.ids,
                values: event.values,
            },
        )
    } else {
        return Err(DecodeError::UnknownSignature(topic0));
    };

    Ok(DecodedTransfer {
        token: log.address(),
        from,
        to,
        kind,
        tx_hash: log
            .transaction_hash
            .ok_or(DecodeError::MissingField("transaction hash"))?,
        block: log
            .block_number
            .ok_or(DecodeError::MissingField("block number"))?,
        log_index: log.log_index.unwrap_or_default(),
    })
}

/// Decodes every log, dropping the ones no known standard matches.
pub fn decode_logs<'a>(logs: impl IntoIterator<Item = &'a Log>) -> Vec<DecodedTransfer> {
    let mut decoded = Vec::new();
    for log in logs {
        match decode_log(log) {
            Ok(transfer) => decoded.push(transfer),
            Err(e @ DecodeError::UnexpectedShape { .. }) => {
                debug!(
                    "Skipping log from {:?} in tx {:?}: {}",
                    log.address(),
                    log.transaction_hash,
                    e
                );
            }
            Err(e) => {
                warn!(
                    "Failed to decode log from {:?} in tx {:?}: {}",
                    log.address(),
                    log.transaction_hash,
                    e
                );
            }
        }
    }
    decoded
}
