//! Per-address scanners over one resolved block range.
//!
//! The transaction-driven scanners (native, interaction, deployment) share a
//! single fetch of the range's blocks; token transfers come from range-level
//! log queries instead.

pub mod deployment;
pub mod interaction;
pub mod native;
pub mod transfers;

use crate::activity::ActivityEvent;
use crate::chain::{ChainBlock, ChainReader, ChainReceipt, ChainTransaction};
use crate::error::ChainError;
use crate::range::BlockRange;
use futures::{StreamExt, TryStreamExt, stream};

/// Fetches every block of `range` with full transactions, at most
/// `concurrency` requests in flight, returned in ascending order.
pub async fn fetch_blocks(
    chain: &dyn ChainReader,
    range: BlockRange,
    concurrency: usize,
) -> Result<Vec<ChainBlock>, ChainError> {
    stream::iter(range.blocks())
        .map(|number| chain.block_with_transactions(number))
        .buffered(concurrency.max(1))
        .try_collect()
        .await
}

fn select<'a>(
    blocks: &'a [ChainBlock],
    keep: impl Fn(&ChainTransaction) -> bool,
) -> Vec<(u64, &'a ChainTransaction)> {
    blocks
        .iter()
        .flat_map(|block| block.transactions.iter().map(move |tx| (block.number, tx)))
        .filter(|(_, tx)| keep(tx))
        .collect()
}

/// Fetches one receipt per candidate and lets `build` turn each into an event.
/// Any failed receipt fails the whole scanner.
async fn with_receipts<F>(
    chain: &dyn ChainReader,
    candidates: Vec<(u64, &ChainTransaction)>,
    concurrency: usize,
    build: F,
) -> Result<Vec<ActivityEvent>, ChainError>
where
    F: Fn(u64, &ChainTransaction, ChainReceipt) -> Option<ActivityEvent>,
{
    let receipts: Vec<ChainReceipt> = stream::iter(candidates.iter())
        .map(|&(_, tx)| chain.receipt(tx.hash))
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    Ok(candidates
        .into_iter()
        .zip(receipts)
        .filter_map(|((block, tx), receipt)| build(block, tx, receipt))
        .collect())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::chain::{ChainBlock, ChainTransaction};
    use alloy_primitives::{Address, B256, Bytes, U256};

    pub fn tx(
        hash: u8,
        from: Address,
        to: Option<Address>,
        value: u64,
        input: &[u8],
    ) -> ChainTransaction {
        ChainTransaction {
            hash: B256::repeat_byte(hash),
            from,
            to,
            value: U256::from(value),
            input: Bytes::copy_from_slice(input),
        }
    }

    pub fn block(number: u64, transactions: Vec<ChainTransaction>) -> ChainBlock {
        ChainBlock {
            number,
            transactions,
        }
    }
}
