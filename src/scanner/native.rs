use super::{select, with_receipts};
use crate::activity::ActivityEvent;
use crate::chain::{ChainBlock, ChainReader, ChainTransaction};
use crate::error::ChainError;
use alloy_primitives::Address;

/// Value-carrying transaction sent or received by `address`.
pub fn is_native_transfer(tx: &ChainTransaction, address: Address) -> bool {
    (tx.from == address || tx.to == Some(address)) && !tx.value.is_zero()
}

pub async fn scan(
    chain: &dyn ChainReader,
    address: Address,
    blocks: &[ChainBlock],
    concurrency: usize,
) -> Result<Vec<ActivityEvent>, ChainError> {
    let candidates = select(blocks, |tx| is_native_transfer(tx, address));

    with_receipts(chain, candidates, concurrency, |block, tx, receipt| {
        Some(ActivityEvent::Native {
            tx_hash: tx.hash,
            from: tx.from,
            to: tx.to,
            value_wei: tx.value,
            block,
            gas_used: receipt.gas_used,
        })
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::fixtures::tx;
    use alloy_primitives::address;

    const ME: Address = address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
    const THEM: Address = address!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");

    #[test]
    fn matches_either_direction_with_value() {
        assert!(is_native_transfer(&tx(1, ME, Some(THEM), 1, &[]), ME));
        assert!(is_native_transfer(&tx(1, THEM, Some(ME), 1, &[]), ME));
        assert!(is_native_transfer(&tx(1, ME, None, 1, &[]), ME));
    }

    #[test]
    fn skips_zero_value_and_unrelated() {
        assert!(!is_native_transfer(&tx(1, ME, Some(THEM), 0, &[]), ME));
        assert!(!is_native_transfer(&tx(1, THEM, Some(THEM), 10, &[]), ME));
    }
}
