use super::{select, with_receipts};
use crate::activity::ActivityEvent;
use crate::chain::{ChainBlock, ChainReader, ChainTransaction};
use crate::error::ChainError;
use crate::selectors::{function_name, is_plain_transfer};
use alloy_primitives::Address;

/// Selector of a contract call made by `address`, if the transaction is one.
///
/// Calls need calldata beyond the bare selector. Creations belong to the
/// deployment scanner, and plain token `transfer`/`transferFrom` calls are
/// already reported by the transfer scanner.
pub fn interaction_selector(tx: &ChainTransaction, address: Address) -> Option<[u8; 4]> {
    if tx.from != address || tx.to.is_none() || tx.input.len() <= 4 {
        return None;
    }
    tx.selector().filter(|selector| !is_plain_transfer(*selector))
}

pub async fn scan(
    chain: &dyn ChainReader,
    address: Address,
    blocks: &[ChainBlock],
    concurrency: usize,
) -> Result<Vec<ActivityEvent>, ChainError> {
    let candidates = select(blocks, |tx| interaction_selector(tx, address).is_some());

    with_receipts(chain, candidates, concurrency, |block, tx, receipt| {
        Some(ActivityEvent::ContractInteraction {
            tx_hash: tx.hash,
            contract: tx.to?,
            function: function_name(tx.selector()?),
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
    use alloy_primitives::{address, hex};

    const ME: Address = address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
    const ROUTER: Address = address!("dddddddddddddddddddddddddddddddddddddddd");

    #[test]
    fn plain_token_transfer_is_not_an_interaction() {
        let input = hex!("a9059cbb000000000000000000000000bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");
        assert_eq!(interaction_selector(&tx(1, ME, Some(ROUTER), 0, &input), ME), None);
    }

    #[test]
    fn approve_is_an_interaction() {
        let input = hex!("095ea7b3000000000000000000000000dddddddddddddddddddddddddddddddddddddddd");
        assert_eq!(
            interaction_selector(&tx(1, ME, Some(ROUTER), 0, &input), ME),
            Some(hex!("095ea7b3"))
        );
    }

    #[test]
    fn requires_sender_recipient_and_arguments() {
        let input = hex!("095ea7b300");
        assert_eq!(interaction_selector(&tx(1, ROUTER, Some(ME), 0, &input), ME), None);
        assert_eq!(interaction_selector(&tx(1, ME, None, 0, &input), ME), None);
        assert_eq!(interaction_selector(&tx(1, ME, Some(ROUTER), 0, &input[..4]), ME), None);
    }
}
