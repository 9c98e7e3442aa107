use super::{select, with_receipts};
use crate::activity::ActivityEvent;
use crate::chain::{ChainBlock, ChainReader, ChainTransaction};
use crate::error::ChainError;
use alloy_primitives::Address;
use tracing::debug;

pub fn is_creation(tx: &ChainTransaction, address: Address) -> bool {
    tx.from == address && tx.to.is_none()
}

/// Creation transactions sent by `address`. Only those whose receipt names a
/// created contract are reported; a reverted creation has none.
pub async fn scan(
    chain: &dyn ChainReader,
    address: Address,
    blocks: &[ChainBlock],
    concurrency: usize,
) -> Result<Vec<ActivityEvent>, ChainError> {
    let candidates = select(blocks, |tx| is_creation(tx, address));

    with_receipts(chain, candidates, concurrency, |block, tx, receipt| {
        let Some(new_contract) = receipt.contract_address else {
            debug!("Creation {:?} produced no contract", tx.hash);
            return None;
        };
        Some(ActivityEvent::ContractDeployment {
            tx_hash: tx.hash,
            new_contract,
            deployer: tx.from,
            block,
            gas_used: receipt.gas_used,
        })
    })
    .await
}
