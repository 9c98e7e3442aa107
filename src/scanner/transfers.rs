use crate::activity::ActivityEvent;
use crate::context::TrackerContext;
use crate::decoder::{DecodedTransfer, TransferKind, decode_logs};
use crate::error::ChainError;
use crate::events::{TRANSFER_BATCH_TOPIC, TRANSFER_SINGLE_TOPIC, TRANSFER_TOPIC};
use crate::range::BlockRange;
use alloy_primitives::{Address, B256};
use futures::future::try_join_all;

pub const TOKEN_TOPICS: [B256; 3] = [TRANSFER_TOPIC, TRANSFER_SINGLE_TOPIC, TRANSFER_BATCH_TOPIC];

// ERC-20 before ERC-721 before ERC-1155
fn rank(kind: &TransferKind) -> u8 {
    match kind {
        TransferKind::Fungible { .. } => 0,
        TransferKind::NonFungible { .. } => 1,
        TransferKind::MultiToken { .. } => 2,
    }
}

/// Token transfers in `range` where `address` is sender or recipient.
pub async fn scan(
    ctx: &TrackerContext,
    address: Address,
    range: BlockRange,
) -> Result<Vec<ActivityEvent>, ChainError> {
    let logs = try_join_all(
        TOKEN_TOPICS
            .iter()
            .map(|topic| ctx.chain.logs_in_range(range.from_block, range.to_block, *topic)),
    )
    .await?;

    let mut transfers: Vec<DecodedTransfer> = decode_logs(logs.iter().flatten())
        .into_iter()
        .filter(|transfer| transfer.involves(address))
        .collect();
    transfers.sort_by_key(|t| (rank(&t.kind), t.block, t.log_index));

    let mut events = Vec::with_capacity(transfers.len());
    for transfer in transfers {
        events.push(into_event(ctx, transfer).await?);
    }
    Ok(events)
}

async fn into_event(
    ctx: &TrackerContext,
    transfer: DecodedTransfer,
) -> Result<ActivityEvent, ChainError> {
    let DecodedTransfer {
        token,
        from,
        to,
        kind,
        tx_hash,
        block,
        ..
    } = transfer;

    let event = match kind {
        TransferKind::Fungible { amount } => {
            let metadata = ctx.metadata.resolve(token).await?;
            ActivityEvent::Erc20Transfer {
                tx_hash,
                token,
                from,
                to,
                amount_raw: amount,
                decimals: metadata.decimals,
                symbol: metadata.symbol,
                name: metadata.name,
                block,
            }
        }
        TransferKind::NonFungible { token_id } => {
            let metadata = ctx.metadata.resolve(token).await?;
            ActivityEvent::Erc721Transfer {
                tx_hash,
                token,
                from,
                to,
                token_id,
                symbol: metadata.symbol,
                name: metadata.name,
                block,
            }
        }
        TransferKind::MultiToken {
            operator,
            ids,
            values,
        } => ActivityEvent::Erc1155Batch {
            tx_hash,
            token,
            operator,
            from,
            to,
            ids,
            values,
            block,
        },
    };
    Ok(event)
}
