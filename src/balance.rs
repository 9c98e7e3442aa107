use crate::context::TrackerContext;
use crate::error::ScanError;
use crate::notifier::Notification;
use crate::repository::{BalanceSnapshot, TrackedAddress};
use alloy_primitives::{Address, U256};
use serde::Serialize;
use tracing::{debug, warn};

const WEI_PER_UNIT: u64 = 1_000_000_000_000_000_000;
// 10^12 wei is one unit of the sixth decimal place
const WEI_PER_MICRO_UNIT: u64 = 1_000_000_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceChange {
    pub address: Address,
    pub previous: U256,
    pub current: U256,
    pub block: u64,
}

impl BalanceChange {
    /// Signed difference in native units, e.g. `+0.500000`.
    pub fn delta(&self) -> String {
        if self.current >= self.previous {
            format!("+{}", format_native(self.current - self.previous))
        } else {
            format!("-{}", format_native(self.previous - self.current))
        }
    }
}

/// Formats a wei amount with six decimal places, truncating the rest.
pub fn format_native(wei: U256) -> String {
    let unit = U256::from(WEI_PER_UNIT);
    let whole = wei / unit;
    let micros = (wei % unit) / U256::from(WEI_PER_MICRO_UNIT);
    format!("{whole}.{:0>6}", micros.to_string())
}

/// Compares the live native balance against the latest snapshot.
///
/// The first observation seeds the series without notifying. Afterwards an
/// unchanged balance is a no-op and a changed one is persisted and announced
/// exactly once.
pub async fn check_native_balance(
    ctx: &TrackerContext,
    tracked: &TrackedAddress,
    block: u64,
) -> Result<Option<BalanceChange>, ScanError> {
    let current = ctx.chain.native_balance(tracked.address).await?;
    let previous = ctx.store.latest_balance(tracked, None).await?;

    if previous == Some(current) {
        return Ok(None);
    }

    ctx.store
        .append_balance_snapshot(BalanceSnapshot {
            address: tracked.address,
            owner_id: tracked.owner_id,
            token_address: None,
            balance: current,
            block_number: block,
            observed_at: chrono::Utc::now().to_rfc3339(),
        })
        .await?;

    let Some(previous) = previous else {
        debug!("Seeded balance snapshot for {:?}", tracked.address);
        return Ok(None);
    };

    let change = BalanceChange {
        address: tracked.address,
        previous,
        current,
        block,
    };
    if let Err(e) = ctx
        .notify(tracked.owner_id, &Notification::BalanceChanged(change.clone()))
        .await
    {
        warn!("Balance notification for {:?} failed: {}", tracked.address, e);
    }
    Ok(Some(change))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ether(whole: u64, micros: u64) -> U256 {
        U256::from(whole) * U256::from(WEI_PER_UNIT) + U256::from(micros * WEI_PER_MICRO_UNIT)
    }

    #[test]
    fn formats_six_decimals() {
        assert_eq!(format_native(U256::ZERO), "0.000000");
        assert_eq!(format_native(ether(1, 500_000)), "1.500000");
        assert_eq!(format_native(ether(12, 7)), "12.000007");
        // sub-micro dust is truncated
        assert_eq!(format_native(U256::from(999_999_999_999u64)), "0.000000");
    }

    #[test]
    fn delta_is_signed() {
        let mut change = BalanceChange {
            address: Address::ZERO,
            previous: ether(1, 0),
            current: ether(1, 500_000),
            block: 1,
        };
        assert_eq!(change.delta(), "+0.500000");

        std::mem::swap(&mut change.previous, &mut change.current);
        assert_eq!(change.delta(), "-0.500000");
    }
}
