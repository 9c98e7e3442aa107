use crate::activity::ActivityEvent;
use crate::error::StoreError;
use crate::repository::{
    ActivityRepository, AddressRepository, BalanceRepository, BalanceSnapshot, Database,
    TrackedAddress,
};
use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use rusqlite::Connection;

/// Persistence contract the dispatcher relies on.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    async fn active_addresses(&self) -> Result<Vec<TrackedAddress>, StoreError>;

    /// 0 when the address has never been scanned.
    async fn last_processed_block(&self, tracked: &TrackedAddress) -> Result<u64, StoreError>;

    async fn set_last_processed_block(
        &self,
        tracked: &TrackedAddress,
        block: u64,
    ) -> Result<(), StoreError>;

    /// Idempotent by transaction hash: `Ok(false)` means the event was
    /// already stored, which is not an error.
    async fn append_activity(
        &self,
        tracked: &TrackedAddress,
        event: &ActivityEvent,
    ) -> Result<bool, StoreError>;

    async fn latest_balance(
        &self,
        tracked: &TrackedAddress,
        token: Option<Address>,
    ) -> Result<Option<U256>, StoreError>;

    async fn append_balance_snapshot(&self, snapshot: BalanceSnapshot) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    // SQLite calls block, so they run on the blocking pool
    async fn run<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.conn()?;
            f(&conn)
        })
        .await?
        .map_err(StoreError::from)
    }
}

#[async_trait]
impl ActivityStore for SqliteStore {
    async fn active_addresses(&self) -> Result<Vec<TrackedAddress>, StoreError> {
        self.run(|conn| AddressRepository::new(conn).list_active())
            .await
    }

    async fn last_processed_block(&self, tracked: &TrackedAddress) -> Result<u64, StoreError> {
        let tracked = tracked.clone();
        self.run(move |conn| {
            let block = AddressRepository::new(conn)
                .get_last_processed_block(&tracked.address, tracked.owner_id)?;
            Ok(block.unwrap_or(0))
        })
        .await
    }

    async fn set_last_processed_block(
        &self,
        tracked: &TrackedAddress,
        block: u64,
    ) -> Result<(), StoreError> {
        let tracked = tracked.clone();
        self.run(move |conn| {
            AddressRepository::new(conn).update_last_processed_block(
                &tracked.address,
                tracked.owner_id,
                block,
            )?;
            Ok(())
        })
        .await
    }

    async fn append_activity(
        &self,
        tracked: &TrackedAddress,
        event: &ActivityEvent,
    ) -> Result<bool, StoreError> {
        let tracked = tracked.clone();
        let event = event.clone();
        self.run(move |conn| ActivityRepository::new(conn).insert(&tracked, &event))
            .await
    }

    async fn latest_balance(
        &self,
        tracked: &TrackedAddress,
        token: Option<Address>,
    ) -> Result<Option<U256>, StoreError> {
        let tracked = tracked.clone();
        self.run(move |conn| {
            let snapshot = BalanceRepository::new(conn).latest(
                &tracked.address,
                tracked.owner_id,
                token.as_ref(),
            )?;
            Ok(snapshot.map(|s| s.balance))
        })
        .await
    }

    async fn append_balance_snapshot(&self, snapshot: BalanceSnapshot) -> Result<(), StoreError> {
        self.run(move |conn| BalanceRepository::new(conn).insert(&snapshot))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{B256, address};

    const WALLET: Address = address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");

    fn store() -> SqliteStore {
        SqliteStore::new(Database::in_memory().unwrap())
    }

    #[tokio::test]
    async fn unknown_address_has_cursor_zero() {
        let store = store();
        let tracked = TrackedAddress::new(WALLET, 1);
        assert_eq!(store.last_processed_block(&tracked).await.unwrap(), 0);
        assert!(store.active_addresses().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_append_reports_false() {
        let store = store();
        let tracked = TrackedAddress::new(WALLET, 1);
        let event = ActivityEvent::ContractDeployment {
            tx_hash: B256::repeat_byte(1),
            new_contract: Address::ZERO,
            deployer: WALLET,
            block: 9,
            gas_used: 1,
        };

        assert!(store.append_activity(&tracked, &event).await.unwrap());
        assert!(!store.append_activity(&tracked, &event).await.unwrap());
    }

    #[tokio::test]
    async fn latest_balance_follows_snapshots() {
        let store = store();
        let tracked = TrackedAddress::new(WALLET, 1);
        assert_eq!(store.latest_balance(&tracked, None).await.unwrap(), None);

        for (block, balance) in [(1u64, 10u64), (2, 20)] {
            store
                .append_balance_snapshot(BalanceSnapshot {
                    address: WALLET,
                    owner_id: 1,
                    token_address: None,
                    balance: U256::from(balance),
                    block_number: block,
                    observed_at: chrono::Utc::now().to_rfc3339(),
                })
                .await
                .unwrap();
        }

        assert_eq!(
            store.latest_balance(&tracked, None).await.unwrap(),
            Some(U256::from(20))
        );
    }
}
