use super::models::{StoredActivity, TrackedAddress};
use crate::activity::ActivityEvent;
use alloy_primitives::Address;
use anyhow::Result;
use rusqlite::{Row, ToSql, params, params_from_iter};
use std::str::FromStr;

pub struct ActivityRepository<'a> {
    conn: &'a rusqlite::Connection,
}

impl<'a> ActivityRepository<'a> {
    // The primary key (address, owner_id, tx_hash) makes a repeated insert a no-op
    const INSERT_ACTIVITY: &'static str = "INSERT OR IGNORE INTO activities (
            address, owner_id, tx_hash, kind, block_number,
            from_address, to_address, payload, recorded_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)";

    const SELECT_ACTIVITY: &'static str =
        "SELECT address, owner_id, payload, recorded_at FROM activities";

    pub fn new(conn: &'a rusqlite::Connection) -> Self {
        Self { conn }
    }

    /// Returns `true` if the row was new, `false` if this transaction was
    /// already recorded for the tracked address.
    pub fn insert(&self, tracked: &TrackedAddress, event: &ActivityEvent) -> Result<bool> {
        let payload = serde_json::to_string(event)?;
        let (from, to) = event.parties();

        let inserted = self.conn.execute(
            Self::INSERT_ACTIVITY,
            params![
                format!("{:?}", tracked.address),
                tracked.owner_id,
                format!("{:?}", event.tx_hash()),
                event.kind(),
                event.block() as i64,
                from.map(|a| format!("{a:?}")),
                to.map(|a| format!("{a:?}")),
                payload,
                chrono::Utc::now().to_rfc3339(),
            ],
        )?;

        Ok(inserted > 0)
    }

    pub fn get_address_history(
        &self,
        address: &Address,
        owner_id: Option<i64>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<StoredActivity>> {
        let mut conditions = vec!["address = ?"];
        let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(format!("{address:?}"))];

        if let Some(owner) = owner_id {
            conditions.push("owner_id = ?");
            params.push(Box::new(owner));
        }

        self.execute_paginated_query(
            conditions,
            params,
            limit,
            offset,
            Some(" ORDER BY block_number DESC, recorded_at DESC"),
        )
    }

    pub fn count_for_address(&self, address: &Address) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM activities WHERE address = ?1",
            params![format!("{address:?}")],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    pub fn get_statistics(&self) -> Result<ActivityStats> {
        let total_activities: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM activities", [], |row| row.get(0))?;

        let (earliest_block, latest_block): (Option<i64>, Option<i64>) = self.conn.query_row(
            "SELECT MIN(block_number), MAX(block_number) FROM activities",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let mut stmt = self
            .conn
            .prepare("SELECT kind, COUNT(*) FROM activities GROUP BY kind ORDER BY kind")?;
        let by_kind = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ActivityStats {
            total_activities: total_activities as usize,
            by_kind,
            earliest_block: earliest_block.map(|b| b as u64),
            latest_block: latest_block.map(|b| b as u64),
        })
    }

    fn execute_paginated_query(
        &self,
        conditions: Vec<&str>,
        params: Vec<Box<dyn ToSql>>,
        limit: usize,
        offset: usize,
        order_by: Option<&str>,
    ) -> Result<Vec<StoredActivity>> {
        let mut query = Self::SELECT_ACTIVITY.to_string();

        if !conditions.is_empty() {
            query.push_str(" WHERE ");
            query.push_str(&conditions.join(" AND "));
        }

        if let Some(order) = order_by {
            query.push_str(order);
        }

        query.push_str(&format!(" LIMIT {limit} OFFSET {offset}"));

        let mut stmt = self.conn.prepare(&query)?;
        let activities = stmt
            .query_map(params_from_iter(params), Self::row_to_activity)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(activities)
    }

    fn row_to_activity(row: &Row) -> rusqlite::Result<StoredActivity> {
        let address = Address::from_str(&row.get::<_, String>(0)?).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;

        let event: ActivityEvent = serde_json::from_str(&row.get::<_, String>(2)?).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(StoredActivity {
            address,
            owner_id: row.get(1)?,
            event,
            recorded_at: row.get(3)?,
        })
    }
}

#[derive(Debug)]
pub struct ActivityStats {
    pub total_activities: usize,
    pub by_kind: Vec<(String, usize)>,
    pub earliest_block: Option<u64>,
    pub latest_block: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::Database;
    use alloy_primitives::{B256, U256, address};

    const WALLET: Address = address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
    const OTHER: Address = address!("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");

    fn native(tx: u8, block: u64) -> ActivityEvent {
        ActivityEvent::Native {
            tx_hash: B256::repeat_byte(tx),
            from: WALLET,
            to: Some(OTHER),
            value_wei: U256::from(1_000u64),
            block,
            gas_used: 21_000,
        }
    }

    #[test]
    fn duplicate_transaction_hash_is_ignored() {
        let db = Database::in_memory().unwrap();
        let conn = db.conn().unwrap();
        let repo = ActivityRepository::new(&conn);
        let tracked = TrackedAddress::new(WALLET, 1);

        assert!(repo.insert(&tracked, &native(1, 10)).unwrap());
        assert!(!repo.insert(&tracked, &native(1, 10)).unwrap());
        assert_eq!(repo.count_for_address(&WALLET).unwrap(), 1);
    }

    #[test]
    fn same_transaction_is_recorded_once_per_owner() {
        let db = Database::in_memory().unwrap();
        let conn = db.conn().unwrap();
        let repo = ActivityRepository::new(&conn);

        assert!(repo.insert(&TrackedAddress::new(WALLET, 1), &native(1, 10)).unwrap());
        assert!(repo.insert(&TrackedAddress::new(WALLET, 2), &native(1, 10)).unwrap());
        assert_eq!(repo.get_address_history(&WALLET, Some(2), 10, 0).unwrap().len(), 1);
    }

    #[test]
    fn history_round_trips_events_newest_first() {
        let db = Database::in_memory().unwrap();
        let conn = db.conn().unwrap();
        let repo = ActivityRepository::new(&conn);
        let tracked = TrackedAddress::new(WALLET, 1);
        let batch = ActivityEvent::Erc1155Batch {
            tx_hash: B256::repeat_byte(2),
            token: OTHER,
            operator: WALLET,
            from: WALLET,
            to: OTHER,
            ids: vec![U256::from(1), U256::from(2)],
            values: vec![U256::from(3), U256::from(4)],
            block: 12,
        };

        repo.insert(&tracked, &native(1, 10)).unwrap();
        repo.insert(&tracked, &batch).unwrap();

        let history = repo.get_address_history(&WALLET, None, 10, 0).unwrap();
        let events: Vec<_> = history.into_iter().map(|a| a.event).collect();
        assert_eq!(events, vec![batch, native(1, 10)]);

        let stats = repo.get_statistics().unwrap();
        assert_eq!(stats.total_activities, 2);
        assert_eq!(stats.earliest_block, Some(10));
        assert_eq!(stats.latest_block, Some(12));
        assert_eq!(
            stats.by_kind,
            vec![("erc1155".to_string(), 1), ("native".to_string(), 1)]
        );
    }
}
