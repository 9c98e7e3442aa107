use super::models::TrackedAddress;
use alloy_primitives::Address;
use anyhow::Result;
use rusqlite::{OptionalExtension, Row, params};
use std::str::FromStr;

pub struct AddressRepository<'a> {
    conn: &'a rusqlite::Connection,
}

impl<'a> AddressRepository<'a> {
    // Re-tracking a deactivated address restarts it from the bootstrap window
    const TRACK_ADDRESS: &'static str =
        "INSERT INTO tracked_addresses (address, owner_id, last_processed_block, is_active, added_at)
         VALUES (?1, ?2, 0, 1, ?3)
         ON CONFLICT (address, owner_id) DO UPDATE SET
             last_processed_block = CASE WHEN is_active = 1 THEN last_processed_block ELSE 0 END,
             added_at = CASE WHEN is_active = 1 THEN added_at ELSE excluded.added_at END,
             is_active = 1";

    const UNTRACK_ADDRESS: &'static str =
        "UPDATE tracked_addresses SET is_active = 0
         WHERE address = ?1 AND owner_id = ?2 AND is_active = 1";

    const ADVANCE_CURSOR: &'static str = "UPDATE tracked_addresses SET last_processed_block = ?1
         WHERE address = ?2 AND owner_id = ?3 AND last_processed_block < ?1";

    const GET_LAST_PROCESSED_BLOCK: &'static str = "SELECT last_processed_block FROM tracked_addresses
         WHERE address = ?1 AND owner_id = ?2";

    const SELECT_TRACKED: &'static str =
        "SELECT address, owner_id, last_processed_block FROM tracked_addresses";

    pub fn new(conn: &'a rusqlite::Connection) -> Self {
        Self { conn }
    }

    pub fn track(&self, address: &Address, owner_id: i64) -> Result<()> {
        self.conn.execute(
            Self::TRACK_ADDRESS,
            params![
                format!("{:?}", address),
                owner_id,
                chrono::Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    /// Deactivates the address; returns `false` if it was not being tracked.
    pub fn untrack(&self, address: &Address, owner_id: i64) -> Result<bool> {
        let changed = self.conn.execute(
            Self::UNTRACK_ADDRESS,
            params![format!("{:?}", address), owner_id],
        )?;
        Ok(changed > 0)
    }

    pub fn list_active(&self) -> Result<Vec<TrackedAddress>> {
        let query = format!(
            "{} WHERE is_active = 1 ORDER BY owner_id, added_at",
            Self::SELECT_TRACKED
        );
        let mut stmt = self.conn.prepare(&query)?;
        let tracked = stmt
            .query_map([], Self::row_to_tracked)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tracked)
    }

    pub fn list_for_owner(&self, owner_id: i64) -> Result<Vec<TrackedAddress>> {
        let query = format!(
            "{} WHERE is_active = 1 AND owner_id = ?1 ORDER BY added_at DESC",
            Self::SELECT_TRACKED
        );
        let mut stmt = self.conn.prepare(&query)?;
        let tracked = stmt
            .query_map(params![owner_id], Self::row_to_tracked)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tracked)
    }

    pub fn get_last_processed_block(&self, address: &Address, owner_id: i64) -> Result<Option<u64>> {
        let block: Option<i64> = self
            .conn
            .query_row(
                Self::GET_LAST_PROCESSED_BLOCK,
                params![format!("{:?}", address), owner_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(block.map(|b| b as u64))
    }

    /// Moves the cursor forward; a value at or below the stored one is ignored
    /// so the cursor never goes backwards.
    pub fn update_last_processed_block(
        &self,
        address: &Address,
        owner_id: i64,
        block_number: u64,
    ) -> Result<bool> {
        let changed = self.conn.execute(
            Self::ADVANCE_CURSOR,
            params![block_number as i64, format!("{:?}", address), owner_id],
        )?;
        Ok(changed > 0)
    }

    fn row_to_tracked(row: &Row) -> rusqlite::Result<TrackedAddress> {
        let address = Address::from_str(&row.get::<_, String>(0)?).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(TrackedAddress {
            address,
            owner_id: row.get(1)?,
            last_processed_block: row.get::<_, i64>(2)? as u64,
        })
    }
}
