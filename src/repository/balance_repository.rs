use super::models::BalanceSnapshot;
use alloy_primitives::{Address, U256};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::str::FromStr;

pub struct BalanceRepository<'a> {
    conn: &'a Connection,
}

impl<'a> BalanceRepository<'a> {
    const INSERT_SNAPSHOT: &'static str = "INSERT INTO balance_snapshots (
            address, owner_id, token_address, balance, block_number, observed_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

    // `IS` so that a NULL token address selects the native series
    const SELECT_SNAPSHOTS: &'static str = "SELECT address, owner_id, token_address, balance, block_number, observed_at
         FROM balance_snapshots
         WHERE address = ?1 AND owner_id = ?2 AND token_address IS ?3
         ORDER BY id DESC";

    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Snapshots are append-only; the newest row is the current balance.
    pub fn insert(&self, snapshot: &BalanceSnapshot) -> Result<()> {
        self.conn.execute(
            Self::INSERT_SNAPSHOT,
            params![
                format!("{:?}", snapshot.address),
                snapshot.owner_id,
                snapshot.token_address.map(|t| format!("{t:?}")),
                snapshot.balance.to_string(),
                snapshot.block_number as i64,
                snapshot.observed_at,
            ],
        )?;
        Ok(())
    }

    pub fn latest(
        &self,
        address: &Address,
        owner_id: i64,
        token_address: Option<&Address>,
    ) -> Result<Option<BalanceSnapshot>> {
        let query = format!("{} LIMIT 1", Self::SELECT_SNAPSHOTS);
        let snapshot = self
            .conn
            .query_row(
                &query,
                params![
                    format!("{address:?}"),
                    owner_id,
                    token_address.map(|t| format!("{t:?}"))
                ],
                Self::row_to_snapshot,
            )
            .optional()?;
        Ok(snapshot)
    }

    pub fn history(
        &self,
        address: &Address,
        owner_id: i64,
        token_address: Option<&Address>,
        limit: usize,
    ) -> Result<Vec<BalanceSnapshot>> {
        let query = format!("{} LIMIT {limit}", Self::SELECT_SNAPSHOTS);
        let mut stmt = self.conn.prepare(&query)?;
        let snapshots = stmt
            .query_map(
                params![
                    format!("{address:?}"),
                    owner_id,
                    token_address.map(|t| format!("{t:?}"))
                ],
                Self::row_to_snapshot,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(snapshots)
    }

    fn row_to_snapshot(row: &Row) -> rusqlite::Result<BalanceSnapshot> {
        let address = Address::from_str(&row.get::<_, String>(0)?).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;

        let token_address = row
            .get::<_, Option<String>>(2)?
            .map(|t| Address::from_str(&t))
            .transpose()
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    2,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;

        let balance = U256::from_str(&row.get::<_, String>(3)?).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(BalanceSnapshot {
            address,
            owner_id: row.get(1)?,
            token_address,
            balance,
            block_number: row.get::<_, i64>(4)? as u64,
            observed_at: row.get(5)?,
        })
    }
}
