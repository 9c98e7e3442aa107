use anyhow::{Context, Result};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use std::time::Duration;

const MAX_CONNECTIONS: u32 = 8;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Shared handle to the SQLite database. Cloning is cheap; all clones draw
/// from the same connection pool.
///
/// File databases run in WAL mode, so readers never wait on a writer and
/// SQLite itself orders concurrent writes. Uniqueness of every key is
/// enforced by the schema, not by the pool.
#[derive(Clone)]
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    pub fn new(db_path: &str) -> Result<Self> {
        let db_path = db_path.strip_prefix("sqlite:").unwrap_or(db_path);
        let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
            conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
            conn.busy_timeout(BUSY_TIMEOUT)
        });
        Self::from_manager(manager, MAX_CONNECTIONS)
    }

    /// Every in-memory connection is its own database, so the pool holds one.
    pub fn in_memory() -> Result<Self> {
        Self::from_manager(SqliteConnectionManager::memory(), 1)
    }

    fn from_manager(manager: SqliteConnectionManager, max_size: u32) -> Result<Self> {
        let pool = Pool::builder()
            .max_size(max_size)
            .idle_timeout(None)
            .max_lifetime(None)
            .build(manager)
            .context("Failed to open database")?;
        let db = Database { pool };
        Self::create_tables(&*db.conn()?)?;
        Ok(db)
    }

    pub fn conn(&self) -> Result<DbConnection> {
        self.pool
            .get()
            .context("Failed to check out a database connection")
    }

    fn create_tables(conn: &Connection) -> Result<()> {
        // Addresses are never deleted, only deactivated
        conn.execute(
            "CREATE TABLE IF NOT EXISTS tracked_addresses (
                address TEXT NOT NULL,
                owner_id INTEGER NOT NULL,
                last_processed_block INTEGER NOT NULL DEFAULT 0,
                is_active INTEGER NOT NULL DEFAULT 1,
                added_at TEXT NOT NULL,
                PRIMARY KEY (address, owner_id)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS activities (
                address TEXT NOT NULL,
                owner_id INTEGER NOT NULL,
                tx_hash TEXT NOT NULL,
                kind TEXT NOT NULL,
                block_number INTEGER NOT NULL,
                from_address TEXT,
                to_address TEXT,
                payload TEXT NOT NULL,
                recorded_at TEXT NOT NULL,
                PRIMARY KEY (address, owner_id, tx_hash)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS balance_snapshots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                address TEXT NOT NULL,
                owner_id INTEGER NOT NULL,
                token_address TEXT,
                balance TEXT NOT NULL,
                block_number INTEGER NOT NULL,
                observed_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_tracked_active
             ON tracked_addresses(is_active)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_activities_block_number
             ON activities(block_number)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_balance_snapshots_series
             ON balance_snapshots(address, owner_id, token_address, id)",
            [],
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_database_hands_out_independent_connections() {
        let path = std::env::temp_dir().join(format!(
            "wallet-tracker-pool-{}.db",
            std::process::id()
        ));
        let db = Database::new(path.to_str().unwrap()).unwrap();

        let writer = db.conn().unwrap();
        writer.execute_batch("BEGIN IMMEDIATE").unwrap();
        writer
            .execute(
                "INSERT INTO tracked_addresses (address, owner_id, added_at)
                 VALUES ('0x01', 1, 'now')",
                [],
            )
            .unwrap();

        // a second checkout while the writer holds its transaction
        let reader = db.conn().unwrap();
        let visible: i64 = reader
            .query_row("SELECT COUNT(*) FROM tracked_addresses", [], |row| row.get(0))
            .unwrap();
        assert_eq!(visible, 0);

        writer.execute_batch("COMMIT").unwrap();
        let visible: i64 = reader
            .query_row("SELECT COUNT(*) FROM tracked_addresses", [], |row| row.get(0))
            .unwrap();
        assert_eq!(visible, 1);

        drop((writer, reader));
        drop(db);
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
        }
    }
}
