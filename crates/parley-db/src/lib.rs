pub mod migrations;
pub mod models;
pub mod queries;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::info;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Bounds for the connection pool.
#[derive(Debug, Clone)]
pub struct PoolOptions {
    pub max_size: u32,
    /// How long a request waits for a free connection before giving up.
    pub connection_timeout: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_size: 8,
            connection_timeout: Duration::from_secs(5),
        }
    }
}

pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    pub fn open(path: &Path, options: &PoolOptions) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.busy_timeout(BUSY_TIMEOUT)?;
            Ok(())
        });

        let pool = Pool::builder()
            .max_size(options.max_size)
            .connection_timeout(options.connection_timeout)
            .build(manager)
            .with_context(|| format!("failed to open database at {}", path.display()))?;

        {
            let conn = pool.get()?;
            // WAL mode for concurrent reads
            let mode: String =
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
            migrations::run(&conn)?;
            info!("Database journal mode: {}", mode);
        }

        info!(
            "Database opened at {} (pool of {})",
            path.display(),
            options.max_size
        );
        Ok(Self { pool })
    }

    /// Checks out a pooled connection for the duration of `f`. The connection
    /// goes back to the pool when `f` returns, whatever the outcome.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.checkout()?;
        f(&conn)
    }

    /// Runs `f` inside a single transaction. Commits when `f` returns `Ok`;
    /// any error drops the transaction, which rolls every statement back.
    ///
    /// The write lock is taken up front (`BEGIN IMMEDIATE`) so a read followed
    /// by a write waits on `busy_timeout` instead of failing with SQLITE_BUSY
    /// when another connection commits in between.
    pub fn with_tx<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.checkout()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    fn checkout(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        self.pool
            .get()
            .context("no database connection available within the pool timeout")
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use tempfile::TempDir;

    pub fn open_temp() -> (TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("parley.db"), &PoolOptions::default()).unwrap();
        (dir, db)
    }

    pub fn count(db: &Database, table: &str) -> i64 {
        db.with_conn(|conn| {
            Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })?)
        })
        .unwrap()
    }
}
