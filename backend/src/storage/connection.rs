use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::DatabaseConfig;
use super::error::ConnectionError;
use super::repositories::{
    AccountRepository, CategoryRepository, TransactionRepository, UserRepository,
};
use super::traits::Connection;

/// Connection provider shared by all repositories.
///
/// Wraps a bounded pool; every repository call checks out one connection and
/// hands it back when the guard drops, whichever way the call exits.
#[derive(Clone)]
pub struct DbConnection {
    pool: Arc<SqlitePool>,
}

impl DbConnection {
    /// Open (creating if needed) the configured database and set up the schema
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, ConnectionError> {
        let unused = config.server_options_in_use();
        if !unused.is_empty() {
            warn!(
                options = ?unused,
                "Embedded SQLite engine ignores server connection options"
            );
        }

        let options = SqliteConnectOptions::new()
            .filename(&config.name)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .acquire_timeout(config.acquire_timeout())
            .test_before_acquire(true)
            .connect_with(options)
            .await
            .map_err(ConnectionError::Open)?;

        info!(database = %config.name, max_connections = config.max_connections, "Database pool ready");
        Self::from_pool(pool).await
    }

    /// Initialize a private in-memory test database
    #[cfg(test)]
    pub async fn init_test() -> Result<Self, ConnectionError> {
        use std::str::FromStr;

        // Each parse of `:memory:` names a distinct shared-cache database
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(ConnectionError::Open)?
            .foreign_keys(true);

        // One connection keeps the in-memory database alive for the whole test
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(ConnectionError::Open)?;

        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self, ConnectionError> {
        Self::setup_schema(&pool).await.map_err(ConnectionError::Schema)?;
        Ok(Self { pool: Arc::new(pool) })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Check out a live connection for a single call
    pub async fn acquire(&self) -> Result<PoolConnection<Sqlite>, ConnectionError> {
        self.pool.acquire().await.map_err(ConnectionError::Acquire)
    }

    /// Hand a connection back to the pool. Never fails.
    pub fn release(&self, conn: PoolConnection<Sqlite>) {
        drop(conn);
        debug!(idle = self.pool.num_idle(), "Connection released");
    }

    /// Start an explicit transaction on a fresh connection
    pub async fn begin(&self) -> Result<sqlx::Transaction<'static, Sqlite>, ConnectionError> {
        self.pool.begin().await.map_err(ConnectionError::Acquire)
    }

    /// Close the pool, waiting for checked-out connections to come back
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database pool closed");
    }

    /// Set up the required database schema
    async fn setup_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                email TEXT NOT NULL DEFAULT '',
                first_name TEXT NOT NULL DEFAULT '',
                last_name TEXT NOT NULL DEFAULT ''
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS accounts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                account_name TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users (id)
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_accounts_user_id
            ON accounts(user_id);
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users (id)
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_categories_user_id_name
            ON categories(user_id, name);
            "#,
        )
        .execute(pool)
        .await?;

        // Amounts are integer hundredths so the engine sums them exactly
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                account_id INTEGER NOT NULL,
                category_id INTEGER,
                amount INTEGER NOT NULL CHECK (amount >= 0),
                type TEXT NOT NULL CHECK (type IN ('INCOME', 'EXPENSE')),
                description TEXT NOT NULL DEFAULT '',
                date TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users (id),
                FOREIGN KEY (account_id) REFERENCES accounts (id),
                FOREIGN KEY (category_id) REFERENCES categories (id)
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_transactions_user_id_date
            ON transactions(user_id, date DESC);
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_transactions_account_id
            ON transactions(account_id);
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_transactions_category_id
            ON transactions(category_id);
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }
}

impl Connection for DbConnection {
    type UserRepository = UserRepository;
    type AccountRepository = AccountRepository;
    type CategoryRepository = CategoryRepository;
    type TransactionRepository = TransactionRepository;

    fn create_user_repository(&self) -> UserRepository {
        UserRepository::new(self.clone())
    }

    fn create_account_repository(&self) -> AccountRepository {
        AccountRepository::new(self.clone())
    }

    fn create_category_repository(&self) -> CategoryRepository {
        CategoryRepository::new(self.clone())
    }

    fn create_transaction_repository(&self) -> TransactionRepository {
        TransactionRepository::new(self.clone())
    }
}
