use async_trait::async_trait;
use shared::Account;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::debug;

use crate::storage::connection::DbConnection;
use crate::storage::error::{degrade, StorageResult};
use crate::storage::traits::AccountStorage;

/// Repository for account operations
#[derive(Clone)]
pub struct AccountRepository {
    db: DbConnection,
}

impl AccountRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }
}

fn account_from_row(row: &SqliteRow) -> Result<Account, sqlx::Error> {
    Ok(Account {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        account_name: row.try_get("account_name")?,
    })
}

#[async_trait]
impl AccountStorage for AccountRepository {
    async fn create(&self, account: &Account) -> StorageResult<Option<i64>> {
        let mut conn = self.db.acquire().await?;
        let result = sqlx::query("INSERT INTO accounts (user_id, account_name) VALUES (?, ?)")
            .bind(account.user_id)
            .bind(&account.account_name)
            .execute(&mut *conn)
            .await
            .map(|done| Some(done.last_insert_rowid()));

        let id = degrade("create account", result, None);
        if let Some(account_id) = id {
            debug!(account_id, user_id = account.user_id, "Created account");
        }
        Ok(id)
    }

    async fn get_by_id(&self, account_id: i64, user_id: i64) -> StorageResult<Option<Account>> {
        let mut conn = self.db.acquire().await?;
        let row = sqlx::query(
            r#"
            SELECT id, user_id, account_name
            FROM accounts
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(account_id)
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await
        .and_then(|row| row.as_ref().map(account_from_row).transpose());

        Ok(degrade("load account", row, None))
    }

    async fn list_by_user(&self, user_id: i64) -> StorageResult<Vec<Account>> {
        let mut conn = self.db.acquire().await?;
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, account_name
            FROM accounts
            WHERE user_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await
        .and_then(|rows| rows.iter().map(account_from_row).collect::<Result<Vec<_>, _>>());

        Ok(degrade("list accounts", rows, Vec::new()))
    }

    async fn update(&self, account: &Account) -> StorageResult<bool> {
        let mut conn = self.db.acquire().await?;
        let result = sqlx::query("UPDATE accounts SET account_name = ? WHERE id = ? AND user_id = ?")
            .bind(&account.account_name)
            .bind(account.id)
            .bind(account.user_id)
            .execute(&mut *conn)
            .await
            .map(|done| done.rows_affected() > 0);

        Ok(degrade("update account", result, false))
    }

    async fn delete(&self, account_id: i64, user_id: i64) -> StorageResult<bool> {
        let mut conn = self.db.acquire().await?;
        let result = sqlx::query("DELETE FROM accounts WHERE id = ? AND user_id = ?")
            .bind(account_id)
            .bind(user_id)
            .execute(&mut *conn)
            .await
            .map(|done| done.rows_affected() > 0);

        Ok(degrade("delete account", result, false))
    }
}
