use async_trait::async_trait;
use chrono::NaiveDateTime;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use shared::{Transaction, TransactionType};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::{debug, warn};

use crate::storage::connection::DbConnection;
use crate::storage::error::{degrade, StorageError, StorageResult};
use crate::storage::traits::TransactionStorage;

/// Digits after the decimal point kept in storage
const MINOR_UNIT_SCALE: u32 = 2;

const SELECT_TRANSACTIONS: &str = r#"
    SELECT t.id, t.user_id, t.account_id, t.category_id, t.amount, t.type,
           t.description, t.date,
           a.account_name AS account_name,
           c.name AS category_name
    FROM transactions t
    JOIN accounts a ON a.id = t.account_id
    LEFT JOIN categories c ON c.id = t.category_id
"#;

/// Repository for transaction operations
#[derive(Clone)]
pub struct TransactionRepository {
    db: DbConnection,
}

impl TransactionRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Run the shared joined select with an extra WHERE clause over integer params
    async fn list_where(
        &self,
        operation: &'static str,
        condition: &str,
        params: &[i64],
    ) -> StorageResult<Vec<Transaction>> {
        let sql = format!("{SELECT_TRANSACTIONS} WHERE {condition} ORDER BY t.date DESC, t.id DESC");
        let mut query = sqlx::query(&sql);
        for param in params {
            query = query.bind(*param);
        }

        let mut conn = self.db.acquire().await?;
        let rows = query
            .fetch_all(&mut *conn)
            .await
            .map_err(StorageError::from)
            .and_then(|rows| rows.iter().map(transaction_from_row).collect::<Result<Vec<_>, _>>());

        Ok(degrade(operation, rows, Vec::new()))
    }
}

/// Convert a non-negative amount with at most two decimals into hundredths
fn to_minor_units(amount: Decimal) -> Option<i64> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return None;
    }
    if amount.normalize().scale() > MINOR_UNIT_SCALE {
        return None;
    }
    amount.checked_mul(Decimal::ONE_HUNDRED)?.trunc().to_i64()
}

fn from_minor_units(minor: i64) -> Decimal {
    Decimal::new(minor, MINOR_UNIT_SCALE)
}

fn transaction_from_row(row: &SqliteRow) -> StorageResult<Transaction> {
    let stored_type: String = row.try_get("type")?;
    let transaction_type = stored_type
        .parse::<TransactionType>()
        .map_err(|_| StorageError::Decode {
            column: "type",
            value: stored_type.clone(),
        })?;

    let minor: i64 = row.try_get("amount")?;
    if minor < 0 {
        return Err(StorageError::Decode {
            column: "amount",
            value: minor.to_string(),
        });
    }

    Ok(Transaction {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        account_id: row.try_get("account_id")?,
        category_id: row.try_get("category_id")?,
        amount: from_minor_units(minor),
        transaction_type,
        description: row.try_get("description")?,
        date: row.try_get::<NaiveDateTime, _>("date")?,
        account_name: row.try_get("account_name")?,
        category_name: row.try_get("category_name")?,
    })
}

#[async_trait]
impl TransactionStorage for TransactionRepository {
    async fn create(&self, transaction: &Transaction) -> StorageResult<Option<i64>> {
        let Some(minor) = to_minor_units(transaction.amount) else {
            warn!(amount = %transaction.amount, "Rejected transaction amount");
            return Ok(None);
        };

        let mut conn = self.db.acquire().await?;
        // Only insert when the account and the category (if any) belong to the same user
        let result = sqlx::query(
            r#"
            INSERT INTO transactions (user_id, account_id, category_id, amount, type, description, date)
            SELECT ?, ?, ?, ?, ?, ?, ?
            WHERE EXISTS (SELECT 1 FROM accounts WHERE id = ? AND user_id = ?)
              AND (? IS NULL OR EXISTS (SELECT 1 FROM categories WHERE id = ? AND user_id = ?))
            "#,
        )
        .bind(transaction.user_id)
        .bind(transaction.account_id)
        .bind(transaction.category_id)
        .bind(minor)
        .bind(transaction.transaction_type.as_str())
        .bind(&transaction.description)
        .bind(transaction.date)
        .bind(transaction.account_id)
        .bind(transaction.user_id)
        .bind(transaction.category_id)
        .bind(transaction.category_id)
        .bind(transaction.user_id)
        .execute(&mut *conn)
        .await
        .map(|done| (done.rows_affected() > 0).then(|| done.last_insert_rowid()));

        let id = degrade("create transaction", result, None);
        match id {
            Some(id) => debug!(transaction_id = id, user_id = transaction.user_id, "Created transaction"),
            None => warn!(
                user_id = transaction.user_id,
                account_id = transaction.account_id,
                category_id = ?transaction.category_id,
                "Transaction not created"
            ),
        }
        Ok(id)
    }

    async fn get_by_id(&self, transaction_id: i64, user_id: i64) -> StorageResult<Option<Transaction>> {
        let sql = format!("{SELECT_TRANSACTIONS} WHERE t.id = ? AND t.user_id = ?");

        let mut conn = self.db.acquire().await?;
        let row = sqlx::query(&sql)
            .bind(transaction_id)
            .bind(user_id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(StorageError::from)
            .and_then(|row| row.as_ref().map(transaction_from_row).transpose());

        Ok(degrade("load transaction", row, None))
    }

    async fn list_by_user(&self, user_id: i64) -> StorageResult<Vec<Transaction>> {
        self.list_where("list transactions", "t.user_id = ?", &[user_id]).await
    }

    async fn list_by_account(&self, account_id: i64, user_id: i64) -> StorageResult<Vec<Transaction>> {
        self.list_where(
            "list transactions by account",
            "t.account_id = ? AND t.user_id = ?",
            &[account_id, user_id],
        )
        .await
    }

    async fn list_by_category(&self, category_id: i64, user_id: i64) -> StorageResult<Vec<Transaction>> {
        self.list_where(
            "list transactions by category",
            "t.category_id = ? AND t.user_id = ?",
            &[category_id, user_id],
        )
        .await
    }

    async fn update(&self, transaction: &Transaction) -> StorageResult<bool> {
        let Some(minor) = to_minor_units(transaction.amount) else {
            warn!(amount = %transaction.amount, "Rejected transaction amount");
            return Ok(false);
        };

        let mut conn = self.db.acquire().await?;
        let result = sqlx::query(
            r#"
            UPDATE transactions
            SET account_id = ?, category_id = ?, amount = ?, type = ?, description = ?, date = ?
            WHERE id = ? AND user_id = ?
              AND EXISTS (SELECT 1 FROM accounts WHERE id = ? AND user_id = ?)
              AND (? IS NULL OR EXISTS (SELECT 1 FROM categories WHERE id = ? AND user_id = ?))
            "#,
        )
        .bind(transaction.account_id)
        .bind(transaction.category_id)
        .bind(minor)
        .bind(transaction.transaction_type.as_str())
        .bind(&transaction.description)
        .bind(transaction.date)
        .bind(transaction.id)
        .bind(transaction.user_id)
        .bind(transaction.account_id)
        .bind(transaction.user_id)
        .bind(transaction.category_id)
        .bind(transaction.category_id)
        .bind(transaction.user_id)
        .execute(&mut *conn)
        .await
        .map(|done| done.rows_affected() > 0);

        Ok(degrade("update transaction", result, false))
    }

    async fn delete(&self, transaction_id: i64, user_id: i64) -> StorageResult<bool> {
        let mut conn = self.db.acquire().await?;
        let result = sqlx::query("DELETE FROM transactions WHERE id = ? AND user_id = ?")
            .bind(transaction_id)
            .bind(user_id)
            .execute(&mut *conn)
            .await
            .map(|done| done.rows_affected() > 0);

        Ok(degrade("delete transaction", result, false))
    }

    async fn get_account_balance(&self, account_id: i64, user_id: i64) -> StorageResult<Decimal> {
        let mut conn = self.db.acquire().await?;
        let minor: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(CASE type WHEN 'INCOME' THEN amount ELSE -amount END), 0)
            FROM transactions
            WHERE account_id = ? AND user_id = ?
            "#,
        )
        .bind(account_id)
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;

        Ok(from_minor_units(minor))
    }
}
