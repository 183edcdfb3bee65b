use async_trait::async_trait;
use shared::Category;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::{debug, error, info};

use crate::storage::connection::DbConnection;
use crate::storage::error::{degrade, StorageError, StorageResult};
use crate::storage::traits::CategoryStorage;

/// Repository for category operations
#[derive(Clone)]
pub struct CategoryRepository {
    db: DbConnection,
}

impl CategoryRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }
}

fn category_from_row(row: &SqliteRow) -> Result<Category, sqlx::Error> {
    Ok(Category {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        name: row.try_get("name")?,
    })
}

#[async_trait]
impl CategoryStorage for CategoryRepository {
    async fn create(&self, category: &Category) -> StorageResult<Option<i64>> {
        let mut conn = self.db.acquire().await?;
        let result = sqlx::query("INSERT INTO categories (user_id, name) VALUES (?, ?)")
            .bind(category.user_id)
            .bind(&category.name)
            .execute(&mut *conn)
            .await
            .map(|done| Some(done.last_insert_rowid()));

        let id = degrade("create category", result, None);
        if let Some(category_id) = id {
            debug!(category_id, user_id = category.user_id, "Created category");
        }
        Ok(id)
    }

    async fn get_by_id(&self, category_id: i64, user_id: i64) -> StorageResult<Option<Category>> {
        let mut conn = self.db.acquire().await?;
        let row = sqlx::query(
            r#"
            SELECT id, user_id, name
            FROM categories
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(category_id)
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await
        .and_then(|row| row.as_ref().map(category_from_row).transpose());

        Ok(degrade("load category", row, None))
    }

    async fn list_by_user(&self, user_id: i64) -> StorageResult<Vec<Category>> {
        let mut conn = self.db.acquire().await?;
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, name
            FROM categories
            WHERE user_id = ?
            ORDER BY name ASC, id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await
        .and_then(|rows| rows.iter().map(category_from_row).collect::<Result<Vec<_>, _>>());

        Ok(degrade("list categories", rows, Vec::new()))
    }

    async fn update(&self, category: &Category) -> StorageResult<bool> {
        let mut conn = self.db.acquire().await?;
        let result = sqlx::query("UPDATE categories SET name = ? WHERE id = ? AND user_id = ?")
            .bind(&category.name)
            .bind(category.id)
            .bind(category.user_id)
            .execute(&mut *conn)
            .await
            .map(|done| done.rows_affected() > 0);

        Ok(degrade("update category", result, false))
    }

    async fn delete(&self, category_id: i64, user_id: i64) -> StorageResult<bool> {
        const OPERATION: &str = "delete category";

        let mut tx = self.db.begin().await?;

        let steps = async {
            let detached = sqlx::query(
                "UPDATE transactions SET category_id = NULL WHERE category_id = ? AND user_id = ?",
            )
            .bind(category_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            let deleted = sqlx::query("DELETE FROM categories WHERE id = ? AND user_id = ?")
                .bind(category_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?
                .rows_affected()
                > 0;

            Ok::<_, sqlx::Error>((detached, deleted))
        }
        .await;

        match steps {
            Ok((detached, deleted)) => {
                tx.commit().await.map_err(|source| StorageError::RolledBack {
                    operation: OPERATION,
                    source,
                })?;
                info!(category_id, user_id, detached, deleted, "Deleted category");
                Ok(deleted)
            }
            Err(source) => {
                if let Err(e) = tx.rollback().await {
                    error!(category_id, error = %e, "Rollback failed");
                }
                error!(category_id, user_id, error = %source, "Category delete rolled back");
                Err(StorageError::RolledBack {
                    operation: OPERATION,
                    source,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::error::ConnectionError;
    use crate::storage::test_utils::TestEnvironment;
    use crate::storage::traits::TransactionStorage;
    use rust_decimal_macros::dec;
    use shared::TransactionType;

    fn category(user_id: i64, name: &str) -> Category {
        Category {
            id: 0,
            user_id,
            name: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_then_get_returns_same_category() {
        let env = TestEnvironment::new().await.expect("Failed to create test env");
        let user_id = env.create_user("alice").await;

        let input = category(user_id, "Groceries");
        let id = env.categories.create(&input).await.unwrap().expect("Category not created");

        let stored = env.categories.get_by_id(id, user_id).await.unwrap().expect("Category not found");
        assert_eq!(stored, Category { id, ..input });
    }

    #[tokio::test]
    async fn test_create_for_unknown_user_fails() {
        let env = TestEnvironment::new().await.expect("Failed to create test env");
        assert!(env.categories.create(&category(999, "Orphan")).await.unwrap().is_none());
        assert!(env.categories.list_by_user(999).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_by_user_sorted_by_name_and_owned_only() {
        let env = TestEnvironment::new().await.expect("Failed to create test env");
        let alice = env.create_user("alice").await;
        let bob = env.create_user("bob").await;

        env.create_category(alice, "Rent").await;
        env.create_category(bob, "Books").await;
        env.create_category(alice, "Dining").await;
        env.create_category(alice, "Utilities").await;

        let categories = env.categories.list_by_user(alice).await.unwrap();
        let names: Vec<&str> = categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Dining", "Rent", "Utilities"]);
        assert!(categories.iter().all(|c| c.user_id == alice));
    }

    #[tokio::test]
    async fn test_update_requires_matching_owner() {
        let env = TestEnvironment::new().await.expect("Failed to create test env");
        let alice = env.create_user("alice").await;
        let bob = env.create_user("bob").await;
        let id = env.create_category(alice, "Rent").await;

        assert!(!env.categories.update(&Category { id, user_id: bob, name: "Hijacked".into() }).await.unwrap());
        assert!(env.categories.update(&Category { id, user_id: alice, name: "Housing".into() }).await.unwrap());

        let stored = env.categories.get_by_id(id, alice).await.unwrap().unwrap();
        assert_eq!(stored.name, "Housing");
        assert!(env.categories.get_by_id(id, bob).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_detaches_transactions_then_removes_category() {
        let env = TestEnvironment::new().await.expect("Failed to create test env");
        let alice = env.create_user("alice").await;
        let account = env.create_account(alice, "Wallet").await;
        let food = env.create_category(alice, "Food").await;
        let rent = env.create_category(alice, "Rent").await;

        let t1 = env.create_transaction(alice, account, Some(food), dec!(12.40), TransactionType::Expense, "2025-02-01 12:00:00").await;
        let t2 = env.create_transaction(alice, account, Some(food), dec!(8.15), TransactionType::Expense, "2025-02-02 12:00:00").await;
        let t3 = env.create_transaction(alice, account, Some(rent), dec!(900), TransactionType::Expense, "2025-02-03 12:00:00").await;

        assert!(env.categories.delete(food, alice).await.expect("Delete failed"));

        assert!(env.categories.get_by_id(food, alice).await.unwrap().is_none());
        for id in [t1, t2] {
            let t = env.transactions.get_by_id(id, alice).await.unwrap().expect("Transaction lost");
            assert_eq!(t.category_id, None);
            assert_eq!(t.category_name, None);
        }
        let untouched = env.transactions.get_by_id(t3, alice).await.unwrap().unwrap();
        assert_eq!(untouched.category_id, Some(rent));
        assert!(env.transactions.list_by_category(food, alice).await.unwrap().is_empty());
        assert_eq!(env.transactions.list_by_user(alice).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_delete_by_other_user_changes_nothing() {
        let env = TestEnvironment::new().await.expect("Failed to create test env");
        let alice = env.create_user("alice").await;
        let bob = env.create_user("bob").await;
        let account = env.create_account(alice, "Wallet").await;
        let food = env.create_category(alice, "Food").await;
        let t = env.create_transaction(alice, account, Some(food), dec!(5), TransactionType::Expense, "2025-02-01 12:00:00").await;

        assert!(!env.categories.delete(food, bob).await.expect("Delete errored"));

        assert!(env.categories.get_by_id(food, alice).await.unwrap().is_some());
        let stored = env.transactions.get_by_id(t, alice).await.unwrap().unwrap();
        assert_eq!(stored.category_id, Some(food));
    }

    #[tokio::test]
    async fn test_failed_delete_rolls_back_both_steps() {
        let env = TestEnvironment::new().await.expect("Failed to create test env");
        let alice = env.create_user("alice").await;
        let account = env.create_account(alice, "Wallet").await;
        let locked = env.create_category(alice, "Locked").await;
        let t = env.create_transaction(alice, account, Some(locked), dec!(20), TransactionType::Expense, "2025-02-01 12:00:00").await;

        // Make the second step fail after the first has already run
        sqlx::query(
            r#"
            CREATE TRIGGER refuse_locked_category_delete
            BEFORE DELETE ON categories
            WHEN OLD.name = 'Locked'
            BEGIN
                SELECT RAISE(ABORT, 'category is locked');
            END;
            "#,
        )
        .execute(env.connection.pool())
        .await
        .expect("Failed to create trigger");

        let result = env.categories.delete(locked, alice).await;
        assert!(matches!(
            result,
            Err(StorageError::RolledBack { operation: "delete category", .. })
        ));

        // Neither the detach nor the delete survived
        assert!(env.categories.get_by_id(locked, alice).await.unwrap().is_some());
        let stored = env.transactions.get_by_id(t, alice).await.unwrap().unwrap();
        assert_eq!(stored.category_id, Some(locked));
        assert_eq!(stored.category_name.as_deref(), Some("Locked"));
    }

    #[tokio::test]
    async fn test_delete_on_closed_pool_is_connection_error() {
        let env = TestEnvironment::new().await.expect("Failed to create test env");
        let alice = env.create_user("alice").await;
        let food = env.create_category(alice, "Food").await;
        env.connection.close().await;

        let result = env.categories.delete(food, alice).await;
        assert!(matches!(
            result,
            Err(StorageError::Connection(ConnectionError::Acquire(_)))
        ));
    }
}
