use async_trait::async_trait;
use shared::{NewUser, User};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::{debug, info, warn};

use crate::password::{hash_password, verify_password};
use crate::storage::connection::DbConnection;
use crate::storage::error::{degrade, StorageResult};
use crate::storage::traits::{CreateUserOutcome, UserStorage};

/// Repository for user operations
#[derive(Clone)]
pub struct UserRepository {
    db: DbConnection,
}

impl UserRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }
}

fn user_from_row(row: &SqliteRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
        email: row.try_get("email")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}

#[async_trait]
impl UserStorage for UserRepository {
    async fn authenticate(&self, username: &str, password: &str) -> StorageResult<Option<User>> {
        let mut conn = self.db.acquire().await?;
        let row = sqlx::query(
            r#"
            SELECT id, username, password_hash, email, first_name, last_name
            FROM users
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(&mut *conn)
        .await
        .and_then(|row| row.as_ref().map(user_from_row).transpose());

        let user = degrade("authenticate user", row, None);
        Ok(user.filter(|user| {
            let verified = verify_password(password, &user.password_hash);
            if !verified {
                warn!(username, "Password did not match");
            }
            verified
        }))
    }

    async fn create(&self, user: &NewUser) -> StorageResult<CreateUserOutcome> {
        let hashed = hash_password(&user.password).map(Some);
        let Some(password_hash) = degrade("hash password", hashed, None) else {
            return Ok(CreateUserOutcome::Failed);
        };
        let mut conn = self.db.acquire().await?;
        let result = sqlx::query(
            r#"
            INSERT INTO users (username, password_hash, email, first_name, last_name)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.username)
        .bind(&password_hash)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .execute(&mut *conn)
        .await;

        let outcome = match result {
            Ok(done) => {
                let id = done.last_insert_rowid();
                info!(user_id = id, username = %user.username, "Registered user");
                CreateUserOutcome::Created(id)
            }
            Err(e) if is_unique_violation(&e) => {
                debug!(username = %user.username, "Username already taken");
                CreateUserOutcome::UsernameTaken
            }
            Err(e) => degrade("create user", Err(e), CreateUserOutcome::Failed),
        };
        Ok(outcome)
    }

    async fn get_by_id(&self, user_id: i64) -> StorageResult<Option<User>> {
        let mut conn = self.db.acquire().await?;
        let row = sqlx::query(
            r#"
            SELECT id, username, password_hash, email, first_name, last_name
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await
        .and_then(|row| row.as_ref().map(user_from_row).transpose());

        Ok(degrade("load user", row, None))
    }

    async fn update(&self, user: &User) -> StorageResult<bool> {
        let mut conn = self.db.acquire().await?;
        let result = sqlx::query(
            r#"
            UPDATE users
            SET username = ?, email = ?, first_name = ?, last_name = ?
            WHERE id = ?
            "#,
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.id)
        .execute(&mut *conn)
        .await
        .map(|done| done.rows_affected() > 0);

        Ok(degrade("update user", result, false))
    }

    async fn change_password(&self, user_id: i64, new_password: &str) -> StorageResult<bool> {
        let hashed = hash_password(new_password).map(Some);
        let Some(password_hash) = degrade("hash password", hashed, None) else {
            return Ok(false);
        };
        let mut conn = self.db.acquire().await?;
        let result = sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(&password_hash)
            .bind(user_id)
            .execute(&mut *conn)
            .await
            .map(|done| done.rows_affected() > 0);

        Ok(degrade("change password", result, false))
    }

    async fn username_exists(&self, username: &str) -> StorageResult<bool> {
        let mut conn = self.db.acquire().await?;
        let result = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE username = ?")
            .bind(username)
            .fetch_one(&mut *conn)
            .await
            .map(|count| count > 0);

        Ok(degrade("check username", result, false))
    }
}
