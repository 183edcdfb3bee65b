//! # Storage Traits
//!
//! Storage abstraction for each entity. Every operation on an owned entity
//! (account, category, transaction) takes the acting user's id and scopes
//! its query to it; there is no other access control.
//!
//! Result conventions:
//! - `Err` only for connection failures and rolled-back multi-statement
//!   work (plus balance queries, where zero is a real answer)
//! - lookups that fail or miss return `Ok(None)`
//! - mutations that fail or match no row return `Ok(false)`

use async_trait::async_trait;
use rust_decimal::Decimal;
use shared::{Account, Category, NewUser, Transaction, User};

use super::error::StorageResult;

/// Result of registering a user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateUserOutcome {
    /// The user was stored under this id
    Created(i64),
    /// Another user already has this username
    UsernameTaken,
    /// The insert failed for another reason (logged)
    Failed,
}

impl CreateUserOutcome {
    pub fn id(&self) -> Option<i64> {
        match self {
            CreateUserOutcome::Created(id) => Some(*id),
            _ => None,
        }
    }
}

#[async_trait]
pub trait UserStorage: Send + Sync {
    /// Look up a user by exact username and verify the password
    async fn authenticate(&self, username: &str, password: &str) -> StorageResult<Option<User>>;

    /// Register a new user, hashing the password
    async fn create(&self, user: &NewUser) -> StorageResult<CreateUserOutcome>;

    async fn get_by_id(&self, user_id: i64) -> StorageResult<Option<User>>;

    /// Overwrite the username, email and names of the user with `user.id`.
    ///
    /// `user.password_hash` is ignored; passwords change only through
    /// [`UserStorage::change_password`].
    async fn update(&self, user: &User) -> StorageResult<bool>;

    /// Replace the user's password with a fresh hash of `new_password`
    async fn change_password(&self, user_id: i64, new_password: &str) -> StorageResult<bool>;

    /// Case-sensitive exact match
    async fn username_exists(&self, username: &str) -> StorageResult<bool>;
}

#[async_trait]
pub trait AccountStorage: Send + Sync {
    /// Store a new account and return its generated id
    async fn create(&self, account: &Account) -> StorageResult<Option<i64>>;

    async fn get_by_id(&self, account_id: i64, user_id: i64) -> StorageResult<Option<Account>>;

    /// Accounts of a user in insertion order
    async fn list_by_user(&self, user_id: i64) -> StorageResult<Vec<Account>>;

    /// Rename the account matching both `account.id` and `account.user_id`
    async fn update(&self, account: &Account) -> StorageResult<bool>;

    async fn delete(&self, account_id: i64, user_id: i64) -> StorageResult<bool>;
}

#[async_trait]
pub trait CategoryStorage: Send + Sync {
    async fn create(&self, category: &Category) -> StorageResult<Option<i64>>;

    async fn get_by_id(&self, category_id: i64, user_id: i64) -> StorageResult<Option<Category>>;

    /// Categories of a user ordered by name
    async fn list_by_user(&self, user_id: i64) -> StorageResult<Vec<Category>>;

    async fn update(&self, category: &Category) -> StorageResult<bool>;

    /// Detach the category from the user's transactions and delete it, atomically.
    ///
    /// Returns `Err(StorageError::RolledBack)` if either step fails, in which
    /// case neither step has taken effect.
    async fn delete(&self, category_id: i64, user_id: i64) -> StorageResult<bool>;
}

#[async_trait]
pub trait TransactionStorage: Send + Sync {
    async fn create(&self, transaction: &Transaction) -> StorageResult<Option<i64>>;

    /// Fetch one transaction with its account and category names filled in
    async fn get_by_id(&self, transaction_id: i64, user_id: i64) -> StorageResult<Option<Transaction>>;

    /// All of a user's transactions, newest first
    async fn list_by_user(&self, user_id: i64) -> StorageResult<Vec<Transaction>>;

    async fn list_by_account(&self, account_id: i64, user_id: i64) -> StorageResult<Vec<Transaction>>;

    async fn list_by_category(&self, category_id: i64, user_id: i64) -> StorageResult<Vec<Transaction>>;

    async fn update(&self, transaction: &Transaction) -> StorageResult<bool>;

    async fn delete(&self, transaction_id: i64, user_id: i64) -> StorageResult<bool>;

    /// Income minus expenses for the account; exactly zero with no transactions
    async fn get_account_balance(&self, account_id: i64, user_id: i64) -> StorageResult<Decimal>;
}

/// Trait defining the interface for storage connections
///
/// Provides factory methods for the repositories so callers can be written
/// against the traits above without naming the backend.
pub trait Connection: Send + Sync + Clone {
    type UserRepository: UserStorage;
    type AccountRepository: AccountStorage;
    type CategoryRepository: CategoryStorage;
    type TransactionRepository: TransactionStorage;

    fn create_user_repository(&self) -> Self::UserRepository;

    fn create_account_repository(&self) -> Self::AccountRepository;

    fn create_category_repository(&self) -> Self::CategoryRepository;

    fn create_transaction_repository(&self) -> Self::TransactionRepository;
}
