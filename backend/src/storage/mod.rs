//! # Storage Module
//!
//! SQLite persistence for users, accounts, categories and transactions.
//!
//! ## Layout
//!
//! - [`connection::DbConnection`] owns the bounded pool and the schema
//! - [`traits`] defines one async storage trait per entity
//! - [`repositories`] holds the SQLite implementations
//!
//! Every call checks out a single pooled connection for its duration.
//! Category deletion is the only operation that runs inside an explicit
//! database transaction.

pub mod connection;
pub mod error;
pub mod repositories;
pub mod traits;

#[cfg(test)]
pub mod test_utils;

pub use connection::DbConnection;
pub use error::{ConnectionError, StorageError, StorageResult};
pub use repositories::{AccountRepository, CategoryRepository, TransactionRepository, UserRepository};
pub use traits::{
    AccountStorage, CategoryStorage, Connection, CreateUserOutcome, TransactionStorage, UserStorage,
};
