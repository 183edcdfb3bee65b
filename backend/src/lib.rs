//! # Finance Tracker Backend
//!
//! Persistence layer for a personal finance tracker: users, their accounts
//! and categories, and the income/expense transactions recorded against
//! them, stored in SQLite.

pub mod config;
pub mod logging;
pub mod password;
pub mod storage;

pub use config::AppConfig;
pub use storage::{Connection, DbConnection, StorageError};
