//! Test utilities shared by the repository tests
//!
//! Each environment owns a private in-memory database that disappears with
//! the pool, so tests never see each other's rows.
use anyhow::Result;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use shared::{Account, Category, NewUser, Transaction, TransactionType};

use super::connection::DbConnection;
use super::repositories::{
    AccountRepository, CategoryRepository, TransactionRepository, UserRepository,
};
use super::traits::{AccountStorage, CategoryStorage, Connection, TransactionStorage, UserStorage};

/// Parse a `YYYY-MM-DD HH:MM:SS` literal
pub fn date(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").expect("Invalid test date")
}

/// A fresh database with one repository per entity
pub struct TestEnvironment {
    pub connection: DbConnection,
    pub users: UserRepository,
    pub accounts: AccountRepository,
    pub categories: CategoryRepository,
    pub transactions: TransactionRepository,
}

impl TestEnvironment {
    pub async fn new() -> Result<Self> {
        let connection = DbConnection::init_test().await?;
        Ok(Self {
            users: connection.create_user_repository(),
            accounts: connection.create_account_repository(),
            categories: connection.create_category_repository(),
            transactions: connection.create_transaction_repository(),
            connection,
        })
    }

    /// Register a user with password "password" and return its id
    pub async fn create_user(&self, username: &str) -> i64 {
        let user = NewUser {
            username: username.to_string(),
            password: "password".to_string(),
            email: format!("{}@example.com", username),
            first_name: username.to_string(),
            last_name: "Tester".to_string(),
        };
        self.users
            .create(&user)
            .await
            .expect("Failed to create user")
            .id()
            .expect("User was not created")
    }

    pub async fn create_account(&self, user_id: i64, name: &str) -> i64 {
        let account = Account {
            id: 0,
            user_id,
            account_name: name.to_string(),
        };
        self.accounts
            .create(&account)
            .await
            .expect("Failed to create account")
            .expect("Account was not created")
    }

    pub async fn create_category(&self, user_id: i64, name: &str) -> i64 {
        let category = Category {
            id: 0,
            user_id,
            name: name.to_string(),
        };
        self.categories
            .create(&category)
            .await
            .expect("Failed to create category")
            .expect("Category was not created")
    }

    pub async fn create_transaction(
        &self,
        user_id: i64,
        account_id: i64,
        category_id: Option<i64>,
        amount: Decimal,
        transaction_type: TransactionType,
        when: &str,
    ) -> i64 {
        let transaction = Transaction {
            id: 0,
            user_id,
            account_id,
            category_id,
            amount,
            transaction_type,
            description: format!("{} {}", transaction_type, amount),
            date: date(when),
            account_name: None,
            category_name: None,
        };
        self.transactions
            .create(&transaction)
            .await
            .expect("Failed to create transaction")
            .expect("Transaction was not created")
    }
}
