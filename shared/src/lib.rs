use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A registered user as stored in the `users` table.
///
/// Only the salted password hash is ever held here; the raw password lives in
/// [`NewUser`] until registration hashes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    /// Unique, compared case-sensitively
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Registration form for a user that does not exist yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    /// Plaintext password, hashed before it reaches storage
    pub password: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// A named money container owned by one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub user_id: i64,
    pub account_name: String,
}

/// A named transaction classifier owned by one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
}

/// A signed monetary event.
///
/// `amount` is always a non-negative magnitude; `transaction_type` carries
/// the sign. `account_name` and `category_name` are filled in by reads that
/// join the owning account and category and are ignored on writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    pub account_id: i64,
    /// `None` once the category has been deleted
    pub category_id: Option<i64>,
    pub amount: Decimal,
    pub transaction_type: TransactionType,
    pub description: String,
    pub date: NaiveDateTime,
    #[serde(default)]
    pub account_name: Option<String>,
    #[serde(default)]
    pub category_name: Option<String>,
}

impl Transaction {
    /// Amount with the sign implied by the transaction type
    pub fn signed_amount(&self) -> Decimal {
        match self.transaction_type {
            TransactionType::Income => self.amount,
            TransactionType::Expense => -self.amount,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    /// Money added to the account
    Income,
    /// Money taken out of the account
    Expense,
}

impl TransactionType {
    /// Stored representation
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "INCOME",
            TransactionType::Expense => "EXPENSE",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTransactionType(pub String);

impl fmt::Display for UnknownTransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown transaction type: {}", self.0)
    }
}

impl std::error::Error for UnknownTransactionType {}

impl FromStr for TransactionType {
    type Err = UnknownTransactionType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INCOME" => Ok(TransactionType::Income),
            "EXPENSE" => Ok(TransactionType::Expense),
            other => Err(UnknownTransactionType(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn sample_transaction(transaction_type: TransactionType) -> Transaction {
        Transaction {
            id: 1,
            user_id: 1,
            account_id: 1,
            category_id: None,
            amount: dec!(12.50),
            transaction_type,
            description: "Groceries".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 3, 1)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap(),
            account_name: None,
            category_name: None,
        }
    }

    #[test]
    fn test_transaction_type_round_trips_through_stored_form() {
        for t in [TransactionType::Income, TransactionType::Expense] {
            assert_eq!(t.as_str().parse::<TransactionType>().unwrap(), t);
        }
    }

    #[test]
    fn test_transaction_type_parse_is_case_sensitive() {
        let err = "income".parse::<TransactionType>().unwrap_err();
        assert_eq!(err, UnknownTransactionType("income".to_string()));
    }

    #[test]
    fn test_signed_amount_follows_type() {
        assert_eq!(sample_transaction(TransactionType::Income).signed_amount(), dec!(12.50));
        assert_eq!(sample_transaction(TransactionType::Expense).signed_amount(), dec!(-12.50));
    }
}
