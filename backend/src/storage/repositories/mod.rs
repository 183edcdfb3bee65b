pub mod account_repository;
pub mod category_repository;
pub mod transaction_repository;
pub mod user_repository;

pub use account_repository::AccountRepository;
pub use category_repository::CategoryRepository;
pub use transaction_repository::TransactionRepository;
pub use user_repository::UserRepository;
