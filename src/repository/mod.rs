pub mod activity_repository;
pub mod address_repository;
pub mod balance_repository;
pub mod database;
pub mod models;

pub use activity_repository::{ActivityRepository, ActivityStats};
pub use address_repository::AddressRepository;
pub use balance_repository::BalanceRepository;
pub use database::Database;
pub use models::{BalanceSnapshot, StoredActivity, TrackedAddress};
