pub mod error;
pub mod memory_store;
pub mod models;
pub mod pool;
pub mod reading_repository;
pub mod rollup;
pub mod store;

pub use error::DbError;
pub use memory_store::MemoryStore;
pub use models::*;
pub use pool::connect;
pub use reading_repository::ReadingRepository;
pub use rollup::{rollup_by_day, rollup_by_month};
pub use store::{ReadingStore, SharedStore};
