pub mod in_memory;
pub mod postgres;

pub use in_memory::{InMemoryResourceStore, StoredRow};
pub use postgres::PostgresResourceStore;
