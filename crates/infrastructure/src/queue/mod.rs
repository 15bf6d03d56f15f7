pub mod in_memory;
pub mod postgres;
pub mod retry;

pub use in_memory::InMemoryTaskQueue;
pub use postgres::PostgresTaskQueue;
pub use retry::retry_delay;
