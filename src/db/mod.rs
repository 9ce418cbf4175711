pub mod memory;
pub mod pool;
pub mod postgres;
pub mod queries;
pub mod store;

pub use memory::MemoryLedgerStore;
pub use pool::{create_pool, run_migrations};
pub use postgres::PgLedgerStore;
pub use store::LedgerStore;
