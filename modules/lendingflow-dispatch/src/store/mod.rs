mod memory;
mod postgres;

pub use memory::MemoryDispatchStore;
pub use postgres::PostgresDispatchStore;
