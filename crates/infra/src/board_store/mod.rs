//! Board store boundary.
//!
//! The board store is the sole writer of card state. Every mutating operation
//! runs as one atomic region so the ordering model's invariants hold after
//! each commit.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryBoardStore;
pub use postgres::PostgresBoardStore;
pub use r#trait::{BoardStore, BoardStoreError};
