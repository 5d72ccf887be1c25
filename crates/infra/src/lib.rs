//! Infrastructure layer: board stores, the board service, and configuration.

pub mod board_service;
pub mod board_store;
pub mod config;

pub use board_service::{BoardOutcome, BoardService};
pub use board_store::{BoardStore, BoardStoreError, InMemoryBoardStore, PostgresBoardStore};
pub use config::{AppConfig, StoreBackend};
