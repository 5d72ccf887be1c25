use std::sync::Arc;

use anyhow::Context;

use laundry_board::BoardLayout;
use laundry_infra::{BoardService, BoardStore, InMemoryBoardStore, PostgresBoardStore, StoreBackend};

/// Board service shared by all handlers.
pub type AppServices = BoardService<Arc<dyn BoardStore>>;

pub async fn build_services(backend: &StoreBackend) -> anyhow::Result<AppServices> {
    match backend {
        StoreBackend::InMemory => {
            tracing::info!("using in-memory board store");
            Ok(in_memory_services())
        }
        StoreBackend::Postgres { database_url } => {
            let store = PostgresBoardStore::connect(database_url, BoardLayout::laundry())
                .await
                .context("failed to initialize postgres board store")?;
            tracing::info!("using postgres board store");
            let store: Arc<dyn BoardStore> = Arc::new(store);
            Ok(BoardService::new(store))
        }
    }
}

/// In-memory wiring (dev/test).
pub fn in_memory_services() -> AppServices {
    let store: Arc<dyn BoardStore> = Arc::new(InMemoryBoardStore::new(BoardLayout::laundry()));
    BoardService::new(store)
}
