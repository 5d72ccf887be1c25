//! Board service: turns client intents into store calls.
//!
//! The service validates an intent's shape, hands the resulting command to the
//! store, and logs the outcome. Invariants are enforced by the store; errors
//! pass through unchanged so the boundary can map each kind to its own
//! response.

use chrono::{DateTime, Utc};

use laundry_board::{BoardCommand, BoardIntent, BoardLayout, Card};
use laundry_core::CardId;

use crate::board_store::{BoardStore, BoardStoreError};

/// Result of a successfully dispatched intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardOutcome {
    /// The created, moved or otherwise affected card.
    Card(Card),
    /// Number of position updates applied by a reorder.
    Reordered { updated: usize },
    Deleted(CardId),
}

#[derive(Debug, Clone)]
pub struct BoardService<S> {
    store: S,
}

impl<S> BoardService<S>
where
    S: BoardStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn layout(&self) -> &BoardLayout {
        self.store.layout()
    }

    /// All cards grouped by lane, in position order.
    pub async fn list(&self) -> Result<Vec<Card>, BoardStoreError> {
        self.store.list_all().await.inspect_err(|err| {
            tracing::error!(error = %err, "failed to list cards");
        })
    }

    pub async fn get(&self, card_id: CardId) -> Result<Card, BoardStoreError> {
        self.store.get(card_id).await
    }

    /// Validate and execute an intent, stamping new cards with the current time.
    pub async fn dispatch(&self, intent: BoardIntent) -> Result<BoardOutcome, BoardStoreError> {
        self.dispatch_at(intent, Utc::now()).await
    }

    pub async fn dispatch_at(
        &self,
        intent: BoardIntent,
        now: DateTime<Utc>,
    ) -> Result<BoardOutcome, BoardStoreError> {
        let kind = intent.kind();

        let result = match intent.into_command(now) {
            Ok(command) => self.execute(command).await,
            Err(err) => Err(err.into()),
        };

        match &result {
            Ok(outcome) => log_accepted(kind, outcome),
            Err(err @ BoardStoreError::Store(_)) => {
                tracing::error!(intent = kind, error = %err, "board intent failed");
            }
            Err(err) => {
                tracing::warn!(intent = kind, error = %err, "board intent rejected");
            }
        }

        result
    }

    async fn execute(&self, command: BoardCommand) -> Result<BoardOutcome, BoardStoreError> {
        match command {
            BoardCommand::CreateCard(cmd) => self.store.create(cmd).await.map(BoardOutcome::Card),
            BoardCommand::TransitionCard(cmd) => self
                .store
                .transition(cmd.card_id, cmd.target_lane)
                .await
                .map(BoardOutcome::Card),
            BoardCommand::ReorderLane(cmd) => {
                if cmd.is_empty() {
                    return Ok(BoardOutcome::Reordered { updated: 0 });
                }
                let updated = self.store.reorder(cmd).await?;
                Ok(BoardOutcome::Reordered { updated })
            }
            BoardCommand::DeleteCard(cmd) => {
                self.store.delete(cmd.card_id).await?;
                Ok(BoardOutcome::Deleted(cmd.card_id))
            }
        }
    }
}

fn log_accepted(kind: &'static str, outcome: &BoardOutcome) {
    match outcome {
        BoardOutcome::Card(card) => tracing::info!(
            intent = kind,
            card_id = %card.id,
            lane = %card.lane,
            position = card.position,
            "board intent accepted"
        ),
        BoardOutcome::Reordered { updated } => {
            tracing::info!(intent = kind, updated, "board intent accepted")
        }
        BoardOutcome::Deleted(card_id) => {
            tracing::info!(intent = kind, card_id = %card_id, "board intent accepted")
        }
    }
}
