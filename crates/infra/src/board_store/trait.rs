use std::sync::Arc;

use thiserror::Error;

use laundry_board::{BoardLayout, Card, CreateCard, LaneId, ReorderLane};
use laundry_core::{CardId, DomainError};

/// Board store operation error.
///
/// Domain rejections (validation, missing card, full lane) are kept distinct
/// from storage failures so the boundary can give each its own response.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BoardStoreError {
    /// Malformed or empty required input; nothing was written.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced card does not exist.
    #[error("card {0} not found")]
    NotFound(String),

    /// The target lane already holds its maximum number of cards.
    #[error("lane {0} already has a card")]
    Capacity(String),

    /// The backing store failed. Not retried.
    #[error("store failure: {0}")]
    Store(String),
}

impl BoardStoreError {
    pub fn not_found(card_id: CardId) -> Self {
        Self::NotFound(card_id.to_string())
    }

    pub fn capacity(lane: LaneId) -> Self {
        Self::Capacity(lane.to_string())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// True for rejections caused by the request rather than the store.
    pub fn is_domain(&self) -> bool {
        !matches!(self, Self::Store(_))
    }
}

impl From<DomainError> for BoardStoreError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => Self::Validation(msg),
            DomainError::InvalidId(msg) => Self::Validation(msg),
            DomainError::NotFound(what) => Self::NotFound(what),
            DomainError::Capacity(lane) => Self::Capacity(lane),
        }
    }
}

/// Authoritative card storage.
///
/// Implementations must make each mutating call atomic with respect to the
/// lane capacity and position-uniqueness invariants: the capacity check in
/// `transition` and the write that follows it happen in one critical region,
/// and `reorder` applies every update or none.
#[async_trait::async_trait]
pub trait BoardStore: Send + Sync {
    /// Lane configuration this store enforces.
    fn layout(&self) -> &BoardLayout;

    /// All cards, sorted by lane (display order) then position.
    async fn list_all(&self) -> Result<Vec<Card>, BoardStoreError>;

    async fn get(&self, card_id: CardId) -> Result<Card, BoardStoreError>;

    /// Insert a card at the tail of the intake lane.
    async fn create(&self, command: CreateCard) -> Result<Card, BoardStoreError>;

    /// Move a card to `target_lane`, subject to the lane's capacity.
    ///
    /// Moving a card to the lane it already occupies returns it unchanged.
    async fn transition(&self, card_id: CardId, target_lane: LaneId) -> Result<Card, BoardStoreError>;

    /// Apply a set of position updates within one lane as a single unit.
    ///
    /// Returns the number of cards updated.
    async fn reorder(&self, command: ReorderLane) -> Result<usize, BoardStoreError>;

    /// Remove a card. Surviving positions are left as they are.
    async fn delete(&self, card_id: CardId) -> Result<(), BoardStoreError>;
}

#[async_trait::async_trait]
impl<S> BoardStore for Arc<S>
where
    S: BoardStore + ?Sized,
{
    fn layout(&self) -> &BoardLayout {
        (**self).layout()
    }

    async fn list_all(&self) -> Result<Vec<Card>, BoardStoreError> {
        (**self).list_all().await
    }

    async fn get(&self, card_id: CardId) -> Result<Card, BoardStoreError> {
        (**self).get(card_id).await
    }

    async fn create(&self, command: CreateCard) -> Result<Card, BoardStoreError> {
        (**self).create(command).await
    }

    async fn transition(&self, card_id: CardId, target_lane: LaneId) -> Result<Card, BoardStoreError> {
        (**self).transition(card_id, target_lane).await
    }

    async fn reorder(&self, command: ReorderLane) -> Result<usize, BoardStoreError> {
        (**self).reorder(command).await
    }

    async fn delete(&self, card_id: CardId) -> Result<(), BoardStoreError> {
        (**self).delete(card_id).await
    }
}
