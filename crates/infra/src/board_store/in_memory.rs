use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use laundry_board::{
    capacity_check, check_reorder_positions, entry_position, next_intake_position, ordering,
    reorder_target_lane, validate_title, BoardLayout, Card, CreateCard, LaneId, ReorderLane,
};
use laundry_core::CardId;

use super::r#trait::{BoardStore, BoardStoreError};

/// In-memory board store.
///
/// A single mutex guards the whole card map, so every operation is one
/// critical section: concurrent transitions into a full lane cannot both
/// observe a vacancy, and reorders never become visible half-applied.
#[derive(Debug)]
pub struct InMemoryBoardStore {
    layout: BoardLayout,
    cards: Mutex<HashMap<CardId, Card>>,
}

impl InMemoryBoardStore {
    pub fn new(layout: BoardLayout) -> Self {
        Self {
            layout,
            cards: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<CardId, Card>>, BoardStoreError> {
        self.cards
            .lock()
            .map_err(|_| BoardStoreError::store("lock poisoned"))
    }

    fn positions_in(
        cards: &HashMap<CardId, Card>,
        lane: LaneId,
        except: Option<CardId>,
    ) -> Vec<i64> {
        cards
            .values()
            .filter(|c| c.lane == lane && Some(c.id) != except)
            .map(|c| c.position)
            .collect()
    }

    /// Re-validate the whole board in debug builds. Logs instead of panicking
    /// so a violation cannot poison the lock.
    fn debug_check(&self, cards: &HashMap<CardId, Card>) {
        if !cfg!(debug_assertions) {
            return;
        }
        let snapshot: Vec<Card> = cards.values().cloned().collect();
        if let Err(err) = ordering::validate_snapshot(&self.layout, &snapshot) {
            tracing::error!(error = %err, "board invariants violated");
        }
    }
}

impl Default for InMemoryBoardStore {
    fn default() -> Self {
        Self::new(BoardLayout::laundry())
    }
}

#[async_trait::async_trait]
impl BoardStore for InMemoryBoardStore {
    fn layout(&self) -> &BoardLayout {
        &self.layout
    }

    async fn list_all(&self) -> Result<Vec<Card>, BoardStoreError> {
        let mut all: Vec<Card> = self.lock()?.values().cloned().collect();
        ordering::sort_for_listing(&self.layout, &mut all);
        Ok(all)
    }

    async fn get(&self, card_id: CardId) -> Result<Card, BoardStoreError> {
        self.lock()?
            .get(&card_id)
            .cloned()
            .ok_or_else(|| BoardStoreError::not_found(card_id))
    }

    async fn create(&self, command: CreateCard) -> Result<Card, BoardStoreError> {
        let title = validate_title(command.title())?;
        let intake = self.layout.intake();

        let mut cards = self.lock()?;
        let position = next_intake_position(Self::positions_in(&cards, intake, None))?;
        let card = Card {
            id: CardId::new(),
            title,
            lane: intake,
            position,
            created_at: command.created_at(),
            styling: command.styling().clone(),
        };
        cards.insert(card.id, card.clone());
        self.debug_check(&cards);
        Ok(card)
    }

    async fn transition(&self, card_id: CardId, target_lane: LaneId) -> Result<Card, BoardStoreError> {
        let mut cards = self.lock()?;

        let current = cards
            .get(&card_id)
            .ok_or_else(|| BoardStoreError::not_found(card_id))?;
        if current.lane == target_lane {
            return Ok(current.clone());
        }

        let lane = self.layout.lane(target_lane);
        let others = Self::positions_in(&cards, target_lane, Some(card_id));
        if !capacity_check(lane, others.len() + 1) {
            return Err(BoardStoreError::capacity(target_lane));
        }
        let position = entry_position(lane, others)?;

        let card = cards
            .get_mut(&card_id)
            .ok_or_else(|| BoardStoreError::not_found(card_id))?;
        card.lane = target_lane;
        card.position = position;
        let moved = card.clone();

        self.debug_check(&cards);
        Ok(moved)
    }

    async fn reorder(&self, command: ReorderLane) -> Result<usize, BoardStoreError> {
        let mut cards = self.lock()?;

        // Validate everything before touching any card.
        let mut current_lanes = Vec::with_capacity(command.updates().len());
        for update in command.updates() {
            let card = cards
                .get(&update.card_id)
                .ok_or_else(|| BoardStoreError::not_found(update.card_id))?;
            current_lanes.push((card.id, card.lane));
        }
        let Some(lane) = reorder_target_lane(command.lane(), current_lanes)? else {
            return Ok(0);
        };
        let untouched: Vec<i64> = cards
            .values()
            .filter(|c| c.lane == lane && !command.updates().iter().any(|u| u.card_id == c.id))
            .map(|c| c.position)
            .collect();
        check_reorder_positions(lane, untouched, command.updates())?;

        for update in command.updates() {
            if let Some(card) = cards.get_mut(&update.card_id) {
                card.position = update.position;
            }
        }

        self.debug_check(&cards);
        Ok(command.updates().len())
    }

    async fn delete(&self, card_id: CardId) -> Result<(), BoardStoreError> {
        self.lock()?
            .remove(&card_id)
            .map(|_| ())
            .ok_or_else(|| BoardStoreError::not_found(card_id))
    }
}
