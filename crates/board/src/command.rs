//! Client intents and the typed commands they validate into.
//!
//! Intents mirror what a client can ask for; commands are what a board store
//! accepts. `BoardIntent::into_command` is the only bridge, so every command
//! reaching a store has already passed shape validation.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use laundry_core::{CardId, DomainError, DomainResult};

use crate::card::{validate_title, CardStyling};
use crate::lane::LaneId;

/// Intent: add a card to the intake lane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateIntent {
    pub title: String,
    pub background_color: Option<String>,
    pub text_color: Option<String>,
}

/// Intent: move a card to another lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionIntent {
    pub card_id: CardId,
    pub target_lane: LaneId,
}

/// Intent: set a single card's position within its current lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepositionIntent {
    pub card_id: CardId,
    pub position: i64,
}

/// One entry of a bulk reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub card_id: CardId,
    pub position: i64,
}

/// Intent: reassign positions among cards already within one lane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorderIntent {
    /// The lane the payload targets, when the client names it.
    pub lane: Option<LaneId>,
    pub updates: Vec<PositionUpdate>,
}

/// Intent: remove a card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteIntent {
    pub card_id: CardId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardIntent {
    Create(CreateIntent),
    Transition(TransitionIntent),
    Reposition(RepositionIntent),
    Reorder(ReorderIntent),
    Delete(DeleteIntent),
}

impl BoardIntent {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            BoardIntent::Create(_) => "create",
            BoardIntent::Transition(_) => "transition",
            BoardIntent::Reposition(_) => "reposition",
            BoardIntent::Reorder(_) => "reorder",
            BoardIntent::Delete(_) => "delete",
        }
    }

    /// Validate the intent's shape and produce a store command.
    pub fn into_command(self, now: DateTime<Utc>) -> DomainResult<BoardCommand> {
        match self {
            BoardIntent::Create(i) => Ok(BoardCommand::CreateCard(CreateCard::new(
                &i.title,
                CardStyling::new(i.background_color, i.text_color),
                now,
            )?)),
            BoardIntent::Transition(i) => Ok(BoardCommand::TransitionCard(TransitionCard {
                card_id: i.card_id,
                target_lane: i.target_lane,
            })),
            BoardIntent::Reposition(i) => Ok(BoardCommand::ReorderLane(ReorderLane::new(
                None,
                vec![PositionUpdate {
                    card_id: i.card_id,
                    position: i.position,
                }],
            )?)),
            BoardIntent::Reorder(i) => Ok(BoardCommand::ReorderLane(ReorderLane::new(
                i.lane, i.updates,
            )?)),
            BoardIntent::Delete(i) => Ok(BoardCommand::DeleteCard(DeleteCard {
                card_id: i.card_id,
            })),
        }
    }
}

/// Command: CreateCard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCard {
    title: String,
    styling: CardStyling,
    created_at: DateTime<Utc>,
}

impl CreateCard {
    pub fn new(title: &str, styling: CardStyling, created_at: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            title: validate_title(title)?,
            styling,
            created_at,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn styling(&self) -> &CardStyling {
        &self.styling
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Command: TransitionCard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionCard {
    pub card_id: CardId,
    pub target_lane: LaneId,
}

/// Command: ReorderLane.
///
/// Card ids and positions are each unique within the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorderLane {
    lane: Option<LaneId>,
    updates: Vec<PositionUpdate>,
}

impl ReorderLane {
    pub fn new(lane: Option<LaneId>, updates: Vec<PositionUpdate>) -> DomainResult<Self> {
        let mut ids = HashSet::with_capacity(updates.len());
        let mut positions = HashSet::with_capacity(updates.len());
        for update in &updates {
            if !ids.insert(update.card_id) {
                return Err(DomainError::validation(format!(
                    "card {} appears more than once in the reorder payload",
                    update.card_id
                )));
            }
            if !positions.insert(update.position) {
                return Err(DomainError::validation(format!(
                    "position {} is assigned more than once in the reorder payload",
                    update.position
                )));
            }
        }
        Ok(Self { lane, updates })
    }

    pub fn lane(&self) -> Option<LaneId> {
        self.lane
    }

    pub fn updates(&self) -> &[PositionUpdate] {
        &self.updates
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}

/// Command: DeleteCard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteCard {
    pub card_id: CardId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardCommand {
    CreateCard(CreateCard),
    TransitionCard(TransitionCard),
    ReorderLane(ReorderLane),
    DeleteCard(DeleteCard),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(card_id: CardId, position: i64) -> PositionUpdate {
        PositionUpdate { card_id, position }
    }

    #[test]
    fn create_rejects_blank_title() {
        let intent = BoardIntent::Create(CreateIntent {
            title: "  ".to_string(),
            background_color: None,
            text_color: None,
        });
        assert!(matches!(
            intent.into_command(Utc::now()),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn create_stamps_the_creation_time() {
        let now = Utc::now();
        let intent = BoardIntent::Create(CreateIntent {
            title: "Whites".to_string(),
            background_color: Some("#ffffff".to_string()),
            text_color: Some(String::new()),
        });
        let BoardCommand::CreateCard(cmd) = intent.into_command(now).unwrap() else {
            panic!("expected CreateCard");
        };
        assert_eq!(cmd.title(), "Whites");
        assert_eq!(cmd.created_at(), now);
        assert_eq!(cmd.styling().background_color.as_deref(), Some("#ffffff"));
        assert_eq!(cmd.styling().text_color, None);
    }

    #[test]
    fn reposition_becomes_single_entry_reorder() {
        let id = CardId::new();
        let intent = BoardIntent::Reposition(RepositionIntent {
            card_id: id,
            position: 5,
        });
        let BoardCommand::ReorderLane(cmd) = intent.into_command(Utc::now()).unwrap() else {
            panic!("expected ReorderLane");
        };
        assert_eq!(cmd.lane(), None);
        assert_eq!(cmd.updates(), &[update(id, 5)]);
    }

    #[test]
    fn reorder_rejects_duplicate_cards() {
        let id = CardId::new();
        let err = ReorderLane::new(None, vec![update(id, 0), update(id, 1)]).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn reorder_rejects_duplicate_positions() {
        let err = ReorderLane::new(
            Some(LaneId::Queue),
            vec![update(CardId::new(), 0), update(CardId::new(), 0)],
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn empty_reorder_is_accepted() {
        let cmd = ReorderLane::new(Some(LaneId::Queue), Vec::new()).unwrap();
        assert!(cmd.is_empty());
    }

    #[test]
    fn intent_kinds_are_stable() {
        let id = CardId::new();
        assert_eq!(BoardIntent::Delete(DeleteIntent { card_id: id }).kind(), "delete");
        assert_eq!(
            BoardIntent::Transition(TransitionIntent {
                card_id: id,
                target_lane: LaneId::Dryer
            })
            .kind(),
            "transition"
        );
    }
}
