//! Lanes: the closed set of stages a card can occupy.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use laundry_core::{DomainError, DomainResult};

/// Identifier of a lane.
///
/// The set is closed and known at compile time; every card's lane is one of
/// these values.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaneId {
    Queue,
    Washer,
    Dryer,
    Fold,
}

impl LaneId {
    pub const COUNT: usize = 4;

    pub const ALL: [LaneId; LaneId::COUNT] =
        [LaneId::Queue, LaneId::Washer, LaneId::Dryer, LaneId::Fold];

    pub fn as_str(self) -> &'static str {
        match self {
            LaneId::Queue => "queue",
            LaneId::Washer => "washer",
            LaneId::Dryer => "dryer",
            LaneId::Fold => "fold",
        }
    }

    fn index(self) -> usize {
        match self {
            LaneId::Queue => 0,
            LaneId::Washer => 1,
            LaneId::Dryer => 2,
            LaneId::Fold => 3,
        }
    }
}

impl core::fmt::Display for LaneId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LaneId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LaneId::ALL
            .into_iter()
            .find(|lane| lane.as_str() == s)
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "unknown lane '{s}' (expected one of: queue, washer, dryer, fold)"
                ))
            })
    }
}

/// Static lane descriptor: configuration, not a persisted entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lane {
    pub id: LaneId,
    pub title: String,
    /// Maximum number of cards the lane may hold; `None` means unbounded.
    #[serde(rename = "maxCards", skip_serializing_if = "Option::is_none", default)]
    pub max_cards: Option<u32>,
}

impl Lane {
    pub fn unbounded(id: LaneId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            max_cards: None,
        }
    }

    pub fn bounded(id: LaneId, title: impl Into<String>, max_cards: u32) -> Self {
        Self {
            id,
            title: title.into(),
            max_cards: Some(max_cards),
        }
    }

    pub fn is_constrained(&self) -> bool {
        self.max_cards.is_some()
    }
}

/// The full set of lane descriptors for a board plus its intake lane.
///
/// A layout is validated on construction, so lookups by `LaneId` never miss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardLayout {
    lanes: Vec<Lane>,
    /// `slots[lane.index()]` is the position of that lane in `lanes`.
    slots: [usize; LaneId::COUNT],
    intake: LaneId,
}

impl BoardLayout {
    /// Build a layout from descriptors in display order.
    ///
    /// Every `LaneId` must be declared exactly once, the intake lane must be
    /// unbounded, and no lane may declare a maximum of zero.
    pub fn new(lanes: Vec<Lane>, intake: LaneId) -> DomainResult<Self> {
        let mut slots = [usize::MAX; LaneId::COUNT];
        for (idx, lane) in lanes.iter().enumerate() {
            let slot = &mut slots[lane.id.index()];
            if *slot != usize::MAX {
                return Err(DomainError::validation(format!(
                    "lane {} is declared more than once",
                    lane.id
                )));
            }
            if lane.max_cards == Some(0) {
                return Err(DomainError::validation(format!(
                    "lane {} declares a maximum of zero cards",
                    lane.id
                )));
            }
            *slot = idx;
        }

        if let Some(missing) = LaneId::ALL.into_iter().find(|l| slots[l.index()] == usize::MAX) {
            return Err(DomainError::validation(format!("lane {missing} is not declared")));
        }

        if lanes[slots[intake.index()]].is_constrained() {
            return Err(DomainError::validation(format!(
                "intake lane {intake} must not declare a maximum"
            )));
        }

        Ok(Self {
            lanes,
            slots,
            intake,
        })
    }

    /// The laundry board: an unbounded queue followed by three single-load machines.
    pub fn laundry() -> Self {
        Self {
            lanes: vec![
                Lane::unbounded(LaneId::Queue, "Queue"),
                Lane::bounded(LaneId::Washer, "In Washer", 1),
                Lane::bounded(LaneId::Dryer, "In Dryer", 1),
                Lane::bounded(LaneId::Fold, "Fold Ready", 1),
            ],
            slots: [0, 1, 2, 3],
            intake: LaneId::Queue,
        }
    }

    /// Lane descriptors in display order.
    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    pub fn lane(&self, id: LaneId) -> &Lane {
        &self.lanes[self.slots[id.index()]]
    }

    pub fn intake(&self) -> LaneId {
        self.intake
    }

    /// Display rank of a lane; listings group cards by this rank.
    pub fn rank(&self, id: LaneId) -> usize {
        self.slots[id.index()]
    }
}

impl Default for BoardLayout {
    fn default() -> Self {
        Self::laundry()
    }
}
