//! Board ordering model.
//!
//! This crate defines what a legal board state is: the closed set of lanes,
//! per-lane capacity, intra-lane ordering, and the typed commands that may
//! mutate a board. It is pure domain logic (no IO, no HTTP, no storage).

pub mod card;
pub mod command;
pub mod lane;
pub mod ordering;

pub use card::{validate_title, Card, CardStyling};
pub use command::{
    BoardCommand, BoardIntent, CreateCard, CreateIntent, DeleteCard, DeleteIntent, PositionUpdate,
    ReorderIntent, ReorderLane, RepositionIntent, TransitionCard, TransitionIntent,
};
pub use lane::{BoardLayout, Lane, LaneId};
pub use ordering::{
    capacity_check, check_reorder_positions, entry_position, next_intake_position,
    reorder_target_lane, reset_position_for_constrained_lane, sort_for_listing, validate_snapshot,
    CONSTRAINED_LANE_POSITION,
};
