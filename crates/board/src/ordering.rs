//! Ordering and capacity rules.
//!
//! Pure predicates over lanes and card positions. Stores call these inside
//! their atomic regions; nothing here resolves races.

use std::collections::{HashMap, HashSet};

use laundry_core::{CardId, DomainError, DomainResult};

use crate::card::Card;
use crate::command::PositionUpdate;
use crate::lane::{BoardLayout, Lane, LaneId};

/// Position given to the sole occupant of a single-card lane.
pub const CONSTRAINED_LANE_POSITION: i64 = 0;

/// True iff a lane may hold `proposed_count` cards.
pub fn capacity_check(lane: &Lane, proposed_count: usize) -> bool {
    match lane.max_cards {
        Some(max) => proposed_count <= max as usize,
        None => true,
    }
}

/// Tail position for a card appended to a lane: one past the current maximum
/// (or 1 for an empty lane).
///
/// Fails when the maximum is already `i64::MAX`; there is no free tail
/// position left and reusing the maximum would collide.
pub fn next_intake_position(
    existing_positions_in_lane: impl IntoIterator<Item = i64>,
) -> DomainResult<i64> {
    let max = existing_positions_in_lane.into_iter().max().unwrap_or(0);
    max.checked_add(1).ok_or_else(|| {
        DomainError::validation(format!(
            "no position left after {max}; reorder the lane to free its tail"
        ))
    })
}

/// Sentinel position for single-card lanes, where order among occupants is moot.
pub fn reset_position_for_constrained_lane() -> i64 {
    CONSTRAINED_LANE_POSITION
}

/// Position for a card entering `lane` without an explicit target position.
///
/// Single-card lanes use the sentinel; every other lane (the intake lane and
/// lanes allowing more than one card) appends at the tail so positions stay
/// unique.
pub fn entry_position(
    lane: &Lane,
    existing_positions_in_lane: impl IntoIterator<Item = i64>,
) -> DomainResult<i64> {
    if lane.max_cards == Some(1) {
        Ok(reset_position_for_constrained_lane())
    } else {
        next_intake_position(existing_positions_in_lane)
    }
}

/// Check that a committed card set is a legal board state: identities are
/// unique, no lane exceeds its maximum, and positions are unique per lane.
pub fn validate_snapshot(layout: &BoardLayout, cards: &[Card]) -> DomainResult<()> {
    let mut ids = HashSet::with_capacity(cards.len());
    let mut per_lane: HashMap<LaneId, HashSet<i64>> = HashMap::new();

    for card in cards {
        if !ids.insert(card.id) {
            return Err(DomainError::validation(format!("card {} appears twice", card.id)));
        }
        if !per_lane.entry(card.lane).or_default().insert(card.position) {
            return Err(DomainError::validation(format!(
                "position {} is held by more than one card in lane {}",
                card.position, card.lane
            )));
        }
    }

    for (lane_id, positions) in &per_lane {
        if !capacity_check(layout.lane(*lane_id), positions.len()) {
            return Err(DomainError::capacity(lane_id));
        }
    }

    Ok(())
}

/// Resolve the single lane a reorder applies to.
///
/// `current_lanes` holds the current lane of every card named in the payload.
/// When the client named a lane, every card must already be in it; otherwise
/// all cards must share one lane. Returns `None` only for an empty payload
/// with no named lane.
pub fn reorder_target_lane(
    requested: Option<LaneId>,
    current_lanes: impl IntoIterator<Item = (CardId, LaneId)>,
) -> DomainResult<Option<LaneId>> {
    let mut target = requested;
    for (card_id, lane) in current_lanes {
        match target {
            None => target = Some(lane),
            Some(expected) if expected != lane => {
                return Err(DomainError::validation(format!(
                    "card {card_id} is in lane {lane}, not {expected}; a reorder must stay within one lane"
                )));
            }
            Some(_) => {}
        }
    }
    Ok(target)
}

/// Check that applying `updates` leaves positions unique within `lane`.
///
/// `untouched` are the positions of cards in the lane that the payload does
/// not mention.
pub fn check_reorder_positions(
    lane: LaneId,
    untouched: impl IntoIterator<Item = i64>,
    updates: &[PositionUpdate],
) -> DomainResult<()> {
    let taken: HashSet<i64> = untouched.into_iter().collect();
    match updates.iter().find(|u| taken.contains(&u.position)) {
        Some(clash) => Err(DomainError::validation(format!(
            "position {} is already held by another card in lane {lane}",
            clash.position
        ))),
        None => Ok(()),
    }
}

/// Sort cards by lane (display order) then position. Creation time and id
/// break ties so listings are deterministic.
pub fn sort_for_listing(layout: &BoardLayout, cards: &mut [Card]) {
    cards.sort_by(|a, b| {
        layout
            .rank(a.lane)
            .cmp(&layout.rank(b.lane))
            .then(a.position.cmp(&b.position))
            .then(a.created_at.cmp(&b.created_at))
            .then(a.id.cmp(&b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardStyling;
    use chrono::Utc;

    fn card(lane: LaneId, position: i64) -> Card {
        Card {
            id: CardId::new(),
            title: "load".to_string(),
            lane,
            position,
            created_at: Utc::now(),
            styling: CardStyling::default(),
        }
    }

    #[test]
    fn unbounded_lanes_accept_any_count() {
        let queue = Lane::unbounded(LaneId::Queue, "Queue");
        assert!(capacity_check(&queue, 0));
        assert!(capacity_check(&queue, 10_000));
    }

    #[test]
    fn bounded_lanes_accept_up_to_their_maximum() {
        let washer = Lane::bounded(LaneId::Washer, "In Washer", 1);
        assert!(capacity_check(&washer, 1));
        assert!(!capacity_check(&washer, 2));
    }

    #[test]
    fn empty_lane_starts_at_one() {
        assert_eq!(next_intake_position(Vec::new()), Ok(1));
    }

    #[test]
    fn next_position_follows_the_maximum_not_the_count() {
        assert_eq!(next_intake_position(vec![4, 1, 9]), Ok(10));
    }

    #[test]
    fn lane_topped_at_i64_max_has_no_next_position() {
        let err = next_intake_position(vec![3, i64::MAX]).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(next_intake_position(vec![i64::MAX - 1]), Ok(i64::MAX));

        let queue = Lane::unbounded(LaneId::Queue, "Queue");
        assert!(entry_position(&queue, vec![i64::MAX]).is_err());
        let washer = Lane::bounded(LaneId::Washer, "In Washer", 1);
        assert_eq!(entry_position(&washer, vec![i64::MAX]), Ok(CONSTRAINED_LANE_POSITION));
    }

    #[test]
    fn single_card_lanes_use_the_sentinel() {
        let washer = Lane::bounded(LaneId::Washer, "In Washer", 1);
        assert_eq!(entry_position(&washer, vec![7]), Ok(CONSTRAINED_LANE_POSITION));
    }

    #[test]
    fn multi_card_lanes_append() {
        let dryer = Lane::bounded(LaneId::Dryer, "In Dryer", 3);
        assert_eq!(entry_position(&dryer, vec![1, 2]), Ok(3));
    }

    #[test]
    fn snapshot_rejects_position_collisions() {
        let layout = BoardLayout::laundry();
        let cards = vec![card(LaneId::Queue, 1), card(LaneId::Queue, 1)];
        assert!(validate_snapshot(&layout, &cards).is_err());
    }

    #[test]
    fn snapshot_allows_equal_positions_across_lanes() {
        let layout = BoardLayout::laundry();
        let cards = vec![card(LaneId::Queue, 0), card(LaneId::Washer, 0)];
        assert!(validate_snapshot(&layout, &cards).is_ok());
    }

    #[test]
    fn snapshot_rejects_overfull_lanes() {
        let layout = BoardLayout::laundry();
        let cards = vec![card(LaneId::Dryer, 0), card(LaneId::Dryer, 1)];
        assert_eq!(
            validate_snapshot(&layout, &cards),
            Err(DomainError::capacity(LaneId::Dryer))
        );
    }

    #[test]
    fn reorder_lane_defaults_to_the_cards_lane() {
        let lane = reorder_target_lane(None, vec![(CardId::new(), LaneId::Queue)]).unwrap();
        assert_eq!(lane, Some(LaneId::Queue));
    }

    #[test]
    fn reorder_rejects_mixed_lanes() {
        let err = reorder_target_lane(
            None,
            vec![(CardId::new(), LaneId::Queue), (CardId::new(), LaneId::Washer)],
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn reorder_rejects_cards_outside_the_named_lane() {
        let err = reorder_target_lane(Some(LaneId::Queue), vec![(CardId::new(), LaneId::Dryer)])
            .unwrap_err();
        assert!(err.to_string().contains("dryer"));
    }

    #[test]
    fn reorder_positions_may_not_collide_with_untouched_cards() {
        let updates = [PositionUpdate {
            card_id: CardId::new(),
            position: 2,
        }];
        assert!(check_reorder_positions(LaneId::Queue, vec![1, 3], &updates).is_ok());
        assert!(check_reorder_positions(LaneId::Queue, vec![2], &updates).is_err());
    }

    #[test]
    fn listing_groups_by_lane_then_position() {
        let layout = BoardLayout::laundry();
        let mut cards = vec![
            card(LaneId::Fold, 0),
            card(LaneId::Queue, 3),
            card(LaneId::Washer, 0),
            card(LaneId::Queue, 1),
        ];
        sort_for_listing(&layout, &mut cards);
        let order: Vec<_> = cards.iter().map(|c| (c.lane, c.position)).collect();
        assert_eq!(
            order,
            vec![
                (LaneId::Queue, 1),
                (LaneId::Queue, 3),
                (LaneId::Washer, 0),
                (LaneId::Fold, 0),
            ]
        );
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: the next intake position is strictly greater than every existing one.
            #[test]
            fn next_intake_position_exceeds_existing(
                positions in proptest::collection::vec(-1_000_000i64..1_000_000, 0..50)
            ) {
                let next = next_intake_position(positions.clone()).unwrap();
                prop_assert!(positions.iter().all(|p| *p < next));
            }

            /// Property: capacity_check agrees with the declared maximum.
            #[test]
            fn capacity_check_matches_maximum(max in 1u32..20, count in 0usize..40) {
                let lane = Lane::bounded(LaneId::Washer, "In Washer", max);
                prop_assert_eq!(capacity_check(&lane, count), count <= max as usize);
            }

            /// Property: repeatedly appending to a lane never produces a collision.
            #[test]
            fn appending_keeps_positions_unique(appends in 1usize..40) {
                let layout = BoardLayout::laundry();
                let mut cards: Vec<Card> = Vec::new();
                for _ in 0..appends {
                    let position = entry_position(
                        layout.lane(LaneId::Queue),
                        cards.iter().map(|c| c.position),
                    )
                    .unwrap();
                    cards.push(card(LaneId::Queue, position));
                }
                prop_assert!(validate_snapshot(&layout, &cards).is_ok());
            }
        }
    }
}
