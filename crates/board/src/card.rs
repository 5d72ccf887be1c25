use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use laundry_core::{CardId, DomainError, DomainResult};

use crate::lane::LaneId;

/// Cosmetic styling for a card. Carries no invariant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardStyling {
    pub background_color: Option<String>,
    pub text_color: Option<String>,
}

impl CardStyling {
    /// Build styling from optional client input; blank strings count as unset.
    pub fn new(background_color: Option<String>, text_color: Option<String>) -> Self {
        Self {
            background_color: non_blank(background_color),
            text_color: non_blank(text_color),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// A discrete work item on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub title: String,
    pub lane: LaneId,
    /// Order among cards sharing `lane`. Meaningless across lanes.
    pub position: i64,
    pub created_at: DateTime<Utc>,
    pub styling: CardStyling,
}

/// Validate and normalize a card title.
pub fn validate_title(title: &str) -> DomainResult<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("title is required"));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_titles_are_rejected() {
        for title in ["", "   ", "\t\n"] {
            assert!(matches!(validate_title(title), Err(DomainError::Validation(_))));
        }
    }

    #[test]
    fn titles_are_trimmed() {
        assert_eq!(validate_title("  Whites ").unwrap(), "Whites");
    }

    #[test]
    fn blank_styling_is_unset() {
        let styling = CardStyling::new(Some("".into()), Some(" #fff ".into()));
        assert_eq!(styling.background_color, None);
        assert_eq!(styling.text_color.as_deref(), Some("#fff"));
    }
}
