use crate::domain::ListingId;
use serde::Serialize;

/// Marker stored in place of red-flag text when there are none.
pub const NO_RED_FLAGS: &str = "None";

const FLAG_MARKERS: &[char] = &['•', '-', '*', '–', '·', '⚠', '\u{fe0f}'];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum RedFlags {
    None,
    Flagged(String),
}

impl RedFlags {
    /// Normalizes free text: empty text or a literal "None" means no flags.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        let trimmed = text.trim();
        let bare = trimmed.trim_end_matches('.').trim();
        if bare.is_empty() || bare.eq_ignore_ascii_case(NO_RED_FLAGS) {
            Self::None
        } else {
            Self::Flagged(trimmed.to_string())
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::None => NO_RED_FLAGS,
            Self::Flagged(text) => text,
        }
    }

    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Individual flags with any bullet or warning marker stripped.
    #[must_use]
    pub fn lines(&self) -> Vec<&str> {
        match self {
            Self::None => Vec::new(),
            Self::Flagged(text) => text
                .lines()
                .map(|line| line.trim().trim_start_matches(FLAG_MARKERS).trim())
                .filter(|line| !line.is_empty())
                .collect(),
        }
    }
}

impl From<RedFlags> for String {
    fn from(flags: RedFlags) -> Self {
        match flags {
            RedFlags::None => NO_RED_FLAGS.to_string(),
            RedFlags::Flagged(text) => text,
        }
    }
}

/// A validated assessment of one listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub value_score: f64,
    pub value_points: Vec<String>,
    pub match_score: f64,
    pub match_points: Vec<String>,
    pub red_flags: RedFlags,
    /// The reply the scores were parsed from, kept for auditing.
    pub raw_response: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredEvaluation {
    pub listing_id: ListingId,
    pub evaluation: Evaluation,
    pub evaluated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_variants_normalize() {
        assert_eq!(RedFlags::from_text("None"), RedFlags::None);
        assert_eq!(RedFlags::from_text(" none. "), RedFlags::None);
        assert_eq!(RedFlags::from_text(""), RedFlags::None);
        assert_eq!(RedFlags::None.as_str(), "None");
    }

    #[test]
    fn flag_lines_strip_markers() {
        let flags = RedFlags::from_text("Posted date is in the future\n• No receipt\n⚠️ Battery cycle count unknown");
        assert_eq!(
            flags.lines(),
            vec![
                "Posted date is in the future",
                "No receipt",
                "Battery cycle count unknown"
            ]
        );
    }
}
