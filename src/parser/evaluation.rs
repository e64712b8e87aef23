//! Parser for the semi-structured assessment text returned by the
//! evaluation service.
//!
//! The reply is read line by line. A line starting with one of the section
//! labels switches the current section; everything else is attributed to the
//! section in effect. A score missing from its label line is taken from the
//! next non-empty line. Red flags continue only through bullet lines:
//!
//! ```text
//! VALUE SCORE: 7.5
//! VALUE POINTS:
//! • Great price for a 2021 model
//! MATCH SCORE: 8
//! MATCH POINTS:
//! • Plenty of RAM for the workload
//! RED FLAGS: None
//! ```

use crate::models::{Evaluation, RedFlags};
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 10.0;

const BULLETS: &[char] = &['•', '-', '*', '–', '·'];
const EMPHASIS: &[char] = &['*', '_', '#'];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("response has no VALUE SCORE")]
    MissingValueScore,

    #[error("response has no VALUE POINTS bullets")]
    MissingValuePoints,

    #[error("response has no MATCH SCORE")]
    MissingMatchScore,

    #[error("response has no MATCH POINTS bullets")]
    MissingMatchPoints,

    #[error("{label} {score} is outside 0-10")]
    ScoreOutOfRange { label: &'static str, score: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    ValueScore,
    ValuePoints,
    MatchScore,
    MatchPoints,
    RedFlags,
}

impl Section {
    const ALL: [Self; 5] = [
        Self::ValueScore,
        Self::ValuePoints,
        Self::MatchScore,
        Self::MatchPoints,
        Self::RedFlags,
    ];

    const fn label(self) -> &'static str {
        match self {
            Self::ValueScore => "VALUE SCORE",
            Self::ValuePoints => "VALUE POINTS",
            Self::MatchScore => "MATCH SCORE",
            Self::MatchPoints => "MATCH POINTS",
            Self::RedFlags => "RED FLAGS",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Preamble,
    In(Section),
    /// Inside a repeated section whose first occurrence already counted.
    Skipping,
}

#[derive(Debug, Default)]
struct Sections {
    value_score: Option<f64>,
    value_points: Vec<String>,
    match_score: Option<f64>,
    match_points: Vec<String>,
    red_flags: Vec<String>,
    /// Score label seen with no number on its line; the next non-empty
    /// line may still carry it.
    pending_score: Option<Section>,
    /// Set once a non-bullet line follows the red flags.
    red_flags_closed: bool,
}

impl Sections {
    fn take_inline(&mut self, section: Section, rest: &str) {
        self.pending_score = None;
        match section {
            Section::ValueScore | Section::MatchScore => {
                let score = first_number(rest);
                if score.is_none() {
                    self.pending_score = Some(section);
                }
                self.set_score(section, score);
            }
            Section::ValuePoints | Section::MatchPoints => self.take_line(section, rest),
            Section::RedFlags => {
                if !rest.is_empty() {
                    self.red_flags.push(rest.to_string());
                }
            }
        }
    }

    fn set_score(&mut self, section: Section, score: Option<f64>) {
        match section {
            Section::ValueScore => self.value_score = score,
            Section::MatchScore => self.match_score = score,
            Section::ValuePoints | Section::MatchPoints | Section::RedFlags => {}
        }
    }

    fn take_line(&mut self, section: Section, line: &str) {
        match section {
            Section::ValuePoints => self.value_points.extend(bullet_text(line)),
            Section::MatchPoints => self.match_points.extend(bullet_text(line)),
            Section::RedFlags => {
                let line = line.trim();
                if line.is_empty() || self.red_flags_closed {
                    return;
                }
                if line.starts_with(BULLETS) {
                    self.red_flags.push(line.to_string());
                } else {
                    self.red_flags_closed = true;
                }
            }
            Section::ValueScore | Section::MatchScore => {
                if self.pending_score != Some(section) || line.trim().is_empty() {
                    return;
                }
                self.pending_score = None;
                self.set_score(section, first_number(line));
            }
        }
    }
}

/// Turns a reply into an [`Evaluation`].
///
/// With `enforce_score_bounds` set, scores outside 0-10 are rejected;
/// otherwise they pass through unchanged. Scores are never rounded or clamped.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationParser {
    enforce_score_bounds: bool,
}

impl Default for EvaluationParser {
    fn default() -> Self {
        Self::new(true)
    }
}

impl EvaluationParser {
    #[must_use]
    pub const fn new(enforce_score_bounds: bool) -> Self {
        Self {
            enforce_score_bounds,
        }
    }

    pub fn parse(&self, response: &str) -> Result<Evaluation, ParseError> {
        let mut sections = Sections::default();
        let mut seen = [false; Section::ALL.len()];
        let mut state = State::Preamble;

        for line in response.lines() {
            if let Some((section, rest)) = match_label(line) {
                if seen[section.index()] {
                    state = State::Skipping;
                    continue;
                }
                seen[section.index()] = true;
                state = State::In(section);
                sections.take_inline(section, rest);
                continue;
            }

            if let State::In(section) = state {
                sections.take_line(section, line);
            }
        }

        let value_score = sections.value_score.ok_or(ParseError::MissingValueScore)?;
        if sections.value_points.is_empty() {
            return Err(ParseError::MissingValuePoints);
        }
        let match_score = sections.match_score.ok_or(ParseError::MissingMatchScore)?;
        if sections.match_points.is_empty() {
            return Err(ParseError::MissingMatchPoints);
        }

        if self.enforce_score_bounds {
            check_bounds(Section::ValueScore.label(), value_score)?;
            check_bounds(Section::MatchScore.label(), match_score)?;
        }

        Ok(Evaluation {
            value_score,
            value_points: sections.value_points,
            match_score,
            match_points: sections.match_points,
            red_flags: RedFlags::from_text(&sections.red_flags.join("\n")),
            raw_response: Some(response.to_string()),
        })
    }
}

/// Parses with score bounds enforced.
pub fn parse_evaluation(response: &str) -> Result<Evaluation, ParseError> {
    EvaluationParser::default().parse(response)
}

fn check_bounds(label: &'static str, score: f64) -> Result<(), ParseError> {
    if (MIN_SCORE..=MAX_SCORE).contains(&score) {
        Ok(())
    } else {
        Err(ParseError::ScoreOutOfRange { label, score })
    }
}

/// Recognizes `LABEL:` at the start of a line, tolerating case differences
/// and markdown emphasis such as `**VALUE SCORE:**` or `## Red flags:`.
fn match_label(line: &str) -> Option<(Section, &str)> {
    let stripped = line.trim().trim_start_matches(EMPHASIS).trim_start();

    Section::ALL.into_iter().find_map(|section| {
        let label = section.label();
        let head = stripped.get(..label.len())?;
        if !head.eq_ignore_ascii_case(label) {
            return None;
        }
        let rest = stripped[label.len()..].trim_start_matches(EMPHASIS);
        let rest = rest.strip_prefix(':')?;
        Some((section, rest.trim_start_matches(EMPHASIS).trim()))
    })
}

fn first_number(text: &str) -> Option<f64> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"-?\d+(?:[.,]\d+)?").expect("Invalid regex"));

    let token = re.find(text)?.as_str().replace(',', ".");
    token.parse().ok()
}

fn bullet_text(line: &str) -> Option<String> {
    let text = line.trim().strip_prefix(BULLETS)?.trim();
    if text.chars().any(char::is_alphanumeric) {
        Some(text.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WELL_FORMED: &str = "VALUE SCORE: 7.5\n\
VALUE POINTS:\n\
• Great price (600€) for a 2021 model\n\
• Includes charger and original box\n\
• Battery health at 92%\n\
\n\
MATCH SCORE: 8\n\
MATCH POINTS:\n\
• Fast enough for photo editing\n\
• 16 GB RAM covers the stated workload\n\
\n\
RED FLAGS: None";

    #[test]
    fn parses_well_formed_reply() {
        let evaluation = parse_evaluation(WELL_FORMED).unwrap();
        assert!((evaluation.value_score - 7.5).abs() < f64::EPSILON);
        assert_eq!(
            evaluation.value_points,
            vec![
                "Great price (600€) for a 2021 model",
                "Includes charger and original box",
                "Battery health at 92%"
            ]
        );
        assert!((evaluation.match_score - 8.0).abs() < f64::EPSILON);
        assert_eq!(
            evaluation.match_points,
            vec![
                "Fast enough for photo editing",
                "16 GB RAM covers the stated workload"
            ]
        );
        assert_eq!(evaluation.red_flags, RedFlags::None);
        assert_eq!(evaluation.raw_response.as_deref(), Some(WELL_FORMED));
    }

    #[test]
    fn missing_match_score_is_rejected() {
        let reply = "VALUE SCORE: 6\nVALUE POINTS:\n• Fair price\nMATCH POINTS:\n• Meets needs\nRED FLAGS: None";
        assert_eq!(parse_evaluation(reply), Err(ParseError::MissingMatchScore));
    }

    #[test]
    fn label_without_number_is_missing() {
        let reply = "VALUE SCORE: n/a\nVALUE POINTS:\n• x1\nMATCH SCORE: 5\nMATCH POINTS:\n• y1";
        assert_eq!(parse_evaluation(reply), Err(ParseError::MissingValueScore));
    }

    #[test]
    fn empty_point_list_is_rejected() {
        let reply = "VALUE SCORE: 6\nVALUE POINTS:\nNothing notable\nMATCH SCORE: 5\nMATCH POINTS:\n• ok";
        assert_eq!(parse_evaluation(reply), Err(ParseError::MissingValuePoints));

        let reply = "VALUE SCORE: 6\nVALUE POINTS:\n- cheap\nMATCH SCORE: 5\nMATCH POINTS:\n";
        assert_eq!(parse_evaluation(reply), Err(ParseError::MissingMatchPoints));
    }

    #[test]
    fn accepts_every_bullet_style() {
        let reply = "VALUE SCORE: 5\nVALUE POINTS:\n• a\n- b\n* c\n– d\n· e\nMATCH SCORE: 5\nMATCH POINTS:\n- f";
        let evaluation = parse_evaluation(reply).unwrap();
        assert_eq!(evaluation.value_points, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn tolerates_case_and_emphasis() {
        let reply = "Here is my assessment.\n\n**Value Score:** 6.5/10\n**VALUE POINTS:**\n- Cheap\n**match score**: 9\nMatch Points:\n- Exactly what was asked\n**Red Flags:** None.";
        let evaluation = parse_evaluation(reply).unwrap();
        assert!((evaluation.value_score - 6.5).abs() < f64::EPSILON);
        assert!((evaluation.match_score - 9.0).abs() < f64::EPSILON);
        assert_eq!(evaluation.value_points, vec!["Cheap"]);
        assert!(evaluation.red_flags.is_none());
    }

    #[test]
    fn repeated_label_keeps_first_occurrence() {
        let reply = "VALUE SCORE: 4\nVALUE POINTS:\n• first\nVALUE SCORE: 9\nVALUE POINTS:\n• second\nMATCH SCORE: 3\nMATCH POINTS:\n• m";
        let evaluation = parse_evaluation(reply).unwrap();
        assert!((evaluation.value_score - 4.0).abs() < f64::EPSILON);
        assert_eq!(evaluation.value_points, vec!["first"]);
    }

    #[test]
    fn red_flags_collect_following_lines() {
        let reply = "VALUE SCORE: 5\nVALUE POINTS:\n• a\nMATCH SCORE: 5\nMATCH POINTS:\n• b\nRED FLAGS:\n• Posted date is in the future\n• No receipt";
        let evaluation = parse_evaluation(reply).unwrap();
        assert_eq!(
            evaluation.red_flags,
            RedFlags::Flagged("• Posted date is in the future\n• No receipt".to_string())
        );
        assert_eq!(
            evaluation.red_flags.lines(),
            vec!["Posted date is in the future", "No receipt"]
        );
    }

    #[test]
    fn closing_prose_after_red_flags_is_ignored() {
        let reply = "VALUE SCORE: 7\nVALUE POINTS:\n• a\nMATCH SCORE: 8\nMATCH POINTS:\n• b\nRED FLAGS: None\n\nOverall this is a solid deal.";
        assert_eq!(parse_evaluation(reply).unwrap().red_flags, RedFlags::None);

        let reply = "VALUE SCORE: 7\nVALUE POINTS:\n• a\nMATCH SCORE: 8\nMATCH POINTS:\n• b\nRED FLAGS:\n• No receipt\nLet me know if you need more detail.\n• not a flag";
        assert_eq!(
            parse_evaluation(reply).unwrap().red_flags,
            RedFlags::Flagged("• No receipt".to_string())
        );
    }

    #[test]
    fn score_on_the_line_after_its_label() {
        let reply = "VALUE SCORE:\n7.5\nVALUE POINTS:\n• a\nMATCH SCORE:\n\n**8**\nMATCH POINTS:\n• b";
        let evaluation = parse_evaluation(reply).unwrap();
        assert!((evaluation.value_score - 7.5).abs() < f64::EPSILON);
        assert!((evaluation.match_score - 8.0).abs() < f64::EPSILON);
    }

    #[test]
    fn score_lookahead_stops_at_first_non_empty_line() {
        let reply = "VALUE SCORE:\nhard to say\n6\nVALUE POINTS:\n• a\nMATCH SCORE: 5\nMATCH POINTS:\n• b";
        assert_eq!(parse_evaluation(reply), Err(ParseError::MissingValueScore));
    }

    #[test]
    fn absent_red_flags_label_means_none() {
        let reply = "VALUE SCORE: 5\nVALUE POINTS:\n• a\nMATCH SCORE: 5\nMATCH POINTS:\n• b";
        assert_eq!(parse_evaluation(reply).unwrap().red_flags, RedFlags::None);
    }

    #[test]
    fn zero_is_a_valid_score() {
        let reply = "VALUE SCORE: 0\nVALUE POINTS:\n• overpriced\nMATCH SCORE: 0.5\nMATCH POINTS:\n• wrong model";
        let evaluation = parse_evaluation(reply).unwrap();
        assert!(evaluation.value_score.abs() < f64::EPSILON);
    }

    #[test]
    fn comma_decimal_is_read() {
        let reply = "VALUE SCORE: 7,5\nVALUE POINTS:\n• a\nMATCH SCORE: 6\nMATCH POINTS:\n• b";
        let evaluation = parse_evaluation(reply).unwrap();
        assert!((evaluation.value_score - 7.5).abs() < f64::EPSILON);
    }

    #[test]
    fn out_of_range_depends_on_enforcement() {
        let reply = "VALUE SCORE: 12\nVALUE POINTS:\n• a\nMATCH SCORE: 6\nMATCH POINTS:\n• b";
        assert_eq!(
            parse_evaluation(reply),
            Err(ParseError::ScoreOutOfRange {
                label: "VALUE SCORE",
                score: 12.0
            })
        );

        let evaluation = EvaluationParser::new(false).parse(reply).unwrap();
        assert!((evaluation.value_score - 12.0).abs() < f64::EPSILON);
    }
}
