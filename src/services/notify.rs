//! Telegram alerts for strong new deals.

use crate::clients::telegram::{TelegramClient, TelegramError};
use crate::models::Evaluation;
use crate::services::evaluation_run::ScoredListing;
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use std::fmt::Write as _;
use tracing::info;

pub struct Notifier {
    client: TelegramClient,
    min_score: f64,
}

impl Notifier {
    #[must_use]
    pub const fn new(client: TelegramClient, min_score: f64) -> Self {
        Self { client, min_score }
    }

    #[must_use]
    pub fn qualifies(&self, evaluation: &Evaluation) -> bool {
        evaluation.value_score >= self.min_score && evaluation.match_score >= self.min_score
    }

    /// Sends one message per qualifying listing; returns how many were sent.
    pub async fn announce(&self, scored: &[ScoredListing]) -> Result<usize, TelegramError> {
        let mut sent = 0;
        for item in scored.iter().filter(|s| self.qualifies(&s.evaluation)) {
            self.client.send_message(&format_alert(item)).await?;
            sent += 1;
        }

        if sent > 0 {
            info!(event = "notifications_sent", count = sent, "Sent deal alerts");
        }
        Ok(sent)
    }

    pub async fn send_test(&self, now: &str) -> Result<(), TelegramError> {
        self.client.send_message(&test_message(now)).await
    }
}

#[must_use]
pub fn format_alert(item: &ScoredListing) -> String {
    let listing = &item.listing;
    let evaluation = &item.evaluation;
    let mut msg = String::new();

    let _ = writeln!(
        msg,
        "🎯 <b><a href=\"{}\">{}</a></b>",
        attr(&listing.link),
        text(&listing.title)
    );
    if let Some(price) = &listing.price {
        let _ = writeln!(msg, "💰 {}", text(price));
    }
    if let Some(location) = &listing.location {
        let _ = writeln!(msg, "📍 {}", text(location));
    }
    let _ = writeln!(msg);

    let _ = writeln!(msg, "<b>Value Score:</b> {}/10", evaluation.value_score);
    for point in &evaluation.value_points {
        let _ = writeln!(msg, "• {}", text(point));
    }
    let _ = writeln!(msg, "<b>Match Score:</b> {}/10", evaluation.match_score);
    for point in &evaluation.match_points {
        let _ = writeln!(msg, "• {}", text(point));
    }

    let flags = evaluation.red_flags.lines();
    if !flags.is_empty() {
        let _ = writeln!(msg, "⚠️ <b>Red Flags:</b>");
        for flag in flags {
            let _ = writeln!(msg, "• {}", text(flag));
        }
    }

    msg.trim_end().to_string()
}

#[must_use]
pub fn test_message(now: &str) -> String {
    format!(
        "🚀 <b>ToriBot Test Message</b>\n\n✅ Bot is working correctly!\n⏰ Time: {}\n\n\
This is a test message from your ToriBot. If you receive this, the bot is properly configured \
and ready to send notifications about good deals from tori.fi!",
        text(now)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ListingId, SearchId};
    use crate::models::{Listing, RedFlags, TechnicalDetails};

    fn scored(value: f64, matched: f64) -> ScoredListing {
        ScoredListing {
            listing: Listing {
                id: ListingId::new("77"),
                search_id: SearchId::new(1),
                title: "iPad <Pro>".to_string(),
                price: Some("300 €".to_string()),
                price_number: Some(300),
                location: None,
                link: "https://www.tori.fi/item/77".to_string(),
                image: None,
                seller: None,
                timestamp: None,
                badges: None,
                description: None,
                details: TechnicalDetails::new(),
                first_seen: String::new(),
                last_seen: String::new(),
            },
            evaluation: Evaluation {
                value_score: value,
                value_points: vec!["Good price".to_string()],
                match_score: matched,
                match_points: vec!["Has pencil".to_string()],
                red_flags: RedFlags::None,
                raw_response: None,
            },
        }
    }

    #[test]
    fn both_scores_must_reach_threshold() {
        let notifier = Notifier::new(TelegramClient::new("token", "chat"), 8.0);
        assert!(notifier.qualifies(&scored(8.0, 9.5).evaluation));
        assert!(!notifier.qualifies(&scored(9.0, 7.5).evaluation));
    }

    #[test]
    fn alert_is_escaped_html() {
        let msg = format_alert(&scored(8.5, 9.0));
        assert!(msg.starts_with("🎯 <b><a href=\"https://www.tori.fi/item/77\">iPad &lt;Pro&gt;</a></b>"));
        assert!(msg.contains("<b>Value Score:</b> 8.5/10"));
        assert!(msg.contains("• Has pencil"));
        assert!(!msg.contains("Red Flags"));
    }
}
