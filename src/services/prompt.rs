//! Text of the evaluation request.

use crate::models::Listing;
use chrono::NaiveDate;
use std::fmt::Write as _;

pub const SYSTEM_PROMPT: &str = "You are an expert in evaluating tech deals in Finland, with deep knowledge of computer hardware, specifications, and market values.";

const RESPONSE_FORMAT: &str = "Respond in this exact format, with CONCISE bullet points (max 15 words each):
VALUE SCORE: [number 0-10 with .5 increments]
VALUE POINTS:
• [1-3 key points focusing on price/quality ratio]

MATCH SCORE: [number 0-10 with .5 increments]
MATCH POINTS:
• [1-3 key points focusing on how it meets requirements]

RED FLAGS: [bullet points if any, or \"None\"]

Example good bullet points:
VALUE POINTS:
• Great price (600€) considering recent model and pristine condition
• Includes all accessories and 18 months warranty remaining
• Low usage: only 2 months old, battery at 100% health

MATCH POINTS:
• 4x faster in multi-core performance than current setup
• Runs all required applications smoothly with no throttling
• Better display and cooling system for long work sessions

Focus on:
- Short, factual statements
- Skip repeating specs from the listing
- Compare directly to requirements when relevant
- Use numbers and specifics when possible
- Highlight key advantages or concerns";

pub struct PromptInput<'a> {
    pub listing: &'a Listing,
    pub today: NaiveDate,
    pub market_analysis: Option<&'a str>,
    pub buyer_requirements: &'a str,
}

fn or_unknown(value: Option<&str>) -> &str {
    value.filter(|v| !v.trim().is_empty()).unwrap_or("Not specified")
}

/// Builds the user message for one listing.
#[must_use]
pub fn build_user_prompt(input: &PromptInput<'_>) -> String {
    let listing = input.listing;
    let today = input.today.format("%Y-%m-%d");
    let mut prompt = String::new();

    let _ = writeln!(
        prompt,
        "You are an expert in evaluating tech deals in Finland, with deep knowledge of computer hardware and market values."
    );
    let _ = writeln!(
        prompt,
        "Please evaluate this listing and rate it on a scale of 0-10 (0.5 increments allowed) based on price/performance ratio and the buyer's specific requirements."
    );
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "CURRENT DATE: {today}");
    let _ = writeln!(prompt);

    let _ = writeln!(prompt, "LISTING INFORMATION:");
    let _ = writeln!(prompt, "Title: {}", listing.title);
    let _ = writeln!(prompt, "Price: {}", or_unknown(listing.price.as_deref()));
    let _ = writeln!(prompt, "Location: {}", or_unknown(listing.location.as_deref()));
    let _ = writeln!(prompt, "Posted: {}", or_unknown(listing.timestamp.as_deref()));
    let _ = writeln!(
        prompt,
        "Description: {}",
        listing
            .description
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or("No description provided")
    );
    if listing.details.is_empty() {
        let _ = writeln!(prompt, "Technical Details: None listed");
    } else {
        let _ = writeln!(prompt, "Technical Details:");
        for (key, value) in listing.details.iter() {
            let _ = writeln!(prompt, "- {key}: {value}");
        }
    }
    let _ = writeln!(prompt);

    if let Some(analysis) = input.market_analysis.filter(|a| !a.trim().is_empty()) {
        let _ = writeln!(prompt, "CURRENT MARKET ANALYSIS:");
        let _ = writeln!(prompt, "{}", analysis.trim());
        let _ = writeln!(prompt);
    }

    let _ = writeln!(prompt, "BUYER'S REQUIREMENTS:");
    let _ = writeln!(prompt, "{}", input.buyer_requirements.trim());
    let _ = writeln!(prompt);

    let _ = writeln!(prompt, "Consider:");
    for (i, item) in [
        "How well this device meets the buyer's specific requirements",
        "Performance comparison with the buyer's current setup (if specified)",
        "Current market prices",
        "Age and specifications of the device",
        "Condition as described",
        "Any red flags or concerns",
        "Overall value for money compared to market prices",
    ]
    .iter()
    .enumerate()
    {
        let _ = writeln!(prompt, "{}. {item}", i + 1);
    }
    let _ = writeln!(prompt);

    let _ = writeln!(prompt, "Important Notes:");
    let _ = writeln!(
        prompt,
        "- Today's date is {today}. Use this to validate any dates mentioned in the listing."
    );
    let _ = writeln!(
        prompt,
        "- If you see dates that are clearly wrong (like future dates), mention this in the red flags but don't let it heavily impact the scores unless there are other concerns."
    );
    let _ = writeln!(prompt);

    prompt.push_str(RESPONSE_FORMAT);
    prompt
}
