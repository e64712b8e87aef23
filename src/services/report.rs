//! Static HTML overview of every search, its listings and their scores.

use crate::db::{Store, StoreError};
use crate::models::{Evaluation, Listing, Search};
use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use std::cmp::Ordering;
use std::fmt::Write as _;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to write report: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct ReportListing {
    pub listing: Listing,
    pub evaluation: Option<Evaluation>,
}

#[derive(Debug, Clone)]
pub struct SearchSection {
    pub search: Search,
    pub listings: Vec<ReportListing>,
}

/// Best value first, then best match; unevaluated listings last.
fn by_scores(a: &ReportListing, b: &ReportListing) -> Ordering {
    match (&a.evaluation, &b.evaluation) {
        (Some(x), Some(y)) => y
            .value_score
            .total_cmp(&x.value_score)
            .then_with(|| y.match_score.total_cmp(&x.match_score)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub async fn collect(store: &Store) -> Result<Vec<SearchSection>, StoreError> {
    let mut searches = store.list_searches().await?;
    searches.sort_by_key(|s| s.id);

    let mut sections = Vec::with_capacity(searches.len());
    for search in searches {
        let mut listings = Vec::new();
        for listing in store.listings_for_search(search.id).await? {
            let evaluation = match store.get_evaluation(&listing.id).await {
                Ok(stored) => stored.map(|s| s.evaluation),
                Err(StoreError::Codec(e)) => {
                    warn!(listing_id = %listing.id, error = %e, "Unreadable evaluation left out of report");
                    None
                }
                Err(e) => return Err(e),
            };
            listings.push(ReportListing {
                listing,
                evaluation,
            });
        }
        listings.sort_by(by_scores);
        sections.push(SearchSection { search, listings });
    }

    Ok(sections)
}

const STYLE: &str = "body{font-family:-apple-system,BlinkMacSystemFont,\"Segoe UI\",Roboto,Helvetica,Arial,sans-serif;line-height:1.6;max-width:1200px;margin:0 auto;padding:20px;background:#f5f5f7}
.listing{background:#fff;border-radius:12px;padding:20px;margin-bottom:20px;box-shadow:0 2px 4px rgba(0,0,0,.1)}
.scores{display:flex;gap:20px;margin:15px 0}
.score{background:#f8f9fa;padding:10px 15px;border-radius:8px;flex:1}
.score-value{font-size:24px;font-weight:bold;color:#2d2d2d}
.point{margin:8px 0;font-size:.95em;color:#2d2d2d}
.red-flags{color:#dc3545;margin-top:10px;padding:10px;background:#fff5f5;border-radius:8px}
.meta{color:#666;font-size:.9em;margin-top:10px}
.price{font-size:1.4em;font-weight:bold;color:#2d2d2d}
.image{max-width:300px;border-radius:8px;margin:10px 0}
.requirements{background:#e9ecef;padding:15px;border-radius:8px;margin:20px 0}
.pending{color:#666;font-style:italic}";

fn render_points(out: &mut String, title: &str, score: f64, points: &[String]) {
    let _ = write!(
        out,
        "<div class=\"score\"><div>{title}</div><div class=\"score-value\">{score}/10</div><div class=\"points\">"
    );
    for point in points {
        let _ = write!(out, "<div class=\"point\">• {}</div>", text(point));
    }
    out.push_str("</div></div>");
}

fn render_listing(out: &mut String, item: &ReportListing) {
    let listing = &item.listing;
    out.push_str("<div class=\"listing\">");
    let _ = write!(
        out,
        "<h3><a href=\"{}\" target=\"_blank\">{}</a></h3>",
        attr(&listing.link),
        text(&listing.title)
    );
    if let Some(image) = &listing.image {
        let _ = write!(
            out,
            "<img src=\"{}\" alt=\"{}\" class=\"image\">",
            attr(image),
            attr(&listing.title)
        );
    }
    if let Some(price) = &listing.price {
        let _ = write!(out, "<div class=\"price\">{}</div>", text(price));
    }

    match &item.evaluation {
        Some(evaluation) => {
            out.push_str("<div class=\"scores\">");
            render_points(out, "Value Score", evaluation.value_score, &evaluation.value_points);
            render_points(out, "Match Score", evaluation.match_score, &evaluation.match_points);
            out.push_str("</div>");

            let flags = evaluation.red_flags.lines();
            if !flags.is_empty() {
                out.push_str("<div class=\"red-flags\">");
                for flag in flags {
                    let _ = write!(out, "<div class=\"point\">⚠️ {}</div>", text(flag));
                }
                out.push_str("</div>");
            }
        }
        None => out.push_str("<div class=\"pending\">Not evaluated yet</div>"),
    }

    let mut meta = Vec::new();
    if let Some(location) = &listing.location {
        meta.push(format!("📍 {}", text(location)));
    }
    if let Some(timestamp) = &listing.timestamp {
        meta.push(format!("⏰ {}", text(timestamp)));
    }
    if let Some(seller) = &listing.seller {
        meta.push(format!("👤 {}", text(seller)));
    }
    if !meta.is_empty() {
        let _ = write!(out, "<div class=\"meta\">{}</div>", meta.join(" | "));
    }
    out.push_str("</div>\n");
}

/// Renders the full page.
#[must_use]
pub fn render(sections: &[SearchSection], buyer_requirements: &str, generated_at: &str) -> String {
    let mut out = String::with_capacity(16 * 1024);
    let _ = write!(
        out,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n\
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
<title>ToriBot - Deals</title>\n<style>\n{}\n</style>\n</head>\n<body>\n",
        STYLE
    );
    let _ = write!(
        out,
        "<div class=\"header\"><h1>ToriBot - Deals</h1>\
<div class=\"requirements\"><h3>Current Requirements:</h3><p>{}</p></div>\
<div class=\"last-update\">Last updated: {}</div></div>\n",
        text(buyer_requirements),
        text(generated_at)
    );

    for section in sections {
        let _ = writeln!(
            out,
            "<h2>Search: &quot;{}&quot; ({} runs)</h2>",
            text(&section.search.query),
            section.search.run_count
        );
        for item in &section.listings {
            render_listing(&mut out, item);
        }
    }

    out.push_str("</body>\n</html>\n");
    out
}

/// Collects, renders and writes the report to `path`, creating parent
/// directories as needed.
pub async fn write_report(
    store: &Store,
    path: &Path,
    buyer_requirements: &str,
) -> Result<(), ReportError> {
    let sections = collect(store).await?;
    let generated_at = chrono::Local::now().format("%d.%m.%Y %H:%M:%S").to_string();
    let html = render(&sections, buyer_requirements, &generated_at);

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, html).await?;

    info!(event = "report_written", path = %path.display(), searches = sections.len(), "Generated HTML report");
    Ok(())
}
