//! Field extraction from marketplace search result and listing pages.

use crate::domain::ListingId;
use crate::models::{ListingDetail, ListingSummary, TechnicalDetails};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;
use tracing::debug;
use url::Url;

struct Selectors {
    article: Selector,
    ad_id: Selector,
    title_link: Selector,
    price: Selector,
    subtle_span: Selector,
    image: Selector,
    seller: Selector,
    badge: Selector,
    descriptions: [Selector; 3],
    detail_item: Selector,
    detail_key: Selector,
    detail_value: Selector,
}

fn selectors() -> &'static Selectors {
    static SELECTORS: OnceLock<Selectors> = OnceLock::new();
    SELECTORS.get_or_init(|| {
        let parse = |css: &str| Selector::parse(css).expect("Invalid selector");
        Selectors {
            article: parse("article.sf-search-ad"),
            ad_id: parse(r#"[id^="search-ad-"]"#),
            title_link: parse("h2 a"),
            price: parse(".text-m.font-bold"),
            subtle_span: parse(".text-xs.s-text-subtle span"),
            image: parse("img"),
            seller: parse(".text-xs.s-text-subtle.truncate span"),
            badge: parse(".badge--positionTL"),
            descriptions: [
                parse(r#"[data-testid="description"]"#),
                parse(".body"),
                parse(".description"),
            ],
            detail_item: parse(r#"[data-testid="product-details"] li"#),
            detail_key: parse("dt"),
            detail_value: parse("dd"),
        }
    })
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() { None } else { Some(text) }
}

fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope.select(selector).next().map(text_of).and_then(non_empty)
}

fn joined_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    let parts: Vec<String> = scope
        .select(selector)
        .map(text_of)
        .filter(|t| !t.is_empty())
        .collect();
    non_empty(parts.join(" "))
}

/// Makes a site-relative link absolute against `base`.
fn absolutize(base: &Url, href: &str) -> String {
    if href.starts_with("http") {
        return href.to_string();
    }
    base.join(href)
        .map_or_else(|_| href.to_string(), |url| url.to_string())
}

/// Digits of a display price, e.g. `"1 250 €"` becomes `1250`.
#[must_use]
pub fn parse_price_number(price: &str) -> Option<i64> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\d+[\s\d]*").expect("Invalid regex"));

    let digits: String = re
        .find(price)?
        .as_str()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    digits.parse().ok()
}

/// Listing summaries in the order the page presents them.
///
/// Ads without an id or a link are skipped, since neither deduplication
/// nor the detail fetch could work for them.
#[must_use]
pub fn parse_search_results(html: &str, base: &Url) -> Vec<ListingSummary> {
    let document = Html::parse_document(html);
    let sel = selectors();

    document
        .select(&sel.article)
        .filter_map(|article| {
            let id = article
                .select(&sel.ad_id)
                .next()
                .and_then(|el| el.value().id())
                .map(|id| id.trim_start_matches("search-ad-").to_string())
                .filter(|id| !id.is_empty());

            let title_link = article.select(&sel.title_link).next();
            let link = title_link
                .and_then(|a| a.value().attr("href"))
                .map(str::trim)
                .filter(|href| !href.is_empty())
                .map(|href| absolutize(base, href));

            let (Some(id), Some(link)) = (id, link) else {
                debug!(
                    event = "listing_card_skipped",
                    "Search result without id or link"
                );
                return None;
            };

            let price = first_text(article, &sel.price);
            let price_number = price.as_deref().and_then(parse_price_number);
            let subtle: Vec<String> = article
                .select(&sel.subtle_span)
                .map(text_of)
                .collect();

            Some(ListingSummary {
                id: ListingId::new(id),
                title: title_link.map(text_of).unwrap_or_default(),
                price,
                price_number,
                location: subtle.first().cloned().and_then(non_empty),
                link,
                image: article
                    .select(&sel.image)
                    .next()
                    .and_then(|img| img.value().attr("src"))
                    .filter(|src| !src.is_empty())
                    .map(|src| absolutize(base, src)),
                seller: joined_text(article, &sel.seller),
                timestamp: subtle.last().cloned().and_then(non_empty),
                badges: joined_text(article, &sel.badge),
            })
        })
        .collect()
}

/// Description and technical attributes from a listing's own page.
#[must_use]
pub fn parse_detail_page(html: &str) -> ListingDetail {
    let document = Html::parse_document(html);
    let root = document.root_element();
    let sel = selectors();

    let description = sel
        .descriptions
        .iter()
        .find_map(|selector| first_text(root, selector));

    let details: TechnicalDetails = root
        .select(&sel.detail_item)
        .filter_map(|item| {
            let key = first_text(item, &sel.detail_key)?;
            let value = first_text(item, &sel.detail_value)?;
            Some((key, value))
        })
        .collect();

    ListingDetail {
        description,
        details,
    }
}
