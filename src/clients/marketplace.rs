use crate::config::MarketplaceConfig;
use crate::domain::SearchTarget;
use crate::models::{ListingDetail, ListingSummary};
use crate::parser::listing_page::{parse_detail_page, parse_search_results};
use crate::services::ingestion::{ListingSource, SourceError};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

const SEARCH_PATH: &str = "/recommerce/forsale/search";

/// Only ads offering something for sale.
const TRADE_TYPE_SELLING: &str = "1";

#[derive(Debug, Error)]
pub enum MarketplaceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Invalid marketplace URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl From<MarketplaceError> for SourceError {
    fn from(err: MarketplaceError) -> Self {
        Self::Fetch(err.to_string())
    }
}

/// Fetches search result and listing pages from tori.fi.
#[derive(Clone)]
pub struct MarketplaceClient {
    client: Client,
    base_url: Url,
}

impl MarketplaceClient {
    pub fn new(config: &MarketplaceConfig) -> Result<Self, MarketplaceError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8",
            ),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US,en;q=0.9,fi;q=0.8"),
        );

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: Url::parse(&config.base_url)?,
        })
    }

    /// Search page URL for a target. Only the parts that are set are sent.
    pub fn search_url(&self, target: &SearchTarget) -> Result<Url, MarketplaceError> {
        let mut url = self.base_url.join(SEARCH_PATH)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("trade_type", TRADE_TYPE_SELLING);
            if let Some(query) = target.query() {
                pairs.append_pair("q", query);
            }
            if let Some(category) = target.category() {
                pairs.append_pair("product_category", category);
            }
            if let Some(location) = target.location() {
                pairs.append_pair("location", location);
            }
        }
        Ok(url)
    }

    pub async fn fetch_page(&self, url: &str) -> Result<String, MarketplaceError> {
        debug!(url = %url, "Fetching marketplace page");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MarketplaceError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl ListingSource for MarketplaceClient {
    async fn search(&self, target: &SearchTarget) -> Result<Vec<ListingSummary>, SourceError> {
        let url = self.search_url(target)?;
        info!(event = "search_fetch", url = %url, "Fetching search results");

        let html = self.fetch_page(url.as_str()).await?;
        let listings = parse_search_results(&html, &self.base_url);

        if listings.is_empty() {
            return Err(SourceError::NoListings);
        }

        debug!(count = listings.len(), "Parsed search result cards");
        Ok(listings)
    }

    async fn fetch_detail(&self, listing: &ListingSummary) -> Result<ListingDetail, SourceError> {
        let html = self.fetch_page(&listing.link).await?;
        Ok(parse_detail_page(&html))
    }
}
