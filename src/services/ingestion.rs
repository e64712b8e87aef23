//! Search page ingestion: dedupe against the store, fetch details for new
//! listings, persist them.

use crate::db::{Store, StoreError};
use crate::domain::{SearchId, SearchTarget};
use crate::models::{ListingDetail, ListingSummary, NewListing};
use crate::services::throttle::Throttle;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to fetch page: {0}")]
    Fetch(String),

    #[error("No product listings found")]
    NoListings,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Search page unavailable: {0}")]
    Source(#[from] SourceError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Where listings come from.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Summaries for the target, newest first as presented by the marketplace.
    async fn search(&self, target: &SearchTarget) -> Result<Vec<ListingSummary>, SourceError>;

    /// Description and technical details for one listing.
    async fn fetch_detail(&self, listing: &ListingSummary) -> Result<ListingDetail, SourceError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestionReport {
    pub search_id: SearchId,
    pub search_name: String,
    /// Candidates considered after truncation to the newest N.
    pub candidates: usize,
    pub new_listings: usize,
    pub already_known: usize,
    /// New listings stored with summary fields only.
    pub detail_failures: usize,
    pub total_listings: u64,
}

impl IngestionReport {
    #[must_use]
    pub const fn nothing_to_do(&self) -> bool {
        self.candidates == 0
    }
}

pub struct IngestionPipeline {
    store: Store,
    source: Arc<dyn ListingSource>,
    throttle: Arc<dyn Throttle>,
    max_listings: usize,
}

impl IngestionPipeline {
    #[must_use]
    pub fn new(
        store: Store,
        source: Arc<dyn ListingSource>,
        throttle: Arc<dyn Throttle>,
        max_listings: usize,
    ) -> Self {
        Self {
            store,
            source,
            throttle,
            max_listings,
        }
    }

    pub async fn run(&self, target: &SearchTarget) -> Result<IngestionReport, IngestError> {
        let search_name = target.search_name();
        let search_id = self.store.upsert_search(&search_name).await?;

        info!(
            event = "ingestion_started",
            search = %search_name,
            search_id = %search_id,
            "Starting search"
        );

        let mut report = IngestionReport {
            search_id,
            search_name,
            ..IngestionReport::default()
        };

        let mut candidates = match self.source.search(target).await {
            Ok(candidates) => candidates,
            Err(SourceError::NoListings) => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        candidates.truncate(self.max_listings);

        if candidates.is_empty() {
            warn!(
                event = "ingestion_empty",
                search = %report.search_name,
                "Search page had no listings, nothing to do"
            );
            report.total_listings = self.store.count_listings_for_search(search_id).await?;
            return Ok(report);
        }

        report.candidates = candidates.len();
        let last = candidates.len() - 1;

        for (index, summary) in candidates.into_iter().enumerate() {
            if self.store.listing_exists(&summary.id).await? {
                debug!(listing_id = %summary.id, "Already stored, skipping");
                report.already_known += 1;
                continue;
            }

            let detail = match self.source.fetch_detail(&summary).await {
                Ok(detail) => Some(detail),
                Err(e) => {
                    warn!(
                        event = "detail_fetch_failed",
                        listing_id = %summary.id,
                        link = %summary.link,
                        error = %e,
                        "Keeping summary fields only"
                    );
                    report.detail_failures += 1;
                    None
                }
            };

            let listing = NewListing::new(summary, detail);
            match self.store.insert_listing(&listing, search_id).await {
                Ok(()) => {
                    info!(
                        event = "listing_stored",
                        listing_id = %listing.id(),
                        title = %listing.summary.title,
                        "Stored new listing"
                    );
                    report.new_listings += 1;
                }
                // Another process stored it between the check and the insert.
                Err(StoreError::DuplicateListing(id)) => {
                    warn!(listing_id = %id, "Listing appeared concurrently, skipping");
                    report.already_known += 1;
                }
                Err(e) => return Err(e.into()),
            }

            if index < last {
                self.throttle.wait().await;
            }
        }

        report.total_listings = self.store.count_listings_for_search(search_id).await?;

        info!(
            event = "ingestion_finished",
            search = %report.search_name,
            new = report.new_listings,
            known = report.already_known,
            total = report.total_listings,
            "Search complete"
        );

        Ok(report)
    }
}
