//! Ingestion pipeline against a scripted marketplace.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use toribot::db::Store;
use toribot::domain::{ListingId, SearchTarget};
use toribot::models::{ListingDetail, ListingSummary, TechnicalDetails};
use toribot::services::{IngestError, IngestionPipeline, ListingSource, NoThrottle, SourceError};

async fn temp_store() -> Store {
    let db_path =
        std::env::temp_dir().join(format!("toribot-ingest-test-{}.db", uuid::Uuid::new_v4()));
    Store::new(&format!("sqlite:{}", db_path.display()))
        .await
        .expect("failed to open store")
}

fn summary(id: &str) -> ListingSummary {
    ListingSummary {
        id: ListingId::new(id),
        title: format!("Listing {id}"),
        price: Some("300 €".to_string()),
        price_number: Some(300),
        location: Some("Espoo".to_string()),
        link: format!("https://www.tori.fi/recommerce/forsale/item/{id}"),
        image: None,
        seller: None,
        timestamp: None,
        badges: None,
    }
}

/// Serves a fixed result page and records which details were requested.
struct FakeMarketplace {
    results: Result<Vec<ListingSummary>, String>,
    broken_details: HashSet<String>,
    detail_requests: Mutex<Vec<String>>,
}

impl FakeMarketplace {
    fn with_ids(ids: &[&str]) -> Self {
        Self {
            results: Ok(ids.iter().map(|id| summary(id)).collect()),
            broken_details: HashSet::new(),
            detail_requests: Mutex::new(Vec::new()),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            results: Err(message.to_string()),
            broken_details: HashSet::new(),
            detail_requests: Mutex::new(Vec::new()),
        }
    }

    fn break_detail(mut self, id: &str) -> Self {
        self.broken_details.insert(id.to_string());
        self
    }

    fn detail_requests(&self) -> Vec<String> {
        self.detail_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ListingSource for FakeMarketplace {
    async fn search(&self, _target: &SearchTarget) -> Result<Vec<ListingSummary>, SourceError> {
        match &self.results {
            Ok(results) if results.is_empty() => Err(SourceError::NoListings),
            Ok(results) => Ok(results.clone()),
            Err(message) => Err(SourceError::Fetch(message.clone())),
        }
    }

    async fn fetch_detail(&self, listing: &ListingSummary) -> Result<ListingDetail, SourceError> {
        let id = listing.id.as_str().to_string();
        self.detail_requests.lock().unwrap().push(id.clone());

        if self.broken_details.contains(&id) {
            return Err(SourceError::Fetch(format!("HTTP 503 for {}", listing.link)));
        }

        Ok(ListingDetail {
            description: Some(format!("Description of {id}")),
            details: [("Kunto", "Hyvä")].into_iter().collect::<TechnicalDetails>(),
        })
    }
}

fn target() -> SearchTarget {
    SearchTarget::new(Some("macbook"), None, None).unwrap()
}

fn pipeline(store: &Store, source: &Arc<FakeMarketplace>, max: usize) -> IngestionPipeline {
    IngestionPipeline::new(store.clone(), source.clone(), Arc::new(NoThrottle), max)
}

#[tokio::test]
async fn stores_only_the_newest_candidates() {
    let store = temp_store().await;
    let source = Arc::new(FakeMarketplace::with_ids(&["1", "2", "3", "4", "5"]));

    let report = pipeline(&store, &source, 3).run(&target()).await.unwrap();

    assert_eq!(report.search_name, "macbook");
    assert_eq!(report.candidates, 3);
    assert_eq!(report.new_listings, 3);
    assert_eq!(report.already_known, 0);
    assert_eq!(report.total_listings, 3);
    assert_eq!(source.detail_requests(), vec!["1", "2", "3"]);

    assert!(store.listing_exists(&ListingId::new("3")).await.unwrap());
    assert!(!store.listing_exists(&ListingId::new("4")).await.unwrap());

    let stored = store.get_listing(&ListingId::new("1")).await.unwrap().unwrap();
    assert_eq!(stored.search_id, report.search_id);
    assert_eq!(stored.description.as_deref(), Some("Description of 1"));
    assert_eq!(stored.details.get("Kunto"), Some("Hyvä"));
}

#[tokio::test]
async fn identical_rerun_changes_nothing_but_the_run_count() {
    let store = temp_store().await;
    let ids = ["1", "2", "3", "4", "5"];

    let first = Arc::new(FakeMarketplace::with_ids(&ids));
    pipeline(&store, &first, 3).run(&target()).await.unwrap();

    let second = Arc::new(FakeMarketplace::with_ids(&ids));
    let report = pipeline(&store, &second, 3).run(&target()).await.unwrap();

    assert_eq!(report.new_listings, 0);
    assert_eq!(report.already_known, 3);
    assert_eq!(report.total_listings, 3);
    assert!(second.detail_requests().is_empty());

    let search = store.find_search("macbook").await.unwrap().unwrap();
    assert_eq!(search.run_count, 2);
}

#[tokio::test]
async fn rerun_skips_known_listings_without_refetching() {
    let store = temp_store().await;

    let first = Arc::new(FakeMarketplace::with_ids(&["1", "2", "3"]));
    pipeline(&store, &first, 3).run(&target()).await.unwrap();

    let second = Arc::new(FakeMarketplace::with_ids(&["9", "1", "2", "3"]));
    let report = pipeline(&store, &second, 3).run(&target()).await.unwrap();

    assert_eq!(report.new_listings, 1);
    assert_eq!(report.already_known, 2);
    assert_eq!(report.total_listings, 4);
    assert_eq!(second.detail_requests(), vec!["9"]);

    let search = store.find_search("macbook").await.unwrap().unwrap();
    assert_eq!(search.run_count, 2);
}

#[tokio::test]
async fn failed_detail_keeps_summary_fields() {
    let store = temp_store().await;
    let source = Arc::new(FakeMarketplace::with_ids(&["1", "2"]).break_detail("2"));

    let report = pipeline(&store, &source, 3).run(&target()).await.unwrap();

    assert_eq!(report.new_listings, 2);
    assert_eq!(report.detail_failures, 1);

    let stored = store.get_listing(&ListingId::new("2")).await.unwrap().unwrap();
    assert_eq!(stored.title, "Listing 2");
    assert_eq!(stored.price_number, Some(300));
    assert_eq!(stored.description, None);
    assert!(stored.details.is_empty());
}

#[tokio::test]
async fn empty_results_mean_nothing_to_do() {
    let store = temp_store().await;
    let source = Arc::new(FakeMarketplace::with_ids(&[]));

    let report = pipeline(&store, &source, 3).run(&target()).await.unwrap();

    assert!(report.nothing_to_do());
    assert_eq!(report.new_listings, 0);
    assert_eq!(report.total_listings, 0);
    assert!(source.detail_requests().is_empty());
}

#[tokio::test]
async fn zero_window_fetches_nothing() {
    let store = temp_store().await;
    let source = Arc::new(FakeMarketplace::with_ids(&["1", "2"]));

    let report = pipeline(&store, &source, 0).run(&target()).await.unwrap();

    assert!(report.nothing_to_do());
    assert_eq!(report.new_listings, 0);
    assert!(source.detail_requests().is_empty());
    assert!(!store.listing_exists(&ListingId::new("1")).await.unwrap());
}

#[tokio::test]
async fn unreachable_search_page_is_an_error() {
    let store = temp_store().await;
    let source = Arc::new(FakeMarketplace::failing("connection reset"));

    let err = pipeline(&store, &source, 3).run(&target()).await.unwrap_err();

    assert!(matches!(err, IngestError::Source(SourceError::Fetch(_))));
}

#[tokio::test]
async fn category_search_is_named_after_its_filters() {
    let store = temp_store().await;
    let source = Arc::new(FakeMarketplace::with_ids(&["1"]));
    let target = SearchTarget::new(None, Some("3215"), Some("0.100018")).unwrap();

    let report = pipeline(&store, &source, 3).run(&target).await.unwrap();

    assert_eq!(report.search_name, target.search_name());
    assert!(store.find_search(&target.search_name()).await.unwrap().is_some());
}
