use crate::domain::{ListingId, SearchId};
use crate::models::{Evaluation, Listing, NewListing, Search, StoredEvaluation};
use chrono::{SecondsFormat, Utc};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

pub mod codec;
pub mod migrator;
pub mod repositories;

pub use codec::CodecError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Listing already stored: {0}")]
    DuplicateListing(ListingId),

    #[error("Stored value could not be decoded: {0}")]
    Codec(#[from] CodecError),

    #[error("Failed to prepare database file: {0}")]
    Io(#[from] std::io::Error),
}

/// Current time as a fixed-width RFC 3339 UTC string.
///
/// Microsecond precision with a `Z` suffix keeps lexical order equal to
/// chronological order, which `listings_for_search` relies on.
#[must_use]
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Handle to the SQLite database holding searches, listings and evaluations.
#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self, StoreError> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, StoreError> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent()
                && !parent.as_os_str().is_empty()
            {
                tokio::fs::create_dir_all(parent).await?;
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    /// Releases the connection pool.
    pub async fn close(self) -> Result<(), StoreError> {
        self.conn.close().await?;
        Ok(())
    }

    fn search_repo(&self) -> repositories::search::SearchRepository {
        repositories::search::SearchRepository::new(self.conn.clone())
    }

    fn listing_repo(&self) -> repositories::listing::ListingRepository {
        repositories::listing::ListingRepository::new(self.conn.clone())
    }

    fn evaluation_repo(&self) -> repositories::evaluation::EvaluationRepository {
        repositories::evaluation::EvaluationRepository::new(self.conn.clone())
    }

    // Searches

    /// Creates the search on first use, otherwise bumps its run counter.
    pub async fn upsert_search(&self, query: &str) -> Result<SearchId, StoreError> {
        self.search_repo().upsert(query).await
    }

    pub async fn find_search(&self, query: &str) -> Result<Option<Search>, StoreError> {
        self.search_repo().find_by_query(query).await
    }

    pub async fn get_search(&self, id: SearchId) -> Result<Option<Search>, StoreError> {
        self.search_repo().get(id).await
    }

    pub async fn list_searches(&self) -> Result<Vec<Search>, StoreError> {
        self.search_repo().list_recent().await
    }

    // Listings

    pub async fn listing_exists(&self, id: &ListingId) -> Result<bool, StoreError> {
        self.listing_repo().exists(id).await
    }

    pub async fn insert_listing(
        &self,
        listing: &NewListing,
        search_id: SearchId,
    ) -> Result<(), StoreError> {
        self.listing_repo().insert(listing, search_id).await
    }

    pub async fn get_listing(&self, id: &ListingId) -> Result<Option<Listing>, StoreError> {
        self.listing_repo().get(id).await
    }

    /// Listings discovered under a search, newest first.
    pub async fn listings_for_search(&self, search_id: SearchId) -> Result<Vec<Listing>, StoreError> {
        self.listing_repo().for_search(search_id).await
    }

    pub async fn count_listings_for_search(&self, search_id: SearchId) -> Result<u64, StoreError> {
        self.listing_repo().count_for_search(search_id).await
    }

    // Evaluations

    /// Inserts or wholesale replaces the evaluation; returns the new evaluated-at.
    pub async fn upsert_evaluation(
        &self,
        listing_id: &ListingId,
        evaluation: &Evaluation,
    ) -> Result<String, StoreError> {
        self.evaluation_repo().upsert(listing_id, evaluation).await
    }

    pub async fn get_evaluation(
        &self,
        listing_id: &ListingId,
    ) -> Result<Option<StoredEvaluation>, StoreError> {
        self.evaluation_repo().get(listing_id).await
    }

    pub async fn evaluation_exists(&self, listing_id: &ListingId) -> Result<bool, StoreError> {
        self.evaluation_repo().exists(listing_id).await
    }

    pub async fn clear_evaluation(&self, listing_id: &ListingId) -> Result<bool, StoreError> {
        self.evaluation_repo().delete(listing_id).await
    }
}
