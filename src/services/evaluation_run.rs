//! Scores the newest stored listings of a search that have no evaluation yet.

use crate::db::{Store, StoreError};
use crate::domain::SearchTarget;
use crate::models::{Evaluation, Listing};
use crate::services::scoring::{ScoreOutcome, ScoringEngine, ScoringError};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum EvaluationRunError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Scoring(#[from] ScoringError),
}

/// A listing together with the evaluation stored for it during this run.
#[derive(Debug, Clone)]
pub struct ScoredListing {
    pub listing: Listing,
    pub evaluation: Evaluation,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EvaluationSummary {
    pub search_name: String,
    pub considered: usize,
    pub skipped: usize,
    pub evaluated: usize,
    pub rejected: usize,
    #[serde(skip)]
    pub accepted: Vec<ScoredListing>,
}

pub struct EvaluationRun<'a> {
    store: &'a Store,
    engine: &'a ScoringEngine,
    max_listings: usize,
}

impl<'a> EvaluationRun<'a> {
    #[must_use]
    pub const fn new(store: &'a Store, engine: &'a ScoringEngine, max_listings: usize) -> Self {
        Self {
            store,
            engine,
            max_listings,
        }
    }

    pub async fn run(&self, target: &SearchTarget) -> Result<EvaluationSummary, EvaluationRunError> {
        self.run_on(target, Utc::now().date_naive()).await
    }

    /// Same as [`Self::run`] with an explicit "today" for the prompt.
    pub async fn run_on(
        &self,
        target: &SearchTarget,
        today: NaiveDate,
    ) -> Result<EvaluationSummary, EvaluationRunError> {
        let search_name = target.search_name();
        let mut summary = EvaluationSummary {
            search_name: search_name.clone(),
            ..EvaluationSummary::default()
        };

        let Some(search) = self.store.find_search(&search_name).await? else {
            warn!(
                event = "evaluation_no_search",
                search = %search_name,
                "No listings stored for this search yet"
            );
            return Ok(summary);
        };

        let mut listings = self.store.listings_for_search(search.id).await?;
        listings.truncate(self.max_listings);
        summary.considered = listings.len();

        info!(
            event = "evaluation_started",
            search = %search_name,
            candidates = listings.len(),
            "Processing newest listings"
        );

        for listing in listings {
            if self.store.evaluation_exists(&listing.id).await? {
                summary.skipped += 1;
                continue;
            }

            match self.engine.score(&listing, today).await? {
                ScoreOutcome::Accepted(evaluation) => {
                    self.store.upsert_evaluation(&listing.id, &evaluation).await?;
                    info!(
                        event = "evaluation_stored",
                        listing_id = %listing.id,
                        value_score = evaluation.value_score,
                        match_score = evaluation.match_score,
                        "Evaluation stored"
                    );
                    summary.evaluated += 1;
                    summary.accepted.push(ScoredListing {
                        listing,
                        evaluation,
                    });
                }
                ScoreOutcome::Rejected(_) => summary.rejected += 1,
            }
        }

        info!(
            event = "evaluation_finished",
            search = %search_name,
            considered = summary.considered,
            skipped = summary.skipped,
            evaluated = summary.evaluated,
            rejected = summary.rejected,
            "Evaluation run complete"
        );

        Ok(summary)
    }
}
