pub mod evaluation_run;
pub use evaluation_run::{EvaluationRun, EvaluationRunError, EvaluationSummary, ScoredListing};

pub mod ingestion;
pub use ingestion::{IngestError, IngestionPipeline, IngestionReport, ListingSource, SourceError};

pub mod notify;
pub use notify::Notifier;

pub mod prompt;

pub mod report;
pub use report::ReportError;

pub mod scoring;
pub use scoring::{
    BackendError, ChatEvaluator, EvaluationBackend, EvaluationRequest, MarketAnalysis,
    ScoreOutcome, ScoringEngine, ScoringError, StaticMarketAnalysis,
};

pub mod throttle;
pub use throttle::{JitterThrottle, NoThrottle, Throttle};
