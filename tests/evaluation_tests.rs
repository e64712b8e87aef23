//! Evaluation runs with a scripted model backend.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::{Arc, Mutex};
use toribot::db::Store;
use toribot::domain::{ListingId, SearchTarget};
use toribot::models::{ListingSummary, NewListing, RedFlags};
use toribot::services::{
    BackendError, EvaluationBackend, EvaluationRequest, EvaluationRun, EvaluationRunError,
    ScoringEngine, ScoringError, StaticMarketAnalysis,
};

const GOOD_REPLY: &str = "VALUE SCORE: 8.5\n\
VALUE POINTS:\n\
• Cheaper than comparable ads\n\
\n\
MATCH SCORE: 9\n\
MATCH POINTS:\n\
• 16 GB RAM as required\n\
\n\
RED FLAGS: None";

async fn temp_store() -> Store {
    let db_path =
        std::env::temp_dir().join(format!("toribot-eval-test-{}.db", uuid::Uuid::new_v4()));
    Store::new(&format!("sqlite:{}", db_path.display()))
        .await
        .expect("failed to open store")
}

fn summary(id: &str) -> ListingSummary {
    ListingSummary {
        id: ListingId::new(id),
        title: format!("MacBook {id}"),
        price: Some("700 €".to_string()),
        price_number: Some(700),
        location: Some("Turku".to_string()),
        link: format!("https://www.tori.fi/recommerce/forsale/item/{id}"),
        image: None,
        seller: None,
        timestamp: None,
        badges: None,
    }
}

async fn seed(store: &Store, ids: &[&str]) {
    let search_id = store.upsert_search("macbook").await.unwrap();
    for id in ids {
        store
            .insert_listing(&NewListing::new(summary(id), None), search_id)
            .await
            .unwrap();
    }
}

/// Replies with the same text every time and records the prompts it saw.
struct ScriptedModel {
    reply: Result<String, String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn down() -> Arc<Self> {
        Arc::new(Self {
            reply: Err("connection refused".to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl EvaluationBackend for ScriptedModel {
    async fn complete(&self, request: &EvaluationRequest) -> Result<String, BackendError> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        self.reply.clone().map_err(BackendError::Unavailable)
    }
}

fn target() -> SearchTarget {
    SearchTarget::new(Some("macbook"), None, None).unwrap()
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
}

#[tokio::test]
async fn scores_and_stores_unevaluated_listings() {
    let store = temp_store().await;
    seed(&store, &["1", "2", "3", "4"]).await;
    let model = ScriptedModel::replying(GOOD_REPLY);
    let engine = ScoringEngine::new(model.clone(), "Needs 16 GB RAM");

    let summary = EvaluationRun::new(&store, &engine, 3)
        .run_on(&target(), today())
        .await
        .unwrap();

    assert_eq!(summary.considered, 3);
    assert_eq!(summary.evaluated, 3);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.accepted.len(), 3);

    // Newest first, the oldest listing is outside the window.
    assert!(store.evaluation_exists(&ListingId::new("4")).await.unwrap());
    assert!(!store.evaluation_exists(&ListingId::new("1")).await.unwrap());

    let stored = store
        .get_evaluation(&ListingId::new("4"))
        .await
        .unwrap()
        .unwrap();
    assert!((stored.evaluation.value_score - 8.5).abs() < f64::EPSILON);
    assert_eq!(stored.evaluation.red_flags, RedFlags::None);
    assert_eq!(stored.evaluation.raw_response.as_deref(), Some(GOOD_REPLY));

    let prompts = model.prompts();
    assert_eq!(prompts.len(), 3);
    assert!(prompts[0].contains("Needs 16 GB RAM"));
    assert!(prompts[0].contains("2026-10-16"));
}

#[tokio::test]
async fn already_evaluated_listings_are_not_sent_again() {
    let store = temp_store().await;
    seed(&store, &["1", "2"]).await;
    let model = ScriptedModel::replying(GOOD_REPLY);
    let engine = ScoringEngine::new(model.clone(), "Anything");

    EvaluationRun::new(&store, &engine, 3)
        .run_on(&target(), today())
        .await
        .unwrap();
    let second = EvaluationRun::new(&store, &engine, 3)
        .run_on(&target(), today())
        .await
        .unwrap();

    assert_eq!(second.skipped, 2);
    assert_eq!(second.evaluated, 0);
    assert_eq!(model.prompts().len(), 2);
}

#[tokio::test]
async fn unusable_reply_stores_nothing() {
    let store = temp_store().await;
    seed(&store, &["1"]).await;
    let model = ScriptedModel::replying("I think this laptop is a solid buy.");
    let engine = ScoringEngine::new(model, "Anything");

    let summary = EvaluationRun::new(&store, &engine, 3)
        .run_on(&target(), today())
        .await
        .unwrap();

    assert_eq!(summary.rejected, 1);
    assert_eq!(summary.evaluated, 0);
    assert!(!store.evaluation_exists(&ListingId::new("1")).await.unwrap());
}

#[tokio::test]
async fn out_of_range_scores_are_rejected_unless_bounds_are_off() {
    let store = temp_store().await;
    seed(&store, &["1"]).await;
    let reply = GOOD_REPLY.replace("VALUE SCORE: 8.5", "VALUE SCORE: 12");

    let strict = ScoringEngine::new(ScriptedModel::replying(&reply), "Anything");
    let summary = EvaluationRun::new(&store, &strict, 3)
        .run_on(&target(), today())
        .await
        .unwrap();
    assert_eq!(summary.rejected, 1);

    let lenient =
        ScoringEngine::new(ScriptedModel::replying(&reply), "Anything").with_score_bounds(false);
    let summary = EvaluationRun::new(&store, &lenient, 3)
        .run_on(&target(), today())
        .await
        .unwrap();
    assert_eq!(summary.evaluated, 1);
}

#[tokio::test]
async fn backend_failure_aborts_the_run() {
    let store = temp_store().await;
    seed(&store, &["1", "2"]).await;
    let engine = ScoringEngine::new(ScriptedModel::down(), "Anything");

    let err = EvaluationRun::new(&store, &engine, 3)
        .run_on(&target(), today())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EvaluationRunError::Scoring(ScoringError::Backend(BackendError::Unavailable(_)))
    ));
    assert!(!store.evaluation_exists(&ListingId::new("2")).await.unwrap());
}

#[tokio::test]
async fn unknown_search_has_nothing_to_evaluate() {
    let store = temp_store().await;
    let model = ScriptedModel::replying(GOOD_REPLY);
    let engine = ScoringEngine::new(model.clone(), "Anything");

    let summary = EvaluationRun::new(&store, &engine, 3)
        .run_on(&target(), today())
        .await
        .unwrap();

    assert_eq!(summary.considered, 0);
    assert!(model.prompts().is_empty());
    assert!(store.find_search("macbook").await.unwrap().is_none());
}

#[tokio::test]
async fn market_analysis_reaches_the_prompt() {
    let store = temp_store().await;
    seed(&store, &["1"]).await;
    let model = ScriptedModel::replying(GOOD_REPLY);
    let engine = ScoringEngine::new(model.clone(), "Anything").with_market_analysis(Arc::new(
        StaticMarketAnalysis::new("Used M1 Airs sell for 550-650 €"),
    ));

    EvaluationRun::new(&store, &engine, 3)
        .run_on(&target(), today())
        .await
        .unwrap();

    assert!(model.prompts()[0].contains("Used M1 Airs sell for 550-650 €"));
}
