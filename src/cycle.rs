//! The stages of a bot cycle and the glue that runs them in order.

use crate::clients::marketplace::MarketplaceClient;
use crate::clients::telegram::TelegramClient;
use crate::config::Config;
use crate::db::Store;
use crate::domain::SearchTarget;
use crate::services::{
    ChatEvaluator, EvaluationRun, EvaluationSummary, IngestionPipeline, IngestionReport,
    JitterThrottle, Notifier, ScoringEngine, report,
};
use anyhow::{Context, Result};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug)]
pub struct CycleReport {
    pub ingestion: IngestionReport,
    pub evaluation: EvaluationSummary,
    pub report_path: Option<PathBuf>,
    pub notified: usize,
}

/// Opens the store, hands it to `f` and closes it again whatever `f` returns.
pub async fn with_store<T, F, Fut>(config: &Config, f: F) -> Result<T>
where
    F: FnOnce(Store) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await
    .with_context(|| format!("Failed to open database {}", config.general.database_path))?;

    let result = f(store.clone()).await;

    if let Err(e) = store.close().await {
        warn!(error = %e, "Failed to close database cleanly");
    }

    result
}

pub fn scoring_engine(config: &Config) -> Result<ScoringEngine> {
    config.require_api_key()?;
    let backend = ChatEvaluator::from_config(&config.evaluator)?;
    Ok(ScoringEngine::from_config(Arc::new(backend), &config.evaluator))
}

pub fn notifier(config: &Config) -> Result<Notifier> {
    let (token, chat) = config.require_telegram()?;
    Ok(Notifier::new(
        TelegramClient::new(token, chat),
        config.notifications.min_score,
    ))
}

pub async fn scrape(store: &Store, config: &Config, target: &SearchTarget) -> Result<IngestionReport> {
    let source = MarketplaceClient::new(&config.marketplace)
        .context("Failed to build marketplace client")?;
    let pipeline = IngestionPipeline::new(
        store.clone(),
        Arc::new(source),
        Arc::new(JitterThrottle::from_config(&config.marketplace)),
        config.search.max_listings,
    );

    Ok(pipeline.run(target).await?)
}

pub async fn evaluate(
    store: &Store,
    engine: &ScoringEngine,
    config: &Config,
    target: &SearchTarget,
) -> Result<EvaluationSummary> {
    let run = EvaluationRun::new(store, engine, config.evaluator.max_listings);
    Ok(run.run(target).await?)
}

pub async fn render_report(store: &Store, config: &Config) -> Result<PathBuf> {
    let path = config.require_report_path()?;
    report::write_report(store, &path, &config.evaluator.buyer_requirements).await?;
    Ok(path)
}

/// Ingestion, evaluation, then the report and alerts when configured.
///
/// Everything the cycle needs from config is checked before the store is
/// opened or any request is sent.
pub async fn run_cycle(config: &Config) -> Result<CycleReport> {
    let target = config.search_target()?;
    let engine = scoring_engine(config)?;
    let report_path = config.report_output_path();
    let notifier = if config.notifications.enabled {
        Some(notifier(config)?)
    } else {
        None
    };

    info!(event = "cycle_started", search = %target, "ToriBot cycle starting");

    let report = with_store(config, |store| async move {
        let ingestion = scrape(&store, config, &target).await?;
        let evaluation = evaluate(&store, &engine, config, &target).await?;

        let written = match report_path {
            Some(path) => {
                report::write_report(&store, &path, &config.evaluator.buyer_requirements).await?;
                Some(path)
            }
            None => None,
        };

        let notified = match &notifier {
            Some(notifier) => notifier.announce(&evaluation.accepted).await?,
            None => 0,
        };

        Ok(CycleReport {
            ingestion,
            evaluation,
            report_path: written,
            notified,
        })
    })
    .await?;

    info!(
        event = "cycle_finished",
        new_listings = report.ingestion.new_listings,
        evaluated = report.evaluation.evaluated,
        notified = report.notified,
        "ToriBot cycle complete"
    );

    Ok(report)
}
