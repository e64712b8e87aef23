use crate::config::Config;
use crate::cycle::{self, with_store};
use crate::scheduler::Scheduler;
use crate::services::{EvaluationSummary, IngestionReport};
use tracing::info;

fn print_ingestion(report: &IngestionReport) {
    if report.nothing_to_do() {
        println!("No listings found for {}, nothing to do.", report.search_name);
        return;
    }

    println!("Search: {} (ID: {})", report.search_name, report.search_id);
    println!(
        "  {} candidates | {} new | {} already stored | {} stored without details",
        report.candidates, report.new_listings, report.already_known, report.detail_failures
    );
    println!("  {} listings stored for this search", report.total_listings);
}

fn print_evaluation(summary: &EvaluationSummary) {
    println!(
        "Evaluated {} of {} listings ({} already scored, {} unusable replies)",
        summary.evaluated, summary.considered, summary.skipped, summary.rejected
    );
    for scored in &summary.accepted {
        println!(
            "  • {} | value {:.1} | match {:.1}",
            scored.listing.title, scored.evaluation.value_score, scored.evaluation.match_score
        );
    }
}

pub async fn cmd_run(config: &Config) -> anyhow::Result<()> {
    let report = cycle::run_cycle(config).await?;

    print_ingestion(&report.ingestion);
    print_evaluation(&report.evaluation);
    if let Some(path) = &report.report_path {
        println!("Report written to {}", path.display());
    }
    if config.notifications.enabled {
        println!("Sent {} alert(s)", report.notified);
    }

    Ok(())
}

pub async fn cmd_scrape(config: &Config) -> anyhow::Result<()> {
    let target = config.search_target()?;
    let report = with_store(config, |store| async move {
        cycle::scrape(&store, config, &target).await
    })
    .await?;

    print_ingestion(&report);
    Ok(())
}

pub async fn cmd_evaluate(config: &Config) -> anyhow::Result<()> {
    let target = config.search_target()?;
    let engine = cycle::scoring_engine(config)?;
    let summary = with_store(config, |store| {
        let (engine, target) = (&engine, &target);
        async move { cycle::evaluate(&store, engine, config, target).await }
    })
    .await?;

    if summary.considered == 0 {
        println!("No stored listings for {}. Run 'toribot scrape' first.", target);
        return Ok(());
    }

    print_evaluation(&summary);
    Ok(())
}

pub async fn cmd_report(config: &Config) -> anyhow::Result<()> {
    config.require_report_path()?;
    let path = with_store(config, |store| async move { cycle::render_report(&store, config).await })
        .await?;

    println!("Report written to {}", path.display());
    Ok(())
}

pub async fn cmd_daemon(config: &Config) -> anyhow::Result<()> {
    config.search_target()?;
    config.require_api_key()?;
    if config.notifications.enabled {
        config.require_telegram()?;
    }

    info!(event = "daemon_started", "Starting ToriBot daemon");

    let scheduler = Scheduler::new(config.clone());
    scheduler
        .run(async {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
            info!("Shutdown signal received");
        })
        .await?;

    info!(event = "daemon_stopped", "ToriBot daemon stopped");
    Ok(())
}
