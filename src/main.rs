use anyhow::{bail, Result};
use clap::Parser;
use gym_dedupe_lib::config::MatchingConfig;
use gym_dedupe_lib::models::core::SourceOrg;
use gym_dedupe_lib::registry::MasterGymRegistry;
use gym_dedupe_lib::sync::{GymSyncOrchestrator, JsonFeedFetcher, SourceFetcher};
use gym_dedupe_lib::utils::env::load_env;
use gym_dedupe_lib::utils::get_memory_usage;
use indicatif::MultiProgress;
use log::info;
use std::path::PathBuf;
use std::sync::Arc;

/// Resolve federation gym feeds against the master gym registry.
#[derive(Parser, Debug)]
#[command(name = "gym_sync")]
struct Args {
    /// Path to the IBJJF gym feed (JSON array of source gym records)
    #[arg(long)]
    ibjjf_feed: Option<PathBuf>,

    /// Path to the JJWL gym feed (JSON array of source gym records)
    #[arg(long)]
    jjwl_feed: Option<PathBuf>,

    /// Disable progress bars (for non-interactive runs)
    #[arg(long)]
    no_progress: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging and environment
    env_logger::init();
    info!("Starting gym identity resolution sync");
    load_env();

    let args = Args::parse();

    let config = MatchingConfig::from_env();
    config.log_config();

    let mut fetchers: Vec<Arc<dyn SourceFetcher>> = Vec::new();
    if let Some(path) = &args.ibjjf_feed {
        fetchers.push(Arc::new(JsonFeedFetcher::new(SourceOrg::Ibjjf, path)));
    }
    if let Some(path) = &args.jjwl_feed {
        fetchers.push(Arc::new(JsonFeedFetcher::new(SourceOrg::Jjwl, path)));
    }
    if fetchers.is_empty() {
        bail!("No feeds given; pass --ibjjf-feed and/or --jjwl-feed");
    }

    let initial_memory = get_memory_usage().await;
    info!("Initial memory usage: {} MB", initial_memory);

    let multi_progress = if args.no_progress {
        None
    } else {
        Some(MultiProgress::new())
    };

    let registry = Arc::new(MasterGymRegistry::new());
    let orchestrator = GymSyncOrchestrator::new(registry.clone(), config);

    let run = orchestrator.run(&fetchers, multi_progress.as_ref()).await;

    info!("=== Sync Summary ===");
    info!("Run ID: {}", run.run_id);
    for source in &run.per_source {
        match &source.error {
            Some(error) => info!("{}: FAILED ({})", source.org, error),
            None => info!(
                "{}: {} fetched, {} skipped, {} auto-linked, {} pending, {} created in {:.2}s",
                source.org,
                source.fetched,
                source.skipped_linked,
                source.auto_linked,
                source.pending_review,
                source.masters_created,
                source.duration_secs
            ),
        }
    }
    info!(
        "Totals: {} fetched, {} auto-linked, {} pending review, {} masters created",
        run.total_fetched(),
        run.total_auto_linked(),
        run.total_pending_review(),
        run.total_masters_created()
    );
    info!(
        "Pending review queue size: {}",
        registry.list_pending_matches().await.len()
    );
    info!("Total execution time: {:.2}s", run.total_duration_secs);

    let final_memory = get_memory_usage().await;
    info!(
        "Final memory usage: {} MB (delta: {} MB)",
        final_memory,
        final_memory.saturating_sub(initial_memory)
    );

    if run.failed_sources().len() == run.per_source.len() {
        bail!("Every source sync failed");
    }

    info!("Sync completed successfully!");
    Ok(())
}
