use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use populator::api::RestClient;
use populator::config::PopulatorConfig;
use populator::engine::{Engine, RunMode};
use populator::rng::{RandomSource, SeededRandom};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,populator=debug")),
        )
        .init();

    let config = PopulatorConfig::load();

    let mode = match std::env::args().nth(1) {
        Some(arg) => RunMode::parse(&arg).with_context(|| {
            format!(
                "Unknown run mode '{}'. Use groups, channels or create-actors.",
                arg
            )
        })?,
        None => RunMode::parse(&config.run_mode).unwrap_or_else(|| {
            tracing::warn!(
                "Unknown run_mode '{}' in config, defaulting to groups",
                config.run_mode
            );
            RunMode::Groups
        }),
    };

    let rng: Arc<dyn RandomSource> = match config.seed {
        Some(seed) => {
            tracing::info!("Using fixed seed {}", seed);
            Arc::new(SeededRandom::from_seed(seed))
        }
        None => Arc::new(SeededRandom::from_entropy()),
    };

    tracing::info!("Populating {:?} against {}", mode, config.base_url);

    let api = Arc::new(RestClient::new(&config));
    let engine = Engine::new(api, config, rng);

    let rt = tokio::runtime::Runtime::new().context("failed to start runtime")?;
    let summary = rt.block_on(engine.run(mode))?;

    tracing::info!(
        "Run complete: {} post(s) ({} skipped), {} repl(ies) ({} failed), {} like(s) ({} failed), {} actor(s) created ({} failed)",
        summary.posted.len(),
        summary.skipped_posts,
        summary.replies_sent,
        summary.replies_failed,
        summary.likes_sent,
        summary.likes_failed,
        summary.actors_created,
        summary.actors_failed
    );

    Ok(())
}
