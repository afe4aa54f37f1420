//! Task Dispatcher
//!
//! Commands:
//! - default: send round 1 tasks to every roster entry
//! - --round N: send revision tasks for round N (N >= 2)
//! - --create-sample: write an example roster and exit

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use task_dispatcher::{
    roster, templates, Config, Dispatcher, RoundController, TaskLogClient,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "task-dispatcher")]
#[command(about = "Send task briefs to student endpoints")]
struct Cli {
    /// Roster CSV with timestamp,email,endpoint,secret columns
    #[arg(long, default_value = "submissions.csv")]
    csv: PathBuf,

    /// Write a sample roster to --csv and exit
    #[arg(long)]
    create_sample: bool,

    /// Round to dispatch; 2 and above send revision briefs
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    round: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "task_dispatcher=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    if cli.create_sample {
        roster::write_sample(&cli.csv)?;
        return Ok(());
    }

    let config = Config::from_env().context("Failed to load configuration")?;

    let templates = match &config.templates_path {
        Some(path) => templates::load_templates(path)?,
        None => templates::builtin_templates(),
    };
    info!("Using {} task templates", templates.len());

    let submissions = roster::load_roster(&cli.csv)?;
    if submissions.is_empty() {
        warn!("Roster {} has no rows", cli.csv.display());
        return Ok(());
    }

    let dispatcher = Dispatcher::new(config.retry_policy(), config.request_timeout())
        .context("Failed to build HTTP client")?;
    let task_log = TaskLogClient::new(
        &config.evaluation_api_url,
        config.evaluation_api_token.clone(),
        config.request_timeout(),
    )
    .context("Failed to build HTTP client")?;

    let controller = RoundController::new(
        dispatcher,
        task_log,
        templates,
        config.notify_url(),
        config.rate_limit(),
    );

    let report = controller
        .run_round(&submissions, cli.round)
        .await
        .context("Round failed")?;

    println!(
        "Round {}: {} delivered, {} unauthorized, {} failed, {} skipped",
        report.round,
        report.delivered(),
        report.unauthorized(),
        report.failed(),
        report.skipped.len()
    );

    Ok(())
}
