//! Evaluation Checker
//!
//! Modes:
//! - --evaluate-all: check every deployment not yet evaluated
//! - --repo --commit --pages --email --task [--round]: check one deployment

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use eval_checker::{CheckEngine, Config, ContentClient, EvaluationApiClient, PageClient, Target};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "eval-checker")]
#[command(about = "Evaluate deployments")]
struct Cli {
    /// Evaluate all deployments not yet marked evaluated
    #[arg(long)]
    evaluate_all: bool,

    /// Repository URL
    #[arg(long)]
    repo: Option<String>,

    /// Commit SHA
    #[arg(long)]
    commit: Option<String>,

    /// Published page URL
    #[arg(long)]
    pages: Option<String>,

    /// Student email
    #[arg(long)]
    email: Option<String>,

    /// Task id
    #[arg(long)]
    task: Option<String>,

    /// Round number
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    round: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eval_checker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let single = match (&cli.repo, &cli.commit, &cli.pages, &cli.email, &cli.task) {
        (Some(repo), Some(commit), Some(pages), Some(email), Some(task)) => Some(Target {
            email: email.clone(),
            task: task.clone(),
            round: cli.round,
            repo_url: repo.clone(),
            commit_sha: commit.clone(),
            pages_url: pages.clone(),
            deployment_id: None,
        }),
        _ => None,
    };

    if !cli.evaluate_all && single.is_none() {
        Cli::command().print_help()?;
        return Ok(());
    }

    let config = Config::from_env().context("Failed to load configuration")?;
    let timeout = config.check_timeout();

    let engine = CheckEngine::new(
        ContentClient::new(&config.github_api_url, config.github_token.clone(), timeout)?,
        PageClient::new(timeout)?,
        EvaluationApiClient::new(
            &config.evaluation_api_url,
            config.evaluation_api_token.clone(),
            timeout,
        )?,
    );

    if cli.evaluate_all {
        let report = engine.evaluate_all().await?;
        println!(
            "{} evaluated, {} failed, {} already evaluated",
            report.evaluated.len(),
            report.failed.len(),
            report.skipped
        );
    } else if let Some(target) = single {
        let results = engine.evaluate(&target).await?;
        let passed = results.iter().filter(|r| r.passed()).count();
        println!("Results submitted: {}/{} checks passed", passed, results.len());
    }

    Ok(())
}
