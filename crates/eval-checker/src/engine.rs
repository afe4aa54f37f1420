//! Check execution and result submission

use chrono::Utc;
use grader_common::{score_for, DeploymentRecord, DeploymentStatus, EvaluationResult, Result};
use tracing::{error, info, warn};

use crate::api_client::EvaluationApiClient;
use crate::checks::{self, Check, CheckOutcome};
use crate::content::ContentClient;
use crate::page::{Page, PageClient};

/// What a check battery runs against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub email: String,
    pub task: String,
    pub round: u32,
    pub repo_url: String,
    pub commit_sha: String,
    pub pages_url: String,
    /// Log index when the target came from the deployment log
    pub deployment_id: Option<usize>,
}

impl From<&DeploymentRecord> for Target {
    fn from(record: &DeploymentRecord) -> Self {
        Self {
            email: record.email.clone(),
            task: record.task.clone(),
            round: record.round,
            repo_url: record.repo_url.clone(),
            commit_sha: record.commit_sha.clone(),
            pages_url: record.pages_url.clone(),
            deployment_id: Some(record.id),
        }
    }
}

/// Outcome of an `evaluate_all` pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluationReport {
    /// Deployments whose results were all accepted and that are now marked evaluated
    pub evaluated: Vec<usize>,
    /// Deployments with at least one rejected submission
    pub failed: Vec<usize>,
    /// Deployments already marked evaluated
    pub skipped: usize,
}

pub struct CheckEngine {
    content: ContentClient,
    pages: PageClient,
    api: EvaluationApiClient,
}

impl CheckEngine {
    pub fn new(content: ContentClient, pages: PageClient, api: EvaluationApiClient) -> Self {
        Self {
            content,
            pages,
            api,
        }
    }

    async fn page(&self, target: &Target) -> Result<Page> {
        self.pages.fetch(&target.pages_url).await
    }

    async fn run_check(&self, check: Check, target: &Target) -> Result<CheckOutcome> {
        let outcome = match check {
            Check::License => {
                let text = self
                    .content
                    .fetch_file(&target.repo_url, "LICENSE", &target.commit_sha)
                    .await?;
                checks::license(text.as_deref())
            }
            Check::Readme => {
                let text = self
                    .content
                    .fetch_file(&target.repo_url, "README.md", &target.commit_sha)
                    .await?;
                checks::readme(text.as_deref())
            }
            Check::History => checks::history(),
            Check::PageAccessibility => checks::page_accessibility(&self.page(target).await?),
            Check::HtmlStructure => checks::html_structure(&self.page(target).await?),
            Check::Script => checks::script(&self.page(target).await?),
            Check::Responsive => checks::responsive(&self.page(target).await?),
        };
        Ok(outcome)
    }

    /// Run every check, in order; a failing check never stops the rest
    pub async fn run_checks(&self, target: &Target) -> Vec<EvaluationResult> {
        info!(
            "Evaluating {} | task {} | round {}",
            target.email, target.task, target.round
        );

        let mut results = Vec::with_capacity(Check::ALL.len());
        for check in Check::ALL {
            let outcome = match self.run_check(check, target).await {
                Ok(outcome) => outcome,
                Err(e) => CheckOutcome::fail(format!("Error running check: {e}")),
            };

            if outcome.passed {
                info!("  passed {}: {}", check.name(), outcome.reason);
            } else {
                info!("  failed {}: {}", check.name(), outcome.reason);
            }

            results.push(EvaluationResult {
                email: target.email.clone(),
                task: target.task.clone(),
                round: target.round,
                deployment_id: target.deployment_id,
                repo_url: Some(target.repo_url.clone()),
                commit_sha: Some(target.commit_sha.clone()),
                pages_url: Some(target.pages_url.clone()),
                check: check.name().to_string(),
                score: score_for(outcome.passed),
                reason: outcome.reason,
                logs: Some(format!("Evaluated at {}", Utc::now().to_rfc3339())),
            });
        }

        results
    }

    /// Submit results in order, stopping at the first rejection
    pub async fn submit(&self, results: &[EvaluationResult]) -> Result<()> {
        for result in results {
            if let Err(e) = self.api.submit(result).await {
                warn!("Failed to submit result for check {}: {}", result.check, e);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Run and submit the battery for one target
    pub async fn evaluate(&self, target: &Target) -> Result<Vec<EvaluationResult>> {
        let results = self.run_checks(target).await;
        self.submit(&results).await?;
        Ok(results)
    }

    /// Evaluate every deployment not yet marked evaluated
    ///
    /// A deployment is marked evaluated only after all of its results were
    /// accepted. Failing to list deployments is the only fatal error.
    pub async fn evaluate_all(&self) -> Result<EvaluationReport> {
        let deployments = self.api.deployments().await?;
        info!("Found {} deployments", deployments.len());

        let mut report = EvaluationReport::default();
        for deployment in &deployments {
            if deployment.status == DeploymentStatus::Evaluated {
                report.skipped += 1;
                continue;
            }

            let target = Target::from(deployment);
            let outcome = match self.evaluate(&target).await {
                Ok(_) => self.api.mark_evaluated(deployment.id).await.map(|_| ()),
                Err(e) => Err(e),
            };

            match outcome {
                Ok(()) => report.evaluated.push(deployment.id),
                Err(e) => {
                    error!("Deployment {} not evaluated: {}", deployment.id, e);
                    report.failed.push(deployment.id);
                }
            }
        }

        info!(
            "Evaluation pass finished: {} evaluated, {} failed, {} skipped",
            report.evaluated.len(),
            report.failed.len(),
            report.skipped
        );

        Ok(report)
    }
}
