//! Deployment and task logs for the evaluation API

use grader_common::{
    DeploymentNotification, DeploymentRecord, DeploymentStatus, Error, EvaluationRecord,
    EvaluationResult, Result, StatusTransition, TaskRecord, TaskRequest,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

use crate::log::{Append, AppendLog};

/// File holding deployments, evaluation results and status transitions
pub const DEPLOYMENT_LOG_FILE: &str = "deployments.jsonl";

/// File holding dispatched tasks
pub const TASK_LOG_FILE: &str = "tasks.jsonl";

/// One line of the deployment log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogEntry {
    Deployment(DeploymentRecord),
    Evaluation(EvaluationRecord),
    StatusTransition(StatusTransition),
}

/// Result of a status transition request
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// A transition entry was appended
    Applied(StatusTransition),
    /// The deployment was already evaluated
    Unchanged,
}

/// Storage backend for the evaluation API
pub struct Storage {
    deployments: AppendLog<LogEntry>,
    tasks: AppendLog<TaskRecord>,
    reject_duplicate_nonce: bool,
}

impl Storage {
    /// Open both logs inside `data_dir`, creating it if needed
    pub async fn open(data_dir: impl AsRef<Path>, reject_duplicate_nonce: bool) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        tokio::fs::create_dir_all(data_dir).await?;

        let deployments = AppendLog::open(data_dir.join(DEPLOYMENT_LOG_FILE)).await?;
        let tasks = AppendLog::open(data_dir.join(TASK_LOG_FILE)).await?;

        info!("Opened logs in {}", data_dir.display());

        Ok(Self {
            deployments,
            tasks,
            reject_duplicate_nonce,
        })
    }

    /// Append a deployment with status `received`
    pub async fn record_deployment(
        &self,
        notification: DeploymentNotification,
    ) -> Result<DeploymentRecord> {
        notification.validate()?;
        let reject = self.reject_duplicate_nonce;

        self.deployments
            .append_with(|entries| {
                let duplicate = entries.iter().any(|entry| {
                    matches!(entry, LogEntry::Deployment(d) if d.same_dispatch(&notification))
                });

                if duplicate {
                    if reject {
                        return Err(Error::Conflict(format!(
                            "notification already received for task {} round {} nonce {}",
                            notification.task, notification.round, notification.nonce
                        )));
                    }
                    warn!(
                        "Duplicate nonce {} for task {} round {}, recording anyway",
                        notification.nonce, notification.task, notification.round
                    );
                }

                let record = DeploymentRecord::received(entries.len(), notification);
                Ok(Append::Entry(LogEntry::Deployment(record.clone()), record))
            })
            .await
    }

    /// Append one check result
    pub async fn record_evaluation(&self, result: EvaluationResult) -> Result<EvaluationRecord> {
        result.validate()?;

        self.deployments
            .append_with(|entries| {
                if let Some(id) = result.deployment_id {
                    deployment_at(entries, id)?;
                }

                let record = EvaluationRecord::new(entries.len(), result);
                Ok(Append::Entry(LogEntry::Evaluation(record.clone()), record))
            })
            .await
    }

    /// Move a deployment to `evaluated`; a second request appends nothing
    pub async fn mark_evaluated(&self, deployment_id: usize) -> Result<Transition> {
        self.deployments
            .append_with(|entries| {
                deployment_at(entries, deployment_id)?;

                let already = entries.iter().any(|entry| match entry {
                    LogEntry::StatusTransition(t) => t.deployment_id == deployment_id,
                    _ => false,
                });
                if already {
                    return Ok(Append::Nothing(Transition::Unchanged));
                }

                let results = entries
                    .iter()
                    .filter(|entry| match entry {
                        LogEntry::Evaluation(e) => e.deployment_id == Some(deployment_id),
                        _ => false,
                    })
                    .count();

                let transition = StatusTransition::evaluated(deployment_id, results);
                Ok(Append::Entry(
                    LogEntry::StatusTransition(transition.clone()),
                    Transition::Applied(transition),
                ))
            })
            .await
    }

    /// Append a dispatched task; the secret is never stored
    pub async fn record_task(&self, request: TaskRequest) -> Result<TaskRecord> {
        request.validate()?;

        self.tasks
            .append_with(|entries| {
                let record = TaskRecord::created(entries.len(), request);
                Ok(Append::Entry(record.clone(), record))
            })
            .await
    }

    /// Every deployment, with its derived status
    pub async fn deployments(&self) -> Vec<DeploymentRecord> {
        let entries = self.deployments.snapshot().await;

        let evaluated: HashSet<usize> = entries
            .iter()
            .filter_map(|entry| match entry {
                LogEntry::StatusTransition(t) => Some(t.deployment_id),
                _ => None,
            })
            .collect();

        entries
            .into_iter()
            .filter_map(|entry| match entry {
                LogEntry::Deployment(mut d) => {
                    if evaluated.contains(&d.id) {
                        d.status = DeploymentStatus::Evaluated;
                    }
                    Some(d)
                }
                _ => None,
            })
            .collect()
    }

    pub async fn evaluations(&self) -> Vec<EvaluationRecord> {
        self.deployments
            .snapshot()
            .await
            .into_iter()
            .filter_map(|entry| match entry {
                LogEntry::Evaluation(e) => Some(e),
                _ => None,
            })
            .collect()
    }

    pub async fn tasks(&self) -> Vec<TaskRecord> {
        self.tasks.snapshot().await
    }

    /// Number of lines in the deployment log, of any kind
    pub async fn log_len(&self) -> usize {
        self.deployments.len().await
    }
}

fn deployment_at(entries: &[LogEntry], id: usize) -> Result<&DeploymentRecord> {
    match entries.get(id) {
        Some(LogEntry::Deployment(d)) => Ok(d),
        _ => Err(Error::NotFound(format!("deployment {id}"))),
    }
}
