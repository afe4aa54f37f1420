//! Deployment notifications and the records they become

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{require_non_blank, require_round, Result};

/// Status of a deployment as reported by the query surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    /// Notification accepted, checks not yet recorded
    Received,
    /// All check results were durably submitted
    Evaluated,
}

/// Payload a student service posts once its artifact is published
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentNotification {
    pub email: String,
    pub task: String,
    pub round: u32,
    pub nonce: String,
    pub repo_url: String,
    pub commit_sha: String,
    pub pages_url: String,
}

impl DeploymentNotification {
    /// Check that every field is present and the round is positive
    pub fn validate(&self) -> Result<()> {
        require_non_blank(&[
            ("email", &self.email),
            ("task", &self.task),
            ("nonce", &self.nonce),
            ("repo_url", &self.repo_url),
            ("commit_sha", &self.commit_sha),
            ("pages_url", &self.pages_url),
        ])?;
        require_round(self.round)
    }
}

/// A point-in-time fact: one accepted notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    /// Index assigned by the deployment log
    pub id: usize,

    /// When the notification was accepted
    pub timestamp: DateTime<Utc>,

    pub email: String,
    pub task: String,
    pub round: u32,
    pub nonce: String,
    pub repo_url: String,
    pub commit_sha: String,
    pub pages_url: String,

    /// Always `received` when stored; queries report the derived status
    pub status: DeploymentStatus,
}

impl DeploymentRecord {
    /// Create a freshly received record from a validated notification
    pub fn received(id: usize, notification: DeploymentNotification) -> Self {
        Self {
            id,
            timestamp: Utc::now(),
            email: notification.email,
            task: notification.task,
            round: notification.round,
            nonce: notification.nonce,
            repo_url: notification.repo_url,
            commit_sha: notification.commit_sha,
            pages_url: notification.pages_url,
            status: DeploymentStatus::Received,
        }
    }

    /// Same (task, round, nonce) triple as another dispatch
    pub fn same_dispatch(&self, notification: &DeploymentNotification) -> bool {
        self.task == notification.task
            && self.round == notification.round
            && self.nonce == notification.nonce
    }
}

/// Log entry moving a deployment to `evaluated`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusTransition {
    pub deployment_id: usize,
    pub status: DeploymentStatus,

    /// Number of check results submitted before the transition
    #[serde(default)]
    pub results: usize,

    pub timestamp: DateTime<Utc>,
}

impl StatusTransition {
    pub fn evaluated(deployment_id: usize, results: usize) -> Self {
        Self {
            deployment_id,
            status: DeploymentStatus::Evaluated,
            results,
            timestamp: Utc::now(),
        }
    }
}
