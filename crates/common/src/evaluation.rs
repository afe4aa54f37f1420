//! Check results and their validation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{require_non_blank, require_round, Error, Result};

/// Score of a passing check
pub const SCORE_PASS: f64 = 100.0;

/// Score of a failing check
pub const SCORE_FAIL: f64 = 0.0;

/// Binary grading: pass maps to 100, fail to 0
pub fn score_for(passed: bool) -> f64 {
    if passed {
        SCORE_PASS
    } else {
        SCORE_FAIL
    }
}

/// Outcome of one check against one deployment, as submitted to `/evaluate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub email: String,
    pub task: String,
    pub round: u32,

    /// Deployment this result grades, when it came from the log
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_id: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_sha: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages_url: Option<String>,

    /// Human-readable check name
    pub check: String,

    /// 0 or 100
    pub score: f64,

    pub reason: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<String>,
}

impl EvaluationResult {
    pub fn passed(&self) -> bool {
        self.score == SCORE_PASS
    }

    /// Reject blank identity fields and any non-binary score
    pub fn validate(&self) -> Result<()> {
        require_non_blank(&[
            ("email", &self.email),
            ("task", &self.task),
            ("check", &self.check),
        ])?;
        require_round(self.round)?;

        if self.score != SCORE_PASS && self.score != SCORE_FAIL {
            return Err(Error::Validation(format!(
                "score must be {SCORE_FAIL} or {SCORE_PASS}, got {}",
                self.score
            )));
        }

        Ok(())
    }
}

/// An accepted evaluation result as stored in the deployment log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    /// Index in the deployment log
    pub id: usize,
    pub timestamp: DateTime<Utc>,
    pub email: String,
    pub task: String,
    pub round: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_id: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_sha: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages_url: Option<String>,
    pub check: String,
    pub score: f64,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<String>,
}

impl EvaluationRecord {
    pub fn new(id: usize, result: EvaluationResult) -> Self {
        Self {
            id,
            timestamp: Utc::now(),
            email: result.email,
            task: result.task,
            round: result.round,
            deployment_id: result.deployment_id,
            repo_url: result.repo_url,
            commit_sha: result.commit_sha,
            pages_url: result.pages_url,
            check: result.check,
            score: result.score,
            reason: result.reason,
            logs: result.logs,
        }
    }
}
