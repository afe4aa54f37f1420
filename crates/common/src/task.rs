//! Roster entries, task requests and the task log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{require_non_blank, require_round, Result};

/// One roster row: a student and the endpoint that builds their artifacts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub secret: String,
}

impl Submission {
    pub fn validate(&self) -> Result<()> {
        require_non_blank(&[
            ("email", &self.email),
            ("endpoint", &self.endpoint),
            ("secret", &self.secret),
        ])
    }
}

/// File handed to the generation step, encoded as a data URI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub url: String,
}

/// Task sent to a student endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub email: String,

    /// Shared secret checked by the student service; blank when logged
    #[serde(default)]
    pub secret: String,

    pub task: String,
    pub round: u32,
    pub nonce: String,
    pub brief: String,
    pub checks: Vec<String>,
    pub evaluation_url: String,

    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl TaskRequest {
    /// Copy without the shared secret, for the task log
    pub fn redacted(&self) -> Self {
        Self {
            secret: String::new(),
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Result<()> {
        require_non_blank(&[
            ("email", &self.email),
            ("task", &self.task),
            ("nonce", &self.nonce),
            ("brief", &self.brief),
            ("evaluation_url", &self.evaluation_url),
        ])?;
        require_round(self.round)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Created,
}

/// A dispatched task as stored in the task log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: usize,
    pub timestamp: DateTime<Utc>,
    pub email: String,
    pub task: String,
    pub round: u32,
    pub nonce: String,
    pub brief: String,
    pub checks: Vec<String>,
    pub evaluation_url: String,
    pub status: TaskStatus,
}

impl TaskRecord {
    /// Build a log record; the secret is dropped
    pub fn created(id: usize, request: TaskRequest) -> Self {
        Self {
            id,
            timestamp: Utc::now(),
            email: request.email,
            task: request.task,
            round: request.round,
            nonce: request.nonce,
            brief: request.brief,
            checks: request.checks,
            evaluation_url: request.evaluation_url,
            status: TaskStatus::Created,
        }
    }
}
