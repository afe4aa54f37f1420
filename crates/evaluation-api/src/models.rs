//! Response bodies for the evaluation API

use chrono::{DateTime, Utc};
use grader_common::{DeploymentRecord, DeploymentStatus, EvaluationRecord, TaskRecord};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Acknowledgement of an accepted notification
#[derive(Debug, Serialize)]
pub struct NotifyResponse {
    pub status: &'static str,
    pub message: String,
    pub deployment_id: usize,
}

/// Acknowledgement of an accepted check result
#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub status: &'static str,
    pub message: String,
    pub evaluation_id: usize,
}

/// Acknowledgement of a status transition
#[derive(Debug, Serialize)]
pub struct TransitionResponse {
    pub status: &'static str,
    pub deployment_id: usize,
    pub deployment_status: DeploymentStatus,
    /// False when the deployment was already evaluated
    pub changed: bool,
}

/// Acknowledgement of a logged task
#[derive(Debug, Serialize)]
pub struct TaskCreatedResponse {
    pub status: &'static str,
    pub message: String,
    pub task_id: usize,
}

#[derive(Debug, Serialize)]
pub struct DeploymentsResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    pub total: usize,
    pub deployments: Vec<DeploymentRecord>,
}

#[derive(Debug, Serialize)]
pub struct EvaluationsResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub total: usize,
    pub evaluations: Vec<EvaluationRecord>,
}

#[derive(Debug, Serialize)]
pub struct TasksResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub total: usize,
    pub tasks: Vec<TaskRecord>,
}

/// Full dump of the logs
#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub deployments: Vec<DeploymentRecord>,
    pub evaluations: Vec<EvaluationRecord>,
    pub tasks: Vec<TaskRecord>,
    pub exported_at: DateTime<Utc>,
}

/// Aggregate view over the logs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_deployments: usize,
    pub total_evaluations: usize,
    pub total_tasks: usize,
    pub deployments_by_round: BTreeMap<u32, usize>,
    pub round_1_deployments: usize,
    pub round_2_deployments: usize,
    pub received_deployments: usize,
    pub evaluated_deployments: usize,
    pub unique_students: usize,
    pub student_emails: Vec<String>,
    /// Mean score per check name
    pub average_score_by_check: BTreeMap<String, f64>,
}

impl Summary {
    pub fn from_logs(
        deployments: &[DeploymentRecord],
        evaluations: &[EvaluationRecord],
        total_tasks: usize,
    ) -> Self {
        let mut deployments_by_round = BTreeMap::new();
        for d in deployments {
            *deployments_by_round.entry(d.round).or_insert(0) += 1;
        }

        let received_deployments = deployments
            .iter()
            .filter(|d| d.status == DeploymentStatus::Received)
            .count();

        let student_emails: BTreeSet<&str> = deployments.iter().map(|d| d.email.as_str()).collect();

        let mut totals: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
        for e in evaluations {
            let slot = totals.entry(e.check.as_str()).or_insert((0.0, 0));
            slot.0 += e.score;
            slot.1 += 1;
        }
        let average_score_by_check = totals
            .into_iter()
            .map(|(check, (sum, count))| (check.to_string(), sum / count as f64))
            .collect();

        Self {
            total_deployments: deployments.len(),
            total_evaluations: evaluations.len(),
            total_tasks,
            round_1_deployments: deployments_by_round.get(&1).copied().unwrap_or(0),
            round_2_deployments: deployments_by_round.get(&2).copied().unwrap_or(0),
            deployments_by_round,
            received_deployments,
            evaluated_deployments: deployments.len() - received_deployments,
            unique_students: student_emails.len(),
            student_emails: student_emails.into_iter().map(str::to_string).collect(),
            average_score_by_check,
        }
    }
}
