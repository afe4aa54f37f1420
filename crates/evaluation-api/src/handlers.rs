//! API request handlers for the evaluation API

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use grader_common::{DeploymentNotification, EvaluationResult, TaskRequest};
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    models::{
        DeploymentsResponse, EvaluateResponse, EvaluationsResponse, ExportResponse,
        NotifyResponse, Summary, TaskCreatedResponse, TasksResponse, TransitionResponse,
    },
    storage::{Storage, Transition},
};

/// Shared application state
pub struct AppState {
    pub storage: Storage,

    /// Bearer token required on mutating routes, when set
    pub api_token: Option<String>,
}

/// API Error type
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message
        });

        (self.status, Json(body)).into_response()
    }
}

impl From<grader_common::Error> for ApiError {
    fn from(err: grader_common::Error) -> Self {
        use grader_common::Error;

        let status = match &err {
            Error::Authentication(_) => StatusCode::UNAUTHORIZED,
            Error::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::ExternalService { .. } | Error::TransientNetwork(_) => StatusCode::BAD_GATEWAY,
            Error::Persistence(_) | Error::JsonSerialization(_) | Error::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        ApiError {
            status,
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = state.api_token.as_deref() else {
        return Ok(());
    };

    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if provided == Some(expected) {
        Ok(())
    } else {
        warn!("Rejected request with missing or invalid bearer token");
        Err(grader_common::Error::Authentication("invalid or missing API token".to_string()).into())
    }
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "evaluation-api"
    }))
}

/// Receive a deployment notification from a student service
pub async fn notify_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<DeploymentNotification>, JsonRejection>,
) -> Result<Json<NotifyResponse>, ApiError> {
    authorize(&state, &headers)?;
    let Json(payload) = payload?;

    info!(
        "Deployment notification: {} task {} round {} commit {}",
        payload.email, payload.task, payload.round, payload.commit_sha
    );

    let record = state.storage.record_deployment(payload).await?;

    Ok(Json(NotifyResponse {
        status: "ok",
        message: "Deployment received and queued for evaluation".to_string(),
        deployment_id: record.id,
    }))
}

/// Store one check result
pub async fn evaluate_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<EvaluationResult>, JsonRejection>,
) -> Result<Json<EvaluateResponse>, ApiError> {
    authorize(&state, &headers)?;
    let Json(payload) = payload?;

    let record = state.storage.record_evaluation(payload).await?;

    info!(
        "Evaluation result: {} task {} check '{}' score {}",
        record.email, record.task, record.check, record.score
    );

    Ok(Json(EvaluateResponse {
        status: "ok",
        message: "Evaluation result recorded".to_string(),
        evaluation_id: record.id,
    }))
}

/// Mark a deployment as evaluated
pub async fn mark_evaluated_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(deployment_id): Path<usize>,
) -> Result<Json<TransitionResponse>, ApiError> {
    authorize(&state, &headers)?;

    let changed = match state.storage.mark_evaluated(deployment_id).await? {
        Transition::Applied(t) => {
            info!(
                "Deployment {} evaluated ({} results)",
                deployment_id, t.results
            );
            true
        }
        Transition::Unchanged => false,
    };

    Ok(Json(TransitionResponse {
        status: "ok",
        deployment_id,
        deployment_status: grader_common::DeploymentStatus::Evaluated,
        changed,
    }))
}

/// Log a dispatched task
pub async fn create_task_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<TaskRequest>, JsonRejection>,
) -> Result<Json<TaskCreatedResponse>, ApiError> {
    authorize(&state, &headers)?;
    let Json(payload) = payload?;

    let record = state.storage.record_task(payload).await?;

    info!(
        "Task logged: {} task {} round {}",
        record.email, record.task, record.round
    );

    Ok(Json(TaskCreatedResponse {
        status: "ok",
        message: "Task created".to_string(),
        task_id: record.id,
    }))
}

/// List all deployments
pub async fn list_deployments_handler(
    State(state): State<Arc<AppState>>,
) -> Json<DeploymentsResponse> {
    let deployments = state.storage.deployments().await;

    Json(DeploymentsResponse {
        email: None,
        task: None,
        total: deployments.len(),
        deployments,
    })
}

/// Deployments for one student
pub async fn deployments_by_email_handler(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> Json<DeploymentsResponse> {
    let deployments: Vec<_> = state
        .storage
        .deployments()
        .await
        .into_iter()
        .filter(|d| d.email == email)
        .collect();

    Json(DeploymentsResponse {
        email: Some(email),
        task: None,
        total: deployments.len(),
        deployments,
    })
}

/// Deployments for one task
pub async fn deployments_by_task_handler(
    State(state): State<Arc<AppState>>,
    Path(task): Path<String>,
) -> Json<DeploymentsResponse> {
    let deployments: Vec<_> = state
        .storage
        .deployments()
        .await
        .into_iter()
        .filter(|d| d.task == task)
        .collect();

    Json(DeploymentsResponse {
        email: None,
        task: Some(task),
        total: deployments.len(),
        deployments,
    })
}

pub async fn list_evaluations_handler(
    State(state): State<Arc<AppState>>,
) -> Json<EvaluationsResponse> {
    let evaluations = state.storage.evaluations().await;

    Json(EvaluationsResponse {
        email: None,
        total: evaluations.len(),
        evaluations,
    })
}

pub async fn evaluations_by_email_handler(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> Json<EvaluationsResponse> {
    let evaluations: Vec<_> = state
        .storage
        .evaluations()
        .await
        .into_iter()
        .filter(|e| e.email == email)
        .collect();

    Json(EvaluationsResponse {
        email: Some(email),
        total: evaluations.len(),
        evaluations,
    })
}

pub async fn list_tasks_handler(State(state): State<Arc<AppState>>) -> Json<TasksResponse> {
    let tasks = state.storage.tasks().await;

    Json(TasksResponse {
        email: None,
        total: tasks.len(),
        tasks,
    })
}

pub async fn tasks_by_email_handler(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> Json<TasksResponse> {
    let tasks: Vec<_> = state
        .storage
        .tasks()
        .await
        .into_iter()
        .filter(|t| t.email == email)
        .collect();

    Json(TasksResponse {
        email: Some(email),
        total: tasks.len(),
        tasks,
    })
}

/// Overall summary
pub async fn summary_handler(State(state): State<Arc<AppState>>) -> Json<Summary> {
    let deployments = state.storage.deployments().await;
    let evaluations = state.storage.evaluations().await;
    let total_tasks = state.storage.tasks().await.len();

    Json(Summary::from_logs(&deployments, &evaluations, total_tasks))
}

/// Export everything
pub async fn export_handler(State(state): State<Arc<AppState>>) -> Json<ExportResponse> {
    Json(ExportResponse {
        deployments: state.storage.deployments().await,
        evaluations: state.storage.evaluations().await,
        tasks: state.storage.tasks().await,
        exported_at: Utc::now(),
    })
}
