//! Evaluation API
//!
//! Receives deployment notifications from student services, stores check
//! results, and answers queries over both. All state lives in two
//! append-only logs that are replayed at startup.

pub mod config;
pub mod handlers;
pub mod log;
pub mod models;
pub mod storage;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use handlers::AppState;
pub use models::Summary;
pub use storage::Storage;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let shared_state = Arc::new(state);

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/notify", post(handlers::notify_handler))
        .route("/evaluate", post(handlers::evaluate_handler))
        .route("/task", post(handlers::create_task_handler))
        .route("/deployments", get(handlers::list_deployments_handler))
        .route(
            "/deployments/{email}",
            get(handlers::deployments_by_email_handler),
        )
        .route(
            "/deployments/task/{task}",
            get(handlers::deployments_by_task_handler),
        )
        .route(
            "/deployments/evaluated/{id}",
            post(handlers::mark_evaluated_handler),
        )
        .route("/evaluations", get(handlers::list_evaluations_handler))
        .route(
            "/evaluations/{email}",
            get(handlers::evaluations_by_email_handler),
        )
        .route("/tasks", get(handlers::list_tasks_handler))
        .route("/tasks/{email}", get(handlers::tasks_by_email_handler))
        .route("/summary", get(handlers::summary_handler))
        .route("/export", get(handlers::export_handler))
        .with_state(shared_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
