//! Evaluation checker
//!
//! Runs a fixed battery of repository and page checks against each
//! deployment and submits one binary-scored result per check to the
//! evaluation API.

pub mod api_client;
pub mod checks;
pub mod config;
pub mod content;
pub mod engine;
pub mod page;

pub use api_client::EvaluationApiClient;
pub use config::Config;
pub use content::ContentClient;
pub use engine::{CheckEngine, EvaluationReport, Target};
pub use page::PageClient;
