//! Task dispatcher
//!
//! Reads the student roster, assigns task templates and delivers task
//! requests to each student endpoint with bounded retries. Delivered tasks
//! are recorded in the evaluation API's task log so later rounds can reuse
//! their identity.

pub mod config;
pub mod dispatcher;
pub mod roster;
pub mod rounds;
pub mod task_log;
pub mod templates;

pub use config::Config;
pub use dispatcher::{DispatchOutcome, Dispatcher, RetryPolicy};
pub use rounds::{BatchReport, RoundController};
pub use task_log::TaskLogClient;
