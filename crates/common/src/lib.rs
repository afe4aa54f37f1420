pub mod deployment;
pub mod error;
pub mod evaluation;
pub mod task;

pub use deployment::{DeploymentNotification, DeploymentRecord, DeploymentStatus, StatusTransition};
pub use error::{Error, Result};
pub use evaluation::{score_for, EvaluationRecord, EvaluationResult, SCORE_FAIL, SCORE_PASS};
pub use task::{Attachment, Submission, TaskRecord, TaskRequest, TaskStatus};
