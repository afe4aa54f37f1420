//! Delivery of task requests to student endpoints

use grader_common::TaskRequest;
use reqwest::StatusCode;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Path every student service exposes for incoming tasks
pub const TASK_ENDPOINT_PATH: &str = "/api/endpoint";

/// Bounded retry with a delay schedule between attempts
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per submission
    pub max_retries: u32,

    /// Delay after the n-th failed attempt; the last entry repeats
    pub delays: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delays: vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4),
            ],
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let index = attempt.saturating_sub(1) as usize;
        self.delays
            .get(index)
            .or_else(|| self.delays.last())
            .copied()
            .unwrap_or(Duration::ZERO)
    }
}

/// How a single submission's delivery ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The endpoint answered HTTP 200
    Delivered { attempts: u32 },
    /// The endpoint rejected the shared secret; never retried
    Unauthorized { attempts: u32 },
    /// Every attempt failed
    Failed { attempts: u32, last_error: String },
}

impl DispatchOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DispatchOutcome::Delivered { .. })
    }
}

/// Resolve the task URL for a roster endpoint
pub fn task_endpoint(endpoint: &str) -> String {
    let endpoint = endpoint.trim().trim_end_matches('/');
    if endpoint.ends_with(TASK_ENDPOINT_PATH) {
        endpoint.to_string()
    } else {
        format!("{}{}", endpoint, TASK_ENDPOINT_PATH)
    }
}

/// Sends task requests under a retry policy
pub struct Dispatcher {
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl Dispatcher {
    pub fn new(policy: RetryPolicy, request_timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self { client, policy })
    }

    /// POST the task to the student endpoint until it answers 200
    pub async fn send_task(&self, endpoint: &str, task: &TaskRequest) -> DispatchOutcome {
        let url = task_endpoint(endpoint);
        let max = self.policy.max_retries;
        let mut last_error = String::from("no attempt made");

        for attempt in 1..=max {
            info!("Attempt {}/{} for {} -> {}", attempt, max, task.email, url);

            match self.client.post(&url).json(task).send().await {
                Ok(response) if response.status() == StatusCode::OK => {
                    info!("Task {} delivered to {}", task.task, task.email);
                    return DispatchOutcome::Delivered { attempts: attempt };
                }
                Ok(response) if response.status() == StatusCode::UNAUTHORIZED => {
                    warn!("Endpoint for {} rejected the shared secret", task.email);
                    return DispatchOutcome::Unauthorized { attempts: attempt };
                }
                Ok(response) => {
                    last_error = format!("HTTP {}", response.status());
                    warn!("Endpoint for {} returned {}", task.email, response.status());
                }
                Err(e) => {
                    last_error = e.to_string();
                    warn!("Request to {} failed: {}", url, e);
                }
            }

            if attempt < max {
                let delay = self.policy.delay_after(attempt);
                info!("Retrying in {:?}", delay);
                sleep(delay).await;
            }
        }

        DispatchOutcome::Failed {
            attempts: max,
            last_error,
        }
    }
}
