//! Client for the evaluation API's task log

use grader_common::{Error, Result, TaskRecord, TaskRequest};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Client for recording and reading dispatched tasks
pub struct TaskLogClient {
    base_url: String,
    api_token: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct TaskCreatedResponse {
    task_id: usize,
}

#[derive(Debug, Deserialize)]
struct TasksResponse {
    tasks: Vec<TaskRecord>,
}

impl TaskLogClient {
    pub fn new(
        base_url: &str,
        api_token: Option<String>,
        request_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
            client,
        })
    }

    /// Record a delivered task; the secret is stripped before sending
    pub async fn record(&self, task: &TaskRequest) -> Result<usize> {
        let url = format!("{}/task", self.base_url);
        debug!("Recording task {} at {}", task.task, url);

        let mut request = self.client.post(&url).json(&task.redacted());
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(network)?;
        let created: TaskCreatedResponse = parse(response).await?;
        Ok(created.task_id)
    }

    /// Every task in the log
    pub async fn tasks(&self) -> Result<Vec<TaskRecord>> {
        let url = format!("{}/tasks", self.base_url);
        debug!("Fetching task log from {}", url);

        let response = self.client.get(&url).send().await.map_err(network)?;
        let tasks: TasksResponse = parse(response).await?;
        Ok(tasks.tasks)
    }
}

fn network(err: reqwest::Error) -> Error {
    Error::TransientNetwork(err.to_string())
}

async fn parse<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        return Err(Error::ExternalService {
            service: "evaluation API".to_string(),
            status: status.as_u16(),
        });
    }
    response.json().await.map_err(network)
}
