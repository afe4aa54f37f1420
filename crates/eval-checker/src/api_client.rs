//! Client for the evaluation API

use grader_common::{DeploymentRecord, Error, EvaluationResult, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Client for reading deployments and submitting check results
pub struct EvaluationApiClient {
    base_url: String,
    api_token: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct DeploymentsResponse {
    deployments: Vec<DeploymentRecord>,
}

#[derive(Debug, Deserialize)]
struct EvaluateResponse {
    evaluation_id: usize,
}

#[derive(Debug, Deserialize)]
struct TransitionResponse {
    changed: bool,
}

impl EvaluationApiClient {
    pub fn new(
        base_url: &str,
        api_token: Option<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
            client,
        })
    }

    /// Every deployment with its current status
    pub async fn deployments(&self) -> Result<Vec<DeploymentRecord>> {
        let url = format!("{}/deployments", self.base_url);
        debug!("Fetching deployments from {}", url);

        let response = self.client.get(&url).send().await.map_err(network)?;
        let body: DeploymentsResponse = parse(response).await?;
        Ok(body.deployments)
    }

    /// Submit one check result, returning its log index
    pub async fn submit(&self, result: &EvaluationResult) -> Result<usize> {
        let url = format!("{}/evaluate", self.base_url);
        debug!("Submitting {} for {}", result.check, result.email);

        let response = self
            .authorized(self.client.post(&url).json(result))
            .send()
            .await
            .map_err(network)?;
        let body: EvaluateResponse = parse(response).await?;
        Ok(body.evaluation_id)
    }

    /// Mark a deployment evaluated; false if it already was
    pub async fn mark_evaluated(&self, deployment_id: usize) -> Result<bool> {
        let url = format!("{}/deployments/evaluated/{}", self.base_url, deployment_id);

        let response = self
            .authorized(self.client.post(&url))
            .send()
            .await
            .map_err(network)?;
        let body: TransitionResponse = parse(response).await?;
        Ok(body.changed)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

fn network(err: reqwest::Error) -> Error {
    Error::TransientNetwork(err.to_string())
}

async fn parse<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(Error::Authentication("evaluation API rejected the token".to_string()));
    }
    if !status.is_success() {
        return Err(Error::ExternalService {
            service: "evaluation API".to_string(),
            status: status.as_u16(),
        });
    }
    response.json().await.map_err(network)
}
