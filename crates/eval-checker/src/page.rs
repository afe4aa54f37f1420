//! Plain GET of a published page

use grader_common::{Error, Result};
use std::time::Duration;
use tracing::debug;

/// Status and body of one page fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub status: u16,
    pub body: String,
}

impl Page {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

pub struct PageClient {
    client: reqwest::Client,
}

impl PageClient {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Fetch the page; any HTTP status is a successful fetch
    pub async fn fetch(&self, url: &str) -> Result<Page> {
        debug!("Fetching page {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::TransientNetwork(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Error::TransientNetwork(e.to_string()))?;

        Ok(Page { status, body })
    }
}
