//! Repository contents at a fixed commit

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use grader_common::{Error, Result};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Owner and name of a hosted repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    /// Parse `https://github.com/{owner}/{repo}` style URLs
    pub fn parse(repo_url: &str) -> Result<Self> {
        let trimmed = repo_url.trim().trim_end_matches('/');
        let path = trimmed
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(trimmed);

        let mut segments = path.split('/').filter(|s| !s.is_empty()).skip(1);
        let owner = segments.next();
        let repo = segments.next().map(|r| r.trim_end_matches(".git"));

        match (owner, repo) {
            (Some(owner), Some(repo)) if !repo.is_empty() => Ok(Self {
                owner: owner.to_string(),
                repo: repo.to_string(),
            }),
            _ => Err(Error::Validation(format!("not a repository URL: {repo_url}"))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    #[serde(default)]
    content: String,
}

/// Client for a GitHub-style contents API
pub struct ContentClient {
    api_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl ContentClient {
    pub fn new(api_url: &str, token: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("eval-checker")
            .build()?;

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
            client,
        })
    }

    /// Decoded text of `path` at `commit`, or `None` if the file is absent
    pub async fn fetch_file(
        &self,
        repo_url: &str,
        path: &str,
        commit: &str,
    ) -> Result<Option<String>> {
        let repo = RepoRef::parse(repo_url)?;
        let url = format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_url, repo.owner, repo.repo, path
        );
        debug!("Fetching {}@{} from {}", path, commit, url);

        let mut request = self.client.get(&url).query(&[("ref", commit)]);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::TransientNetwork(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Error::ExternalService {
                service: "content API".to_string(),
                status: response.status().as_u16(),
            });
        }

        let body: ContentsResponse = response
            .json()
            .await
            .map_err(|e| Error::TransientNetwork(e.to_string()))?;

        decode_content(&body.content).map(Some)
    }
}

/// Decode the line-wrapped base64 payload of a contents response
pub fn decode_content(encoded: &str) -> Result<String> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| Error::Validation(format!("invalid base64 content: {e}")))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_repo_url_variants() {
        let expected = RepoRef {
            owner: "student".to_string(),
            repo: "app-sum-of-sales".to_string(),
        };
        for url in [
            "https://github.com/student/app-sum-of-sales",
            "https://github.com/student/app-sum-of-sales/",
            "https://github.com/student/app-sum-of-sales.git",
            "github.com/student/app-sum-of-sales",
        ] {
            assert_eq!(RepoRef::parse(url).unwrap(), expected, "{url}");
        }
    }

    #[test]
    fn test_parse_repo_url_rejects_owner_only() {
        assert!(RepoRef::parse("https://github.com/student").is_err());
    }

    #[test]
    fn test_decode_wrapped_content() {
        let encoded = "TUlUIExp\nY2Vuc2U=\n";
        assert_eq!(decode_content(encoded).unwrap(), "MIT License");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_content("not base64!").is_err());
    }
}
