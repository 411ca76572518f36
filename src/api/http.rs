/// HTTP implementation of [`AnalysisBackend`] on top of `reqwest`.
use std::error::Error as _;

use anyhow::{Context, Result};
use reqwest::Url;
use tracing::{debug, warn};

use super::{AnalysisBackend, ApiError, HealthStatus, QueryRequest, QueryResponse};
use crate::config::Config;

pub struct HttpBackend {
    client: reqwest::Client,
    endpoint: Url,
    health_url: Url,
    timeout_secs: u64,
}

impl HttpBackend {
    /// Build a client for the endpoint and timeout in `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let endpoint = config.endpoint_url()?;
        let health_url = config.health_url()?;

        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("HTTP client build failed")?;

        Ok(Self {
            client,
            endpoint,
            health_url,
            timeout_secs: config.request_timeout_secs,
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn classify(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            return ApiError::Timeout(self.timeout_secs);
        }
        ApiError::Transport(describe(&err))
    }
}

impl AnalysisBackend for HttpBackend {
    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse, ApiError> {
        debug!(endpoint = %self.endpoint, repo_url = %request.repo_url, "POST query");

        let resp = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = resp.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "backend rejected query");
            return Err(ApiError::Status(status.as_u16()));
        }

        let body = resp.bytes().await.map_err(|e| self.classify(e))?;
        serde_json::from_slice(&body).map_err(|e| {
            warn!("failed to decode query response: {e}");
            ApiError::Decode(e.to_string())
        })
    }

    async fn health(&self) -> Result<HealthStatus, ApiError> {
        let resp = self
            .client
            .get(self.health_url.clone())
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ApiError::Status(status.as_u16()));
        }

        let body = resp.bytes().await.map_err(|e| self.classify(e))?;
        serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// Flatten a reqwest error and its sources into one line.
fn describe(err: &reqwest::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        msg.push_str(": ");
        msg.push_str(&inner.to_string());
        source = inner.source();
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_default_config() {
        let backend = HttpBackend::from_config(&Config::default()).unwrap();
        assert_eq!(backend.endpoint().as_str(), "http://localhost:8000/query");
        assert_eq!(backend.health_url.as_str(), "http://localhost:8000/health");
        assert_eq!(backend.timeout_secs, 120);
    }

    #[test]
    fn test_from_config_rejects_bad_endpoint() {
        let config = Config {
            endpoint: "not a url".to_string(),
            ..Config::default()
        };
        assert!(HttpBackend::from_config(&config).is_err());
    }

    #[test]
    fn test_timeout_disabled() {
        let config = Config {
            request_timeout_secs: 0,
            ..Config::default()
        };
        assert!(HttpBackend::from_config(&config).is_ok());
    }
}
