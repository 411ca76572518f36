/// Scripted backend for tests and offline demos.
///
/// Replays queued outcomes in order and records every request it receives.
/// Once the script runs dry it answers deterministically from the request.
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use super::{AnalysisBackend, ApiError, HealthStatus, QueryRequest, QueryResponse};

#[derive(Default)]
pub struct MockBackend {
    script: Mutex<VecDeque<Result<QueryResponse, ApiError>>>,
    requests: Mutex<Vec<QueryRequest>>,
    delay: Option<Duration>,
}

impl MockBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response.
    #[must_use]
    pub fn respond(self, response: QueryResponse) -> Self {
        self.push(Ok(response));
        self
    }

    /// Queue a failure.
    #[must_use]
    pub fn fail(self, error: ApiError) -> Self {
        self.push(Err(error));
        self
    }

    /// Hold every response for `delay` before resolving.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push(&self, outcome: Result<QueryResponse, ApiError>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(outcome);
        }
    }

    /// Requests received so far, in arrival order.
    #[must_use]
    pub fn requests(&self) -> Vec<QueryRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    fn next_outcome(&self, request: &QueryRequest) -> Result<QueryResponse, ApiError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        let scripted = self.script.lock().ok().and_then(|mut s| s.pop_front());
        scripted.unwrap_or_else(|| Ok(echo_response(request)))
    }
}

fn echo_response(request: &QueryRequest) -> QueryResponse {
    QueryResponse {
        rationale: format!("Analyzed {}", request.repo_url),
        answer: request.query.clone(),
        contexts: Vec::new(),
    }
}

impl AnalysisBackend for MockBackend {
    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse, ApiError> {
        let outcome = self.next_outcome(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        outcome
    }

    async fn health(&self) -> Result<HealthStatus, ApiError> {
        Ok(HealthStatus {
            status: "healthy".to_string(),
            timestamp: None,
            version: Some("mock".to_string()),
        })
    }
}
