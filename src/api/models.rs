use serde::{Deserialize, Serialize};

/// Body of one `POST /query` round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub repo_url: String,
    pub query: String,
}

impl QueryRequest {
    pub fn new(repo_url: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            repo_url: repo_url.into(),
            query: query.into(),
        }
    }
}

/// Provenance of one evidence fragment, supplied entirely by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub file_path: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    #[serde(default)]
    pub is_code: bool,
    #[serde(default)]
    pub is_implementation: bool,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Markdown body of the fragment.
    pub text: String,
    pub meta_data: DocumentMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub rationale: String,
    pub answer: String,
    /// Ordered by backend relevance. Never re-sorted on the client.
    pub contexts: Vec<Document>,
}

/// Payload of `GET /health`.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<chrono::DateTime<chrono::FixedOffset>>,
    #[serde(default)]
    pub version: Option<String>,
}

impl HealthStatus {
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}
