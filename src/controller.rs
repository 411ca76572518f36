/// Query controller: user input, request lifecycle and the current result.
///
/// The controller is the only component that starts a backend call. A call
/// is split in two halves so an event loop can keep handling input while the
/// request is in flight:
///
/// 1. [`QueryController::begin_submit`] validates the input, moves to
///    [`Phase::Submitting`] and hands back the request plus a [`Ticket`].
/// 2. [`QueryController::complete_submit`] applies the outcome for that
///    ticket and returns to [`Phase::Idle`].
///
/// [`QueryController::submit`] runs both halves around a single `.await`.
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{AnalysisBackend, ApiError, QueryRequest, QueryResponse};
use crate::notify::Notifier;
use crate::presenter::{PresenterError, ResultTree};

pub const SUCCESS_MESSAGE: &str = "Analysis complete!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Submitting,
}

/// Identifies one in-flight request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

/// Why a submission was refused before any request was issued.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    #[error("repository URL is empty")]
    EmptyRepoUrl,

    #[error("query is empty")]
    EmptyQuery,

    #[error("a query is already in flight")]
    AlreadySubmitting,
}

/// What [`QueryController::complete_submit`] did with an outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The response replaced the current result.
    Resolved { contexts: usize },
    /// The request failed; the previous result, if any, is still shown.
    Failed { message: String },
    /// The ticket was not the in-flight one; nothing changed.
    Stale,
}

#[derive(Debug, Default)]
pub struct QueryController {
    repo_url: String,
    query: String,
    in_flight: Option<Ticket>,
    next_ticket: u64,
    result: Option<ResultTree>,
}

impl QueryController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_repo_url(repo_url: impl Into<String>) -> Self {
        Self {
            repo_url: repo_url.into(),
            ..Self::default()
        }
    }

    // ── Input ──────────────────────────────────────────────────────────

    #[must_use]
    pub fn repo_url(&self) -> &str {
        &self.repo_url
    }

    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Editing is allowed in any phase; an in-flight request keeps the values
    /// it was started with.
    pub fn set_repo_url(&mut self, repo_url: impl Into<String>) {
        self.repo_url = repo_url.into();
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    // ── Lifecycle ──────────────────────────────────────────────────────

    #[must_use]
    pub fn phase(&self) -> Phase {
        if self.in_flight.is_some() {
            Phase::Submitting
        } else {
            Phase::Idle
        }
    }

    /// Whether the submit affordance is enabled.
    #[must_use]
    pub fn can_submit(&self) -> bool {
        self.check_submit().is_ok()
    }

    /// Why the submit affordance is disabled, if it is.
    pub fn check_submit(&self) -> Result<(), SubmitError> {
        if self.in_flight.is_some() {
            return Err(SubmitError::AlreadySubmitting);
        }
        if self.repo_url.trim().is_empty() {
            return Err(SubmitError::EmptyRepoUrl);
        }
        if self.query.trim().is_empty() {
            return Err(SubmitError::EmptyQuery);
        }
        Ok(())
    }

    /// Start a submission. The displayed result is left alone until the
    /// matching [`complete_submit`](Self::complete_submit).
    pub fn begin_submit(&mut self) -> Result<(Ticket, QueryRequest), SubmitError> {
        self.check_submit()?;

        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        self.in_flight = Some(ticket);

        info!(repo_url = %self.repo_url, ticket = ticket.0, "submitting query");
        Ok((ticket, QueryRequest::new(&self.repo_url, &self.query)))
    }

    /// Apply the outcome of the request identified by `ticket`.
    pub fn complete_submit(
        &mut self,
        ticket: Ticket,
        outcome: Result<QueryResponse, ApiError>,
        notifier: &dyn Notifier,
    ) -> Completion {
        if self.in_flight != Some(ticket) {
            debug!(ticket = ticket.0, "dropping outcome for stale ticket");
            return Completion::Stale;
        }
        self.in_flight = None;

        match outcome {
            Ok(response) => {
                let contexts = response.contexts.len();
                info!(contexts, "query resolved");
                self.result = Some(ResultTree::new(response));
                notifier.success(SUCCESS_MESSAGE);
                Completion::Resolved { contexts }
            }
            Err(err) => {
                warn!("query failed: {err}");
                let message = err.user_message();
                notifier.error(&message);
                Completion::Failed { message }
            }
        }
    }

    /// Validate, issue exactly one request and apply its outcome.
    pub async fn submit<B>(
        &mut self,
        backend: &B,
        notifier: &dyn Notifier,
    ) -> Result<Completion, SubmitError>
    where
        B: AnalysisBackend,
    {
        let (ticket, request) = self.begin_submit()?;
        let outcome = backend.query(&request).await;
        Ok(self.complete_submit(ticket, outcome, notifier))
    }

    /// Clear the result and the query; the repository URL is kept.
    pub fn reset(&mut self) {
        self.result = None;
        self.query.clear();
    }

    // ── Result ─────────────────────────────────────────────────────────

    #[must_use]
    pub fn result(&self) -> Option<&ResultTree> {
        self.result.as_ref()
    }

    /// Toggle a context row of the current result.
    ///
    /// Returns `Ok(None)` when there is nothing displayed.
    pub fn toggle(&mut self, index: usize) -> Result<Option<bool>, PresenterError> {
        match self.result.as_mut() {
            Some(tree) => tree.toggle(index).map(Some),
            None => Ok(None),
        }
    }

    pub fn result_mut(&mut self) -> Option<&mut ResultTree> {
        self.result.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockBackend;
    use crate::api::{Document, DocumentMetadata, FALLBACK_ERROR_MESSAGE};
    use crate::notify::{Notification, RecordingNotifier};

    fn response(paths: &[&str]) -> QueryResponse {
        QueryResponse {
            rationale: "R".into(),
            answer: "A".into(),
            contexts: paths
                .iter()
                .map(|p| Document {
                    text: format!("text of {p}"),
                    meta_data: DocumentMetadata {
                        file_path: p.to_string(),
                        doc_type: "code".into(),
                        is_code: true,
                        is_implementation: true,
                        title: String::new(),
                    },
                })
                .collect(),
        }
    }

    fn ready() -> QueryController {
        let mut c = QueryController::with_repo_url("https://github.com/acme/widgets");
        c.set_query("How is auth handled?");
        c
    }

    #[test]
    fn test_initial_state() {
        let c = QueryController::new();
        assert_eq!(c.phase(), Phase::Idle);
        assert!(c.result().is_none());
        assert!(!c.can_submit());
    }

    #[test]
    fn test_blank_inputs_are_rejected() {
        let cases = [
            ("", "q", SubmitError::EmptyRepoUrl),
            ("   ", "q", SubmitError::EmptyRepoUrl),
            ("\t\n", "q", SubmitError::EmptyRepoUrl),
            ("repo", "", SubmitError::EmptyQuery),
            ("repo", "  \n ", SubmitError::EmptyQuery),
            ("", "", SubmitError::EmptyRepoUrl),
        ];
        for (repo, query, expected) in cases {
            let mut c = QueryController::with_repo_url(repo);
            c.set_query(query);
            assert!(!c.can_submit(), "{repo:?}/{query:?}");
            assert_eq!(c.begin_submit().unwrap_err(), expected);
            assert_eq!(c.phase(), Phase::Idle);
        }
    }

    #[tokio::test]
    async fn test_blank_inputs_issue_no_request() {
        let backend = MockBackend::new();
        let notifier = RecordingNotifier::new();
        let mut c = QueryController::with_repo_url("repo");
        c.set_query("   ");

        let err = c.submit(&backend, &notifier).await.unwrap_err();
        assert_eq!(err, SubmitError::EmptyQuery);
        assert_eq!(backend.call_count(), 0);
        assert!(notifier.notifications().is_empty());
    }

    #[test]
    fn test_no_reentrant_submission() {
        let mut c = ready();
        let (ticket, _) = c.begin_submit().unwrap();
        assert_eq!(c.phase(), Phase::Submitting);
        assert!(!c.can_submit());
        assert_eq!(c.begin_submit().unwrap_err(), SubmitError::AlreadySubmitting);

        let notifier = RecordingNotifier::new();
        c.complete_submit(ticket, Ok(response(&[])), &notifier);
        assert_eq!(c.phase(), Phase::Idle);
        assert!(c.can_submit());
    }

    #[test]
    fn test_request_carries_current_input() {
        let mut c = ready();
        let (_, request) = c.begin_submit().unwrap();
        assert_eq!(request.repo_url, "https://github.com/acme/widgets");
        assert_eq!(request.query, "How is auth handled?");
    }

    #[test]
    fn test_in_flight_request_does_not_touch_result() {
        let notifier = RecordingNotifier::new();
        let mut c = ready();
        let (t1, _) = c.begin_submit().unwrap();
        c.complete_submit(t1, Ok(response(&["old.rs"])), &notifier);

        let (t2, _) = c.begin_submit().unwrap();
        c.set_query("edited while waiting");
        let shown = c.result().unwrap().response().contexts[0].meta_data.file_path.clone();
        assert_eq!(shown, "old.rs");

        c.complete_submit(t2, Ok(response(&["new.rs"])), &notifier);
        let shown = &c.result().unwrap().response().contexts[0].meta_data.file_path;
        assert_eq!(shown, "new.rs");
        assert_eq!(c.query(), "edited while waiting");
    }

    #[test]
    fn test_stale_ticket_is_ignored() {
        let notifier = RecordingNotifier::new();
        let mut c = ready();
        let (t1, _) = c.begin_submit().unwrap();
        c.complete_submit(t1, Err(ApiError::Status(500)), &notifier);
        let (t2, _) = c.begin_submit().unwrap();

        assert_eq!(
            c.complete_submit(t1, Ok(response(&["x.rs"])), &notifier),
            Completion::Stale
        );
        assert_eq!(c.phase(), Phase::Submitting);
        assert!(c.result().is_none());

        c.complete_submit(t2, Ok(response(&[])), &notifier);
        assert_eq!(c.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn test_success_sets_result_and_notifies() {
        let backend = MockBackend::new().respond(response(&["src/auth.go"]));
        let notifier = RecordingNotifier::new();
        let mut c = ready();

        let completion = c.submit(&backend, &notifier).await.unwrap();
        assert_eq!(completion, Completion::Resolved { contexts: 1 });
        assert_eq!(c.phase(), Phase::Idle);
        assert_eq!(c.result().unwrap().response().answer, "A");
        assert_eq!(
            notifier.notifications(),
            vec![Notification::Success(SUCCESS_MESSAGE.into())]
        );
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_new_response_resets_expansion() {
        let backend = MockBackend::new()
            .respond(response(&["a.rs", "b.rs", "c.rs"]))
            .respond(response(&["a.rs", "b.rs", "c.rs"]));
        let notifier = RecordingNotifier::new();
        let mut c = ready();

        c.submit(&backend, &notifier).await.unwrap();
        c.toggle(0).unwrap();
        c.toggle(2).unwrap();
        assert_eq!(c.result().unwrap().expansion().expanded_indices(), vec![0, 2]);

        c.submit(&backend, &notifier).await.unwrap();
        let tree = c.result().unwrap();
        assert!(tree.expansion().expanded_indices().is_empty());
        for i in 0..tree.len() {
            assert!(!tree.is_expanded(i));
        }
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_result() {
        let backend = MockBackend::new()
            .respond(response(&["keep.rs"]))
            .fail(ApiError::Status(500));
        let notifier = RecordingNotifier::new();
        let mut c = ready();

        c.submit(&backend, &notifier).await.unwrap();
        c.toggle(0).unwrap();

        let completion = c.submit(&backend, &notifier).await.unwrap();
        assert_eq!(
            completion,
            Completion::Failed {
                message: FALLBACK_ERROR_MESSAGE.into()
            }
        );
        assert_eq!(c.phase(), Phase::Idle);
        assert!(c.can_submit());

        let tree = c.result().unwrap();
        assert_eq!(tree.response().contexts[0].meta_data.file_path, "keep.rs");
        assert!(tree.is_expanded(0));
        assert_eq!(notifier.errors(), vec![FALLBACK_ERROR_MESSAGE.to_string()]);
    }

    #[tokio::test]
    async fn test_transport_error_message_is_surfaced() {
        let backend = MockBackend::new().fail(ApiError::Transport("connection refused".into()));
        let notifier = RecordingNotifier::new();
        let mut c = ready();

        c.submit(&backend, &notifier).await.unwrap();
        assert!(c.result().is_none());
        assert_eq!(notifier.errors(), vec!["connection refused".to_string()]);
    }

    #[test]
    fn test_reset_clears_result_and_query_only() {
        let notifier = RecordingNotifier::new();
        let mut c = ready();
        let (t, _) = c.begin_submit().unwrap();
        c.complete_submit(t, Ok(response(&["a.rs"])), &notifier);

        c.reset();
        assert!(c.result().is_none());
        assert_eq!(c.query(), "");
        assert_eq!(c.repo_url(), "https://github.com/acme/widgets");
    }

    #[test]
    fn test_reset_without_result_is_noop() {
        let mut c = QueryController::with_repo_url("repo");
        c.reset();
        c.reset();
        assert!(c.result().is_none());
        assert_eq!(c.repo_url(), "repo");
        assert_eq!(c.phase(), Phase::Idle);
    }

    #[test]
    fn test_toggle_without_result() {
        let mut c = QueryController::new();
        assert_eq!(c.toggle(0), Ok(None));
    }
}
