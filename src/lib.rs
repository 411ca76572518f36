//! # repochat: ask questions about a Git repository
//!
//! Terminal client for a remote RAG analysis service. A query goes out as one
//! atomic `POST {repo_url, query}` round trip; the answer comes back as a
//! rationale, a final answer and a ranked list of evidence fragments, each of
//! which can be expanded on its own.
//!
//! ## Architecture
//!
//! - **[`config`]**: Configuration loading, validation and defaults
//! - **[`api`]**: Wire types, the `AnalysisBackend` seam, HTTP and mock backends
//! - **[`controller`]**: Query controller: input, request lifecycle, current result
//! - **[`presenter`]**: Result tree: expansion state and the render tree
//! - **[`markdown`]**: Markdown to terminal text (pulldown-cmark)
//! - **[`view`]**: Terminal rendering of results and status
//! - **[`notify`]**: Success/error notifications
//! - **[`repl`]**: Interactive event loop

pub mod api;
pub mod config;
pub mod controller;
pub mod markdown;
pub mod notify;
pub mod presenter;
pub mod repl;
pub mod view;
