//! Run code blocks against a remote execution service, or render them as a
//! preview document when they are markup, styling or script.
//!
//! The pieces line up as a pipeline:
//! - [`language`] resolves a fence tag (or the source) to a [`Language`].
//! - [`ExecutionBackend`] submits source and reports status snapshots;
//!   [`crate::api::judge::JudgeClient`] is the HTTP implementation.
//! - [`poll`] waits for a terminal status under a fixed attempt budget.
//! - [`render`] turns the finished job into an output panel or a preview.
//! - [`runner`] tracks per-block run state and drives runs as background tasks.

use async_trait::async_trait;

use crate::api::judge::{JobToken, SubmissionResult};
use crate::api::ClientError;

pub mod buffer;
pub mod job;
pub mod language;
pub mod poll;
pub mod render;
pub mod runner;

pub use language::Language;

/// Submit/poll pair offered by an execution service.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Post `source` for execution and return the job token.
    async fn submit(&self, source: &str, language: Language) -> Result<JobToken, ClientError>;

    /// Fetch the current status snapshot for a submitted job.
    async fn status(&self, token: &JobToken) -> Result<SubmissionResult, ClientError>;
}
