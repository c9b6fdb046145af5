use tracing::debug;

use super::language::Language;
use crate::api::judge::{JobToken, SubmissionResult};

/// Status id the backend reports while a job waits for a worker.
pub const STATUS_IN_QUEUE: u32 = 1;
/// Status id the backend reports while a job runs.
pub const STATUS_PROCESSING: u32 = 2;

/// Lifecycle of a submitted job. Only ever moves forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Running,
    Terminal { id: u32, description: String },
}

impl JobStatus {
    pub fn from_snapshot(id: u32, description: &str) -> Self {
        match id {
            STATUS_IN_QUEUE => JobStatus::Queued,
            STATUS_PROCESSING => JobStatus::Running,
            _ => JobStatus::Terminal {
                id,
                description: description.to_string(),
            },
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Terminal { .. })
    }

    fn rank(&self) -> u8 {
        match self {
            JobStatus::Queued => 0,
            JobStatus::Running => 1,
            JobStatus::Terminal { .. } => 2,
        }
    }
}

/// One code-run request and the latest snapshot the backend reported for it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionJob {
    pub source: String,
    pub language: Language,
    pub token: JobToken,
    pub status: JobStatus,
    pub stdout: String,
    pub stderr: String,
    pub compile_output: String,
    pub time: Option<String>,
}

impl ExecutionJob {
    /// A freshly accepted submission starts out queued.
    pub fn submitted(source: impl Into<String>, language: Language, token: JobToken) -> Self {
        Self {
            source: source.into(),
            language,
            token,
            status: JobStatus::Queued,
            stdout: String::new(),
            stderr: String::new(),
            compile_output: String::new(),
            time: None,
        }
    }

    /// Fold a status snapshot into the job. Snapshots that would move the
    /// status backwards, or arrive after a terminal status, are ignored.
    pub fn apply(&mut self, snapshot: &SubmissionResult) -> bool {
        let next = JobStatus::from_snapshot(snapshot.status.id, &snapshot.status.description);
        if self.status.is_terminal() || next.rank() < self.status.rank() {
            debug!(
                token = %self.token,
                current = ?self.status,
                ignored = ?next,
                "ignoring out-of-order status snapshot"
            );
            return false;
        }

        self.status = next;
        self.stdout = snapshot.stdout().to_string();
        self.stderr = snapshot.stderr().to_string();
        self.compile_output = snapshot.compile_output().to_string();
        self.time = snapshot.time.clone();
        true
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }
}
