use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use super::language::Language;
use super::poll::{run_code, PollConfig};
use super::render::{PreviewDocument, RenderedResult};
use super::ExecutionBackend;
use crate::api::ClientError;

/// Where a code block is in its run lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Idle,
    Executing {
        run_id: u64,
    },
    ShowingPreview(PreviewDocument),
    ShowingOutput(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    /// A run for this block is already in flight.
    AlreadyRunning,
    /// The previous result is still displayed and must be dismissed first.
    NotIdle,
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::AlreadyRunning => write!(f, "Code is already running"),
            RunError::NotIdle => write!(f, "Dismiss the current result before running again"),
        }
    }
}

impl std::error::Error for RunError {}

/// Run state for a single code block.
///
/// Only one run can be in flight; a result is accepted only from the run that
/// is currently executing, so a late completion after a dismiss is dropped.
#[derive(Debug, Clone, Default)]
pub struct CodeRunner {
    state: RunState,
}

impl CodeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn is_executing(&self) -> bool {
        matches!(self.state, RunState::Executing { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            RunState::ShowingPreview(_) | RunState::ShowingOutput(_)
        )
    }

    /// Start a run tagged `run_id`. Fails unless the block is idle.
    pub fn begin(&mut self, run_id: u64) -> Result<(), RunError> {
        match self.state {
            RunState::Idle => {
                self.state = RunState::Executing { run_id };
                Ok(())
            }
            RunState::Executing { .. } => Err(RunError::AlreadyRunning),
            _ => Err(RunError::NotIdle),
        }
    }

    /// Record the outcome of run `run_id`. Returns false and leaves the state
    /// untouched when that run is no longer the current one.
    pub fn complete(&mut self, run_id: u64, result: RenderedResult) -> bool {
        match self.state {
            RunState::Executing { run_id: current } if current == run_id => {
                self.state = match result {
                    RenderedResult::Preview(document) => RunState::ShowingPreview(document),
                    RenderedResult::Output(text) => RunState::ShowingOutput(text),
                };
                true
            }
            _ => {
                debug!(run_id, state = ?self.state, "discarding stale run outcome");
                false
            }
        }
    }

    /// Return to idle from any state, abandoning an in-flight run.
    pub fn dismiss(&mut self) {
        self.state = RunState::Idle;
    }
}

/// Identifies a code block inside the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockRef {
    pub message_index: usize,
    pub block_index: usize,
}

#[derive(Debug, Clone)]
pub struct RunRequest {
    pub block: BlockRef,
    pub run_id: u64,
    pub language: Language,
    pub source: String,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub block: BlockRef,
    pub run_id: u64,
    pub result: Result<RenderedResult, ClientError>,
}

impl RunOutcome {
    /// Errors are shown in the output panel like any other text.
    pub fn into_rendered(self) -> RenderedResult {
        match self.result {
            Ok(rendered) => rendered,
            Err(err) => RenderedResult::Output(format!("Error: {err}")),
        }
    }
}

/// Drives code runs as background tasks and reports each outcome on a channel.
#[derive(Clone)]
pub struct ExecutionService {
    backend: Arc<dyn ExecutionBackend>,
    poll: PollConfig,
    tx: mpsc::UnboundedSender<RunOutcome>,
}

impl ExecutionService {
    pub fn new(
        backend: Arc<dyn ExecutionBackend>,
        poll: PollConfig,
    ) -> (Self, mpsc::UnboundedReceiver<RunOutcome>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { backend, poll, tx }, rx)
    }

    pub fn spawn_run(&self, request: RunRequest) {
        let backend = Arc::clone(&self.backend);
        let poll = self.poll;
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let RunRequest {
                block,
                run_id,
                language,
                source,
            } = request;

            let result = run_code(backend.as_ref(), language, &source, poll).await;
            let _ = tx.send(RunOutcome {
                block,
                run_id,
                result,
            });
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::poll::tests::ScriptedBackend;
    use std::time::Duration;

    const BLOCK: BlockRef = BlockRef {
        message_index: 1,
        block_index: 0,
    };

    #[test]
    fn begin_requires_idle() {
        let mut runner = CodeRunner::new();
        runner.begin(1).unwrap();
        assert_eq!(runner.begin(2), Err(RunError::AlreadyRunning));

        assert!(runner.complete(1, RenderedResult::Output("ok".into())));
        assert_eq!(runner.begin(3), Err(RunError::NotIdle));

        runner.dismiss();
        assert!(runner.begin(3).is_ok());
    }

    #[test]
    fn stale_completion_after_dismiss_is_discarded() {
        let mut runner = CodeRunner::new();
        runner.begin(1).unwrap();
        runner.dismiss();
        assert!(!runner.complete(1, RenderedResult::Output("late".into())));
        assert_eq!(runner.state(), &RunState::Idle);

        runner.begin(2).unwrap();
        assert!(!runner.complete(1, RenderedResult::Output("late".into())));
        assert!(runner.is_executing());
        assert!(runner.complete(2, RenderedResult::Output("fresh".into())));
        assert_eq!(runner.state(), &RunState::ShowingOutput("fresh".into()));
    }

    #[test]
    fn errors_render_into_the_output_panel() {
        let outcome = RunOutcome {
            block: BLOCK,
            run_id: 1,
            result: Err(ClientError::Timeout { attempts: 10 }),
        };
        match outcome.into_rendered() {
            RenderedResult::Output(text) => {
                assert!(text.starts_with("Error: Timeout"), "{text}");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_run_reports_its_outcome() {
        let backend = Arc::new(ScriptedBackend::new(&[1, 3], 3, "42\n"));
        let (service, mut rx) = ExecutionService::new(
            backend.clone(),
            PollConfig {
                interval: Duration::from_millis(100),
                max_attempts: 5,
            },
        );

        service.spawn_run(RunRequest {
            block: BLOCK,
            run_id: 9,
            language: Language::Python,
            source: "print(42)".to_string(),
        });

        let outcome = rx.recv().await.expect("outcome");
        assert_eq!(outcome.block, BLOCK);
        assert_eq!(outcome.run_id, 9);
        assert_eq!(
            outcome.into_rendered(),
            RenderedResult::Output("42\n".to_string())
        );
    }
}
