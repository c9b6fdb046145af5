use std::time::Duration;

use tracing::{debug, info, warn};

use super::job::ExecutionJob;
use super::language::Language;
use super::render::{render_result, PreviewDocument, RenderedResult};
use super::ExecutionBackend;
use crate::api::judge::SubmissionResult;
use crate::api::ClientError;

/// How often, and how many times, a job's status is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: 10,
        }
    }
}

/// Wait for `job` to reach a terminal status.
///
/// Each attempt sleeps one interval and then issues exactly one status
/// request. The loop ends on the first terminal snapshot, on the first failed
/// request, or with [`ClientError::Timeout`] once `max_attempts` requests have
/// all come back queued or running.
pub async fn poll_job<B>(
    backend: &B,
    job: &mut ExecutionJob,
    config: PollConfig,
) -> Result<SubmissionResult, ClientError>
where
    B: ExecutionBackend + ?Sized,
{
    for attempt in 1..=config.max_attempts {
        tokio::time::sleep(config.interval).await;

        let snapshot = backend.status(&job.token).await?;
        job.apply(&snapshot);
        debug!(
            token = %job.token,
            attempt,
            status = snapshot.status.id,
            "polled execution status"
        );

        if job.is_finished() {
            return Ok(snapshot);
        }
    }

    warn!(
        token = %job.token,
        attempts = config.max_attempts,
        "execution did not finish within the poll budget"
    );
    Err(ClientError::Timeout {
        attempts: config.max_attempts,
    })
}

/// Submit `source` and poll it to completion.
pub async fn execute<B>(
    backend: &B,
    language: Language,
    source: &str,
    config: PollConfig,
) -> Result<(ExecutionJob, SubmissionResult), ClientError>
where
    B: ExecutionBackend + ?Sized,
{
    let token = backend.submit(source, language).await?;
    let mut job = ExecutionJob::submitted(source, language, token);
    let result = poll_job(backend, &mut job, config).await?;

    if language == Language::Java && (!job.stderr.is_empty() || !job.compile_output.is_empty())
    {
        warn!(
            stderr = %job.stderr,
            compile_output = %job.compile_output,
            "java run reported diagnostics"
        );
    }
    info!(
        token = %job.token,
        status = ?job.status,
        time = job.time.as_deref().unwrap_or("-"),
        "execution finished"
    );

    Ok((job, result))
}

/// Full run of one code block: documents are synthesized locally, everything
/// else goes through the execution backend.
pub async fn run_code<B>(
    backend: &B,
    language: Language,
    source: &str,
    config: PollConfig,
) -> Result<RenderedResult, ClientError>
where
    B: ExecutionBackend + ?Sized,
{
    if language.is_renderable() {
        debug!(%language, "rendering block as a preview document");
        return Ok(RenderedResult::Preview(PreviewDocument::from_block(
            language, source,
        )));
    }

    let (_, result) = execute(backend, language, source, config).await?;
    Ok(render_result(language, source, &result))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::api::judge::{JobToken, SubmissionStatus};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Backend that replays a script of status ids and counts every call.
    pub(crate) struct ScriptedBackend {
        statuses: Mutex<VecDeque<u32>>,
        repeat_last: u32,
        stdout: String,
        pub(crate) submits: AtomicU32,
        pub(crate) polls: AtomicU32,
    }

    impl ScriptedBackend {
        pub(crate) fn new(script: &[u32], repeat_last: u32, stdout: &str) -> Self {
            Self {
                statuses: Mutex::new(script.iter().copied().collect()),
                repeat_last,
                stdout: stdout.to_string(),
                submits: AtomicU32::new(0),
                polls: AtomicU32::new(0),
            }
        }

        pub(crate) fn always(id: u32) -> Self {
            Self::new(&[], id, "")
        }
    }

    #[async_trait]
    impl ExecutionBackend for ScriptedBackend {
        async fn submit(&self, _source: &str, _language: Language) -> Result<JobToken, ClientError> {
            self.submits.fetch_add(1, Ordering::SeqCst);
            Ok(JobToken::new("scripted"))
        }

        async fn status(&self, _token: &JobToken) -> Result<SubmissionResult, ClientError> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            let id = self
                .statuses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(self.repeat_last);
            Ok(SubmissionResult {
                status: SubmissionStatus {
                    id,
                    description: format!("status {id}"),
                },
                stdout: Some(self.stdout.clone()),
                ..SubmissionResult::default()
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn queued_forever_times_out_after_exactly_the_budget() {
        let backend = ScriptedBackend::always(1);
        let config = PollConfig {
            interval: Duration::from_secs(1),
            max_attempts: 7,
        };

        let started = tokio::time::Instant::now();
        let err = execute(&backend, Language::Python, "print(1)", config)
            .await
            .unwrap_err();

        assert_eq!(err, ClientError::Timeout { attempts: 7 });
        assert_eq!(backend.polls.load(Ordering::SeqCst), 7);
        assert_eq!(started.elapsed(), Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn stops_at_the_first_terminal_status() {
        let backend = ScriptedBackend::new(&[1, 2, 2, 3], 1, "done\n");
        let (job, result) = execute(&backend, Language::Cpp, "int main() {}", PollConfig::default())
            .await
            .expect("job should finish");

        assert_eq!(result.status.id, 3);
        assert_eq!(job.stdout, "done\n");
        assert_eq!(backend.polls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_on_the_last_allowed_attempt_succeeds() {
        let backend = ScriptedBackend::new(&[1, 1], 3, "ok");
        let config = PollConfig {
            interval: Duration::from_millis(10),
            max_attempts: 3,
        };
        let (_, result) = execute(&backend, Language::Python, "print(1)", config)
            .await
            .expect("third attempt is terminal");
        assert_eq!(result.status.id, 3);
        assert_eq!(backend.polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn markup_never_reaches_the_backend() {
        let backend = ScriptedBackend::always(3);
        let rendered = run_code(
            &backend,
            Language::Html,
            "<html><body>Hi</body></html>",
            PollConfig::default(),
        )
        .await
        .unwrap();

        match rendered {
            RenderedResult::Preview(doc) => assert!(doc.html.contains("Hi")),
            other => panic!("expected a preview, got {other:?}"),
        }
        assert_eq!(backend.submits.load(Ordering::SeqCst), 0);
        assert_eq!(backend.polls.load(Ordering::SeqCst), 0);
    }
}
