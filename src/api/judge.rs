//! Client for a Judge0-compatible code execution service.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::error::ClientError;
use super::http::{ensure_success, read_json};
use crate::core::config::JudgeSettings;
use crate::exec::language::Language;
use crate::exec::ExecutionBackend;
use crate::utils::url::construct_api_url;

/// Opaque identifier the backend hands out for an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobToken(String);

impl JobToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SubmissionRequest {
    pub source_code: String,
    pub language_id: u32,
    pub stdin: String,
    pub expected_output: String,
    pub cpu_time_limit: String,
    pub memory_limit: String,
}

#[derive(Deserialize, Debug)]
struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionStatus {
    pub id: u32,
    #[serde(default)]
    pub description: String,
}

/// One status snapshot. Text fields arrive as `null` until they exist.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionResult {
    pub status: SubmissionStatus,
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub stderr: Option<String>,
    #[serde(default)]
    pub compile_output: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
}

impl SubmissionResult {
    pub fn stdout(&self) -> &str {
        self.stdout.as_deref().unwrap_or_default()
    }

    pub fn stderr(&self) -> &str {
        self.stderr.as_deref().unwrap_or_default()
    }

    pub fn compile_output(&self) -> &str {
        self.compile_output.as_deref().unwrap_or_default()
    }
}

/// Wrap bare Java statements in a `Main` class so they compile on their own.
pub fn wrap_java_source(source: &str) -> String {
    if source.contains("class ") {
        source.to_string()
    } else {
        format!("public class Main {{ public static void main(String[] args) {{ {source} }} }}")
    }
}

/// Build the submission body for `source`, applying the Java wrapper and the
/// configured resource limits.
pub fn build_submission(
    source: &str,
    language: Language,
    settings: &JudgeSettings,
) -> SubmissionRequest {
    let source_code = match language {
        Language::Java => wrap_java_source(source),
        _ => source.to_string(),
    };

    SubmissionRequest {
        source_code,
        language_id: language.judge_id(),
        stdin: String::new(),
        expected_output: String::new(),
        cpu_time_limit: settings.cpu_time_limit.clone(),
        memory_limit: settings.memory_limit.clone(),
    }
}

pub struct JudgeClient {
    client: reqwest::Client,
    settings: JudgeSettings,
    api_key: Option<String>,
}

impl JudgeClient {
    pub fn new(client: reqwest::Client, settings: JudgeSettings, api_key: Option<String>) -> Self {
        Self {
            client,
            settings,
            api_key,
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = match self.api_key.as_deref() {
            Some(key) if !key.is_empty() => request.header("X-RapidAPI-Key", key),
            _ => request,
        };
        if self.settings.host.is_empty() {
            request
        } else {
            request.header("X-RapidAPI-Host", &self.settings.host)
        }
    }

    fn submissions_url(&self) -> String {
        construct_api_url(&self.settings.base_url, "submissions")
    }
}

#[async_trait]
impl ExecutionBackend for JudgeClient {
    async fn submit(&self, source: &str, language: Language) -> Result<JobToken, ClientError> {
        let body = build_submission(source, language, &self.settings);
        info!(
            language = %language,
            language_id = body.language_id,
            bytes = body.source_code.len(),
            "submitting code for execution"
        );

        let response = self
            .authorize(self.client.post(self.submissions_url()))
            .json(&body)
            .send()
            .await
            .map_err(ClientError::network)?;
        let response = ensure_success(response).await?;
        let parsed: TokenResponse = read_json(response, "execution service").await?;

        match parsed.token.filter(|token| !token.trim().is_empty()) {
            Some(token) => {
                debug!(%token, "submission accepted");
                Ok(JobToken::new(token))
            }
            None => {
                warn!("submission response carried no token");
                Err(ClientError::protocol(
                    "No token received from execution service",
                ))
            }
        }
    }

    async fn status(&self, token: &JobToken) -> Result<SubmissionResult, ClientError> {
        let url = format!(
            "{}/{}?base64_encoded=false&fields=*",
            self.submissions_url(),
            token
        );
        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(ClientError::network)?;
        let response = ensure_success(response).await?;
        read_json(response, "execution service").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::http::test_client;
    use crate::exec::poll::{run_code, PollConfig};
    use crate::exec::render::RenderedResult;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings_for(server: &MockServer) -> JudgeSettings {
        JudgeSettings {
            base_url: server.uri(),
            host: "judge.test".to_string(),
            ..JudgeSettings::default()
        }
    }

    fn fast_polling() -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(5),
            max_attempts: 10,
        }
    }

    #[test]
    fn java_statements_are_wrapped_once() {
        let wrapped = wrap_java_source("System.out.println(1);");
        assert_eq!(
            wrapped,
            "public class Main { public static void main(String[] args) { System.out.println(1); } }"
        );
        let full = "public class Main { public static void main(String[] a) {} }";
        assert_eq!(wrap_java_source(full), full);
    }

    #[test]
    fn submission_carries_language_id_and_limits() {
        let body = build_submission("print(1)", Language::Python, &JudgeSettings::default());
        assert_eq!(body.language_id, 71);
        assert_eq!(body.cpu_time_limit, "8");
        assert_eq!(body.memory_limit, "256000");
        assert!(body.stdin.is_empty());
        assert!(body.expected_output.is_empty());
    }

    #[test]
    fn null_fields_decode_as_empty_text() {
        let result: SubmissionResult = serde_json::from_value(json!({
            "status": {"id": 3, "description": "Accepted"},
            "stdout": null,
            "stderr": null,
            "compile_output": null,
            "message": null,
            "time": "0.01"
        }))
        .unwrap();
        assert_eq!(result.stdout(), "");
        assert_eq!(result.time.as_deref(), Some("0.01"));
    }

    #[tokio::test]
    async fn python_round_trip_shows_stdout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/submissions"))
            .and(header("X-RapidAPI-Key", "secret"))
            .and(header("X-RapidAPI-Host", "judge.test"))
            .and(body_partial_json(json!({
                "language_id": 71,
                "source_code": "print(\"hi\")"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"token": "tok-1"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/submissions/tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": {"id": 3, "description": "Accepted"},
                "stdout": "hi\n",
                "stderr": null,
                "compile_output": null,
                "message": null,
                "time": "0.02"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = JudgeClient::new(
            test_client(),
            settings_for(&server),
            Some("secret".to_string()),
        );
        let rendered = run_code(&client, Language::Python, "print(\"hi\")", fast_polling())
            .await
            .expect("run should succeed");

        match rendered {
            RenderedResult::Output(text) => assert!(text.contains("hi")),
            other => panic!("expected output panel, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_error_on_submit_is_transport_and_never_polls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/submissions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = JudgeClient::new(test_client(), settings_for(&server), None);
        let err = run_code(&client, Language::Python, "print(1)", fast_polling())
            .await
            .unwrap_err();
        assert!(err.is_transport(), "unexpected error: {err:?}");
        assert_eq!(
            err,
            ClientError::Transport {
                status: Some(500),
                message: "boom".to_string()
            }
        );
    }

    #[tokio::test]
    async fn status_failure_stops_polling_with_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/submissions"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"token": "tok-9"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/submissions/tok-9"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .expect(1)
            .mount(&server)
            .await;

        let client = JudgeClient::new(test_client(), settings_for(&server), None);
        let err = run_code(&client, Language::Python, "print(1)", fast_polling())
            .await
            .unwrap_err();
        assert!(
            matches!(err, ClientError::Transport { status: Some(503), .. }),
            "unexpected error: {err:?}"
        );
    }

    #[tokio::test]
    async fn missing_token_is_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/submissions"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"error": "nope"})))
            .mount(&server)
            .await;

        let client = JudgeClient::new(test_client(), settings_for(&server), None);
        let err = client.submit("print(1)", Language::Python).await.unwrap_err();
        assert!(err.is_protocol());
    }

    #[tokio::test]
    async fn unparsable_status_body_is_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/submissions/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = JudgeClient::new(test_client(), settings_for(&server), None);
        let err = client.status(&JobToken::new("abc")).await.unwrap_err();
        assert!(err.is_protocol());
    }
}
