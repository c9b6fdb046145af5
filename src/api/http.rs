use serde::de::DeserializeOwned;
use tracing::debug;

use super::error::ClientError;

/// Longest response-body excerpt carried inside a transport error.
const MAX_ERROR_EXCERPT: usize = 200;

/// Pass successful responses through; turn anything else into
/// [`ClientError::Transport`] with a summary of the body.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<no body>".to_string());
    debug!(status = status.as_u16(), body = %body, "request failed");

    Err(ClientError::Transport {
        status: Some(status.as_u16()),
        message: summarize_error_body(&body),
    })
}

/// Read the body and decode it as `T`, reporting shape mismatches as
/// [`ClientError::Protocol`].
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
    context: &str,
) -> Result<T, ClientError> {
    let body = response.text().await.map_err(ClientError::network)?;
    serde_json::from_str(&body).map_err(|err| {
        debug!(context, body = %body, "unparsable response body");
        ClientError::protocol(format!("Invalid JSON response from {context}: {err}"))
    })
}

fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value.get("error").and_then(|v| match v {
                serde_json::Value::String(s) => Some(s.to_string()),
                _ => None,
            })
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str().map(str::to_owned))
        });

    summary.map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Collapse an error body into one short line: the JSON `error.message`
/// (or `error`/`message`) when present, otherwise a truncated excerpt.
pub(crate) fn summarize_error_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(summary) = extract_error_summary(&value) {
            if !summary.is_empty() {
                return summary;
            }
        }
    }

    let collapsed = trimmed.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > MAX_ERROR_EXCERPT {
        let excerpt: String = collapsed.chars().take(MAX_ERROR_EXCERPT).collect();
        format!("{excerpt}…")
    } else {
        collapsed
    }
}

#[cfg(test)]
pub(crate) fn test_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("test client should build")
}
