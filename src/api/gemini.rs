//! Google Gemini `generateContent` client.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::ClientError;
use super::http::{ensure_success, read_json};
use super::Completion;

#[derive(Serialize, Debug)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize, Debug)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize, Debug)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Deserialize, Debug)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

/// Send a single-turn prompt and return the first candidate's first text part.
pub async fn generate(
    client: &reqwest::Client,
    endpoint: &str,
    api_key: Option<&str>,
    prompt: &str,
) -> Result<Completion, ClientError> {
    let body = GenerateRequest {
        contents: vec![Content {
            parts: vec![Part { text: prompt }],
        }],
    };

    let mut request = client.post(endpoint).json(&body);
    if let Some(key) = api_key.filter(|key| !key.is_empty()) {
        request = request.header("x-goog-api-key", key);
    }

    let response = request.send().await.map_err(ClientError::network)?;
    let response = ensure_success(response).await?;
    let parsed: GenerateResponse = read_json(response, "Gemini").await?;

    let candidate = parsed
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| ClientError::protocol("Gemini returned no candidates"))?;
    let text = candidate
        .content
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.text)
        .ok_or_else(|| ClientError::protocol("Gemini response has no text"))?;

    debug!(chars = text.len(), finish_reason = ?candidate.finish_reason, "gemini reply");
    Ok(Completion {
        text,
        finish_reason: candidate.finish_reason,
    })
}
