//! Wire payloads and thin HTTP clients for the hosted services polychat talks to.

use serde::{Deserialize, Serialize};

pub mod completions;
pub mod error;
pub mod flux;
pub mod gemini;
pub(crate) mod http;
pub mod judge;

pub use error::ClientError;

/// One message in an OpenAI-compatible chat completion request.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: ChatContent,
}

/// Plain text for ordinary turns, a list of parts for multimodal turns.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum ChatContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ImageUrl {
    pub url: String,
    pub detail: String,
}

#[derive(Serialize, Debug)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    pub stream: bool,
}

#[derive(Deserialize, Debug)]
pub struct ChatCompletionMessage {
    pub content: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct ChatCompletionChoice {
    pub message: Option<ChatCompletionMessage>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatCompletionChoice>,
}

/// Text returned by a generation call together with the stop reason the
/// service reported, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub finish_reason: Option<String>,
}

/// Raw image bytes returned by an image generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub extension: &'static str,
}

impl ChatMessage {
    pub fn text(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: ChatContent::Text(content.into()),
        }
    }

    pub fn parts(role: &str, parts: Vec<ContentPart>) -> Self {
        Self {
            role: role.to_string(),
            content: ChatContent::Parts(parts),
        }
    }
}
