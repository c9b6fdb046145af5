//! OpenAI-compatible chat completions, used for the Groq and GitHub Models
//! endpoints.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tracing::debug;

use super::error::ClientError;
use super::http::{ensure_success, read_json};
use super::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, Completion, ContentPart, ImageUrl,
};
use crate::core::builtin_models::BuiltinModel;

/// Text sent alongside an image when the user gave no prompt of their own.
pub const DEFAULT_IMAGE_PROMPT: &str = "Please analyze this image in detail.";

/// Raw image bytes and their MIME type, as attached by the user.
#[derive(Debug, Clone, Copy)]
pub struct ImageInput<'a> {
    pub bytes: &'a [u8],
    pub mime: &'a str,
}

impl ImageInput<'_> {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(self.bytes))
    }
}

fn base_request(model: &BuiltinModel, messages: Vec<ChatMessage>) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: model
            .remote_model
            .clone()
            .unwrap_or_else(|| model.id.to_string()),
        messages,
        temperature: model.sampling.temperature,
        top_p: model.sampling.top_p,
        max_tokens: model.sampling.max_tokens,
        frequency_penalty: model.sampling.frequency_penalty,
        presence_penalty: model.sampling.presence_penalty,
        stream: false,
    }
}

/// System prompt (when the model has one) followed by the user's prompt.
pub fn text_request(model: &BuiltinModel, prompt: &str) -> ChatCompletionRequest {
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = &model.system_prompt {
        messages.push(ChatMessage::text("system", system.clone()));
    }
    messages.push(ChatMessage::text("user", prompt));
    base_request(model, messages)
}

/// Like [`text_request`], but with an image the system prompt switches to the
/// description prompt and the user turn becomes a text part plus a
/// high-detail image part.
pub fn vision_request(
    model: &BuiltinModel,
    prompt: &str,
    image: Option<ImageInput<'_>>,
) -> ChatCompletionRequest {
    let Some(image) = image else {
        return text_request(model, prompt);
    };

    let system = model
        .vision_system_prompt
        .as_ref()
        .or(model.system_prompt.as_ref());
    let mut messages = Vec::with_capacity(2);
    if let Some(system) = system {
        messages.push(ChatMessage::text("system", system.clone()));
    }

    let text = if prompt.trim().is_empty() {
        DEFAULT_IMAGE_PROMPT
    } else {
        prompt
    };
    messages.push(ChatMessage::parts(
        "user",
        vec![
            ContentPart::Text {
                text: text.to_string(),
            },
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: image.data_url(),
                    detail: "high".to_string(),
                },
            },
        ],
    ));
    base_request(model, messages)
}

pub async fn complete(
    client: &reqwest::Client,
    endpoint: &str,
    api_key: Option<&str>,
    request: &ChatCompletionRequest,
) -> Result<Completion, ClientError> {
    let mut builder = client.post(endpoint).json(request);
    if let Some(key) = api_key.filter(|key| !key.is_empty()) {
        builder = builder.bearer_auth(key);
    }

    let response = builder.send().await.map_err(ClientError::network)?;
    let response = ensure_success(response).await?;
    let parsed: ChatCompletionResponse = read_json(response, "chat completions API").await?;

    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ClientError::protocol("Invalid response format from API"))?;
    let text = choice
        .message
        .and_then(|message| message.content)
        .filter(|content| !content.is_empty())
        .ok_or_else(|| ClientError::protocol("Invalid response format from API"))?;

    debug!(model = %request.model, chars = text.len(), "chat completion reply");
    Ok(Completion {
        text,
        finish_reason: choice.finish_reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::http::test_client;
    use crate::core::builtin_models::ModelId;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn mixtral_request_matches_the_service_contract() {
        let request = text_request(ModelId::Mixtral.info(), "Explain borrowing");
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "mixtral-8x7b-32768");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "Explain borrowing");
        assert_eq!(value["temperature"], json!(0.9));
        assert_eq!(value["top_p"], json!(0.9));
        assert_eq!(value["max_tokens"], json!(4096));
        assert_eq!(value["frequency_penalty"], json!(0.5));
        assert_eq!(value["presence_penalty"], json!(0.5));
    }

    #[test]
    fn image_requests_use_the_description_prompt_and_a_data_url() {
        let image = ImageInput {
            bytes: &[0x89, b'P', b'N', b'G'],
            mime: "image/png",
        };
        let request = vision_request(ModelId::Gpt4oMini.info(), "  ", Some(image));
        let value = serde_json::to_value(&request).unwrap();

        let system = value["messages"][0]["content"].as_str().unwrap();
        assert!(system.contains("describes images in detail"));
        let parts = &value["messages"][1]["content"];
        assert_eq!(parts[0]["text"], DEFAULT_IMAGE_PROMPT);
        assert_eq!(parts[1]["image_url"]["url"], "data:image/png;base64,iVBORw==");
        assert_eq!(parts[1]["image_url"]["detail"], "high");
        assert_eq!(value["temperature"], json!(0.7));
        assert_eq!(value["top_p"], json!(0.95));
        assert_eq!(value["stream"], json!(false));
    }

    #[test]
    fn vision_model_without_image_sends_plain_text() {
        let request = vision_request(ModelId::Gpt4oMini.info(), "Hi", None);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["messages"][0]["content"], "You are a helpful assistant.");
        assert_eq!(value["messages"][1]["content"], "Hi");
        assert_eq!(value["model"], "gpt-4o-mini");
    }

    #[tokio::test]
    async fn returns_first_choice_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer gsk"))
            .and(body_partial_json(json!({"model": "mixtral-8x7b-32768"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "Sure."}, "finish_reason": "stop"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request = text_request(ModelId::Mixtral.info(), "Hello");
        let completion = complete(&test_client(), &server.uri(), Some("gsk"), &request)
            .await
            .unwrap();
        assert_eq!(completion.text, "Sure.");
        assert_eq!(completion.finish_reason.as_deref(), Some("stop"));
    }

    #[tokio::test]
    async fn error_bodies_are_mined_for_the_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"message": "Invalid API Key", "type": "invalid_request_error"}
            })))
            .mount(&server)
            .await;

        let request = text_request(ModelId::Mixtral.info(), "Hello");
        let err = complete(&test_client(), &server.uri(), None, &request)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "HTTP error! status: 401 (Invalid API Key)");
    }

    #[tokio::test]
    async fn missing_content_is_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let request = text_request(ModelId::Mixtral.info(), "Hello");
        let err = complete(&test_client(), &server.uri(), None, &request)
            .await
            .unwrap_err();
        assert_eq!(err, ClientError::protocol("Invalid response format from API"));
    }
}
