//! Hugging Face inference client for FLUX text-to-image models.

use serde::Serialize;
use tracing::{debug, warn};

use super::error::ClientError;
use super::http::{ensure_success, summarize_error_body};
use super::GeneratedImage;

#[derive(Serialize, Debug)]
struct Parameters {
    width: u32,
    height: u32,
}

#[derive(Serialize, Debug)]
struct GenerateRequest<'a> {
    inputs: &'a str,
    parameters: Parameters,
}

/// File extension for an image MIME type, if it is one we can display.
pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let essence = mime.split(';').next().unwrap_or_default().trim();
    match essence.to_ascii_lowercase().as_str() {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

fn sniff_extension(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"\x89PNG") {
        Some("png")
    } else if bytes.starts_with(&[0xFF, 0xD8]) {
        Some("jpg")
    } else if bytes.starts_with(b"GIF8") {
        Some("gif")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("webp")
    } else {
        None
    }
}

/// Generate a 1024x1024 image for `prompt` and return its bytes.
pub async fn generate_image(
    client: &reqwest::Client,
    endpoint: &str,
    api_key: Option<&str>,
    prompt: &str,
) -> Result<GeneratedImage, ClientError> {
    let body = GenerateRequest {
        inputs: prompt,
        parameters: Parameters {
            width: 1024,
            height: 1024,
        },
    };

    let mut request = client.post(endpoint).json(&body);
    if let Some(key) = api_key.filter(|key| !key.is_empty()) {
        request = request.bearer_auth(key);
    }

    let response = request.send().await.map_err(ClientError::network)?;
    let response = ensure_success(response).await?;
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let bytes = response.bytes().await.map_err(ClientError::network)?;

    if bytes.is_empty() {
        return Err(ClientError::protocol("Image service returned an empty body"));
    }
    if content_type.starts_with("application/json") {
        let summary = summarize_error_body(&String::from_utf8_lossy(&bytes));
        warn!(%summary, "image service answered with JSON instead of an image");
        return Err(ClientError::protocol(format!(
            "Image service returned no image: {summary}"
        )));
    }

    let extension = extension_for_mime(&content_type)
        .or_else(|| sniff_extension(&bytes))
        .ok_or_else(|| {
            ClientError::protocol(format!(
                "Image service returned unsupported content type '{content_type}'"
            ))
        })?;

    debug!(bytes = bytes.len(), extension, "generated image");
    Ok(GeneratedImage {
        bytes: bytes.to_vec(),
        extension,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::http::test_client;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake";

    #[tokio::test]
    async fn posts_prompt_with_fixed_dimensions() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer hf_x"))
            .and(body_json(json!({
                "inputs": "a red fox",
                "parameters": {"width": 1024, "height": 1024}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_raw(PNG, "image/png"))
            .expect(1)
            .mount(&server)
            .await;

        let image = generate_image(&test_client(), &server.uri(), Some("hf_x"), "a red fox")
            .await
            .unwrap();
        assert_eq!(image.bytes, PNG);
        assert_eq!(image.extension, "png");
    }

    #[tokio::test]
    async fn json_body_is_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"error": "Model is currently loading"})),
            )
            .mount(&server)
            .await;

        let err = generate_image(&test_client(), &server.uri(), None, "x")
            .await
            .unwrap_err();
        assert!(err.is_protocol());
        assert!(err.to_string().contains("Model is currently loading"));
    }

    #[tokio::test]
    async fn service_errors_are_transport() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string(""))
            .mount(&server)
            .await;

        let err = generate_image(&test_client(), &server.uri(), None, "x")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "HTTP error! status: 503");
    }

    #[test]
    fn extensions_follow_mime_or_magic_bytes() {
        assert_eq!(extension_for_mime("image/jpeg; charset=binary"), Some("jpg"));
        assert_eq!(extension_for_mime("text/plain"), None);
        assert_eq!(sniff_extension(b"GIF89a"), Some("gif"));
        assert_eq!(sniff_extension(b"RIFF\0\0\0\0WEBPVP8 "), Some("webp"));
    }
}
