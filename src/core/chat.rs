//! Sending prompts to the selected model and recording the replies.

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::api::completions::{self, vision_request, ImageInput};
use crate::api::{flux, gemini, ClientError, Completion, GeneratedImage};
use crate::auth::Credentials;
use crate::core::attachments::{validate_image, Attachment, PendingImage};
use crate::core::builtin_models::{BuiltinModel, ModelApi, ModelId};
use crate::core::config::Config;
use crate::core::markdown::strip_think_tags;
use crate::core::message::{Message, MessageMetadata};
use crate::core::store::ChatStore;

/// Prompt sent along with an image uploaded without any text.
pub const IMAGE_PROMPT: &str = "Could you analyze this image for me?";
pub const GENERATED_IMAGE_TEXT: &str = "Here's the generated image:";
pub const EMPTY_PROMPT_MESSAGE: &str = "Type a message or attach an image first.";
pub const DEFAULT_STOP_REASON: &str = "Completed";

/// Model that answers every message carrying an image.
pub const VISION_MODEL: ModelId = ModelId::Gpt4oMini;

/// The generation services behind the built-in models.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn generate_text(
        &self,
        model: &BuiltinModel,
        prompt: &str,
        image: Option<ImageInput<'_>>,
    ) -> Result<Completion, ClientError>;

    async fn generate_image(
        &self,
        model: &BuiltinModel,
        prompt: &str,
    ) -> Result<GeneratedImage, ClientError>;
}

/// [`ModelBackend`] that talks to the hosted services over HTTP.
pub struct HttpModelBackend {
    client: reqwest::Client,
    config: Config,
    credentials: Credentials,
}

impl HttpModelBackend {
    pub fn new(client: reqwest::Client, config: Config, credentials: Credentials) -> Self {
        Self {
            client,
            config,
            credentials,
        }
    }

    /// Endpoint and key for `model`. A built-in endpoint without a key fails
    /// early; an overridden endpoint is tried without one.
    fn target<'a>(&'a self, model: &'a BuiltinModel) -> Result<(&'a str, Option<&'a str>), ClientError> {
        let endpoint = model.endpoint_for(&self.config);
        let key = self.credentials.get(model.service);
        if key.is_none() && endpoint == model.endpoint {
            return Err(ClientError::validation(format!(
                "No API key for {}. Set {} or run `polychat auth {}`.",
                model.service.display_name(),
                model.service.env_var(),
                model.service.id()
            )));
        }
        Ok((endpoint, key))
    }
}

#[async_trait]
impl ModelBackend for HttpModelBackend {
    async fn generate_text(
        &self,
        model: &BuiltinModel,
        prompt: &str,
        image: Option<ImageInput<'_>>,
    ) -> Result<Completion, ClientError> {
        let (endpoint, key) = self.target(model)?;
        match model.api {
            ModelApi::Gemini => gemini::generate(&self.client, endpoint, key, prompt).await,
            ModelApi::ChatCompletions => {
                let request = vision_request(model, prompt, image);
                completions::complete(&self.client, endpoint, key, &request).await
            }
            ModelApi::Flux => Err(ClientError::validation(format!(
                "{} generates images, not text",
                model.display_name
            ))),
        }
    }

    async fn generate_image(
        &self,
        model: &BuiltinModel,
        prompt: &str,
    ) -> Result<GeneratedImage, ClientError> {
        let (endpoint, key) = self.target(model)?;
        flux::generate_image(&self.client, endpoint, key, prompt).await
    }
}

/// Figures for a text reply that took `elapsed` to arrive.
pub fn reply_metadata(
    text: &str,
    finish_reason: Option<String>,
    elapsed: Duration,
) -> MessageMetadata {
    let tokens = text.split_whitespace().count();
    let seconds = elapsed.as_secs_f64();
    MessageMetadata {
        image: None,
        tokens: Some(tokens),
        tokens_per_second: (seconds > 0.0).then(|| tokens as f64 / seconds),
        time_to_first_token: Some(seconds),
        stop_reason: Some(finish_reason.unwrap_or_else(|| DEFAULT_STOP_REASON.to_string())),
    }
}

/// The model that will answer: the vision model whenever an image is
/// attached and the selected model cannot see it.
pub fn responding_model(selected: ModelId, has_image: bool) -> ModelId {
    if has_image && !selected.info().accepts_images() {
        VISION_MODEL
    } else {
        selected
    }
}

fn user_message(
    store: &mut ChatStore,
    prompt: &str,
    image: Option<PendingImage>,
) -> Result<Message, ClientError> {
    let prompt = prompt.trim();
    if prompt.is_empty() && image.is_none() {
        return Err(ClientError::validation(EMPTY_PROMPT_MESSAGE));
    }

    let mut message = Message::user(prompt);
    if let Some(image) = image {
        validate_image(Path::new(&image.name), image.bytes.len() as u64)?;
        let object = store
            .objects_mut()
            .create_for_mime(&image.bytes, image.mime)
            .map_err(|err| ClientError::validation(format!("Cannot store {}: {err}", image.name)))?;
        message = message.with_attachment(Attachment {
            object,
            mime: image.mime.to_string(),
        });
    }
    Ok(message)
}

/// Append the user's message and wait for the reply. Failures are recorded
/// as the store's error and returned.
pub async fn send_message(
    store: &mut ChatStore,
    backend: &dyn ModelBackend,
    prompt: &str,
    image: Option<PendingImage>,
) -> Result<(), ClientError> {
    match user_message(store, prompt, image) {
        Ok(message) => {
            store.push_message(message);
            respond(store, backend).await
        }
        Err(err) => {
            store.set_error(err.to_string());
            Err(err)
        }
    }
}

/// Drop the last exchange and send its user message again. Returns false
/// when there is no user message to resend.
pub async fn regenerate(
    store: &mut ChatStore,
    backend: &dyn ModelBackend,
) -> Result<bool, ClientError> {
    let Some(user) = store.take_last_user_turn() else {
        return Ok(false);
    };
    debug!(chars = user.content.len(), "regenerating reply");
    store.push_message(user);
    respond(store, backend).await.map(|()| true)
}

/// Answer the trailing user message.
async fn respond(store: &mut ChatStore, backend: &dyn ModelBackend) -> Result<(), ClientError> {
    store.clear_error();
    store.set_loading(true);
    let result = reply_to_last(store, backend).await;
    store.set_loading(false);

    match result {
        Ok(reply) => {
            store.push_message(reply);
            Ok(())
        }
        Err(err) => {
            warn!("model request failed: {err}");
            store.set_error(err.to_string());
            Err(err)
        }
    }
}

async fn reply_to_last(
    store: &mut ChatStore,
    backend: &dyn ModelBackend,
) -> Result<Message, ClientError> {
    let user = store
        .messages()
        .last()
        .filter(|message| message.is_user())
        .cloned()
        .ok_or_else(|| ClientError::validation(EMPTY_PROMPT_MESSAGE))?;

    let attachment = user.attachments.first();
    let image_bytes = match attachment {
        Some(attachment) => Some(store.objects().read(attachment.object).map_err(|err| {
            ClientError::validation(format!("Attachment is no longer available: {err}"))
        })?),
        None => None,
    };

    let model_id = responding_model(store.selected_model(), attachment.is_some());
    let model = model_id.info();
    info!(model = %model_id, image = attachment.is_some(), "sending prompt");

    let started = Instant::now();
    if model.api == ModelApi::Flux {
        let image = backend.generate_image(model, &user.content).await?;
        let elapsed = started.elapsed();
        let object = store
            .objects_mut()
            .create(&image.bytes, image.extension)
            .map_err(|err| ClientError::protocol(format!("Cannot store generated image: {err}")))?;
        let metadata = MessageMetadata {
            image: Some(object),
            time_to_first_token: Some(elapsed.as_secs_f64()),
            stop_reason: Some(DEFAULT_STOP_REASON.to_string()),
            ..MessageMetadata::default()
        };
        return Ok(Message::assistant(GENERATED_IMAGE_TEXT, model_id, metadata));
    }

    let image = attachment
        .zip(image_bytes.as_deref())
        .map(|(attachment, bytes)| ImageInput {
            bytes,
            mime: &attachment.mime,
        });
    let completion = backend.generate_text(model, &user.content, image).await?;
    let elapsed = started.elapsed();

    let text = strip_think_tags(&completion.text).trim().to_string();
    if text.is_empty() {
        return Err(ClientError::protocol("Model returned an empty reply"));
    }
    let metadata = reply_metadata(&text, completion.finish_reason, elapsed);
    debug!(tokens = ?metadata.tokens, "reply received");
    Ok(Message::assistant(text, model_id, metadata))
}
