//! One-shot "say" command: send a single prompt and print the reply.

use std::error::Error;
use std::path::Path;

use chrono::Utc;
use tracing::debug;

use crate::api::error::ClientError;
use crate::auth::AuthManager;
use crate::cli::resolve_model;
use crate::core::attachments::{ObjectStore, PendingImage};
use crate::core::chat::{self, HttpModelBackend, IMAGE_PROMPT};
use crate::core::config::data::Config;
use crate::core::store::ChatStore;
use crate::ui::renderer::{render_message, RenderOptions};

/// Bad input (a rejected attachment, a missing key) exits 2 like other
/// usage mistakes; service failures exit 1.
fn exit_code_for(err: &ClientError) -> i32 {
    if err.is_validation() {
        2
    } else {
        1
    }
}

/// Copy the image generated by the last reply next to the user, returning
/// the file it was written to.
fn save_generated_image(store: &ChatStore) -> Result<Option<String>, Box<dyn Error>> {
    let Some(object) = store.messages().last().and_then(|m| m.generated_image()) else {
        return Ok(None);
    };
    let extension = store
        .objects()
        .path(object)
        .and_then(|path| path.extension())
        .and_then(|ext| ext.to_str())
        .unwrap_or("png")
        .to_string();
    let path = format!(
        "polychat-image-{}.{extension}",
        Utc::now().format("%Y-%m-%d-%H%M%S")
    );
    std::fs::write(&path, store.objects().read(object)?)?;
    Ok(Some(path))
}

pub async fn run_say(
    prompt: Vec<String>,
    image: Option<&Path>,
    model: Option<&str>,
    env_only: bool,
) -> Result<(), Box<dyn Error>> {
    let mut prompt = prompt.join(" ");
    if prompt.trim().is_empty() {
        if image.is_none() {
            eprintln!("Usage: polychat say <prompt> [--image <path>]");
            std::process::exit(1);
        }
        prompt = IMAGE_PROMPT.to_string();
    }

    let config = Config::load()?;
    let model = match resolve_model(model, &config) {
        Ok(model) => model,
        Err(err) => {
            eprintln!("❌ {err}");
            std::process::exit(1);
        }
    };
    let image = match image.map(PendingImage::load).transpose() {
        Ok(image) => image,
        Err(err) => {
            eprintln!("❌ {err}");
            std::process::exit(1);
        }
    };

    let credentials = AuthManager::new_with_keyring(!env_only).credentials();
    let options = RenderOptions {
        markdown: config.markdown_enabled(),
        syntax: config.syntax_enabled(),
    };
    let backend = HttpModelBackend::new(reqwest::Client::new(), config, credentials);
    let mut store = ChatStore::new(model, ObjectStore::new()?);
    debug!(%model, chars = prompt.len(), "sending one-shot prompt");

    if let Err(err) = chat::send_message(&mut store, &backend, &prompt, image).await {
        eprintln!("❌ Error: {err}");
        std::process::exit(exit_code_for(&err));
    }

    let last = store.messages().len() - 1;
    // Header and trailing blank line are for the interactive transcript.
    let lines = render_message(&store, last, options);
    let body = lines.get(1..lines.len().saturating_sub(1)).unwrap_or(&[]);
    for line in body {
        println!("{line}");
    }

    if let Some(path) = save_generated_image(&store)? {
        println!("🖼️  Saved image to {path}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::builtin_models::ModelId;
    use crate::core::message::{Message, MessageMetadata};

    #[test]
    fn nothing_is_saved_for_text_replies() {
        let mut store = ChatStore::new(ModelId::Gemini, ObjectStore::new().unwrap());
        store.push_message(Message::user("hi"));
        assert_eq!(save_generated_image(&store).unwrap(), None);

        store.push_message(Message::assistant(
            "hello",
            ModelId::Gemini,
            MessageMetadata::default(),
        ));
        assert_eq!(save_generated_image(&store).unwrap(), None);
    }

    #[test]
    fn rejected_input_exits_with_the_usage_code() {
        assert_eq!(exit_code_for(&ClientError::validation("Image too large")), 2);
        assert_eq!(exit_code_for(&ClientError::Timeout { attempts: 10 }), 1);
        assert_eq!(exit_code_for(&ClientError::protocol("no candidates")), 1);
    }
}
