//! Run a source file through the code execution service.

use std::error::Error;
use std::path::Path;

use tracing::info;

use crate::api::judge::JudgeClient;
use crate::auth::{AuthManager, Service};
use crate::core::config::data::Config;
use crate::exec::poll::run_code;
use crate::exec::render::{BrowserPreview, PreviewSurface, RenderedResult};
use crate::exec::Language;

/// Language for `path`: an explicit tag wins, then the file extension, then
/// a scan of the source.
pub fn language_for_file(
    path: &Path,
    language: Option<&str>,
    source: &str,
) -> Result<Language, String> {
    if let Some(tag) = language {
        return Language::from_tag(tag).ok_or_else(|| {
            let known: Vec<&str> = Language::ALL.iter().map(|l| l.tag()).collect();
            format!("Unknown language '{tag}'. Available: {}", known.join(", "))
        });
    }
    Ok(path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(Language::from_extension)
        .unwrap_or_else(|| Language::guess_from_source(source)))
}

pub async fn run_file(
    path: &Path,
    language: Option<&str>,
    env_only: bool,
) -> Result<(), Box<dyn Error>> {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("❌ Cannot read {}: {err}", path.display());
            std::process::exit(1);
        }
    };
    let language = match language_for_file(path, language, &source) {
        Ok(language) => language,
        Err(err) => {
            eprintln!("❌ {err}");
            std::process::exit(1);
        }
    };

    let config = Config::load()?;
    let api_key = AuthManager::new_with_keyring(!env_only).resolve_key(Service::Rapidapi);
    let client = JudgeClient::new(reqwest::Client::new(), config.judge.clone(), api_key);
    info!(file = %path.display(), %language, "running file");

    match run_code(&client, language, &source, config.judge.poll_config()).await {
        Ok(RenderedResult::Output(output)) => {
            println!("{output}");
            Ok(())
        }
        Ok(RenderedResult::Preview(document)) => {
            let mut preview = BrowserPreview::new(config.open_previews_enabled());
            match preview.show(&document) {
                Ok(path) => {
                    println!("🌐 Preview written to {}", path.display());
                    // The preview directory is removed on exit; keep it open
                    // until the user is done looking.
                    println!("Press Enter to exit.");
                    let mut line = String::new();
                    std::io::stdin().read_line(&mut line)?;
                    Ok(())
                }
                Err(err) => {
                    eprintln!("❌ {err}");
                    std::process::exit(1);
                }
            }
        }
        Err(err) => {
            eprintln!("❌ Error: {err}");
            std::process::exit(1);
        }
    }
}
