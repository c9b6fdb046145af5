//! Model listing functionality
//!
//! Shows the built-in models together with whether the key each one needs
//! is available and which endpoint it will use.

use std::error::Error;

use crate::auth::{AuthManager, Credentials};
use crate::core::builtin_models::{load_builtin_models, ModelId, ModelKind, DEFAULT_MODEL};
use crate::core::config::Config;

fn kind_label(kind: ModelKind) -> &'static str {
    match kind {
        ModelKind::Text => "text",
        ModelKind::Vision => "vision",
        ModelKind::Image => "image generation",
    }
}

/// Lines printed by `polychat models`.
pub fn format_model_list(config: &Config, credentials: &Credentials) -> Vec<String> {
    let default = config
        .default_model
        .as_deref()
        .and_then(|value| value.parse::<ModelId>().ok())
        .unwrap_or(DEFAULT_MODEL);

    let mut lines = vec![
        "🤖 Available Models".to_string(),
        "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━".to_string(),
        String::new(),
    ];

    for model in load_builtin_models() {
        let marker = if model.id == default { " (default)" } else { "" };
        lines.push(format!(
            "  • {} - {} [{}]{marker}",
            model.id,
            model.display_name,
            kind_label(model.kind)
        ));

        let key_status = if credentials.get(model.service).is_some() {
            "✅ key configured".to_string()
        } else {
            format!(
                "❌ no key (run 'polychat auth {}' or set {})",
                model.service.id(),
                model.service.env_var()
            )
        };
        lines.push(format!("    {}: {key_status}", model.service.display_name()));

        if let Some(url) = config.endpoint_override(model.id.as_str()) {
            lines.push(format!("    endpoint: {url} (override)"));
        }
    }

    lines.push(String::new());
    lines.push("💡 Use -m <model> to pick one, or 'polychat set default-model <model>'".to_string());
    lines
}

pub fn list_models(env_only: bool) -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    let credentials = AuthManager::new_with_keyring(!env_only).credentials();
    for line in format_model_list(&config, &credentials) {
        println!("{line}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Service;

    #[test]
    fn lists_every_model_with_key_status() {
        let config = Config {
            default_model: Some("mixtral".to_string()),
            ..Config::default()
        };
        let credentials = Credentials::default().with(Service::Groq, "gsk-test");
        let lines = format_model_list(&config, &credentials);

        for id in ModelId::ALL {
            assert!(
                lines.iter().any(|line| line.starts_with(&format!("  • {id} - "))),
                "{id} missing"
            );
        }
        let mixtral = lines
            .iter()
            .position(|line| line.starts_with("  • mixtral"))
            .unwrap();
        assert!(lines[mixtral].ends_with("(default)"));
        assert!(lines[mixtral + 1].contains("✅ key configured"));

        let gemini = lines
            .iter()
            .position(|line| line.starts_with("  • gemini"))
            .unwrap();
        assert!(!lines[gemini].ends_with("(default)"));
        assert!(lines[gemini + 1].contains("GEMINI_API_KEY"));
    }

    #[test]
    fn endpoint_overrides_are_shown() {
        let mut config = Config::default();
        config.set_endpoint("flux-ai", "http://localhost:9000/flux".to_string());
        let lines = format_model_list(&config, &Credentials::default());
        assert!(lines
            .iter()
            .any(|line| line == "    endpoint: http://localhost:9000/flux (override)"));
    }
}
