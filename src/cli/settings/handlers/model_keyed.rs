//! Settings keyed by model id.

use crate::cli::settings::error::SettingError;
use crate::cli::settings::helpers::{mutate_config_with_message, validate_model};
use crate::cli::settings::{SetContext, SettingHandler};
use crate::core::config::data::Config;
use crate::utils::url::is_http_url;

/// Handler for the `endpoint` setting: `set endpoint <model> <url>`.
pub struct EndpointHandler;

impl SettingHandler for EndpointHandler {
    fn key(&self) -> &'static str {
        "endpoint"
    }

    fn set(&self, args: &[String], _ctx: &mut SetContext<'_>) -> Result<String, SettingError> {
        let [model, url] = args else {
            return Err(SettingError::MissingArgs {
                hint: "To override a model's endpoint, specify the model and the full URL:",
                example: "polychat set endpoint mixtral http://localhost:8080/v1/chat/completions",
            });
        };

        let model = validate_model(model)?;
        let url = url.trim().to_string();
        if !is_http_url(&url) {
            return Err(SettingError::InvalidValue {
                key: "endpoint",
                input: url,
                expected: "an http:// or https:// URL",
            });
        }

        let message = format!("✅ Set endpoint for {model} to: {url}");
        mutate_config_with_message(
            move |config| {
                config.set_endpoint(model.as_str(), url);
                Ok(())
            },
            message,
        )
    }

    fn unset(&self, args: Option<&str>, _ctx: &mut SetContext<'_>) -> Result<String, SettingError> {
        let Some(model) = args else {
            return Err(SettingError::MissingArgs {
                hint: "To remove an endpoint override, specify the model:",
                example: "polychat unset endpoint mixtral",
            });
        };
        let model = validate_model(model)?;

        mutate_config_with_message(
            move |config| {
                config.unset_endpoint(model.as_str());
                Ok(())
            },
            format!("✅ Unset endpoint for {model} (will use the built-in URL)"),
        )
    }

    fn format(&self, config: &Config) -> String {
        if config.endpoints.is_empty() {
            return "  endpoint: (none set)".to_string();
        }
        let mut entries: Vec<_> = config.endpoints.iter().collect();
        entries.sort();
        let mut out = String::from("  endpoint:");
        for (model, url) in entries {
            out.push_str(&format!("\n    {model}: {url}"));
        }
        out
    }
}
