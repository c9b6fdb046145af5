//! Simple setting handlers for single-value settings.

use crate::cli::settings::error::SettingError;
use crate::cli::settings::helpers::{
    mutate_config_with_message, success_set, success_unset, validate_model,
};
use crate::cli::settings::{SetContext, SettingHandler};
use crate::core::builtin_models::DEFAULT_MODEL;
use crate::core::config::data::Config;

/// Handler for the `default-model` setting.
pub struct DefaultModelHandler;

impl SettingHandler for DefaultModelHandler {
    fn key(&self) -> &'static str {
        "default-model"
    }

    fn set(&self, args: &[String], _ctx: &mut SetContext<'_>) -> Result<String, SettingError> {
        if args.is_empty() {
            return Err(SettingError::MissingArgs {
                hint: "To set a default model, specify the model:",
                example: "polychat set default-model mixtral",
            });
        }

        let model = validate_model(&args.join(" "))?;
        let message = success_set("default-model", model.as_str());

        mutate_config_with_message(
            move |config| {
                config.default_model = Some(model.as_str().to_string());
                Ok(())
            },
            message,
        )
    }

    fn unset(
        &self,
        _args: Option<&str>,
        _ctx: &mut SetContext<'_>,
    ) -> Result<String, SettingError> {
        mutate_config_with_message(
            |config| {
                config.default_model = None;
                Ok(())
            },
            success_unset("default-model"),
        )
    }

    fn format(&self, config: &Config) -> String {
        match &config.default_model {
            Some(model) => format!("  default-model: {model}"),
            None => format!("  default-model: (unset, default: {DEFAULT_MODEL})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_models_are_rejected_before_saving() {
        let config = Config::default();
        let mut ctx = SetContext { config: &config };
        let handler = DefaultModelHandler;
        assert!(matches!(
            handler.set(&[], &mut ctx),
            Err(SettingError::MissingArgs { .. })
        ));
        assert!(matches!(
            handler.set(&["llama".to_string()], &mut ctx),
            Err(SettingError::UnknownModel { input }) if input == "llama"
        ));
    }

    #[test]
    fn format_names_the_fallback() {
        let handler = DefaultModelHandler;
        assert_eq!(
            handler.format(&Config::default()),
            "  default-model: (unset, default: gemini)"
        );
    }
}
