//! String setting handlers for text-based settings.

use crate::cli::settings::error::SettingError;
use crate::cli::settings::helpers::{mutate_config_with_message, success_set};
use crate::cli::settings::{SetContext, SettingHandler};
use crate::core::config::data::Config;

/// Data-driven handler for free-text settings.
pub struct StringHandler {
    key: &'static str,
    hint: &'static str,
    example: &'static str,
    default_display: &'static str,
    get: fn(&Config) -> Option<&str>,
    set_field: fn(&mut Config, Option<String>),
}

impl SettingHandler for StringHandler {
    fn key(&self) -> &'static str {
        self.key
    }

    fn set(&self, args: &[String], _ctx: &mut SetContext<'_>) -> Result<String, SettingError> {
        let value = args.join(" ").trim().to_string();
        if value.is_empty() {
            return Err(SettingError::MissingArgs {
                hint: self.hint,
                example: self.example,
            });
        }

        let message = success_set(self.key, &value);
        let set_field = self.set_field;
        mutate_config_with_message(
            move |config| {
                set_field(config, Some(value));
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
        let set_field = self.set_field;
        mutate_config_with_message(
            move |config| {
                set_field(config, None);
                Ok(())
            },
            format!(
                "✅ Unset {} (will use default: {})",
                self.key, self.default_display
            ),
        )
    }

    fn format(&self, config: &Config) -> String {
        match (self.get)(config) {
            Some(value) => format!("  {}: {value}", self.key),
            None => format!("  {}: (unset, default: {})", self.key, self.default_display),
        }
    }
}

/// Create a handler for the `speech-language` setting.
pub fn speech_language_handler() -> StringHandler {
    StringHandler {
        key: "speech-language",
        hint: "To set the speech language, give a language name or tag:",
        example: "polychat set speech-language fr-FR",
        default_display: "en-US",
        get: |c| c.speech_language.as_deref(),
        set_field: |c, v| c.speech_language = v,
    }
}

/// Create a handler for the `voice` setting.
pub fn voice_handler() -> StringHandler {
    StringHandler {
        key: "voice",
        hint: "To set the voice, give a name your speech synthesizer knows:",
        example: "polychat set voice Samantha",
        default_display: "system voice",
        get: |c| c.voice.as_deref(),
        set_field: |c, v| c.voice = v,
    }
}

/// Create a handler for the `recognizer` setting.
pub fn recognizer_handler() -> StringHandler {
    StringHandler {
        key: "recognizer",
        hint: "To enable /listen, give a command that records speech and prints the transcript:",
        example: "polychat set recognizer \"my-stt --lang $POLYCHAT_SPEECH_LOCALE\"",
        default_display: "none",
        get: |c| c.recognizer_command.as_deref(),
        set_field: |c, v| c.recognizer_command = v,
    }
}
