//! The table of config keys `polychat set` understands.

use super::handlers::boolean::{Flag, FlagHandler};
use super::handlers::string::{recognizer_handler, speech_language_handler, voice_handler};
use super::handlers::{DefaultModelHandler, EndpointHandler, JudgeHandler};
use super::SettingHandler;

/// Handlers in the order a bare `polychat set` lists them.
pub struct SettingRegistry {
    handlers: Vec<Box<dyn SettingHandler>>,
}

impl SettingRegistry {
    pub fn new() -> Self {
        let mut handlers: Vec<Box<dyn SettingHandler>> = vec![Box::new(DefaultModelHandler)];
        handlers.extend(
            Flag::ALL
                .into_iter()
                .map(|flag| Box::new(FlagHandler(flag)) as Box<dyn SettingHandler>),
        );
        handlers.push(Box::new(speech_language_handler()));
        handlers.push(Box::new(voice_handler()));
        handlers.push(Box::new(recognizer_handler()));
        handlers.push(Box::new(JudgeHandler));
        handlers.push(Box::new(EndpointHandler));
        Self { handlers }
    }

    /// Case-insensitive lookup; `_` and `-` are interchangeable.
    pub fn get(&self, key: &str) -> Option<&dyn SettingHandler> {
        let key = key.trim().to_ascii_lowercase().replace('_', "-");
        self.handlers
            .iter()
            .find(|handler| handler.key() == key)
            .map(|handler| handler.as_ref())
    }

    pub fn handlers(&self) -> impl Iterator<Item = &dyn SettingHandler> {
        self.handlers.iter().map(|handler| handler.as_ref())
    }

    pub fn keys_sorted(&self) -> Vec<&'static str> {
        let mut keys: Vec<_> = self.handlers().map(|handler| handler.key()).collect();
        keys.sort_unstable();
        keys
    }
}

impl Default for SettingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;

    #[test]
    fn every_key_is_registered_once() {
        let registry = SettingRegistry::new();
        assert_eq!(
            registry.keys_sorted(),
            vec![
                "default-model",
                "endpoint",
                "judge",
                "markdown",
                "open-previews",
                "recognizer",
                "speech-language",
                "syntax",
                "voice",
            ]
        );
        assert!(registry.get("theme").is_none());
    }

    #[test]
    fn lookup_accepts_config_file_spelling() {
        let registry = SettingRegistry::new();
        assert_eq!(
            registry.get("DEFAULT_MODEL").map(|h| h.key()),
            Some("default-model")
        );
        assert_eq!(
            registry.get("open_previews").map(|h| h.key()),
            Some("open-previews")
        );
    }

    #[test]
    fn every_handler_formats_the_default_config() {
        let registry = SettingRegistry::new();
        let config = Config::default();
        for handler in registry.handlers() {
            let line = handler.format(&config);
            assert!(line.trim_start().starts_with(handler.key()), "{line}");
        }
    }
}
