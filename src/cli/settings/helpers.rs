//! Helper functions for settings operations.

use crate::core::builtin_models::ModelId;
use crate::core::config::data::Config;

use super::error::SettingError;

/// Wrapper around `Config::mutate` that maps errors to `SettingError::ConfigError`.
pub fn mutate_config<F>(f: F) -> Result<(), SettingError>
where
    F: FnOnce(&mut Config) -> Result<(), Box<dyn std::error::Error>>,
{
    Config::mutate(f).map_err(|e| SettingError::ConfigError(e.to_string()))
}

/// Apply `f` and return `message` once the config has been saved.
pub fn mutate_config_with_message<F>(f: F, message: String) -> Result<String, SettingError>
where
    F: FnOnce(&mut Config) -> Result<(), Box<dyn std::error::Error>>,
{
    mutate_config(f)?;
    Ok(message)
}

pub fn success_set(key: &str, value: &str) -> String {
    format!("✅ Set {key} to: {value}")
}

pub fn success_unset(key: &str) -> String {
    format!("✅ Unset {key}")
}

/// Parse a boolean value from user input.
///
/// Accepts: on/off, true/false, yes/no (case-insensitive).
pub fn parse_bool(input: &str) -> Option<bool> {
    match input.to_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Some(true),
        "off" | "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

/// Format a boolean value for display.
pub fn format_bool(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

/// Validate and resolve a model identifier, accepting the usual aliases.
pub fn validate_model(input: &str) -> Result<ModelId, SettingError> {
    input.parse::<ModelId>().map_err(|_| SettingError::UnknownModel {
        input: input.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booleans_accept_common_spellings() {
        for on in ["on", "TRUE", "yes", "1"] {
            assert_eq!(parse_bool(on), Some(true));
        }
        for off in ["off", "False", "no", "0"] {
            assert_eq!(parse_bool(off), Some(false));
        }
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn models_resolve_through_aliases() {
        assert_eq!(validate_model("flux").unwrap(), ModelId::FluxAi);
        assert!(matches!(
            validate_model("llama"),
            Err(SettingError::UnknownModel { .. })
        ));
    }
}
