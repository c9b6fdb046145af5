//! Errors from `polychat set` / `polychat unset`.

use std::fmt;

#[derive(Debug)]
pub enum SettingError {
    UnknownKey(String),
    UnknownModel { input: String },
    InvalidBoolean(String),
    /// A value that parsed but is out of range or malformed for `key`.
    InvalidValue {
        key: &'static str,
        input: String,
        expected: &'static str,
    },
    MissingArgs {
        hint: &'static str,
        example: &'static str,
    },
    /// Saving the config file failed.
    ConfigError(String),
}

impl SettingError {
    /// Follow-up line printed under the error, if any.
    pub fn advice(&self) -> Option<String> {
        match self {
            SettingError::UnknownKey(_) => {
                Some("Run 'polychat set' to list the available keys.".to_string())
            }
            SettingError::UnknownModel { .. } => {
                Some("Run 'polychat models' to list available models.".to_string())
            }
            SettingError::InvalidBoolean(_) => {
                Some("Use 'on' or 'off' (also accepts true/false, yes/no)".to_string())
            }
            SettingError::InvalidValue { expected, .. } => Some(format!("Expected {expected}")),
            SettingError::MissingArgs { example, .. } => Some(format!("Example: {example}")),
            SettingError::ConfigError(_) => None,
        }
    }

    pub fn print(&self) {
        let marker = match self {
            SettingError::MissingArgs { .. } => "⚠️ ",
            _ => "❌",
        };
        eprintln!("{marker} {self}");
        if let Some(advice) = self.advice() {
            eprintln!("   {advice}");
        }
    }

    /// 2 for usage mistakes, 1 for everything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            SettingError::UnknownKey(_) | SettingError::MissingArgs { .. } => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for SettingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingError::UnknownKey(key) => write!(f, "Unknown config key: {key}"),
            SettingError::UnknownModel { input } => write!(f, "Unknown model: {input}"),
            SettingError::InvalidBoolean(input) => write!(f, "Invalid boolean value: {input}"),
            SettingError::InvalidValue { key, input, .. } => {
                write!(f, "Invalid value for {key}: {input}")
            }
            SettingError::MissingArgs { hint, .. } => write!(f, "{hint}"),
            SettingError::ConfigError(msg) => write!(f, "Failed to save configuration: {msg}"),
        }
    }
}

impl std::error::Error for SettingError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_mistakes_exit_with_two() {
        assert_eq!(SettingError::UnknownKey("x".into()).exit_code(), 2);
        assert_eq!(SettingError::InvalidBoolean("x".into()).exit_code(), 1);
    }

    #[test]
    fn advice_points_at_the_fix() {
        let err = SettingError::InvalidValue {
            key: "judge",
            input: "max-attempts 0".into(),
            expected: "a positive whole number",
        };
        assert_eq!(err.to_string(), "Invalid value for judge: max-attempts 0");
        assert_eq!(err.advice().as_deref(), Some("Expected a positive whole number"));
        assert_eq!(SettingError::ConfigError("disk full".into()).advice(), None);
    }
}
