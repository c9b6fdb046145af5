//! `polychat set` / `polychat unset`.
//!
//! Each config key has one [`SettingHandler`]; the [`SettingRegistry`] maps
//! keys to handlers. Handler families live under [`handlers`]: on/off flags,
//! free text, the default model, per-model endpoints and the `judge` group.

pub mod error;
pub mod handlers;
pub mod helpers;
pub mod registry;

pub use error::SettingError;
pub use registry::SettingRegistry;

use crate::core::config::data::Config;

/// What a handler may read while validating input.
pub struct SetContext<'a> {
    pub config: &'a Config,
}

/// One configuration key.
pub trait SettingHandler: Send + Sync {
    fn key(&self) -> &'static str;

    /// Validate `args` (everything after the key) and persist the new value.
    /// Returns the confirmation to print.
    fn set(&self, args: &[String], ctx: &mut SetContext<'_>) -> Result<String, SettingError>;

    /// Clear the value. `args` is the optional sub-key, such as the model
    /// for `unset endpoint <model>`.
    fn unset(&self, args: Option<&str>, ctx: &mut SetContext<'_>) -> Result<String, SettingError>;

    /// The line(s) shown for this key by a bare `polychat set`.
    fn format(&self, config: &Config) -> String;
}

/// Every key's current value, in registration order.
pub fn describe_config(registry: &SettingRegistry, config: &Config) -> Vec<String> {
    registry
        .handlers()
        .map(|handler| handler.format(config))
        .collect()
}

/// Look up `key` and set it from `args`.
pub fn set_value(
    registry: &SettingRegistry,
    config: &Config,
    key: &str,
    args: &[String],
) -> Result<String, SettingError> {
    let handler = registry
        .get(key)
        .ok_or_else(|| SettingError::UnknownKey(key.to_string()))?;
    handler.set(args, &mut SetContext { config })
}

/// Look up `key` and clear it.
pub fn unset_value(
    registry: &SettingRegistry,
    config: &Config,
    key: &str,
    sub_key: Option<&str>,
) -> Result<String, SettingError> {
    let handler = registry
        .get(key)
        .ok_or_else(|| SettingError::UnknownKey(key.to_string()))?;
    handler.unset(sub_key, &mut SetContext { config })
}
