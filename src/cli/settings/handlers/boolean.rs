//! On/off settings.

use crate::cli::settings::error::SettingError;
use crate::cli::settings::helpers::{format_bool, mutate_config_with_message, parse_bool};
use crate::cli::settings::{SetContext, SettingHandler};
use crate::core::config::data::Config;

/// A boolean config field. Every flag defaults to on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    Markdown,
    Syntax,
    OpenPreviews,
}

impl Flag {
    pub const ALL: [Flag; 3] = [Flag::Markdown, Flag::Syntax, Flag::OpenPreviews];

    pub fn key(self) -> &'static str {
        match self {
            Flag::Markdown => "markdown",
            Flag::Syntax => "syntax",
            Flag::OpenPreviews => "open-previews",
        }
    }

    fn noun(self) -> &'static str {
        match self {
            Flag::Markdown => "Markdown rendering",
            Flag::Syntax => "Syntax highlighting",
            Flag::OpenPreviews => "Opening previews in the browser",
        }
    }

    fn example(self) -> &'static str {
        match self {
            Flag::Markdown => "polychat set markdown off",
            Flag::Syntax => "polychat set syntax toggle",
            Flag::OpenPreviews => "polychat set open-previews off",
        }
    }

    fn stored(self, config: &Config) -> Option<bool> {
        match self {
            Flag::Markdown => config.markdown,
            Flag::Syntax => config.syntax,
            Flag::OpenPreviews => config.open_previews,
        }
    }

    fn slot(self, config: &mut Config) -> &mut Option<bool> {
        match self {
            Flag::Markdown => &mut config.markdown,
            Flag::Syntax => &mut config.syntax,
            Flag::OpenPreviews => &mut config.open_previews,
        }
    }

    fn effective(self, config: &Config) -> bool {
        self.stored(config).unwrap_or(true)
    }
}

/// Handler for one [`Flag`]. Accepts on/off spellings or `toggle`.
pub struct FlagHandler(pub Flag);

impl FlagHandler {
    /// The value `set` would store for `args`, given the current config.
    pub fn resolve(&self, args: &[String], config: &Config) -> Result<bool, SettingError> {
        let flag = self.0;
        match args {
            [] => Err(SettingError::MissingArgs {
                hint: "Specify on, off or toggle:",
                example: flag.example(),
            }),
            [word] if word.eq_ignore_ascii_case("toggle") => Ok(!flag.effective(config)),
            _ => {
                let input = args.join(" ");
                parse_bool(&input).ok_or(SettingError::InvalidBoolean(input))
            }
        }
    }
}

impl SettingHandler for FlagHandler {
    fn key(&self) -> &'static str {
        self.0.key()
    }

    fn set(&self, args: &[String], ctx: &mut SetContext<'_>) -> Result<String, SettingError> {
        let flag = self.0;
        let value = self.resolve(args, ctx.config)?;
        mutate_config_with_message(
            move |config| {
                *flag.slot(config) = Some(value);
                Ok(())
            },
            format!("✅ {} is now {}", flag.noun(), format_bool(value)),
        )
    }

    fn unset(&self, _args: Option<&str>, _ctx: &mut SetContext<'_>) -> Result<String, SettingError> {
        let flag = self.0;
        mutate_config_with_message(
            move |config| {
                *flag.slot(config) = None;
                Ok(())
            },
            format!("✅ Unset {} (back to on)", flag.key()),
        )
    }

    fn format(&self, config: &Config) -> String {
        let flag = self.0;
        let value = format_bool(flag.effective(config));
        match flag.stored(config) {
            Some(_) => format!("  {}: {value}", flag.key()),
            None => format!("  {}: {value} (default)", flag.key()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn values_and_toggle_resolve_against_the_config() {
        let handler = FlagHandler(Flag::Markdown);
        let mut config = Config::default();
        assert!(!handler.resolve(&args(&["OFF"]), &config).unwrap());
        assert!(!handler.resolve(&args(&["toggle"]), &config).unwrap());

        config.markdown = Some(false);
        assert!(handler.resolve(&args(&["toggle"]), &config).unwrap());

        assert!(matches!(
            handler.resolve(&[], &config),
            Err(SettingError::MissingArgs { .. })
        ));
        assert!(matches!(
            handler.resolve(&args(&["sometimes"]), &config),
            Err(SettingError::InvalidBoolean(input)) if input == "sometimes"
        ));
    }

    #[test]
    fn format_marks_defaults() {
        let handler = FlagHandler(Flag::OpenPreviews);
        let mut config = Config::default();
        assert_eq!(handler.format(&config), "  open-previews: on (default)");
        config.open_previews = Some(false);
        assert_eq!(handler.format(&config), "  open-previews: off");
    }

    #[test]
    fn slots_write_the_matching_field() {
        let mut config = Config::default();
        for flag in Flag::ALL {
            *flag.slot(&mut config) = Some(false);
        }
        assert!(!config.markdown_enabled());
        assert!(!config.syntax_enabled());
        assert!(!config.open_previews_enabled());
    }
}
