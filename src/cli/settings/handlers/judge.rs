//! Code execution service settings: `set judge <field> <value>`.

use crate::cli::settings::error::SettingError;
use crate::cli::settings::helpers::{mutate_config_with_message, success_set, success_unset};
use crate::cli::settings::{SetContext, SettingHandler};
use crate::core::config::data::{Config, JudgeSettings};
use crate::utils::url::is_http_url;

const FIELDS: [&str; 6] = [
    "base-url",
    "host",
    "cpu-time-limit",
    "memory-limit",
    "poll-interval-ms",
    "max-attempts",
];

const MISSING: SettingError = SettingError::MissingArgs {
    hint: "Specify a judge field (base-url, host, cpu-time-limit, memory-limit, poll-interval-ms, max-attempts) and a value:",
    example: "polychat set judge base-url http://localhost:2358",
};

/// A validated change to one field of [`JudgeSettings`].
#[derive(Debug, Clone, PartialEq, Eq)]
enum JudgeField {
    BaseUrl(String),
    Host(String),
    CpuTimeLimit(String),
    MemoryLimit(String),
    PollIntervalMs(u64),
    MaxAttempts(u32),
}

impl JudgeField {
    fn parse(field: &str, value: &str) -> Result<Self, SettingError> {
        let invalid = |expected: &'static str| SettingError::InvalidValue {
            key: "judge",
            input: format!("{field} {value}"),
            expected,
        };
        let number = |expected| {
            value
                .parse::<f64>()
                .ok()
                .filter(|n| *n > 0.0)
                .map(|_| value.to_string())
                .ok_or_else(|| invalid(expected))
        };

        match field {
            "base-url" if is_http_url(value) => Ok(Self::BaseUrl(value.to_string())),
            "base-url" => Err(invalid("an http:// or https:// URL")),
            // An empty host drops the X-RapidAPI-Host header.
            "host" => Ok(Self::Host(value.to_string())),
            "cpu-time-limit" => number("a positive number of seconds").map(Self::CpuTimeLimit),
            "memory-limit" => number("a positive number of kilobytes").map(Self::MemoryLimit),
            "poll-interval-ms" => value
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .map(Self::PollIntervalMs)
                .ok_or_else(|| invalid("a positive number of milliseconds")),
            "max-attempts" => value
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .map(Self::MaxAttempts)
                .ok_or_else(|| invalid("a positive whole number")),
            _ => Err(SettingError::UnknownKey(format!("judge {field}"))),
        }
    }

    fn apply(self, judge: &mut JudgeSettings) {
        match self {
            Self::BaseUrl(url) => judge.base_url = url,
            Self::Host(host) => judge.host = host,
            Self::CpuTimeLimit(limit) => judge.cpu_time_limit = limit,
            Self::MemoryLimit(limit) => judge.memory_limit = limit,
            Self::PollIntervalMs(ms) => judge.poll_interval_ms = ms,
            Self::MaxAttempts(n) => judge.max_attempts = n,
        }
    }
}

fn reset_field(field: &str, judge: &mut JudgeSettings) {
    let defaults = JudgeSettings::default();
    match field {
        "base-url" => judge.base_url = defaults.base_url,
        "host" => judge.host = defaults.host,
        "cpu-time-limit" => judge.cpu_time_limit = defaults.cpu_time_limit,
        "memory-limit" => judge.memory_limit = defaults.memory_limit,
        "poll-interval-ms" => judge.poll_interval_ms = defaults.poll_interval_ms,
        "max-attempts" => judge.max_attempts = defaults.max_attempts,
        _ => *judge = defaults,
    }
}

/// Handler for the `judge` setting group.
pub struct JudgeHandler;

impl SettingHandler for JudgeHandler {
    fn key(&self) -> &'static str {
        "judge"
    }

    fn set(&self, args: &[String], _ctx: &mut SetContext<'_>) -> Result<String, SettingError> {
        let Some((field, rest)) = args.split_first() else {
            return Err(MISSING);
        };
        let value = rest.join(" ").trim().to_string();
        if value.is_empty() && field != "host" {
            return Err(MISSING);
        }

        let change = JudgeField::parse(field, &value)?;
        let message = success_set(&format!("judge {field}"), &value);
        mutate_config_with_message(
            move |config| {
                change.apply(&mut config.judge);
                Ok(())
            },
            message,
        )
    }

    /// `unset judge <field>` restores one field; `unset judge` restores all.
    fn unset(&self, args: Option<&str>, _ctx: &mut SetContext<'_>) -> Result<String, SettingError> {
        let field = args.unwrap_or("").trim().to_string();
        if !field.is_empty() && !FIELDS.contains(&field.as_str()) {
            return Err(SettingError::UnknownKey(format!("judge {field}")));
        }
        let message = if field.is_empty() {
            success_unset("judge")
        } else {
            success_unset(&format!("judge {field}"))
        };
        mutate_config_with_message(
            move |config| {
                reset_field(&field, &mut config.judge);
                Ok(())
            },
            message,
        )
    }

    fn format(&self, config: &Config) -> String {
        let judge = &config.judge;
        let host = if judge.host.is_empty() {
            "(none)"
        } else {
            judge.host.as_str()
        };
        format!(
            "  judge:\n    base-url: {}\n    host: {host}\n    cpu-time-limit: {}\n    memory-limit: {}\n    poll-interval-ms: {}\n    max-attempts: {}",
            judge.base_url,
            judge.cpu_time_limit,
            judge.memory_limit,
            judge.poll_interval_ms,
            judge.max_attempts
        )
    }
}
