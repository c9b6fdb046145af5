use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::exec::poll::PollConfig;

pub const DEFAULT_JUDGE_URL: &str = "https://judge0-ce.p.rapidapi.com";
pub const DEFAULT_JUDGE_HOST: &str = "judge0-ce.p.rapidapi.com";

/// Connection details and limits for the code execution service.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct JudgeSettings {
    pub base_url: String,
    /// Value of the `X-RapidAPI-Host` header; left out when empty.
    pub host: String,
    /// CPU seconds, sent as a string.
    pub cpu_time_limit: String,
    /// Kilobytes, sent as a string.
    pub memory_limit: String,
    pub poll_interval_ms: u64,
    pub max_attempts: u32,
}

impl Default for JudgeSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_JUDGE_URL.to_string(),
            host: DEFAULT_JUDGE_HOST.to_string(),
            cpu_time_limit: "8".to_string(),
            memory_limit: "256000".to_string(),
            poll_interval_ms: 1000,
            max_attempts: 10,
        }
    }
}

impl JudgeSettings {
    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(self.poll_interval_ms),
            max_attempts: self.max_attempts.max(1),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    /// Model selected at startup (e.g., "gemini", "flux-ai")
    pub default_model: Option<String>,
    /// Enable markdown rendering in the chat area
    pub markdown: Option<bool>,
    /// Enable syntax highlighting for fenced code blocks when markdown is enabled
    pub syntax: Option<bool>,
    /// BCP 47 tag used for speech, e.g. "en-US"
    pub speech_language: Option<String>,
    /// Voice name handed to the speech synthesizer
    pub voice: Option<String>,
    /// Open preview documents in the system browser as soon as they render
    pub open_previews: Option<bool>,
    /// External command that records speech and prints a transcript
    pub recognizer_command: Option<String>,
    #[serde(default)]
    pub judge: JudgeSettings,
    /// Per-model endpoint overrides
    /// Key: model id (e.g., "mixtral")
    /// Value: full request URL
    #[serde(default)]
    pub endpoints: HashMap<String, String>,
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}

impl Config {
    pub fn markdown_enabled(&self) -> bool {
        self.markdown.unwrap_or(true)
    }

    pub fn syntax_enabled(&self) -> bool {
        self.syntax.unwrap_or(true)
    }

    pub fn open_previews_enabled(&self) -> bool {
        self.open_previews.unwrap_or(true)
    }

    pub fn speech_language(&self) -> &str {
        self.speech_language.as_deref().unwrap_or("en-US")
    }

    pub fn endpoint_override(&self, model_id: &str) -> Option<&str> {
        self.endpoints
            .get(&model_id.to_lowercase())
            .or_else(|| self.endpoints.get(model_id))
            .map(String::as_str)
            .filter(|url| !url.trim().is_empty())
    }

    pub fn set_endpoint(&mut self, model_id: &str, url: String) {
        self.endpoints.insert(model_id.to_lowercase(), url);
    }

    pub fn unset_endpoint(&mut self, model_id: &str) {
        let normalized = model_id.to_lowercase();
        self.endpoints.remove(&normalized);
        if normalized != model_id {
            self.endpoints.remove(model_id);
        }
    }
}
