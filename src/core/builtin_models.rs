//! Built-in model configuration
//!
//! The table of selectable models ships inside the binary as
//! `builtin_models.toml` and is parsed once on first use.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use serde::Deserialize;

use crate::auth::Service;
use crate::core::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum ModelId {
    Gemini,
    Mixtral,
    Gpt4oMini,
    FluxAi,
}

pub const DEFAULT_MODEL: ModelId = ModelId::Gemini;

impl ModelId {
    pub const ALL: [ModelId; 4] = [
        ModelId::Gemini,
        ModelId::Mixtral,
        ModelId::Gpt4oMini,
        ModelId::FluxAi,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ModelId::Gemini => "gemini",
            ModelId::Mixtral => "mixtral",
            ModelId::Gpt4oMini => "gpt-4o-mini",
            ModelId::FluxAi => "flux-ai",
        }
    }

    pub fn info(self) -> &'static BuiltinModel {
        find_builtin_model(self)
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelId {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase();
        let alias = match normalized.as_str() {
            "flux" => "flux-ai",
            "gpt-4o" | "gpt4o-mini" | "vision" => "gpt-4o-mini",
            "groq" => "mixtral",
            other => other,
        };
        ModelId::ALL
            .into_iter()
            .find(|id| id.as_str() == alias)
            .ok_or_else(|| {
                let known: Vec<&str> = ModelId::ALL.iter().map(|id| id.as_str()).collect();
                format!("Unknown model '{value}'. Available: {}", known.join(", "))
            })
    }
}

impl TryFrom<String> for ModelId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// What a model produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Text,
    Vision,
    Image,
}

/// Wire protocol spoken by the model's endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelApi {
    Gemini,
    ChatCompletions,
    Flux,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct Sampling {
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub max_tokens: Option<u32>,
    pub frequency_penalty: Option<f64>,
    pub presence_penalty: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuiltinModel {
    pub id: ModelId,
    pub display_name: String,
    pub kind: ModelKind,
    pub api: ModelApi,
    pub service: Service,
    pub endpoint: String,
    pub remote_model: Option<String>,
    pub system_prompt: Option<String>,
    pub vision_system_prompt: Option<String>,
    #[serde(default)]
    pub sampling: Sampling,
}

impl BuiltinModel {
    /// The configured override for this model, or the built-in endpoint.
    pub fn endpoint_for<'a>(&'a self, config: &'a Config) -> &'a str {
        config
            .endpoint_override(self.id.as_str())
            .unwrap_or(&self.endpoint)
    }

    pub fn accepts_images(&self) -> bool {
        self.kind == ModelKind::Vision
    }
}

#[derive(Debug, Deserialize)]
struct BuiltinModelsConfig {
    models: Vec<BuiltinModel>,
}

const CONFIG_CONTENT: &str = include_str!("../builtin_models.toml");

static BUILTIN_MODELS: LazyLock<Vec<BuiltinModel>> = LazyLock::new(|| {
    // The table is compiled in; a parse failure is a build defect caught by tests.
    let config: BuiltinModelsConfig =
        toml::from_str(CONFIG_CONTENT).expect("Failed to parse builtin_models.toml");
    config.models
});

pub fn load_builtin_models() -> &'static [BuiltinModel] {
    &BUILTIN_MODELS
}

/// Every [`ModelId`] has exactly one entry in the embedded table.
pub fn find_builtin_model(id: ModelId) -> &'static BuiltinModel {
    BUILTIN_MODELS
        .iter()
        .find(|model| model.id == id)
        .unwrap_or_else(|| panic!("builtin_models.toml has no entry for {id}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_model_id_has_an_entry() {
        assert_eq!(load_builtin_models().len(), ModelId::ALL.len());
        for id in ModelId::ALL {
            assert_eq!(find_builtin_model(id).id, id);
        }
    }

    #[test]
    fn mixtral_carries_its_sampling_parameters() {
        let mixtral = ModelId::Mixtral.info();
        assert_eq!(mixtral.api, ModelApi::ChatCompletions);
        assert_eq!(mixtral.service, Service::Groq);
        assert_eq!(mixtral.remote_model.as_deref(), Some("mixtral-8x7b-32768"));
        assert_eq!(mixtral.sampling.temperature, Some(0.9));
        assert_eq!(mixtral.sampling.presence_penalty, Some(0.5));
    }

    #[test]
    fn only_the_vision_model_accepts_images() {
        let accepting: Vec<ModelId> = ModelId::ALL
            .into_iter()
            .filter(|id| id.info().accepts_images())
            .collect();
        assert_eq!(accepting, vec![ModelId::Gpt4oMini]);
    }

    #[test]
    fn model_names_parse_with_aliases() {
        assert_eq!("Flux".parse::<ModelId>().unwrap(), ModelId::FluxAi);
        assert_eq!("gpt-4o".parse::<ModelId>().unwrap(), ModelId::Gpt4oMini);
        assert!("llama".parse::<ModelId>().is_err());
    }

    #[test]
    fn endpoint_overrides_take_precedence() {
        let mut config = Config::default();
        let gemini = ModelId::Gemini.info();
        assert!(gemini.endpoint_for(&config).starts_with("https://generativelanguage"));

        config.set_endpoint("gemini", "http://127.0.0.1:1/gen".to_string());
        assert_eq!(gemini.endpoint_for(&config), "http://127.0.0.1:1/gen");
    }
}
