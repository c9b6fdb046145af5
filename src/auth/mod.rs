//! API keys for the hosted services: environment variables first, then the
//! system keyring.

use crate::core::keyring::{KeyringAccessError, SharedKeyringAccessError};
use keyring::Entry;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, OnceLock};
use tracing::{debug, warn};

mod ui;

use self::ui::{
    prompt_confirmation, prompt_service_menu, prompt_token, ConfirmationChoice, MenuSelection,
    ServiceMenuItem, UiError,
};

const KEYRING_SERVICE: &str = "polychat";

/// A hosted service that needs its own API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    Gemini,
    Groq,
    Github,
    Huggingface,
    Rapidapi,
}

impl Service {
    pub const ALL: [Service; 5] = [
        Service::Gemini,
        Service::Groq,
        Service::Github,
        Service::Huggingface,
        Service::Rapidapi,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Service::Gemini => "gemini",
            Service::Groq => "groq",
            Service::Github => "github",
            Service::Huggingface => "huggingface",
            Service::Rapidapi => "rapidapi",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Service::Gemini => "Google Gemini",
            Service::Groq => "Groq",
            Service::Github => "GitHub Models",
            Service::Huggingface => "Hugging Face Inference",
            Service::Rapidapi => "RapidAPI (code execution)",
        }
    }

    pub fn env_var(self) -> &'static str {
        match self {
            Service::Gemini => "GEMINI_API_KEY",
            Service::Groq => "GROQ_API_KEY",
            Service::Github => "GITHUB_TOKEN",
            Service::Huggingface => "HF_TOKEN",
            Service::Rapidapi => "RAPIDAPI_KEY",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Service {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase();
        let alias = match normalized.as_str() {
            "google" => "gemini",
            "hf" => "huggingface",
            "judge0" | "judge" => "rapidapi",
            other => other,
        };
        Service::ALL
            .into_iter()
            .find(|service| service.id() == alias)
            .ok_or_else(|| {
                let known: Vec<&str> = Service::ALL.iter().map(|s| s.id()).collect();
                format!(
                    "Unknown service '{value}'. Known services: {}",
                    known.join(", ")
                )
            })
    }
}

/// Resolved keys for every service that has one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    keys: HashMap<Service, String>,
}

impl Credentials {
    pub fn get(&self, service: Service) -> Option<&str> {
        self.keys.get(&service).map(String::as_str)
    }

    pub fn insert(&mut self, service: Service, key: impl Into<String>) {
        self.keys.insert(service, key.into());
    }

    pub fn with(mut self, service: Service, key: impl Into<String>) -> Self {
        self.insert(service, key);
        self
    }
}

#[derive(Clone, Debug)]
enum KeyringCacheEntry {
    Present(String),
    Missing,
    Error(SharedKeyringAccessError),
}

fn token_cache() -> MutexGuard<'static, HashMap<Service, KeyringCacheEntry>> {
    static CACHE: OnceLock<Mutex<HashMap<Service, KeyringCacheEntry>>> = OnceLock::new();
    CACHE
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct AuthManager {
    use_keyring: bool,
}

impl AuthManager {
    pub fn new() -> Self {
        Self::new_with_keyring(true)
    }

    /// Construct an AuthManager, optionally disabling keyring access (`--env-only`, tests)
    pub fn new_with_keyring(use_keyring: bool) -> Self {
        Self { use_keyring }
    }

    pub fn store_token(&self, service: Service, token: &str) -> Result<(), KeyringAccessError> {
        if !self.use_keyring {
            return Ok(());
        }
        let entry = Entry::new(KEYRING_SERVICE, service.id())?;
        entry.set_password(token)?;
        token_cache().insert(service, KeyringCacheEntry::Present(token.to_string()));
        Ok(())
    }

    pub fn get_token(&self, service: Service) -> Result<Option<String>, SharedKeyringAccessError> {
        if !self.use_keyring {
            return Ok(None);
        }
        if let Some(cached) = token_cache().get(&service).cloned() {
            return match cached {
                KeyringCacheEntry::Present(token) => Ok(Some(token)),
                KeyringCacheEntry::Missing => Ok(None),
                KeyringCacheEntry::Error(err) => Err(err),
            };
        }

        let lookup = Entry::new(KEYRING_SERVICE, service.id()).and_then(|entry| entry.get_password());
        let (entry, result) = match lookup {
            Ok(token) => (
                KeyringCacheEntry::Present(token.clone()),
                Ok(Some(token)),
            ),
            Err(keyring::Error::NoEntry) => (KeyringCacheEntry::Missing, Ok(None)),
            Err(err) => {
                let shared = SharedKeyringAccessError::new(KeyringAccessError::from(err));
                (KeyringCacheEntry::Error(shared.clone()), Err(shared))
            }
        };
        debug!(service = %service, found = matches!(entry, KeyringCacheEntry::Present(_)), "keyring lookup");
        token_cache().insert(service, entry);
        result
    }

    pub fn remove_token(&self, service: Service) -> Result<bool, KeyringAccessError> {
        if !self.use_keyring {
            return Ok(false);
        }
        let entry = Entry::new(KEYRING_SERVICE, service.id())?;
        let removed = match entry.delete_credential() {
            Ok(()) => true,
            Err(keyring::Error::NoEntry) => false,
            Err(err) => return Err(err.into()),
        };
        token_cache().insert(service, KeyringCacheEntry::Missing);
        Ok(removed)
    }

    /// Key for `service`: a non-empty environment variable wins, then the
    /// keyring. Keyring failures are logged and treated as a missing key.
    pub fn resolve_key_with<F>(&self, service: Service, env: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = env(service.env_var()).filter(|v| !v.trim().is_empty()) {
            return Some(value.trim().to_string());
        }
        match self.get_token(service) {
            Ok(token) => token,
            Err(err) => {
                warn!(service = %service, recoverable = err.is_recoverable(), "{}", err.hint_for(service));
                None
            }
        }
    }

    pub fn resolve_key(&self, service: Service) -> Option<String> {
        self.resolve_key_with(service, |name| std::env::var(name).ok())
    }

    pub fn credentials(&self) -> Credentials {
        let mut credentials = Credentials::default();
        for service in Service::ALL {
            if let Some(key) = self.resolve_key(service) {
                credentials.insert(service, key);
            }
        }
        credentials
    }

    fn menu_items(&self) -> Vec<ServiceMenuItem> {
        Service::ALL
            .into_iter()
            .map(|service| ServiceMenuItem {
                id: service.id().to_string(),
                display_name: service.display_name().to_string(),
                configured: matches!(self.get_token(service), Ok(Some(_))),
            })
            .collect()
    }

    fn pick_service(&self, title: &str, service: Option<Service>) -> Result<Option<Service>, UiError> {
        if service.is_some() {
            return Ok(service);
        }
        match prompt_service_menu(title, &self.menu_items())? {
            MenuSelection::Service(index) => Ok(Service::ALL.get(index).copied()),
            MenuSelection::Cancel => Ok(None),
        }
    }

    pub fn interactive_auth(&self, service: Option<Service>) -> Result<(), Box<dyn std::error::Error>> {
        let Some(service) = self.pick_service("🔐 polychat authentication setup", service)? else {
            println!("Cancelled.");
            return Ok(());
        };
        let token = prompt_token(service.display_name())?;
        self.store_token(service, &token)?;
        println!("✓ Key stored securely for {}", service.display_name());
        println!("You can now use polychat without setting {}.", service.env_var());
        Ok(())
    }

    pub fn interactive_deauth(
        &self,
        service: Option<Service>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let Some(service) = self.pick_service("🗑️  polychat authentication removal", service)? else {
            println!("Cancelled.");
            return Ok(());
        };
        let question = format!(
            "Are you sure you want to remove the key for {}?",
            service.display_name()
        );
        if prompt_confirmation(&question)? != ConfirmationChoice::Yes {
            println!("Cancelled.");
            return Ok(());
        }
        if self.remove_token(service)? {
            println!("✅ Key removed for {}", service.display_name());
        } else {
            println!("No stored key for {}", service.display_name());
        }
        Ok(())
    }
}

impl Default for AuthManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_names_parse_with_aliases() {
        assert_eq!("GEMINI".parse::<Service>().unwrap(), Service::Gemini);
        assert_eq!("hf".parse::<Service>().unwrap(), Service::Huggingface);
        assert_eq!("judge0".parse::<Service>().unwrap(), Service::Rapidapi);
        let err = "openai".parse::<Service>().unwrap_err();
        assert!(err.contains("Known services"));
    }

    #[test]
    fn environment_wins_and_blank_values_are_ignored() {
        let manager = AuthManager::new_with_keyring(false);
        let key = manager.resolve_key_with(Service::Groq, |name| {
            (name == "GROQ_API_KEY").then(|| " gsk-123 ".to_string())
        });
        assert_eq!(key.as_deref(), Some("gsk-123"));

        let blank = manager.resolve_key_with(Service::Groq, |_| Some("   ".to_string()));
        assert_eq!(blank, None);
    }

    #[test]
    fn disabled_keyring_stores_nothing() {
        let manager = AuthManager::new_with_keyring(false);
        manager.store_token(Service::Gemini, "abc").unwrap();
        assert_eq!(manager.get_token(Service::Gemini).unwrap(), None);
        assert!(!manager.remove_token(Service::Gemini).unwrap());
    }

    #[test]
    fn credentials_builder_collects_keys() {
        let credentials = Credentials::default()
            .with(Service::Huggingface, "hf_1")
            .with(Service::Rapidapi, "rk");
        assert_eq!(credentials.get(Service::Huggingface), Some("hf_1"));
        assert_eq!(credentials.get(Service::Gemini), None);
    }
}
