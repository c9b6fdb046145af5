//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod model_list;
pub mod run;
pub mod say;
pub mod settings;

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::auth::{AuthManager, Service};
use crate::cli::model_list::list_models;
use crate::cli::run::run_file;
use crate::cli::say::run_say;
use crate::cli::settings::{describe_config, set_value, unset_value, SettingError, SettingRegistry};
use crate::core::builtin_models::{ModelId, DEFAULT_MODEL};
use crate::core::config::Config;
use crate::ui::chat_loop::run_chat;
use crate::utils::logging::init_tracing;

#[derive(Parser)]
#[command(name = "polychat")]
#[command(version)]
#[command(about = "A terminal chat client for hosted AI models")]
#[command(
    long_about = "polychat talks to several hosted models (Gemini, Mixtral on Groq, \
GPT-4o mini for images, and FLUX for image generation) from one terminal session. \
Code blocks in replies can be run remotely through Judge0, edited, saved, or \
previewed in the browser.\n\n\
Authentication:\n\
  Use 'polychat auth' to store API keys in your system keyring, or set\n\
  GEMINI_API_KEY, GROQ_API_KEY, GITHUB_TOKEN, HF_TOKEN and RAPIDAPI_KEY.\n\n\
In a chat session, type /help for the list of commands."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Model to use, or list available models if no model is given
    #[arg(short = 'm', long, global = true, value_name = "MODEL", num_args = 0..=1, default_missing_value = "")]
    pub model: Option<String>,

    /// Write diagnostics to the given file
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log: Option<PathBuf>,

    /// Read API keys from environment variables only, never the keyring
    #[arg(long, global = true)]
    pub env_only: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the chat interface (default)
    Chat,
    /// Send one prompt and print the reply
    Say {
        /// The prompt; multiple words are joined with spaces
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        prompt: Vec<String>,
        /// Attach an image to the prompt
        #[arg(short = 'i', long, value_name = "PATH")]
        image: Option<PathBuf>,
    },
    /// Run a source file through the code execution service
    Run {
        /// File to run; its extension picks the language
        file: PathBuf,
        /// Language tag to use instead of the file extension
        #[arg(long, value_name = "LANG")]
        language: Option<String>,
    },
    /// List the available models
    Models,
    /// Store an API key in the system keyring
    Auth {
        /// Service to store a key for (prompted if omitted)
        service: Option<String>,
    },
    /// Remove a stored API key
    Deauth {
        /// Service to remove the key for (prompted if omitted)
        service: Option<String>,
    },
    /// Set configuration values, or show them when no key is given
    Set {
        /// Configuration key to set
        key: Option<String>,
        /// Value to set for the key
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Unset configuration values
    Unset {
        /// Configuration key to unset
        key: String,
        /// Sub-key for keyed settings (e.g., the model for `endpoint`)
        value: Option<String>,
    },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(args.log.as_deref())?;

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(async_main(args))
}

/// The model for this run: `-m` wins over `default_model` in the config.
pub fn resolve_model(flag: Option<&str>, config: &Config) -> Result<ModelId, String> {
    match flag.filter(|value| !value.is_empty()) {
        Some(value) => value.parse(),
        None => match config.default_model.as_deref() {
            Some(value) => value.parse(),
            None => Ok(DEFAULT_MODEL),
        },
    }
}

fn parse_service(service: Option<String>) -> Result<Option<Service>, Box<dyn Error>> {
    Ok(service.map(|name| name.parse::<Service>()).transpose()?)
}

fn exit_with(message: impl std::fmt::Display) -> ! {
    eprintln!("❌ {message}");
    std::process::exit(1);
}

async fn async_main(args: Args) -> Result<(), Box<dyn Error>> {
    let Args {
        command,
        model,
        log: _,
        env_only,
    } = args;

    // `-m` with no value lists models, whatever the subcommand.
    if model.as_deref() == Some("") {
        return list_models(env_only);
    }

    match command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let config = Config::load()?;
            let model = resolve_model(model.as_deref(), &config).unwrap_or_else(|e| exit_with(e));
            run_chat(model, env_only).await
        }
        Commands::Say { prompt, image } => {
            run_say(prompt, image.as_deref(), model.as_deref(), env_only).await
        }
        Commands::Run { file, language } => {
            run_file(&file, language.as_deref(), env_only).await
        }
        Commands::Models => list_models(env_only),
        Commands::Auth { service } => {
            let auth_manager = AuthManager::new();
            if let Err(e) = auth_manager.interactive_auth(parse_service(service)?) {
                exit_with(format!("Authentication failed: {e}"));
            }
            Ok(())
        }
        Commands::Deauth { service } => {
            let auth_manager = AuthManager::new();
            if let Err(e) = auth_manager.interactive_deauth(parse_service(service)?) {
                exit_with(format!("Deauthentication failed: {e}"));
            }
            Ok(())
        }
        Commands::Set { key, value } => {
            let registry = SettingRegistry::new();
            let config = Config::load()?;
            let Some(key) = key else {
                println!("Current configuration:");
                for line in describe_config(&registry, &config) {
                    println!("{line}");
                }
                return Ok(());
            };
            report(set_value(&registry, &config, &key, &value));
            Ok(())
        }
        Commands::Unset { key, value } => {
            let registry = SettingRegistry::new();
            let config = Config::load()?;
            report(unset_value(&registry, &config, &key, value.as_deref()));
            Ok(())
        }
    }
}

/// Print a settings result, exiting non-zero on failure.
fn report(result: Result<String, SettingError>) {
    match result {
        Ok(message) => println!("{message}"),
        Err(err) => {
            err.print();
            std::process::exit(err.exit_code());
        }
    }
}
