//! polychat is a terminal chat client for hosted AI models, with a
//! run/edit/preview loop for the code blocks in their replies.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the chat store, attachments, model selection, the
//!   request/reply cycle, speech playback, and configuration.
//! - [`exec`] detects block languages, submits code to the execution service,
//!   polls it to completion, and renders results or preview documents.
//! - [`api`] defines the wire payloads and thin HTTP clients for Gemini,
//!   OpenAI-compatible chat completions, FLUX and Judge0.
//! - [`commands`] implements slash-command parsing and execution used by the
//!   chat loop.
//! - [`ui`] renders transcript entries for the terminal and runs the
//!   interactive session.
//! - [`auth`] resolves API keys from the environment or the system keyring.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`], which dispatches into [`ui::chat_loop`] for
//! interactive sessions.

pub mod api;
pub mod auth;
pub mod cli;
pub mod commands;
pub mod core;
pub mod exec;
pub mod ui;
pub mod utils;
