pub mod app;
pub mod attachments;
pub mod builtin_models;
pub mod chat;
pub mod config;
pub mod keyring;
pub mod markdown;
pub mod message;
pub mod speech;
pub mod store;
