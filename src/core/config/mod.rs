pub mod data;
pub mod io;
pub mod orchestrator;

pub use data::{path_display, Config, JudgeSettings};
pub use io::ConfigError;

#[cfg(test)]
mod tests;
