//! Diagnostic logging setup.
//!
//! Diagnostics go to the file given with `--log`, or to stderr at `warn`
//! when no file is given so they do not interleave with the conversation.
//! `RUST_LOG` overrides the default filter either way.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

const FILE_FILTER: &str = "polychat=debug,info";
const STDERR_FILTER: &str = "warn";

fn filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

fn open_log_file(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Install the global subscriber. Calling it again is a no-op.
pub fn init_tracing(log_file: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match log_file {
        Some(path) => {
            let file = open_log_file(path)
                .map_err(|err| format!("Cannot open log file {}: {err}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter(FILE_FILTER))
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .ok();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter(STDERR_FILTER))
                .with_target(false)
                .with_writer(std::io::stderr)
                .try_init()
                .ok();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn log_file_is_created_on_init() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("polychat.log");
        init_tracing(Some(&path)).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn unwritable_log_path_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("polychat.log");
        let err = init_tracing(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("Cannot open log file"));
    }
}
