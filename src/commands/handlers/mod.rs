pub(super) mod code;
pub(super) mod core;
pub(super) mod io;
pub(super) mod media;

use crate::commands::CommandResult;
use crate::core::app::App;

pub(super) fn usage_status(app: &mut App, usage: &'static str) -> CommandResult {
    app.notify(format!("Usage: {usage}"));
    CommandResult::Continue
}

/// Parse a 1-based number argument, reporting `usage` when it is missing.
pub(super) fn number_arg(app: &mut App, arg: Option<&str>, usage: &'static str) -> Option<usize> {
    match arg.map(str::parse::<usize>) {
        Some(Ok(number)) if number > 0 => Some(number),
        Some(_) => {
            app.notify(format!("Not a valid number: {}", arg.unwrap_or_default()));
            None
        }
        None => {
            app.notify(format!("Usage: {usage}"));
            None
        }
    }
}
