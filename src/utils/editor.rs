//! External editor integration
//!
//! Code blocks and messages can be edited in `$EDITOR`; the edited text
//! comes back as a new revision.

use std::error::Error;
use std::fs;
use std::io::Write;
use std::process::Command;

#[derive(Debug, PartialEq, Eq)]
pub enum EditOutcome {
    Edited(String),
    Unchanged,
    /// The editor failed or left the file empty.
    Aborted(String),
}

fn editor_command() -> Option<String> {
    ["VISUAL", "EDITOR"]
        .into_iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.trim().is_empty())
}

/// Open `initial` in the user's editor using a temp file ending in
/// `.{extension}` so editors pick the right syntax mode.
pub fn edit_text(initial: &str, extension: &str) -> Result<EditOutcome, Box<dyn Error>> {
    let Some(editor) = editor_command() else {
        return Ok(EditOutcome::Aborted(
            "No EDITOR environment variable set. Please set EDITOR to your preferred text editor (e.g., export EDITOR=nano).".to_string(),
        ));
    };

    let mut temp_file = tempfile::Builder::new()
        .prefix("polychat-")
        .suffix(&format!(".{extension}"))
        .tempfile()?;
    temp_file.write_all(initial.as_bytes())?;
    temp_file.flush()?;

    // EDITOR may carry arguments, e.g. "code --wait".
    let mut parts = editor.split_whitespace();
    let program = parts.next().unwrap_or_default();
    let status = Command::new(program)
        .args(parts)
        .arg(temp_file.path())
        .status()?;

    if !status.success() {
        return Ok(EditOutcome::Aborted(format!(
            "Editor exited with non-zero status: {status}"
        )));
    }

    let content = fs::read_to_string(temp_file.path())?;
    Ok(classify_edit(initial, &content))
}

fn classify_edit(initial: &str, edited: &str) -> EditOutcome {
    let edited = edited.trim_end();
    if edited.trim().is_empty() {
        EditOutcome::Aborted("Editor file was empty - nothing changed.".to_string())
    } else if edited == initial.trim_end() {
        EditOutcome::Unchanged
    } else {
        EditOutcome::Edited(edited.to_string())
    }
}
