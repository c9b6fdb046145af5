use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::Utc;
use tracing::debug;

use super::{number_arg, usage_status};
use crate::commands::registry::CommandInvocation;
use crate::commands::CommandResult;
use crate::core::app::App;

const USAGE_SAVE: &str = "/save <block> [path]";
const USAGE_SAVE_IMAGE: &str = "/saveimage [n] [path]";
const USAGE_DUMP: &str = "/dump [path]";

/// Write `contents` to `path`. Default names never replace an existing file;
/// a path the user typed does.
fn write_file(path: &str, contents: &[u8], overwrite: bool) -> Result<(), String> {
    if !overwrite && Path::new(path).exists() {
        return Err(format!(
            "File '{path}' already exists. Please specify a different filename."
        ));
    }
    std::fs::write(path, contents).map_err(|err| format!("Cannot write {path}: {err}"))
}

pub(crate) fn handle_save(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let words = invocation.words();
    if words.is_empty() || words.len() > 2 {
        return usage_status(app, USAGE_SAVE);
    }
    let Some(number) = number_arg(app, words.first().copied(), USAGE_SAVE) else {
        return CommandResult::Continue;
    };
    let Some(block) = app.store.block_by_number(number) else {
        app.notify(format!("No code block #{number}"));
        return CommandResult::Continue;
    };

    let (path, overwrite) = match words.get(1) {
        Some(path) => (path.to_string(), true),
        None => (block.file_name(), false),
    };
    let source = block.source().to_string();
    match write_file(&path, source.as_bytes(), overwrite) {
        Ok(()) => app.notify(format!("Saved block #{number} to {path}")),
        Err(err) => app.notify(err),
    }
    CommandResult::Continue
}

pub(crate) fn handle_save_image(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let words = invocation.words();
    if words.len() > 2 {
        return usage_status(app, USAGE_SAVE_IMAGE);
    }

    // Without a number, pick the latest message that has an image.
    let index = match words.first() {
        Some(word) => match number_arg(app, Some(*word), USAGE_SAVE_IMAGE) {
            Some(number) => number - 1,
            None => return CommandResult::Continue,
        },
        None => match app
            .store
            .messages()
            .iter()
            .rposition(|message| message.generated_image().is_some())
        {
            Some(index) => index,
            None => {
                app.notify("No generated image to save");
                return CommandResult::Continue;
            }
        },
    };

    let Some(object) = app
        .store
        .messages()
        .get(index)
        .and_then(|message| message.generated_image())
    else {
        app.notify(format!("Message #{} has no generated image", index + 1));
        return CommandResult::Continue;
    };
    let Some(source) = app.store.objects().path(object) else {
        app.notify("The image is no longer available");
        return CommandResult::Continue;
    };
    let extension = source
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("png")
        .to_string();

    let (path, overwrite) = match words.get(1) {
        Some(path) => (path.to_string(), true),
        None => (
            format!(
                "polychat-image-{}.{extension}",
                Utc::now().format("%Y-%m-%d-%H%M%S")
            ),
            false,
        ),
    };
    let result = app
        .store
        .objects()
        .read(object)
        .map_err(|err| format!("Cannot read image: {err}"))
        .and_then(|bytes| write_file(&path, &bytes, overwrite));
    match result {
        Ok(()) => app.notify(format!("Saved image to {path}")),
        Err(err) => app.notify(err),
    }
    CommandResult::Continue
}

pub(crate) fn handle_dump(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let words = invocation.words();
    let result = match words.as_slice() {
        [] => {
            let timestamp = Utc::now().format("%Y-%m-%d").to_string();
            let filename = format!("polychat-log-{timestamp}.txt");
            dump_conversation_with_overwrite(app, &filename, false).map(|()| filename)
        }
        [filename] => dump_conversation_with_overwrite(app, filename, true)
            .map(|()| filename.to_string()),
        _ => return usage_status(app, USAGE_DUMP),
    };
    match result {
        Ok(filename) => app.notify(format!("Dumped: {filename}")),
        Err(err) => app.notify(format!("Dump error: {err}")),
    }
    CommandResult::Continue
}

pub fn dump_conversation_with_overwrite(
    app: &App,
    filename: &str,
    overwrite: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if app.store.messages().is_empty() {
        return Err("No conversation to dump - the chat history is empty.".into());
    }

    if !overwrite && Path::new(filename).exists() {
        return Err(format!(
            "File '{filename}' already exists. Please specify a different filename with /dump <filename>."
        )
        .into());
    }

    let file = File::create(filename)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(app.store.transcript().as_bytes())?;
    writer.flush()?;
    debug!(filename, messages = app.store.messages().len(), "dumped conversation");
    Ok(())
}
