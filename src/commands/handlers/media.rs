use std::path::Path;

use tracing::info;

use super::usage_status;
use crate::commands::registry::CommandInvocation;
use crate::commands::CommandResult;
use crate::core::app::App;
use crate::core::attachments::PendingImage;
use crate::core::chat::IMAGE_PROMPT;
use crate::core::markdown::{extract_tables, youtube_links};

const USAGE_IMAGE: &str = "/image <path>";
const USAGE_UPLOAD: &str = "/upload <path>";

/// Load and validate the image at `args` and make it the pending attachment.
fn attach(app: &mut App, args: &str, usage: &'static str) -> bool {
    if args.is_empty() {
        usage_status(app, usage);
        return false;
    }
    match PendingImage::load(Path::new(args)) {
        Ok(image) => {
            info!(name = %image.name, bytes = image.bytes.len(), "image attached");
            let name = image.name.clone();
            match app.store.attach_image(image) {
                Some(previous) => app.notify(format!("Attached {name} (replacing {})", previous.name)),
                None => app.notify(format!("Attached {name}")),
            }
            app.store.clear_error();
            true
        }
        Err(err) => {
            app.store.set_error(err.to_string());
            app.notify(err.to_string());
            false
        }
    }
}

pub(crate) fn handle_image(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    attach(app, invocation.args, USAGE_IMAGE);
    CommandResult::Continue
}

pub(crate) fn handle_upload(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    if attach(app, invocation.args, USAGE_UPLOAD) {
        CommandResult::ProcessAsMessage(IMAGE_PROMPT.to_string())
    } else {
        CommandResult::Continue
    }
}

pub(crate) fn handle_detach(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    match app.store.take_pending_image() {
        Some(image) => app.notify(format!("Removed {}", image.name)),
        None => app.notify("No image attached"),
    }
    CommandResult::Continue
}

/// Content of the message chosen by `args` (default: latest reply).
fn message_content(app: &mut App, args: &str) -> Option<(usize, String)> {
    match app.message_number(args) {
        Ok(number) => {
            let content = app.store.messages()[number - 1].content.clone();
            Some((number, content))
        }
        Err(err) => {
            app.notify(err);
            None
        }
    }
}

fn copy(app: &mut App, text: &str, what: String) {
    match app.clipboard.copy(text) {
        Ok(()) => app.notify(format!("Copied {what} to clipboard")),
        Err(err) => app.notify(format!("Clipboard error: {err}")),
    }
}

pub(crate) fn handle_copy(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    if let Some((number, content)) = message_content(app, invocation.args) {
        copy(app, &content, format!("message #{number}"));
    }
    CommandResult::Continue
}

pub(crate) fn handle_table(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let Some((number, content)) = message_content(app, invocation.args) else {
        return CommandResult::Continue;
    };
    let tables = extract_tables(&content);
    if tables.is_empty() {
        app.notify(format!("Message #{number} has no tables"));
        return CommandResult::Continue;
    }
    let what = if tables.len() == 1 {
        "1 table".to_string()
    } else {
        format!("{} tables", tables.len())
    };
    copy(app, &tables.join("\n\n"), what);
    CommandResult::Continue
}

pub(crate) fn handle_videos(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let Some((number, content)) = message_content(app, invocation.args) else {
        return CommandResult::Continue;
    };
    let links = youtube_links(&content);
    if links.is_empty() {
        app.notify(format!("Message #{number} has no YouTube links"));
    } else {
        let listing: Vec<String> = links
            .iter()
            .map(|link| format!("  {} -> {}", link.url, link.embed_url))
            .collect();
        app.notify(format!("Videos in message #{number}:\n{}", listing.join("\n")));
    }
    CommandResult::Continue
}

pub(crate) fn handle_speak(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    if let Some((number, content)) = message_content(app, invocation.args) {
        app.speak(content);
        app.notify(format!("Speaking message #{number} (/stop to stop)"));
    }
    CommandResult::Continue
}

pub(crate) fn handle_stop(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    if app.speech.cancel() {
        app.notify("Stopped speaking");
    } else {
        app.notify("Nothing is playing");
    }
    CommandResult::Continue
}

pub(crate) fn handle_listen(_app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    CommandResult::Listen
}
