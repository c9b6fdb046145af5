use tracing::info;

use super::number_arg;
use crate::commands::registry::CommandInvocation;
use crate::commands::CommandResult;
use crate::core::app::App;
use crate::exec::render::PreviewDocument;
use crate::exec::runner::RunState;
use crate::utils::editor::{edit_text, EditOutcome};

const USAGE_RUN: &str = "/run <block>";
const USAGE_DISMISS: &str = "/dismiss <block>";
const USAGE_SHOW: &str = "/show <block>";
const USAGE_EDIT: &str = "/edit <block>";
const USAGE_UNDO: &str = "/undo <block>";
const USAGE_REDO: &str = "/redo <block>";

/// Block number from the first argument, reporting problems to the user.
fn block_number(app: &mut App, invocation: &CommandInvocation<'_>, usage: &'static str) -> Option<usize> {
    let number = number_arg(app, invocation.words().first().copied(), usage)?;
    if app.store.block_by_number(number).is_none() {
        let count = app.store.blocks().len();
        app.notify(format!("No code block #{number} ({count} available)"));
        return None;
    }
    Some(number)
}

pub(crate) fn handle_run(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let Some(number) = block_number(app, &invocation, USAGE_RUN) else {
        return CommandResult::Continue;
    };
    match app.store.start_run(number) {
        Ok(request) => {
            info!(block = number, language = %request.language, "run requested");
            let verb = if request.language.is_renderable() {
                "Rendering"
            } else {
                "Running"
            };
            app.notify(format!("{verb} block #{number} ({})…", request.language));
            app.execution.spawn_run(request);
        }
        Err(err) => app.notify(err.to_string()),
    }
    CommandResult::Continue
}

pub(crate) fn handle_dismiss(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let Some(number) = block_number(app, &invocation, USAGE_DISMISS) else {
        return CommandResult::Continue;
    };
    if let Some(block) = app.store.block_by_number_mut(number) {
        if block.runner.is_executing() {
            app.notify("Code is still running");
        } else {
            block.runner.dismiss();
            app.notify(format!("Block #{number} dismissed"));
        }
    }
    CommandResult::Continue
}

pub(crate) fn handle_show(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let Some(number) = block_number(app, &invocation, USAGE_SHOW) else {
        return CommandResult::Continue;
    };
    let Some(block) = app.store.block_by_number(number) else {
        return CommandResult::Continue;
    };
    let state = match block.runner.state() {
        RunState::Idle => "idle",
        RunState::Executing { .. } => "running",
        RunState::ShowingPreview(_) => "showing preview",
        RunState::ShowingOutput(_) => "showing output",
    };
    let edited = if block.buffer.is_modified() { ", edited" } else { "" };
    let text = format!(
        "Block #{number} ({}, {state}{edited}):\n{}",
        block.language(),
        block.source()
    );
    app.notify(text);
    CommandResult::Continue
}

pub(crate) fn handle_edit(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let Some(number) = block_number(app, &invocation, USAGE_EDIT) else {
        return CommandResult::Continue;
    };
    let Some(block) = app.store.block_by_number(number) else {
        return CommandResult::Continue;
    };
    let extension = block.language().file_extension();

    match edit_text(block.source(), extension) {
        Ok(EditOutcome::Edited(code)) => {
            if let Some(block) = app.store.block_by_number_mut(number) {
                block.buffer.edit(code.trim_end());
            }
            app.needs_redraw = true;
            app.notify(format!("Block #{number} updated"));
        }
        Ok(EditOutcome::Unchanged) => app.notify("No changes"),
        Ok(EditOutcome::Aborted(reason)) => app.notify(reason),
        Err(err) => app.notify(format!("Editor error: {err}")),
    }
    CommandResult::Continue
}

fn step_history(
    app: &mut App,
    invocation: CommandInvocation<'_>,
    usage: &'static str,
    undo: bool,
) -> CommandResult {
    let Some(number) = block_number(app, &invocation, usage) else {
        return CommandResult::Continue;
    };
    let moved = app
        .store
        .block_by_number_mut(number)
        .is_some_and(|block| {
            if undo {
                block.buffer.undo()
            } else {
                block.buffer.redo()
            }
        });
    if moved {
        app.needs_redraw = true;
        let verb = if undo { "Undid" } else { "Redid" };
        app.notify(format!("{verb} edit of block #{number}"));
    } else {
        let what = if undo { "undo" } else { "redo" };
        app.notify(format!("Nothing to {what} for block #{number}"));
    }
    CommandResult::Continue
}

pub(crate) fn handle_undo(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    step_history(app, invocation, USAGE_UNDO, true)
}

pub(crate) fn handle_redo(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    step_history(app, invocation, USAGE_REDO, false)
}

/// Combine every HTML, CSS and JavaScript block of one message into a
/// single page.
pub(crate) fn handle_preview(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    let number = match app.message_number(invocation.args) {
        Ok(number) => number,
        Err(err) => {
            app.notify(err);
            return CommandResult::Continue;
        }
    };
    let message_index = number - 1;
    let document = PreviewDocument::from_blocks(
        app.store
            .blocks()
            .iter()
            .filter(|block| block.location.message_index == message_index)
            .map(|block| (block.language(), block.source())),
    );
    if document.is_empty() {
        app.notify(format!("Message #{number} has no HTML, CSS or JavaScript blocks"));
        return CommandResult::Continue;
    }

    match app.preview.show(&document) {
        Ok(path) => app.notify(format!("Preview of message #{number}: {}", path.display())),
        Err(err) => app.notify(format!("Preview failed: {err}")),
    }
    CommandResult::Continue
}
