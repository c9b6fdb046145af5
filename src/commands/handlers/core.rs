use super::{number_arg, usage_status};
use crate::commands::registry::CommandInvocation;
use crate::commands::{all_commands, CommandResult};
use crate::core::app::App;
use crate::core::builtin_models::{load_builtin_models, ModelId};
use crate::utils::editor::{edit_text, EditOutcome};

pub(crate) fn handle_help(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    let width = all_commands()
        .iter()
        .map(|command| command.usage.len())
        .max()
        .unwrap_or_default();
    let mut help = String::from("Commands:\n");
    for command in all_commands() {
        help.push_str(&format!("  {:width$}  {}\n", command.usage, command.help));
    }
    help.push_str("Anything else is sent to the current model.");
    app.notify(help);
    CommandResult::Continue
}

pub(crate) fn handle_model(app: &mut App, invocation: CommandInvocation<'_>) -> CommandResult {
    if invocation.args.is_empty() {
        let current = app.store.selected_model();
        let mut listing = String::from("Models:\n");
        for model in load_builtin_models() {
            let marker = if model.id == current { "*" } else { " " };
            listing.push_str(&format!(
                "{marker} {:<12} {}\n",
                model.id.as_str(),
                model.display_name
            ));
        }
        app.notify(listing.trim_end().to_string());
        return CommandResult::Continue;
    }

    match invocation.args.parse::<ModelId>() {
        Ok(model) => {
            app.store.select_model(model);
            app.notify(format!("Model set: {}", model.info().display_name));
        }
        Err(err) => app.notify(err),
    }
    CommandResult::Continue
}

pub(crate) fn handle_retry(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    if app.store.messages().iter().any(|message| message.is_user()) {
        CommandResult::Regenerate
    } else {
        app.notify("Nothing to retry yet.");
        CommandResult::Continue
    }
}

const USAGE_EDIT_MESSAGE: &str = "/editmsg <n>";

pub(crate) fn handle_edit_message(
    app: &mut App,
    invocation: CommandInvocation<'_>,
) -> CommandResult {
    let words = invocation.words();
    if words.len() != 1 {
        return usage_status(app, USAGE_EDIT_MESSAGE);
    }
    let Some(number) = number_arg(app, words.first().copied(), USAGE_EDIT_MESSAGE) else {
        return CommandResult::Continue;
    };
    let Some(message) = app.store.messages().get(number - 1) else {
        app.notify(format!("No message #{number}"));
        return CommandResult::Continue;
    };

    match edit_text(&message.content, "md") {
        Ok(EditOutcome::Edited(content)) => {
            app.store.edit_message(number - 1, content.trim_end());
            app.needs_redraw = true;
            app.notify(format!("Message #{number} updated"));
        }
        Ok(EditOutcome::Unchanged) => app.notify("No changes"),
        Ok(EditOutcome::Aborted(reason)) => app.notify(reason),
        Err(err) => app.notify(format!("Editor error: {err}")),
    }
    CommandResult::Continue
}

pub(crate) fn handle_clear(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    app.speech.cancel();
    app.store.clear();
    app.needs_redraw = true;
    app.notify("Transcript cleared");
    CommandResult::Continue
}

pub(crate) fn handle_markdown(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    app.markdown_enabled = !app.markdown_enabled;
    let state = if app.markdown_enabled { "enabled" } else { "disabled" };
    app.needs_redraw = true;
    app.notify(format!("Markdown {state}"));
    CommandResult::Continue
}

pub(crate) fn handle_syntax(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    app.syntax_enabled = !app.syntax_enabled;
    let state = if app.syntax_enabled { "enabled" } else { "disabled" };
    app.needs_redraw = true;
    app.notify(format!("Syntax highlighting {state}"));
    CommandResult::Continue
}

pub(crate) fn handle_quit(app: &mut App, _invocation: CommandInvocation<'_>) -> CommandResult {
    app.speech.cancel();
    CommandResult::Quit
}
