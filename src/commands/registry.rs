use super::handlers;
use super::CommandResult;
use crate::core::app::App;

pub type CommandHandler = fn(&mut App, CommandInvocation<'_>) -> CommandResult;

pub struct Command {
    pub name: &'static str,
    pub usage: &'static str,
    pub help: &'static str,
    pub handler: CommandHandler,
}

#[derive(Clone, Copy)]
pub struct CommandInvocation<'a> {
    pub input: &'a str,
    pub args: &'a str,
}

impl CommandInvocation<'_> {
    /// Arguments split on whitespace.
    pub fn words(&self) -> Vec<&str> {
        self.args.split_whitespace().collect()
    }
}

pub fn all_commands() -> &'static [Command] {
    COMMANDS
}

pub fn find_command(name: &str) -> Option<&'static Command> {
    all_commands()
        .iter()
        .find(|command| command.name.eq_ignore_ascii_case(name))
}

/// Commands whose name starts with `prefix`, for completion hints.
pub fn matching_commands(prefix: &str) -> Vec<&'static Command> {
    let prefix = prefix.to_ascii_lowercase();
    all_commands()
        .iter()
        .filter(|command| command.name.starts_with(&prefix))
        .collect()
}

const COMMANDS: &[Command] = &[
    Command {
        name: "help",
        usage: "/help",
        help: "Show available commands.",
        handler: handlers::core::handle_help,
    },
    Command {
        name: "model",
        usage: "/model [id]",
        help: "List models or switch to another one.",
        handler: handlers::core::handle_model,
    },
    Command {
        name: "retry",
        usage: "/retry",
        help: "Drop the last reply and send the last message again.",
        handler: handlers::core::handle_retry,
    },
    Command {
        name: "editmsg",
        usage: "/editmsg <n>",
        help: "Edit message #n in $EDITOR.",
        handler: handlers::core::handle_edit_message,
    },
    Command {
        name: "clear",
        usage: "/clear",
        help: "Remove every message and stored image.",
        handler: handlers::core::handle_clear,
    },
    Command {
        name: "markdown",
        usage: "/markdown",
        help: "Toggle markdown rendering for replies.",
        handler: handlers::core::handle_markdown,
    },
    Command {
        name: "syntax",
        usage: "/syntax",
        help: "Toggle syntax highlighting for code blocks.",
        handler: handlers::core::handle_syntax,
    },
    Command {
        name: "run",
        usage: "/run <block>",
        help: "Run code block #block, or preview it when it is HTML, CSS or JavaScript.",
        handler: handlers::code::handle_run,
    },
    Command {
        name: "dismiss",
        usage: "/dismiss <block>",
        help: "Hide the output or preview of a code block.",
        handler: handlers::code::handle_dismiss,
    },
    Command {
        name: "show",
        usage: "/show <block>",
        help: "Print the current code of a block.",
        handler: handlers::code::handle_show,
    },
    Command {
        name: "edit",
        usage: "/edit <block>",
        help: "Edit a code block in $EDITOR.",
        handler: handlers::code::handle_edit,
    },
    Command {
        name: "undo",
        usage: "/undo <block>",
        help: "Undo the last edit of a code block.",
        handler: handlers::code::handle_undo,
    },
    Command {
        name: "redo",
        usage: "/redo <block>",
        help: "Redo an undone edit of a code block.",
        handler: handlers::code::handle_redo,
    },
    Command {
        name: "preview",
        usage: "/preview [n]",
        help: "Combine the HTML, CSS and JavaScript blocks of message #n into one preview.",
        handler: handlers::code::handle_preview,
    },
    Command {
        name: "save",
        usage: "/save <block> [path]",
        help: "Write a code block to code.<ext> or the given path.",
        handler: handlers::io::handle_save,
    },
    Command {
        name: "saveimage",
        usage: "/saveimage [n] [path]",
        help: "Save the image generated in message #n.",
        handler: handlers::io::handle_save_image,
    },
    Command {
        name: "dump",
        usage: "/dump [path]",
        help: "Export the conversation to a text file.",
        handler: handlers::io::handle_dump,
    },
    Command {
        name: "image",
        usage: "/image <path>",
        help: "Attach an image to the next message.",
        handler: handlers::media::handle_image,
    },
    Command {
        name: "upload",
        usage: "/upload <path>",
        help: "Send an image for analysis right away.",
        handler: handlers::media::handle_upload,
    },
    Command {
        name: "detach",
        usage: "/detach",
        help: "Drop the pending image.",
        handler: handlers::media::handle_detach,
    },
    Command {
        name: "copy",
        usage: "/copy [n]",
        help: "Copy message #n (default: the latest reply) to the clipboard.",
        handler: handlers::media::handle_copy,
    },
    Command {
        name: "table",
        usage: "/table [n]",
        help: "Copy the tables in message #n as tab-separated text.",
        handler: handlers::media::handle_table,
    },
    Command {
        name: "videos",
        usage: "/videos [n]",
        help: "List embeddable YouTube links in message #n.",
        handler: handlers::media::handle_videos,
    },
    Command {
        name: "speak",
        usage: "/speak [n]",
        help: "Read message #n aloud.",
        handler: handlers::media::handle_speak,
    },
    Command {
        name: "stop",
        usage: "/stop",
        help: "Stop speaking.",
        handler: handlers::media::handle_stop,
    },
    Command {
        name: "listen",
        usage: "/listen",
        help: "Dictate a message with the configured recognizer.",
        handler: handlers::media::handle_listen,
    },
    Command {
        name: "quit",
        usage: "/quit",
        help: "Leave polychat.",
        handler: handlers::core::handle_quit,
    },
];
