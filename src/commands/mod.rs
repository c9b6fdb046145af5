mod handlers;
mod registry;

pub use registry::{all_commands, find_command, matching_commands, CommandInvocation};

use crate::core::app::App;

/// What the chat loop should do after a line of input was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    Continue,
    ProcessAsMessage(String),
    Regenerate,
    Listen,
    Quit,
}

/// Dispatch `/name args` to its handler; anything else is a chat message.
/// Unknown commands are reported instead of being sent to the model.
pub fn process_input(app: &mut App, input: &str) -> CommandResult {
    let trimmed = input.trim();

    let Some(rest) = trimmed.strip_prefix('/') else {
        return CommandResult::ProcessAsMessage(input.to_string());
    };

    let mut parts = rest.splitn(2, char::is_whitespace);
    let command_name = match parts.next() {
        Some(name) if !name.is_empty() => name,
        _ => return CommandResult::ProcessAsMessage(input.to_string()),
    };
    let args = parts.next().unwrap_or("").trim();

    match registry::find_command(command_name) {
        Some(command) => {
            let invocation = CommandInvocation {
                input: trimmed,
                args,
            };
            (command.handler)(app, invocation)
        }
        None => {
            let suggestions: Vec<&str> = matching_commands(command_name)
                .iter()
                .map(|command| command.usage)
                .collect();
            if suggestions.is_empty() {
                app.notify(format!("Unknown command /{command_name}. Try /help."));
            } else {
                app.notify(format!(
                    "Unknown command /{command_name}. Did you mean: {}",
                    suggestions.join(", ")
                ));
            }
            CommandResult::Continue
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::app::tests::create_test_app;

    #[test]
    fn plain_text_is_a_message() {
        let mut test = create_test_app();
        assert_eq!(
            process_input(&mut test.app, "hello there"),
            CommandResult::ProcessAsMessage("hello there".to_string())
        );
        assert_eq!(
            process_input(&mut test.app, "/"),
            CommandResult::ProcessAsMessage("/".to_string())
        );
    }

    #[test]
    fn unknown_commands_are_reported_with_suggestions() {
        let mut test = create_test_app();
        assert_eq!(process_input(&mut test.app, "/sa"), CommandResult::Continue);
        let notices = test.app.take_notices();
        assert_eq!(
            notices,
            vec!["Unknown command /sa. Did you mean: /save <block> [path], /saveimage [n] [path]"
                .to_string()]
        );

        process_input(&mut test.app, "/zzz");
        assert_eq!(
            test.app.take_notices(),
            vec!["Unknown command /zzz. Try /help.".to_string()]
        );
    }

    #[test]
    fn flow_commands_hand_control_back_to_the_loop() {
        let mut test = create_test_app();
        assert_eq!(process_input(&mut test.app, "/retry"), CommandResult::Continue);
        test.app
            .store
            .push_message(crate::core::message::Message::user("again?"));
        assert_eq!(process_input(&mut test.app, "/retry"), CommandResult::Regenerate);
        assert_eq!(process_input(&mut test.app, "  /QUIT "), CommandResult::Quit);
    }
}
