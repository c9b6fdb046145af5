//! Interactive chat session.
//!
//! Reads lines from stdin, dispatches slash commands, sends everything else
//! to the selected model, and prints new transcript entries as they arrive.
//! Code runs and speech playback report back over channels, so the loop
//! waits on stdin and both channels at once.

use std::error::Error;
use std::io::{self, Write};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use crate::api::judge::JudgeClient;
use crate::auth::{AuthManager, Service};
use crate::commands::{process_input, CommandResult};
use crate::core::app::{App, Capabilities};
use crate::core::attachments::ObjectStore;
use crate::core::builtin_models::ModelId;
use crate::core::chat::{self, HttpModelBackend};
use crate::core::config::Config;
use crate::core::speech::{CommandRecognizer, CommandSynthesizer};
use crate::core::store::ChatStore;
use crate::exec::render::BrowserPreview;
use crate::ui::renderer::{paint, render_message, RenderOptions, DIM, RED, YELLOW};
use crate::utils::clipboard::SystemClipboard;

/// Tracks what has already been written to the terminal.
#[derive(Debug, Default)]
pub struct TranscriptView {
    printed: usize,
    last_error: Option<String>,
}

impl TranscriptView {
    /// Lines to print for everything that changed since the last call.
    pub fn refresh(&mut self, app: &mut App) -> Vec<String> {
        let mut out = Vec::new();
        let options = RenderOptions {
            markdown: app.markdown_enabled,
            syntax: app.syntax_enabled,
        };
        let total = app.store.messages().len();

        if app.needs_redraw {
            app.needs_redraw = false;
            if total > 0 {
                out.push(paint(DIM, "──────── transcript ────────"));
            }
            self.printed = 0;
        } else if self.printed > total {
            self.printed = total;
        }
        for index in self.printed..total {
            out.extend(render_message(&app.store, index, options));
        }
        self.printed = total;

        for notice in app.take_notices() {
            out.extend(notice.lines().map(|line| paint(DIM, line)));
        }

        let error = app.store.error().map(str::to_string);
        if error != self.last_error {
            if let Some(message) = &error {
                out.push(paint(RED, &format!("Error: {message}")));
            }
            self.last_error = error;
        }
        out
    }
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}

fn print_prompt(app: &App) {
    let attachment = app
        .store
        .pending_image()
        .map(|image| format!("[{}] ", image.name))
        .unwrap_or_default();
    print!("{attachment}{}> ", app.store.selected_model());
    let _ = io::stdout().flush();
}

fn print_banner(app: &App) {
    let model = app.store.selected_model().info();
    println!("polychat · {}", model.display_name);
    println!(
        "{}",
        paint(
            DIM,
            "Type a message, /image <path> to attach a picture, /help for commands, /quit to leave."
        )
    );
}

fn waiting(app: &App) {
    let model = app.store.selected_model().info();
    println!("{}", paint(YELLOW, &format!("… waiting for {}", model.display_name)));
}

/// Send `text` with whatever image is attached.
async fn send(app: &mut App, text: &str) {
    waiting(app);
    let image = app.store.take_pending_image();
    let models = Arc::clone(&app.models);
    if chat::send_message(&mut app.store, models.as_ref(), text, image)
        .await
        .is_ok()
    {
        debug!(messages = app.store.messages().len(), "reply received");
    }
}

async fn regenerate(app: &mut App) {
    waiting(app);
    let models = Arc::clone(&app.models);
    match chat::regenerate(&mut app.store, models.as_ref()).await {
        Ok(true) => app.needs_redraw = true,
        Ok(false) => app.notify("Nothing to retry yet."),
        Err(_) => app.needs_redraw = true,
    }
}

async fn listen(app: &mut App) {
    let locale = app.speech_locale();
    println!("{}", paint(YELLOW, "… listening"));
    let recognizer = Arc::clone(&app.recognizer);
    match recognizer.listen(&locale).await {
        Ok(transcript) if !transcript.trim().is_empty() => {
            println!("{}", paint(DIM, &format!("Heard: {transcript}")));
            send(app, &transcript).await;
        }
        Ok(_) => app.notify("Heard nothing"),
        Err(err) => app.store.set_error(err.to_string()),
    }
}

/// Handle one line of input. Returns false when the session should end.
pub async fn handle_line(app: &mut App, line: &str) -> bool {
    let input = line.trim();
    if input.is_empty() && app.store.pending_image().is_none() {
        return true;
    }
    match process_input(app, input) {
        CommandResult::Continue => {}
        CommandResult::ProcessAsMessage(text) => send(app, &text).await,
        CommandResult::Regenerate => regenerate(app).await,
        CommandResult::Listen => listen(app).await,
        CommandResult::Quit => return false,
    }
    true
}

pub async fn run_chat(model: ModelId, env_only: bool) -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    let auth = AuthManager::new_with_keyring(!env_only);
    let credentials = auth.credentials();
    let client = reqwest::Client::new();

    let execution = JudgeClient::new(
        client.clone(),
        config.judge.clone(),
        credentials.get(Service::Rapidapi).map(str::to_string),
    );
    let capabilities = Capabilities {
        models: Arc::new(HttpModelBackend::new(client, config.clone(), credentials)),
        execution: Arc::new(execution),
        synthesizer: Arc::new(CommandSynthesizer::detect()),
        recognizer: Arc::new(CommandRecognizer::new(config.recognizer_command.clone())),
        clipboard: Box::new(SystemClipboard),
        preview: Box::new(BrowserPreview::new(config.open_previews_enabled())),
    };
    let store = ChatStore::new(model, ObjectStore::new()?);
    let poll = config.judge.poll_config();
    let (mut app, mut events) = App::new(config, store, poll, capabilities);
    info!(%model, "chat session started");

    print_banner(&app);
    let mut view = TranscriptView::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    print_prompt(&app);

    loop {
        let mut prompt_again = false;
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    println!();
                    break;
                };
                if !handle_line(&mut app, &line).await {
                    break;
                }
                prompt_again = true;
            }
            Some(outcome) = events.runs.recv() => app.handle_run_outcome(outcome),
            Some(outcome) = events.speech.recv() => app.handle_speech_outcome(outcome),
        }

        let output = view.refresh(&mut app);
        if !output.is_empty() && !prompt_again {
            // Background result arrived while the prompt was showing.
            println!();
        }
        print_lines(&output);
        if prompt_again || !output.is_empty() {
            print_prompt(&app);
        }
    }

    app.speech.cancel();
    info!("chat session ended");
    Ok(())
}
