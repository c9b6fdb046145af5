//! Interactive session state: the chat store plus the services and
//! capabilities that slash commands and the chat loop act through.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::core::chat::ModelBackend;
use crate::core::config::Config;
use crate::core::message::Message;
use crate::core::speech::{speech_locale, SpeechError, SpeechPlayer, SpeechRecognizer, SpeechSynthesizer};
use crate::core::store::ChatStore;
use crate::exec::poll::PollConfig;
use crate::exec::render::PreviewSurface;
use crate::exec::runner::{ExecutionService, RunOutcome, RunState};
use crate::exec::ExecutionBackend;
use crate::utils::clipboard::Clipboard;

/// Host capabilities handed to an [`App`]. Tests pass fakes.
pub struct Capabilities {
    pub models: Arc<dyn ModelBackend>,
    pub execution: Arc<dyn ExecutionBackend>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub recognizer: Arc<dyn SpeechRecognizer>,
    pub clipboard: Box<dyn Clipboard>,
    pub preview: Box<dyn PreviewSurface>,
}

/// Receivers for work that finishes in the background.
pub struct AppEvents {
    pub runs: mpsc::UnboundedReceiver<RunOutcome>,
    pub speech: mpsc::UnboundedReceiver<Result<usize, SpeechError>>,
}

pub struct App {
    pub store: ChatStore,
    pub config: Config,
    pub models: Arc<dyn ModelBackend>,
    pub execution: ExecutionService,
    pub speech: SpeechPlayer,
    pub recognizer: Arc<dyn SpeechRecognizer>,
    pub clipboard: Box<dyn Clipboard>,
    pub preview: Box<dyn PreviewSurface>,
    pub markdown_enabled: bool,
    pub syntax_enabled: bool,
    /// Set when messages were changed in place and the transcript should be
    /// printed again from the top.
    pub needs_redraw: bool,
    notices: Vec<String>,
}

impl App {
    pub fn new(
        config: Config,
        store: ChatStore,
        poll: PollConfig,
        capabilities: Capabilities,
    ) -> (Self, AppEvents) {
        let (execution, runs) = ExecutionService::new(capabilities.execution, poll);
        let (speech, speech_events) = SpeechPlayer::new(capabilities.synthesizer);
        let app = Self {
            markdown_enabled: config.markdown_enabled(),
            syntax_enabled: config.syntax_enabled(),
            store,
            config,
            models: capabilities.models,
            execution,
            speech,
            recognizer: capabilities.recognizer,
            clipboard: capabilities.clipboard,
            preview: capabilities.preview,
            needs_redraw: false,
            notices: Vec::new(),
        };
        (
            app,
            AppEvents {
                runs,
                speech: speech_events,
            },
        )
    }

    /// Queue a line of feedback for the chat loop to print.
    pub fn notify(&mut self, text: impl Into<String>) {
        self.notices.push(text.into());
    }

    pub fn take_notices(&mut self) -> Vec<String> {
        std::mem::take(&mut self.notices)
    }

    pub fn speech_locale(&self) -> String {
        speech_locale(self.config.speech_language()).to_string()
    }

    /// 1-based message number from `args`, or the latest assistant reply
    /// when `args` is empty.
    pub fn message_number(&self, args: &str) -> Result<usize, String> {
        let messages = self.store.messages();
        if args.trim().is_empty() {
            return messages
                .iter()
                .rposition(Message::is_assistant)
                .map(|index| index + 1)
                .ok_or_else(|| "No assistant reply yet".to_string());
        }
        let number: usize = args
            .trim()
            .parse()
            .map_err(|_| format!("Not a message number: {}", args.trim()))?;
        if number == 0 || number > messages.len() {
            return Err(format!("No message #{number}"));
        }
        Ok(number)
    }

    /// Speak `text` with the configured voice, replacing anything playing.
    pub fn speak(&mut self, text: String) {
        let voice = self.config.voice.clone();
        let locale = self.speech_locale();
        self.speech.play(text, voice, locale);
    }

    /// Record a finished run and show previews on the preview surface.
    pub fn handle_run_outcome(&mut self, outcome: RunOutcome) {
        let location = outcome.block;
        let number = self
            .store
            .blocks()
            .iter()
            .position(|block| block.location == location)
            .map(|index| index + 1);
        let Some(state) = self.store.apply_run_outcome(outcome).cloned() else {
            return;
        };
        let number = number.unwrap_or_default();
        match state {
            RunState::ShowingPreview(document) => match self.preview.show(&document) {
                Ok(path) => self.notify(format!("Preview for block #{number}: {}", path.display())),
                Err(err) => {
                    warn!("preview failed: {err}");
                    self.notify(format!("Preview for block #{number} failed: {err}"));
                }
            },
            RunState::ShowingOutput(text) => {
                self.notify(format!("Output of block #{number}:\n{text}"));
            }
            RunState::Idle | RunState::Executing { .. } => {}
        }
    }

    pub fn handle_speech_outcome(&mut self, outcome: Result<usize, SpeechError>) {
        match outcome {
            Ok(chunks) => debug!(chunks, "speech finished"),
            Err(err) => self.store.set_error(err.to_string()),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::attachments::ObjectStore;
    use crate::core::builtin_models::ModelId;
    use crate::core::chat::tests::FakeBackend;
    use crate::core::message::MessageMetadata;
    use crate::core::speech::tests::RecordingSynthesizer;
    use crate::core::speech::CommandRecognizer;
    use crate::exec::poll::tests::ScriptedBackend;
    use crate::exec::render::{PreviewDocument, RenderedResult};
    use crate::utils::clipboard::tests::MemoryClipboard;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Preview surface that remembers what it was asked to show.
    #[derive(Default, Clone)]
    pub(crate) struct RecordingPreview {
        pub(crate) shown: Arc<Mutex<Vec<PreviewDocument>>>,
    }

    impl PreviewSurface for RecordingPreview {
        fn show(&mut self, document: &PreviewDocument) -> Result<PathBuf, String> {
            let mut shown = self.shown.lock().unwrap();
            shown.push(document.clone());
            Ok(PathBuf::from(format!("preview-{}.html", shown.len())))
        }
    }

    pub(crate) struct TestApp {
        pub(crate) app: App,
        pub(crate) events: AppEvents,
        pub(crate) clipboard: MemoryClipboard,
        pub(crate) preview: RecordingPreview,
        pub(crate) synthesizer: Arc<RecordingSynthesizer>,
    }

    pub(crate) fn create_test_app() -> TestApp {
        create_test_app_with(FakeBackend::replying("ok"))
    }

    pub(crate) fn create_test_app_with(models: FakeBackend) -> TestApp {
        let clipboard = MemoryClipboard::default();
        let preview = RecordingPreview::default();
        let synthesizer = Arc::new(RecordingSynthesizer::default());
        let capabilities = Capabilities {
            models: Arc::new(models),
            execution: Arc::new(ScriptedBackend::new(&[2], 3, "hi\n")),
            synthesizer: synthesizer.clone(),
            recognizer: Arc::new(CommandRecognizer::new(None)),
            clipboard: Box::new(clipboard.clone()),
            preview: Box::new(preview.clone()),
        };
        let store = ChatStore::new(ModelId::Gemini, ObjectStore::new().unwrap());
        let poll = PollConfig {
            interval: Duration::from_millis(1),
            max_attempts: 3,
        };
        let (app, events) = App::new(Config::default(), store, poll, capabilities);
        TestApp {
            app,
            events,
            clipboard,
            preview,
            synthesizer,
        }
    }

    pub(crate) fn reply(content: &str) -> Message {
        Message::assistant(content, ModelId::Gemini, MessageMetadata::default())
    }

    #[test]
    fn message_numbers_default_to_the_latest_reply() {
        let mut test = create_test_app();
        assert!(test.app.message_number("").is_err());

        test.app.store.push_message(Message::user("q"));
        test.app.store.push_message(reply("a"));
        test.app.store.push_message(Message::user("q2"));
        assert_eq!(test.app.message_number(""), Ok(2));
        assert_eq!(test.app.message_number(" 3 "), Ok(3));
        assert_eq!(test.app.message_number("4"), Err("No message #4".to_string()));
        assert!(test.app.message_number("x").is_err());
    }

    #[test]
    fn previews_go_to_the_preview_surface() {
        let mut test = create_test_app();
        test.app
            .store
            .push_message(reply("```html\n<h1>Hi</h1>\n```"));
        let request = test.app.store.start_run(1).unwrap();
        let document = PreviewDocument::from_block(request.language, &request.source);

        test.app.handle_run_outcome(RunOutcome {
            block: request.block,
            run_id: request.run_id,
            result: Ok(RenderedResult::Preview(document.clone())),
        });

        assert_eq!(test.preview.shown.lock().unwrap().as_slice(), [document]);
        assert_eq!(
            test.app.take_notices(),
            vec!["Preview for block #1: preview-1.html".to_string()]
        );
    }

    #[test]
    fn speech_errors_become_the_visible_error() {
        let mut test = create_test_app();
        test.app
            .handle_speech_outcome(Err(SpeechError::Failed("device busy".to_string())));
        assert_eq!(test.app.store.error(), Some("Speech error: device busy"));
    }
}
