//! Text-to-speech playback and speech capture through host commands.

use std::fmt;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Longest chunk handed to the synthesizer in one call.
pub const MAX_CHUNK_CHARS: usize = 200;

pub const RECOGNITION_UNSUPPORTED: &str = "Speech recognition is not supported";
pub const SYNTHESIS_UNSUPPORTED: &str = "Speech synthesis is not supported";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechError {
    Unsupported(&'static str),
    Failed(String),
}

impl fmt::Display for SpeechError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpeechError::Unsupported(message) => f.write_str(message),
            SpeechError::Failed(message) => write!(f, "Speech error: {message}"),
        }
    }
}

impl std::error::Error for SpeechError {}

/// Map a language name or tag to the locale handed to speech tools.
pub fn speech_locale(language: &str) -> &str {
    match language.trim().to_lowercase().as_str() {
        "" | "english" | "en" => "en-US",
        "hindi" | "hi" => "hi-IN",
        _ => language.trim(),
    }
}

/// Split `text` after sentence punctuation (`.`, `,`, `!`, `?`) followed by
/// whitespace, then pack the pieces greedily into chunks of at most
/// `max_len` characters. A single piece longer than `max_len` becomes its own
/// chunk.
pub fn chunk_text(text: &str, max_len: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut piece = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        piece.push(c);
        let at_boundary = matches!(c, '.' | ',' | '!' | '?')
            && chars.peek().is_some_and(|next| next.is_whitespace());
        if at_boundary {
            pieces.push(std::mem::take(&mut piece));
            while chars.peek().is_some_and(|next| next.is_whitespace()) {
                chars.next();
            }
        }
    }
    pieces.push(piece);

    let mut chunks = Vec::new();
    let mut current = String::new();
    for piece in pieces.iter().map(|p| p.trim()).filter(|p| !p.is_empty()) {
        let current_len = current.chars().count();
        let needed = piece.chars().count() + usize::from(current_len > 0);
        if current_len > 0 && current_len + needed > max_len {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(piece);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Speak one chunk and return once it has finished.
    async fn speak(&self, text: &str, voice: Option<&str>, locale: &str)
        -> Result<(), SpeechError>;
}

#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Capture one utterance and return its transcript.
    async fn listen(&self, locale: &str) -> Result<String, SpeechError>;
}

/// Speak `text` chunk by chunk, stopping at the first failure.
pub async fn speak_message(
    synthesizer: &dyn SpeechSynthesizer,
    text: &str,
    voice: Option<&str>,
    locale: &str,
) -> Result<usize, SpeechError> {
    let chunks = chunk_text(text, MAX_CHUNK_CHARS);
    for chunk in &chunks {
        synthesizer.speak(chunk, voice, locale).await?;
    }
    Ok(chunks.len())
}

/// Plays one message at a time in the background. Starting a new message or
/// cancelling aborts the current one, which kills the speaking process.
pub struct SpeechPlayer {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    current: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<Result<usize, SpeechError>>,
}

impl SpeechPlayer {
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
    ) -> (Self, mpsc::UnboundedReceiver<Result<usize, SpeechError>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                synthesizer,
                current: None,
                tx,
            },
            rx,
        )
    }

    pub fn play(&mut self, text: String, voice: Option<String>, locale: String) {
        self.cancel();
        let synthesizer = Arc::clone(&self.synthesizer);
        let tx = self.tx.clone();
        self.current = Some(tokio::spawn(async move {
            let result =
                speak_message(synthesizer.as_ref(), &text, voice.as_deref(), &locale).await;
            let _ = tx.send(result);
        }));
    }

    /// Returns true when something was playing.
    pub fn cancel(&mut self) -> bool {
        match self.current.take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                true
            }
            _ => false,
        }
    }

    pub fn is_speaking(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

async fn run_quiet(mut command: Command) -> Result<(), SpeechError> {
    let status = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status()
        .await
        .map_err(|err| SpeechError::Failed(err.to_string()))?;
    if status.success() {
        Ok(())
    } else {
        Err(SpeechError::Failed(format!("speech command exited with {status}")))
    }
}

/// Synthesizer backed by `say` on macOS and `espeak-ng`/`espeak` elsewhere.
pub struct CommandSynthesizer {
    program: Option<&'static str>,
}

impl CommandSynthesizer {
    pub fn detect() -> Self {
        let candidates: &[&'static str] = if cfg!(target_os = "macos") {
            &["say"]
        } else {
            &["espeak-ng", "espeak"]
        };
        let program = candidates
            .iter()
            .copied()
            .find(|program| program_on_path(program));
        debug!(?program, "speech synthesizer");
        Self { program }
    }
}

fn program_on_path(program: &str) -> bool {
    std::env::var_os("PATH").is_some_and(|paths| {
        std::env::split_paths(&paths).any(|dir| dir.join(program).is_file())
    })
}

#[async_trait]
impl SpeechSynthesizer for CommandSynthesizer {
    async fn speak(
        &self,
        text: &str,
        voice: Option<&str>,
        locale: &str,
    ) -> Result<(), SpeechError> {
        let Some(program) = self.program else {
            return Err(SpeechError::Unsupported(SYNTHESIS_UNSUPPORTED));
        };
        let mut command = Command::new(program);
        if program == "say" {
            if let Some(voice) = voice {
                command.args(["-v", voice]);
            }
        } else {
            let voice = voice.unwrap_or(locale);
            command.args(["-v", voice]);
        }
        command.arg("--").arg(text);
        run_quiet(command).await
    }
}

/// Recognizer that runs a user-configured shell command and reads the
/// transcript from its stdout. Without a command, recognition is reported
/// as unsupported.
pub struct CommandRecognizer {
    command: Option<String>,
}

impl CommandRecognizer {
    pub fn new(command: Option<String>) -> Self {
        Self {
            command: command.filter(|command| !command.trim().is_empty()),
        }
    }
}

#[async_trait]
impl SpeechRecognizer for CommandRecognizer {
    async fn listen(&self, locale: &str) -> Result<String, SpeechError> {
        let Some(command) = &self.command else {
            return Err(SpeechError::Unsupported(RECOGNITION_UNSUPPORTED));
        };

        let (shell, flag) = if cfg!(windows) { ("cmd", "/C") } else { ("sh", "-c") };
        let output = Command::new(shell)
            .args([flag, command])
            .env("POLYCHAT_SPEECH_LOCALE", locale)
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|err| SpeechError::Failed(err.to_string()))?;

        if !output.status.success() {
            warn!(status = %output.status, "recognizer command failed");
            return Err(SpeechError::Failed(format!(
                "recognizer exited with {}",
                output.status
            )));
        }
        let transcript = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if transcript.is_empty() {
            return Err(SpeechError::Failed("no speech detected".to_string()));
        }
        Ok(transcript)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records every spoken chunk; fails on the chunk at `fail_at`.
    #[derive(Default)]
    pub(crate) struct RecordingSynthesizer {
        pub(crate) spoken: Mutex<Vec<String>>,
        pub(crate) fail_at: Option<usize>,
    }

    #[async_trait]
    impl SpeechSynthesizer for RecordingSynthesizer {
        async fn speak(
            &self,
            text: &str,
            _voice: Option<&str>,
            _locale: &str,
        ) -> Result<(), SpeechError> {
            let mut spoken = self.spoken.lock().unwrap();
            if self.fail_at == Some(spoken.len()) {
                return Err(SpeechError::Failed("device busy".to_string()));
            }
            spoken.push(text.to_string());
            Ok(())
        }
    }

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(
            chunk_text("Hello there. How are you?", 200),
            vec!["Hello there. How are you?".to_string()]
        );
        assert!(chunk_text("   ", 200).is_empty());
    }

    #[test]
    fn chunks_respect_the_limit_and_keep_order() {
        let text = "First sentence here. Second sentence here! Third one? Fourth, and last.";
        let chunks = chunk_text(text, 30);
        assert_eq!(
            chunks,
            vec![
                "First sentence here.",
                "Second sentence here!",
                "Third one? Fourth, and last.",
            ]
        );
        assert!(chunks.iter().all(|chunk| chunk.chars().count() <= 30));
    }

    #[test]
    fn overlong_sentence_stands_alone() {
        let long = "a".repeat(50);
        let text = format!("Hi. {long}. Bye.");
        let chunks = chunk_text(&text, 20);
        assert_eq!(chunks, vec!["Hi.".to_string(), format!("{long}."), "Bye.".to_string()]);
    }

    #[test]
    fn decimals_do_not_split() {
        assert_eq!(chunk_text("Pi is 3.14 roughly.", 5).len(), 1);
    }

    #[tokio::test]
    async fn speak_message_stops_at_the_first_error() {
        let synthesizer = RecordingSynthesizer {
            fail_at: Some(1),
            ..Default::default()
        };
        let text = format!("{}. {}. {}.", "a".repeat(150), "b".repeat(150), "c".repeat(150));
        let err = speak_message(&synthesizer, &text, None, "en-US")
            .await
            .unwrap_err();
        assert_eq!(err, SpeechError::Failed("device busy".to_string()));
        assert_eq!(synthesizer.spoken.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn player_reports_completion() {
        let synthesizer = Arc::new(RecordingSynthesizer::default());
        let (mut player, mut rx) = SpeechPlayer::new(synthesizer.clone());
        player.play("One. Two.".to_string(), None, "en-US".to_string());

        assert_eq!(rx.recv().await.unwrap(), Ok(1));
        assert_eq!(synthesizer.spoken.lock().unwrap().as_slice(), ["One. Two."]);
    }

    #[tokio::test]
    async fn recognizer_without_command_is_unsupported() {
        let recognizer = CommandRecognizer::new(Some("  ".to_string()));
        assert_eq!(
            recognizer.listen("en-US").await.unwrap_err().to_string(),
            RECOGNITION_UNSUPPORTED
        );
    }

    #[test]
    fn locales_map_language_names() {
        assert_eq!(speech_locale("English"), "en-US");
        assert_eq!(speech_locale("hindi"), "hi-IN");
        assert_eq!(speech_locale("fr-FR"), "fr-FR");
    }
}
