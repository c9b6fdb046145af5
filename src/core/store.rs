//! The single state container for an interactive session.

use std::fmt::Write as _;

use tracing::debug;

use crate::core::attachments::{ObjectStore, PendingImage};
use crate::core::builtin_models::ModelId;
use crate::core::markdown::code_blocks;
use crate::core::message::Message;
use crate::exec::buffer::CodeBlock;
use crate::exec::runner::{BlockRef, RunError, RunOutcome, RunRequest, RunState};

/// Messages, model selection, loading and error state, the pending
/// attachment, and the code blocks found in assistant replies.
pub struct ChatStore {
    messages: Vec<Message>,
    selected_model: ModelId,
    loading: bool,
    error: Option<String>,
    pending_image: Option<PendingImage>,
    objects: ObjectStore,
    blocks: Vec<CodeBlock>,
    next_run_id: u64,
}

impl ChatStore {
    pub fn new(selected_model: ModelId, objects: ObjectStore) -> Self {
        Self {
            messages: Vec::new(),
            selected_model,
            loading: false,
            error: None,
            pending_image: None,
            objects,
            blocks: Vec::new(),
            next_run_id: 1,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn selected_model(&self) -> ModelId {
        self.selected_model
    }

    pub fn select_model(&mut self, model: ModelId) {
        debug!(%model, "model selected");
        self.selected_model = model;
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_error(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn pending_image(&self) -> Option<&PendingImage> {
        self.pending_image.as_ref()
    }

    /// Returns the attachment it supersedes, if any.
    pub fn attach_image(&mut self, image: PendingImage) -> Option<PendingImage> {
        self.pending_image.replace(image)
    }

    pub fn take_pending_image(&mut self) -> Option<PendingImage> {
        self.pending_image.take()
    }

    pub fn objects(&self) -> &ObjectStore {
        &self.objects
    }

    pub fn objects_mut(&mut self) -> &mut ObjectStore {
        &mut self.objects
    }

    /// Append a message; code blocks in assistant replies become runnable.
    pub fn push_message(&mut self, message: Message) -> usize {
        let index = self.messages.len();
        self.messages.push(message);
        self.register_blocks(index);
        index
    }

    /// Replace one message's content in place. Its code blocks are rebuilt,
    /// so runs still in flight for the old blocks are ignored on completion.
    pub fn edit_message(&mut self, index: usize, content: impl Into<String>) -> bool {
        let Some(message) = self.messages.get_mut(index) else {
            return false;
        };
        message.content = content.into();
        self.blocks.retain(|block| block.location.message_index != index);
        self.register_blocks(index);
        true
    }

    fn register_blocks(&mut self, message_index: usize) {
        let Some(message) = self.messages.get(message_index) else {
            return;
        };
        if !message.is_assistant() {
            return;
        }
        let insert_at = self
            .blocks
            .iter()
            .position(|block| block.location.message_index > message_index)
            .unwrap_or(self.blocks.len());
        let new_blocks: Vec<CodeBlock> = code_blocks(&message.content)
            .into_iter()
            .enumerate()
            .map(|(block_index, (tag, code))| {
                let location = BlockRef {
                    message_index,
                    block_index,
                };
                CodeBlock::new(location, Some(tag), &code)
            })
            .collect();
        if !new_blocks.is_empty() {
            debug!(message_index, count = new_blocks.len(), "registered code blocks");
        }
        self.blocks.splice(insert_at..insert_at, new_blocks);
    }

    /// Remove every message, the error, the pending attachment and all
    /// stored objects.
    pub fn clear(&mut self) {
        debug!(
            messages = self.messages.len(),
            objects = self.objects.len(),
            "clearing chat"
        );
        self.messages.clear();
        self.blocks.clear();
        self.error = None;
        self.pending_image = None;
        self.loading = false;
        self.objects.release_all();
    }

    /// Drop the last user message and everything after it, returning that
    /// message so it can be sent again. Objects owned by the dropped replies
    /// are released; the user message keeps its attachments.
    pub fn take_last_user_turn(&mut self) -> Option<Message> {
        let index = self.messages.iter().rposition(Message::is_user)?;
        let removed: Vec<Message> = self.messages.drain(index..).collect();
        self.blocks.retain(|block| block.location.message_index < index);

        let mut removed = removed.into_iter();
        let user = removed.next()?;
        for reply in removed {
            for object in reply.objects() {
                self.objects.release(object);
            }
        }
        Some(user)
    }

    /// Code blocks in transcript order.
    pub fn blocks(&self) -> &[CodeBlock] {
        &self.blocks
    }

    pub fn block_mut(&mut self, location: BlockRef) -> Option<&mut CodeBlock> {
        self.blocks.iter_mut().find(|block| block.location == location)
    }

    /// Block by its 1-based position in the transcript.
    pub fn block_by_number(&self, number: usize) -> Option<&CodeBlock> {
        number.checked_sub(1).and_then(|index| self.blocks.get(index))
    }

    pub fn block_by_number_mut(&mut self, number: usize) -> Option<&mut CodeBlock> {
        number
            .checked_sub(1)
            .and_then(|index| self.blocks.get_mut(index))
    }

    /// Move block `number` to Executing and describe the run to spawn. A
    /// finished result is dismissed first; a run in flight is rejected.
    pub fn start_run(&mut self, number: usize) -> Result<RunRequest, StartRunError> {
        let run_id = self.next_run_id;
        let block = self
            .block_by_number_mut(number)
            .ok_or(StartRunError::NoSuchBlock(number))?;
        if block.runner.is_terminal() {
            block.runner.dismiss();
        }
        block.runner.begin(run_id).map_err(StartRunError::Run)?;
        let request = RunRequest {
            block: block.location,
            run_id,
            language: block.language(),
            source: block.source().to_string(),
        };
        self.next_run_id += 1;
        Ok(request)
    }

    /// Apply a finished run. Returns the block's new state, or `None` when
    /// the outcome no longer matches the block's current run.
    pub fn apply_run_outcome(&mut self, outcome: RunOutcome) -> Option<&RunState> {
        let location = outcome.block;
        let run_id = outcome.run_id;
        let block = self.block_mut(location)?;
        if block.runner.complete(run_id, outcome.into_rendered()) {
            Some(block.runner.state())
        } else {
            debug!(?location, run_id, "dropped stale run outcome");
            None
        }
    }

    /// Plain-text transcript, one `role: content` paragraph per message.
    pub fn transcript(&self) -> String {
        let mut text = String::new();
        for message in &self.messages {
            let speaker = match message.model {
                Some(model) if message.is_assistant() => model.to_string(),
                _ => message.role.to_string(),
            };
            let _ = writeln!(text, "{speaker}: {}", message.content);
            for attachment in &message.attachments {
                let _ = writeln!(text, "  [attached {}]", attachment.mime);
            }
            let _ = writeln!(text);
        }
        text
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartRunError {
    NoSuchBlock(usize),
    Run(RunError),
}

impl std::fmt::Display for StartRunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StartRunError::NoSuchBlock(number) => write!(f, "No code block #{number}"),
            StartRunError::Run(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for StartRunError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ClientError;
    use crate::core::attachments::Attachment;
    use crate::core::message::MessageMetadata;
    use crate::exec::render::RenderedResult;
    use crate::exec::Language;

    fn store() -> ChatStore {
        ChatStore::new(ModelId::Gemini, ObjectStore::new().unwrap())
    }

    fn reply(content: &str) -> Message {
        Message::assistant(content, ModelId::Gemini, MessageMetadata::default())
    }

    const TWO_BLOCKS: &str = "```python\nprint(\"hi\")\n```\n\nand\n\n```css\nbody { color: red; }\n```";

    #[test]
    fn assistant_replies_register_code_blocks_in_order() {
        let mut store = store();
        store.push_message(Message::user("```rust\nfn main() {}\n```"));
        store.push_message(reply(TWO_BLOCKS));

        assert_eq!(store.blocks().len(), 2);
        let first = store.block_by_number(1).unwrap();
        assert_eq!(first.location, BlockRef { message_index: 1, block_index: 0 });
        assert_eq!(first.language(), Language::Python);
        assert_eq!(store.block_by_number(2).unwrap().language(), Language::Css);
        assert!(store.block_by_number(0).is_none());
        assert!(store.block_by_number(3).is_none());
    }

    #[test]
    fn editing_a_message_rebuilds_its_blocks_in_place() {
        let mut store = store();
        store.push_message(reply("```python\nprint(1)\n```"));
        store.push_message(reply("```java\nclass A {}\n```"));
        assert!(store.edit_message(0, TWO_BLOCKS));

        let languages: Vec<Language> = store.blocks().iter().map(CodeBlock::language).collect();
        assert_eq!(languages, vec![Language::Python, Language::Css, Language::Java]);
        assert_eq!(store.messages()[0].content, TWO_BLOCKS);
        assert!(!store.edit_message(9, "nothing"));
    }

    #[test]
    fn runs_are_rejected_while_executing_and_stale_outcomes_dropped() {
        let mut store = store();
        store.push_message(reply("```python\nprint(\"hi\")\n```"));

        let request = store.start_run(1).unwrap();
        assert_eq!(request.language, Language::Python);
        assert_eq!(request.source, "print(\"hi\")");
        assert_eq!(
            store.start_run(1).unwrap_err(),
            StartRunError::Run(RunError::AlreadyRunning)
        );
        assert_eq!(store.start_run(5).unwrap_err(), StartRunError::NoSuchBlock(5));

        let stale = RunOutcome {
            block: request.block,
            run_id: request.run_id + 100,
            result: Ok(RenderedResult::Output("late".to_string())),
        };
        assert!(store.apply_run_outcome(stale).is_none());

        let outcome = RunOutcome {
            block: request.block,
            run_id: request.run_id,
            result: Err(ClientError::Timeout { attempts: 10 }),
        };
        match store.apply_run_outcome(outcome) {
            Some(RunState::ShowingOutput(text)) => assert!(text.starts_with("Error: ")),
            other => panic!("unexpected state: {other:?}"),
        }

        // A finished result is dismissed by the next run.
        let again = store.start_run(1).unwrap();
        assert!(again.run_id > request.run_id);
    }

    #[test]
    fn take_last_user_turn_releases_reply_objects() {
        let mut store = store();
        let upload = store.objects_mut().create(b"png", "png").unwrap();
        let generated = store.objects_mut().create(b"gen", "png").unwrap();

        store.push_message(Message::user("first"));
        store.push_message(reply("ok"));
        store.push_message(Message::user("draw").with_attachment(Attachment {
            object: upload,
            mime: "image/png".to_string(),
        }));
        store.push_message(Message::assistant(
            "Here's the generated image:\n\n```js\nx\n```",
            ModelId::FluxAi,
            MessageMetadata {
                image: Some(generated),
                ..MessageMetadata::default()
            },
        ));
        assert_eq!(store.blocks().len(), 1);

        let user = store.take_last_user_turn().unwrap();
        assert_eq!(user.content, "draw");
        assert_eq!(store.messages().len(), 2);
        assert!(store.blocks().is_empty());
        assert!(store.objects().path(generated).is_none());
        assert!(store.objects().path(upload).is_some());
    }

    #[test]
    fn take_last_user_turn_without_user_messages_is_none() {
        let mut store = store();
        store.push_message(Message::system("welcome"));
        assert!(store.take_last_user_turn().is_none());
        assert_eq!(store.messages().len(), 1);
    }

    #[test]
    fn clear_resets_everything() {
        let mut store = store();
        store.objects_mut().create(b"x", "png").unwrap();
        store.push_message(reply("```python\n1\n```"));
        store.set_error("boom");
        store.attach_image(PendingImage {
            name: "a.png".to_string(),
            mime: "image/png",
            bytes: vec![1],
        });

        store.clear();
        assert!(store.messages().is_empty());
        assert!(store.blocks().is_empty());
        assert!(store.error().is_none());
        assert!(store.pending_image().is_none());
        assert!(store.objects().is_empty());
    }

    #[test]
    fn transcript_names_models_and_attachments() {
        let mut store = store();
        let object = store.objects_mut().create(b"jpg", "jpg").unwrap();
        store.push_message(Message::user("hi").with_attachment(Attachment {
            object,
            mime: "image/jpeg".to_string(),
        }));
        store.push_message(reply("hello"));
        assert_eq!(
            store.transcript(),
            "user: hi\n  [attached image/jpeg]\n\ngemini: hello\n\n"
        );
    }
}
