use super::language::Language;
use super::runner::{BlockRef, CodeRunner};

/// Editable copy of a code block with linear undo/redo history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBuffer {
    history: Vec<String>,
    index: usize,
}

impl CodeBuffer {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            history: vec![initial.into()],
            index: 0,
        }
    }

    pub fn current(&self) -> &str {
        &self.history[self.index]
    }

    /// Replace the contents. Editing after an undo drops the redo tail;
    /// an edit that changes nothing is not recorded.
    pub fn edit(&mut self, content: impl Into<String>) -> bool {
        let content = content.into();
        if content == self.current() {
            return false;
        }
        self.history.truncate(self.index + 1);
        self.history.push(content);
        self.index += 1;
        true
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        self.index + 1 < self.history.len()
    }

    pub fn undo(&mut self) -> bool {
        if !self.can_undo() {
            return false;
        }
        self.index -= 1;
        true
    }

    pub fn redo(&mut self) -> bool {
        if !self.can_redo() {
            return false;
        }
        self.index += 1;
        true
    }

    pub fn is_modified(&self) -> bool {
        self.current() != self.history[0]
    }
}

/// A fenced code block found in an assistant message.
#[derive(Debug, Clone)]
pub struct CodeBlock {
    pub location: BlockRef,
    pub language_tag: Option<String>,
    pub buffer: CodeBuffer,
    pub runner: CodeRunner,
}

impl CodeBlock {
    pub fn new(location: BlockRef, language_tag: Option<String>, source: &str) -> Self {
        Self {
            location,
            language_tag,
            buffer: CodeBuffer::new(source),
            runner: CodeRunner::new(),
        }
    }

    /// Language of the current buffer contents. Recomputed on every call so
    /// edits that change an untagged block's shape are picked up.
    pub fn language(&self) -> Language {
        Language::detect(self.language_tag.as_deref(), self.buffer.current())
    }

    pub fn source(&self) -> &str {
        self.buffer.current()
    }

    /// Suggested file name for saving the block.
    pub fn file_name(&self) -> String {
        format!("code.{}", self.language().file_extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undo_and_redo_walk_the_history() {
        let mut buffer = CodeBuffer::new("a");
        assert!(buffer.edit("b"));
        assert!(buffer.edit("c"));

        assert!(buffer.undo());
        assert_eq!(buffer.current(), "b");
        assert!(buffer.undo());
        assert_eq!(buffer.current(), "a");
        assert!(!buffer.undo());

        assert!(buffer.redo());
        assert_eq!(buffer.current(), "b");
    }

    #[test]
    fn editing_after_undo_drops_the_redo_tail() {
        let mut buffer = CodeBuffer::new("a");
        buffer.edit("b");
        buffer.edit("c");
        buffer.undo();
        buffer.edit("d");

        assert!(!buffer.can_redo());
        assert_eq!(buffer.current(), "d");
        buffer.undo();
        assert_eq!(buffer.current(), "b");
    }

    #[test]
    fn unchanged_edits_are_not_recorded() {
        let mut buffer = CodeBuffer::new("same");
        assert!(!buffer.edit("same"));
        assert!(!buffer.can_undo());
        assert!(!buffer.is_modified());
    }

    const AT: BlockRef = BlockRef {
        message_index: 0,
        block_index: 0,
    };

    #[test]
    fn block_language_follows_the_buffer() {
        let mut block = CodeBlock::new(AT, None, "print('hi')");
        assert_eq!(block.language(), Language::Python);
        block.buffer.edit("<html><body>hi</body></html>");
        assert_eq!(block.language(), Language::Html);
        assert_eq!(block.file_name(), "code.html");

        let tagged = CodeBlock::new(AT, Some("rust".into()), "fn main() {}");
        assert_eq!(tagged.language(), Language::JavaScript);
    }
}
