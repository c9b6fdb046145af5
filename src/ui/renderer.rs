//! Transcript rendering for the line-oriented session.
//!
//! Messages are turned into ANSI-styled lines. Prose goes through
//! pulldown-cmark when markdown is enabled; fenced code is drawn from the
//! store's code blocks, so edits and run results show up on the next redraw.

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use crate::core::markdown::{split_code_blocks, youtube_links, Segment, PLAIN_TAG};
use crate::core::message::{Message, MessageMetadata, Role};
use crate::core::store::ChatStore;
use crate::exec::buffer::CodeBlock;
use crate::exec::runner::{BlockRef, RunState};
use crate::utils::syntax::highlight_code_block;

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";
pub const ITALIC: &str = "\x1b[3m";
pub const STRIKE: &str = "\x1b[9m";
pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";

const RULE_WIDTH: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub markdown: bool,
    pub syntax: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            markdown: true,
            syntax: true,
        }
    }
}

pub fn paint(style: &str, text: &str) -> String {
    format!("{style}{text}{RESET}")
}

/// Render message `index` of the transcript as terminal lines.
pub fn render_message(store: &ChatStore, index: usize, options: RenderOptions) -> Vec<String> {
    let Some(message) = store.messages().get(index) else {
        return Vec::new();
    };
    let mut lines = vec![header(index, message)];

    match message.role {
        Role::Assistant => {
            render_assistant_body(store, index, message, options, &mut lines);
        }
        Role::User | Role::System => {
            if !message.content.is_empty() {
                lines.extend(message.content.lines().map(str::to_string));
            }
        }
    }

    for attachment in &message.attachments {
        let location = store
            .objects()
            .path(attachment.object)
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "released".to_string());
        lines.push(paint(DIM, &format!("  [attached {}: {location}]", attachment.mime)));
    }

    if let Some(metadata) = &message.metadata {
        if let Some(path) = metadata.image.and_then(|object| store.objects().path(object)) {
            lines.push(format!("  image: {}", path.display()));
        }
        if let Some(footer) = metadata_footer(metadata) {
            lines.push(paint(DIM, &footer));
        }
    }
    lines.push(String::new());
    lines
}

fn header(index: usize, message: &Message) -> String {
    let number = index + 1;
    match message.role {
        Role::User => paint(&format!("{BOLD}{CYAN}"), &format!("[{number}] You")),
        Role::Assistant => {
            let name = message
                .model
                .map(|model| model.info().display_name.as_str())
                .unwrap_or("Assistant");
            paint(&format!("{BOLD}{GREEN}"), &format!("[{number}] {name}"))
        }
        Role::System => paint(DIM, &format!("[{number}] system")),
    }
}

fn render_assistant_body(
    store: &ChatStore,
    index: usize,
    message: &Message,
    options: RenderOptions,
    lines: &mut Vec<String>,
) {
    let mut block_index = 0;
    for segment in split_code_blocks(&message.content) {
        match segment {
            Segment::Prose(prose) => {
                if options.markdown {
                    lines.extend(render_markdown(&prose));
                } else {
                    lines.extend(prose.lines().map(str::to_string));
                }
            }
            Segment::Code { language, code } => {
                let location = BlockRef {
                    message_index: index,
                    block_index,
                };
                block_index += 1;
                match block_number(store, location) {
                    Some((number, block)) => {
                        lines.extend(render_code_block(number, block, options));
                    }
                    None => lines.extend(plain_fence(&language, &code)),
                }
            }
        }
    }

    let videos = youtube_links(&message.content);
    for video in videos {
        lines.push(paint(YELLOW, &format!("  ▶ {}", video.embed_url)));
    }
}

/// Global 1-based number of the block at `location`.
fn block_number(store: &ChatStore, location: BlockRef) -> Option<(usize, &CodeBlock)> {
    store
        .blocks()
        .iter()
        .enumerate()
        .find(|(_, block)| block.location == location)
        .map(|(position, block)| (position + 1, block))
}

fn plain_fence(language: &str, code: &str) -> Vec<String> {
    let mut lines = vec![format!("```{language}")];
    lines.extend(code.lines().map(str::to_string));
    lines.push("```".to_string());
    lines
}

/// A code panel: a title with the block number and language, the current
/// buffer contents, then whatever the last run produced.
pub fn render_code_block(number: usize, block: &CodeBlock, options: RenderOptions) -> Vec<String> {
    let language = block.language();
    let edited = if block.buffer.is_modified() { " (edited)" } else { "" };
    let mut lines = vec![paint(
        DIM,
        &format!("┌─ #{number} {language}{edited}"),
    )];

    let hint = block
        .language_tag
        .as_deref()
        .filter(|tag| *tag != PLAIN_TAG)
        .unwrap_or(language.tag());
    let highlighted = options
        .syntax
        .then(|| highlight_code_block(hint, block.source()))
        .flatten();
    match highlighted {
        Some(text) => lines.extend(text.lines().map(|line| format!("│ {line}{RESET}"))),
        None => lines.extend(block.source().lines().map(|line| format!("│ {line}"))),
    }

    let verb = if language.is_renderable() { "render" } else { "run" };
    match block.runner.state() {
        RunState::Idle => lines.push(paint(
            DIM,
            &format!("└─ /run {number} to {verb}, /edit {number} to change"),
        )),
        RunState::Executing { .. } => lines.push(paint(YELLOW, "└─ running…")),
        RunState::ShowingPreview(_) => lines.push(paint(
            GREEN,
            &format!("└─ preview ready (/preview, /dismiss {number})"),
        )),
        RunState::ShowingOutput(output) => {
            lines.push(paint(DIM, "├─ output"));
            lines.extend(output.lines().map(|line| format!("│ {line}")));
            lines.push(paint(DIM, &format!("└─ /dismiss {number} to clear")));
        }
    }
    lines
}

/// "12 tokens · 3.4 tok/s · 1.20s · Completed"
pub fn metadata_footer(metadata: &MessageMetadata) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(tokens) = metadata.tokens {
        parts.push(format!("{tokens} tokens"));
    }
    if let Some(rate) = metadata.tokens_per_second {
        parts.push(format!("{rate:.1} tok/s"));
    }
    if let Some(seconds) = metadata.time_to_first_token {
        parts.push(format!("{seconds:.2}s"));
    }
    if let Some(reason) = &metadata.stop_reason {
        parts.push(reason.clone());
    }
    (!parts.is_empty()).then(|| format!("  {}", parts.join(" · ")))
}

fn markdown_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

#[derive(Default)]
struct MarkdownWriter {
    lines: Vec<String>,
    current: String,
    styles: Vec<&'static str>,
    lists: Vec<Option<u64>>,
    quote_depth: usize,
    link_targets: Vec<String>,
    table_row: Vec<String>,
    table_rows: Vec<Vec<String>>,
    in_cell: bool,
}

impl MarkdownWriter {
    fn push_style(&mut self, style: &'static str) {
        self.styles.push(style);
        self.current.push_str(style);
    }

    fn pop_style(&mut self) {
        self.styles.pop();
        self.current.push_str(RESET);
        for style in &self.styles {
            self.current.push_str(style);
        }
    }

    fn text(&mut self, text: &str) {
        if self.in_cell {
            if let Some(cell) = self.table_row.last_mut() {
                cell.push_str(text);
            }
            return;
        }
        if self.current.is_empty() && self.quote_depth > 0 {
            self.current.push_str(&"│ ".repeat(self.quote_depth));
        }
        self.current.push_str(text);
    }

    fn break_line(&mut self) {
        let line = std::mem::take(&mut self.current);
        self.lines.push(line);
        for style in &self.styles {
            self.current.push_str(style);
        }
    }

    fn end_block(&mut self) {
        if !self.current.is_empty() {
            self.break_line();
        }
        if self.lists.is_empty() && self.lines.last().is_some_and(|line| !line.is_empty()) {
            self.lines.push(String::new());
        }
    }

    fn flush_table(&mut self) {
        let rows = std::mem::take(&mut self.table_rows);
        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        let widths: Vec<usize> = (0..columns)
            .map(|column| {
                rows.iter()
                    .filter_map(|row| row.get(column))
                    .map(|cell| cell.chars().count())
                    .max()
                    .unwrap_or(0)
            })
            .collect();
        for (row_index, row) in rows.iter().enumerate() {
            let cells: Vec<String> = widths
                .iter()
                .enumerate()
                .map(|(column, width)| {
                    let cell = row.get(column).map(String::as_str).unwrap_or("");
                    format!("{cell:<width$}")
                })
                .collect();
            let line = cells.join(" │ ");
            if row_index == 0 {
                self.lines.push(paint(BOLD, &line));
                let rule: Vec<String> = widths.iter().map(|width| "─".repeat(*width)).collect();
                self.lines.push(rule.join("─┼─"));
            } else {
                self.lines.push(line);
            }
        }
        self.lines.push(String::new());
    }
}

/// Render markdown prose (no fenced code) as ANSI-styled lines.
pub fn render_markdown(text: &str) -> Vec<String> {
    let mut writer = MarkdownWriter::default();

    for event in Parser::new_ext(text, markdown_options()) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                let marker = match level {
                    HeadingLevel::H1 => "# ",
                    HeadingLevel::H2 => "## ",
                    _ => "### ",
                };
                writer.push_style(BOLD);
                writer.text(marker);
            }
            Event::End(TagEnd::Heading(_)) => {
                writer.pop_style();
                writer.end_block();
            }
            Event::End(TagEnd::Paragraph) => writer.end_block(),
            Event::Start(Tag::Emphasis) => writer.push_style(ITALIC),
            Event::Start(Tag::Strong) => writer.push_style(BOLD),
            Event::Start(Tag::Strikethrough) => writer.push_style(STRIKE),
            Event::End(TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough) => {
                writer.pop_style();
            }
            Event::Start(Tag::BlockQuote(_)) => writer.quote_depth += 1,
            Event::End(TagEnd::BlockQuote(_)) => {
                writer.quote_depth = writer.quote_depth.saturating_sub(1);
                writer.end_block();
            }
            Event::Start(Tag::List(start)) => {
                if !writer.current.is_empty() {
                    writer.break_line();
                }
                writer.lists.push(start);
            }
            Event::End(TagEnd::List(_)) => {
                writer.lists.pop();
                writer.end_block();
            }
            Event::Start(Tag::Item) => {
                if !writer.current.is_empty() {
                    writer.break_line();
                }
                let depth = writer.lists.len().saturating_sub(1);
                let bullet = match writer.lists.last_mut() {
                    Some(Some(next)) => {
                        let bullet = format!("{next}. ");
                        *next += 1;
                        bullet
                    }
                    _ => "• ".to_string(),
                };
                writer.text(&format!("{}{bullet}", "  ".repeat(depth)));
            }
            Event::End(TagEnd::Item) => {
                if !writer.current.is_empty() {
                    writer.break_line();
                }
            }
            Event::TaskListMarker(done) => writer.text(if done { "[x] " } else { "[ ] " }),
            Event::Start(Tag::Link { dest_url, .. }) => {
                writer.push_style(CYAN);
                writer.link_targets.push(dest_url.to_string());
            }
            Event::End(TagEnd::Link) => {
                writer.pop_style();
                if let Some(url) = writer.link_targets.pop() {
                    writer.text(&paint(DIM, &format!(" ({url})")));
                }
            }
            Event::Start(Tag::Table(_)) => writer.table_rows.clear(),
            Event::Start(Tag::TableRow | Tag::TableHead) => writer.table_row.clear(),
            Event::Start(Tag::TableCell) => {
                writer.table_row.push(String::new());
                writer.in_cell = true;
            }
            Event::End(TagEnd::TableCell) => writer.in_cell = false,
            Event::End(TagEnd::TableRow | TagEnd::TableHead) => {
                let row = std::mem::take(&mut writer.table_row);
                writer.table_rows.push(row);
            }
            Event::End(TagEnd::Table) => writer.flush_table(),
            Event::Code(code) => {
                if writer.in_cell {
                    writer.text(&code);
                } else {
                    writer.text(&paint(CYAN, &code));
                }
            }
            Event::Text(text) => {
                let mut pieces = text.split('\n').peekable();
                while let Some(piece) = pieces.next() {
                    writer.text(piece);
                    if pieces.peek().is_some() {
                        writer.break_line();
                    }
                }
            }
            Event::SoftBreak => writer.text(" "),
            Event::HardBreak => writer.break_line(),
            Event::Rule => {
                writer.lines.push(paint(DIM, &"─".repeat(RULE_WIDTH)));
                writer.lines.push(String::new());
            }
            Event::Html(html) | Event::InlineHtml(html) => writer.text(html.trim_end()),
            _ => {}
        }
    }

    if !writer.current.is_empty() {
        writer.break_line();
    }
    while writer.lines.last().is_some_and(|line| line.is_empty()) {
        writer.lines.pop();
    }
    writer.lines
}

/// Drop ANSI escape sequences.
pub fn strip_ansi(text: &str) -> String {
    let mut plain = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch == '\x1b' {
            for next in chars.by_ref() {
                if next.is_ascii_alphabetic() {
                    break;
                }
            }
        } else {
            plain.push(ch);
        }
    }
    plain
}
