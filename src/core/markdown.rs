//! Structure mined from assistant replies: fenced code, tables, video links
//! and reasoning spans.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

/// Tag recorded for fences that declare no language.
pub const PLAIN_TAG: &str = "plaintext";

fn parser_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Prose(String),
    Code { language: String, code: String },
}

/// Language hint of a fence: the first word of its info string.
fn fence_language(kind: &CodeBlockKind<'_>) -> String {
    match kind {
        CodeBlockKind::Fenced(info) => info
            .split_ascii_whitespace()
            .next()
            .filter(|tag| !tag.is_empty())
            .unwrap_or(PLAIN_TAG)
            .to_string(),
        CodeBlockKind::Indented => PLAIN_TAG.to_string(),
    }
}

/// Split `text` into prose and fenced code, in order. Code is trimmed; prose
/// keeps its markdown source so it can be rendered later.
pub fn split_code_blocks(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut prose_start = 0;
    let mut current: Option<(String, String)> = None;

    for (event, range) in Parser::new_ext(text, parser_options()).into_offset_iter() {
        match event {
            Event::Start(Tag::CodeBlock(kind @ CodeBlockKind::Fenced(_))) => {
                push_prose(&mut segments, &text[prose_start..range.start]);
                current = Some((fence_language(&kind), String::new()));
                prose_start = range.end;
            }
            Event::Text(chunk) => {
                if let Some((_, code)) = current.as_mut() {
                    code.push_str(&chunk);
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some((language, code)) = current.take() {
                    segments.push(Segment::Code {
                        language,
                        code: code.trim().to_string(),
                    });
                    prose_start = range.end;
                }
            }
            _ => {}
        }
    }
    push_prose(&mut segments, &text[prose_start.min(text.len())..]);
    segments
}

fn push_prose(segments: &mut Vec<Segment>, prose: &str) {
    let trimmed = prose.trim();
    if !trimmed.is_empty() {
        segments.push(Segment::Prose(trimmed.to_string()));
    }
}

/// Fenced code blocks only, as `(language tag, code)`.
pub fn code_blocks(text: &str) -> Vec<(String, String)> {
    split_code_blocks(text)
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Code { language, code } => Some((language, code)),
            Segment::Prose(_) => None,
        })
        .collect()
}

/// Every GFM table in `text` as tab-separated rows, header first.
pub fn extract_tables(text: &str) -> Vec<String> {
    let mut tables = Vec::new();
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut cell = String::new();
    let mut in_cell = false;

    for event in Parser::new_ext(text, parser_options()) {
        match event {
            Event::Start(Tag::Table(_)) => rows.clear(),
            Event::Start(Tag::TableCell) => {
                cell.clear();
                in_cell = true;
            }
            Event::End(TagEnd::TableCell) => {
                row.push(cell.trim().to_string());
                in_cell = false;
            }
            Event::End(TagEnd::TableHead) | Event::End(TagEnd::TableRow) => {
                rows.push(std::mem::take(&mut row));
            }
            Event::End(TagEnd::Table) => {
                let tsv = rows
                    .iter()
                    .map(|cells| cells.join("\t"))
                    .collect::<Vec<_>>()
                    .join("\n");
                tables.push(tsv);
            }
            Event::Text(chunk) | Event::Code(chunk) if in_cell => cell.push_str(&chunk),
            Event::SoftBreak | Event::HardBreak if in_cell => cell.push(' '),
            _ => {}
        }
    }
    tables
}

/// A YouTube link and the URL that embeds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YouTubeLink {
    pub url: String,
    pub embed_url: String,
}

const MIN_YOUTUBE_ID: usize = 11;

fn youtube_id(rest: &str) -> Option<&str> {
    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
        .unwrap_or(rest.len());
    let id = &rest[..end];
    (id.len() >= MIN_YOUTUBE_ID).then_some(id)
}

fn parse_youtube(token: &str) -> Option<YouTubeLink> {
    let bare = token
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_start_matches("www.");

    let (id, embed_url) = if let Some(rest) = bare.strip_prefix("youtube.com/watch?v=") {
        let id = youtube_id(rest)?;
        (id, format!("https://www.youtube.com/embed/{id}"))
    } else if let Some(rest) = bare.strip_prefix("youtube.com/playlist?list=") {
        let id = youtube_id(rest)?;
        (id, format!("https://www.youtube.com/embed/videoseries?list={id}"))
    } else if let Some(rest) = bare.strip_prefix("youtube.com/channel/") {
        let id = youtube_id(rest)?;
        (id, format!("https://www.youtube.com/embed/?channel={id}"))
    } else if let Some(rest) = bare.strip_prefix("youtu.be/") {
        let id = youtube_id(rest)?;
        (id, format!("https://www.youtube.com/embed/{id}"))
    } else {
        return None;
    };

    let prefix_len = token.len() - bare.len();
    let id_end = id.as_ptr() as usize - bare.as_ptr() as usize + id.len();
    Some(YouTubeLink {
        url: token[..prefix_len + id_end].to_string(),
        embed_url,
    })
}

/// Watch, short, playlist and channel links found anywhere in `text`.
pub fn youtube_links(text: &str) -> Vec<YouTubeLink> {
    text.split(|c: char| c.is_whitespace() || matches!(c, '(' | ')' | '<' | '>' | '[' | ']'))
        .filter_map(parse_youtube)
        .collect()
}

/// Remove every `<think>...</think>` span. An unterminated opening tag is
/// left as-is.
pub fn strip_think_tags(text: &str) -> String {
    const OPEN: &str = "<think>";
    const CLOSE: &str = "</think>";

    let mut output = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(OPEN) {
        let Some(close) = rest[start + OPEN.len()..].find(CLOSE) else {
            break;
        };
        output.push_str(&rest[..start]);
        rest = &rest[start + OPEN.len() + close + CLOSE.len()..];
    }
    output.push_str(rest);
    output
}
