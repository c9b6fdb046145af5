use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tempfile::TempDir;
use tracing::debug;

use super::language::Language;
use crate::api::judge::SubmissionResult;

/// Shown when a run produced neither stdout nor stderr.
pub const NO_OUTPUT: &str = "No output";

/// Restricts the preview to inline styles/scripts and remote images.
const PREVIEW_CSP: &str =
    "default-src 'none'; style-src 'unsafe-inline'; script-src 'unsafe-inline'; img-src https: data:";

/// Markup, styles and script assembled into one standalone page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviewDocument {
    pub html: String,
    pub css: String,
    pub js: String,
}

impl PreviewDocument {
    /// Place a single block in the slot its language belongs to.
    pub fn from_block(language: Language, source: &str) -> Self {
        let mut document = Self::default();
        document.add(language, source);
        document
    }

    /// Combine complementary blocks (typically one each of HTML, CSS and
    /// JavaScript). Blocks for the same slot are concatenated in order;
    /// non-document languages are skipped.
    pub fn from_blocks<'a>(blocks: impl IntoIterator<Item = (Language, &'a str)>) -> Self {
        let mut document = Self::default();
        for (language, source) in blocks {
            document.add(language, source);
        }
        document
    }

    fn add(&mut self, language: Language, source: &str) {
        let slot = match language {
            Language::Html => &mut self.html,
            Language::Css => &mut self.css,
            Language::JavaScript => &mut self.js,
            _ => return,
        };
        if !slot.is_empty() {
            slot.push('\n');
        }
        slot.push_str(source);
    }

    pub fn is_empty(&self) -> bool {
        self.html.is_empty() && self.css.is_empty() && self.js.is_empty()
    }

    /// Render the page. Markup is placed as-is; an empty body gets an `#app`
    /// mount point so scripts have somewhere to draw.
    pub fn to_html(&self) -> String {
        let body = if self.html.is_empty() {
            r#"<div id="app"></div>"#
        } else {
            self.html.as_str()
        };
        format!(
            "<!DOCTYPE html>\n<html>\n  <head>\n    <meta charset=\"utf-8\">\n    <meta http-equiv=\"Content-Security-Policy\" content=\"{PREVIEW_CSP}\">\n    <style>{css}</style>\n  </head>\n  <body>\n    {body}\n    <script>{js}</script>\n  </body>\n</html>\n",
            css = self.css,
            js = self.js,
        )
    }
}

/// What the UI shows once a run is over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedResult {
    Preview(PreviewDocument),
    Output(String),
}

/// Text for the output panel: stdout when non-empty, else stderr when
/// non-empty, else [`NO_OUTPUT`].
pub fn output_text(result: &SubmissionResult) -> String {
    [result.stdout(), result.stderr()]
        .into_iter()
        .find(|text| !text.is_empty())
        .unwrap_or(NO_OUTPUT)
        .to_string()
}

/// Route a finished run to the preview surface or the output panel.
pub fn render_result(
    language: Language,
    source: &str,
    result: &SubmissionResult,
) -> RenderedResult {
    if language.is_renderable() {
        RenderedResult::Preview(PreviewDocument::from_block(language, source))
    } else {
        RenderedResult::Output(output_text(result))
    }
}

/// An isolated place to display preview documents.
pub trait PreviewSurface {
    /// Display `document`, returning where it can be found.
    fn show(&mut self, document: &PreviewDocument) -> Result<PathBuf, String>;
}

/// Writes each preview to its own file in a private temp directory and hands
/// it to the system browser.
pub struct BrowserPreview {
    dir: Option<TempDir>,
    open_in_browser: bool,
    rendered: usize,
}

impl BrowserPreview {
    pub fn new(open_in_browser: bool) -> Self {
        Self {
            dir: None,
            open_in_browser,
            rendered: 0,
        }
    }

    fn dir(&mut self) -> Result<&Path, String> {
        if self.dir.is_none() {
            let dir = tempfile::Builder::new()
                .prefix("polychat-preview-")
                .tempdir()
                .map_err(|err| format!("Failed to create preview directory: {err}"))?;
            self.dir = Some(dir);
        }
        match &self.dir {
            Some(dir) => Ok(dir.path()),
            None => Err("Preview directory unavailable".to_string()),
        }
    }
}

impl PreviewSurface for BrowserPreview {
    fn show(&mut self, document: &PreviewDocument) -> Result<PathBuf, String> {
        self.rendered += 1;
        let name = format!("preview-{}.html", self.rendered);
        let path = self.dir()?.join(name);
        fs::write(&path, document.to_html())
            .map_err(|err| format!("Failed to write preview: {err}"))?;
        debug!(path = %path.display(), "wrote preview document");

        if self.open_in_browser {
            open_path(&path)?;
        }
        Ok(path)
    }
}

/// Hand a file to the platform's default opener.
pub fn open_path(path: &Path) -> Result<(), String> {
    #[cfg(target_os = "macos")]
    {
        return run_opener("open", &[], path);
    }
    #[cfg(target_os = "windows")]
    {
        return run_opener("cmd", &["/C", "start", ""], path);
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        if run_opener("xdg-open", &[], path).is_ok() {
            return Ok(());
        }
        run_opener("gio", &["open"], path)
            .map_err(|_| "No opener found (install xdg-utils)".to_string())
    }
}

fn run_opener(cmd: &str, args: &[&str], path: &Path) -> Result<(), String> {
    match Command::new(cmd)
        .args(args)
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
    {
        Ok(status) if status.success() => Ok(()),
        Ok(_) => Err(format!("Opener `{cmd}` failed")),
        Err(_) => Err(format!("Opener `{cmd}` not available")),
    }
}
