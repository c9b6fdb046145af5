//! Resolve fenced code blocks to one of the languages the execution backend
//! understands.

use std::fmt;

/// Every language a code block can be run (or previewed) as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Cpp,
    C,
    Java,
    Html,
    Css,
}

/// Fallback for tags and sources nothing else claims.
pub const DEFAULT_LANGUAGE: Language = Language::JavaScript;

/// Tags that carry no language information and should fall through to a scan
/// of the source itself.
const UNTAGGED: &[&str] = &["", "plaintext", "plain", "text", "txt"];

impl Language {
    pub const ALL: [Language; 8] = [
        Language::Python,
        Language::JavaScript,
        Language::TypeScript,
        Language::Cpp,
        Language::C,
        Language::Java,
        Language::Html,
        Language::Css,
    ];

    /// Resolve a block to a language. A real tag wins; an unrecognized tag
    /// maps to [`DEFAULT_LANGUAGE`]; a missing or generic tag falls back to
    /// [`Language::guess_from_source`].
    pub fn detect(tag: Option<&str>, source: &str) -> Language {
        let tag = tag.map(|t| t.trim().to_ascii_lowercase()).unwrap_or_default();
        if UNTAGGED.contains(&tag.as_str()) {
            return Self::guess_from_source(source);
        }
        Self::from_tag(&tag).unwrap_or(DEFAULT_LANGUAGE)
    }

    /// Case-insensitive lookup of a fence tag, including the usual aliases.
    pub fn from_tag(tag: &str) -> Option<Language> {
        let language = match tag.trim().to_ascii_lowercase().as_str() {
            "python" | "py" | "python3" => Language::Python,
            "javascript" | "js" | "node" | "jsx" | "mjs" => Language::JavaScript,
            "typescript" | "ts" | "tsx" => Language::TypeScript,
            "cpp" | "c++" | "cc" | "cxx" | "hpp" => Language::Cpp,
            "c" | "h" => Language::C,
            "java" => Language::Java,
            "html" | "htm" | "xhtml" => Language::Html,
            "css" => Language::Css,
            _ => return None,
        };
        Some(language)
    }

    /// Scan the source for tokens that give the language away. Checks run in a
    /// fixed order, so ambiguous sources resolve deterministically.
    pub fn guess_from_source(source: &str) -> Language {
        let has = |needle: &str| source.contains(needle);

        if has("<html>") || has("<body>") {
            Language::Html
        } else if has("body {") || has("@media") {
            Language::Css
        } else if has("function") || has("var ") || has("let ") || has("const ") {
            Language::JavaScript
        } else if has(": ") || has("interface ") || has("type ") {
            Language::TypeScript
        } else if has("def ") || has("print(") {
            Language::Python
        } else if has("int main()") || has("#include") {
            Language::Cpp
        } else if has("public static void main(String[] args)") {
            Language::Java
        } else {
            DEFAULT_LANGUAGE
        }
    }

    /// Numeric language code the execution backend expects.
    pub fn judge_id(self) -> u32 {
        match self {
            Language::Python => 71,
            Language::JavaScript => 63,
            Language::TypeScript => 74,
            Language::Cpp => 54,
            Language::C => 50,
            Language::Java => 62,
            Language::Html => 42,
            Language::Css => 41,
        }
    }

    /// Markup, styling and script render as a document instead of running
    /// remotely.
    pub fn is_renderable(self) -> bool {
        matches!(self, Language::Html | Language::Css | Language::JavaScript)
    }

    pub fn tag(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Cpp => "cpp",
            Language::C => "c",
            Language::Java => "java",
            Language::Html => "html",
            Language::Css => "css",
        }
    }

    pub fn file_extension(self) -> &'static str {
        match self {
            Language::Python => "py",
            Language::JavaScript => "js",
            Language::TypeScript => "ts",
            Language::Cpp => "cpp",
            Language::C => "c",
            Language::Java => "java",
            Language::Html => "html",
            Language::Css => "css",
        }
    }

    /// Language implied by a file extension, used when running files directly.
    pub fn from_extension(extension: &str) -> Option<Language> {
        Self::ALL
            .into_iter()
            .find(|language| language.file_extension().eq_ignore_ascii_case(extension))
            .or_else(|| Self::from_tag(extension))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
