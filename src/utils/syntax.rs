use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, MutexGuard, OnceLock};

use syntect::easy::HighlightLines;
use syntect::highlighting::ThemeSet;
use syntect::parsing::SyntaxSet;
use syntect::util::{as_24_bit_terminal_escaped, LinesWithEndings};

const CACHE_CAPACITY: usize = 64;
const RESET: &str = "\x1b[0m";

// Bounded FIFO cache of highlighted blocks keyed by (language, hash).
struct SimpleCache {
    map: HashMap<(String, u64), String>,
    order: VecDeque<(String, u64)>,
    cap: usize,
}

impl SimpleCache {
    fn new(cap: usize) -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            cap,
        }
    }

    fn get(&self, key: &(String, u64)) -> Option<String> {
        self.map.get(key).cloned()
    }

    fn put(&mut self, key: (String, u64), value: String) {
        if !self.map.contains_key(&key) {
            self.order.push_back(key.clone());
        }
        self.map.insert(key, value);
        while self.map.len() > self.cap {
            match self.order.pop_front() {
                Some(old) => {
                    self.map.remove(&old);
                }
                None => break,
            }
        }
    }
}

fn cache() -> MutexGuard<'static, SimpleCache> {
    static CACHE: OnceLock<Mutex<SimpleCache>> = OnceLock::new();
    CACHE
        .get_or_init(|| Mutex::new(SimpleCache::new(CACHE_CAPACITY)))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn hash_code(lang: &str, code: &str, theme: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    lang.hash(&mut hasher);
    code.hash(&mut hasher);
    theme.hash(&mut hasher);
    hasher.finish()
}

fn normalize_lang_hint(s: &str) -> String {
    let t = s.trim().to_ascii_lowercase();
    match t.as_str() {
        "py" | "python" => "python".into(),
        "bash" | "sh" | "zsh" | "shell" => "bash".into(),
        "js" | "javascript" | "jsx" => "javascript".into(),
        "ts" | "tsx" | "typescript" => "typescript".into(),
        "c++" | "cpp" | "cc" | "cxx" | "hpp" => "cpp".into(),
        "c" | "h" => "c".into(),
        "java" => "java".into(),
        "rust" | "rs" => "rust".into(),
        "html" | "htm" => "html".into(),
        "css" => "css".into(),
        "json" => "json".into(),
        "toml" => "toml".into(),
        "yaml" | "yml" => "yaml".into(),
        other => other.into(),
    }
}

/// True when `COLORFGBG` reports a light background (`fg;bg` with bg 7 or 15).
fn light_background() -> bool {
    std::env::var("COLORFGBG")
        .ok()
        .and_then(|value| value.rsplit(';').next().map(str::to_string))
        .is_some_and(|bg| bg == "7" || bg == "15")
}

pub(crate) fn pick_syntect_theme_name(light: bool) -> &'static str {
    if light {
        "InspiredGitHub"
    } else {
        "base16-ocean.dark"
    }
}

/// Highlight `code` for a 24-bit color terminal. Returns `None` when no
/// usable theme is available or a line fails to highlight.
pub fn highlight_code_block(lang_hint: &str, code: &str) -> Option<String> {
    static SYNTAX_SET: OnceLock<SyntaxSet> = OnceLock::new();
    static THEME_SET: OnceLock<ThemeSet> = OnceLock::new();
    let ps = SYNTAX_SET.get_or_init(SyntaxSet::load_defaults_newlines);
    let ts = THEME_SET.get_or_init(ThemeSet::load_defaults);

    let theme_name = pick_syntect_theme_name(light_background());
    let theme = ts
        .themes
        .get(theme_name)
        .or_else(|| ts.themes.get("base16-ocean.dark"))?;

    let lang_norm = normalize_lang_hint(lang_hint);
    let key = (lang_norm.clone(), hash_code(&lang_norm, code, theme_name));
    if let Some(hit) = cache().get(&key) {
        return Some(hit);
    }

    let syntax = ps
        .find_syntax_by_token(&lang_norm)
        .unwrap_or_else(|| ps.find_syntax_plain_text());
    let mut highlighter = HighlightLines::new(syntax, theme);

    let mut out = String::with_capacity(code.len() * 2);
    for line in LinesWithEndings::from(code) {
        let ranges = highlighter.highlight_line(line, ps).ok()?;
        out.push_str(&as_24_bit_terminal_escaped(&ranges, false));
    }
    out.push_str(RESET);

    cache().put(key, out.clone());
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highlighted_code_keeps_the_text() {
        let out = highlight_code_block("py", "print('hi')\n").unwrap();
        assert!(out.contains("\x1b[38;2;"));
        assert!(out.contains("print"));
        assert!(out.ends_with(RESET));
    }

    #[test]
    fn unknown_languages_fall_back_to_plain_text() {
        let out = highlight_code_block("no-such-language", "just words").unwrap();
        assert!(out.contains("just words"));
    }

    #[test]
    fn cache_evicts_oldest_entries() {
        let mut cache = SimpleCache::new(2);
        cache.put(("a".into(), 1), "one".into());
        cache.put(("b".into(), 2), "two".into());
        cache.put(("c".into(), 3), "three".into());
        assert!(cache.get(&("a".into(), 1)).is_none());
        assert_eq!(cache.get(&("c".into(), 3)).as_deref(), Some("three"));
    }

    #[test]
    fn theme_follows_background() {
        assert_eq!(pick_syntect_theme_name(true), "InspiredGitHub");
        assert_eq!(pick_syntect_theme_name(false), "base16-ocean.dark");
    }
}
