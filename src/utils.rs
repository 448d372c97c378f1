//! String helpers shared by the feed and generation stages.
//!
//! Feed summaries arrive as escaped HTML snippets and the generation API
//! returns free-form text, so everything here is about cleaning and
//! bounding strings: markup stripping, whitespace collapsing, and
//! character-budget truncation.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn collapse_ws(s: &str) -> String {
    WHITESPACE.replace_all(s.trim(), " ").into_owned()
}

/// Reduce an HTML snippet to its visible text.
///
/// Feed item descriptions wrap the headline in anchors and font tags;
/// only the text matters for the prompt.
pub fn strip_html(s: &str) -> String {
    let fragment = Html::parse_fragment(s);
    let text = fragment.root_element().text().collect::<Vec<_>>().join(" ");
    collapse_ws(&text)
}

/// Truncate a string to at most `max` characters, never splitting a
/// multi-byte character.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and byte
/// count appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head = truncate_chars(s, max);
        format!("{}…(+{} bytes)", head, s.len() - head.len())
    }
}
