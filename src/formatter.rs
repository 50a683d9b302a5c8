//! Paragraph post-processing for the winning completion text.
//!
//! The transform is not idempotent: running it over its own output wraps the
//! `<p>` markup a second time. The orchestrator applies it exactly once.

use std::sync::LazyLock;

use regex::Regex;

/// `-` or `\-` list marker at the start of a line, with the spacing after it
///
/// A dash that ends its line is a marker too; it takes its own line break
/// with it, but never a second one, so paragraphs stay apart.
static LIST_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[ \t]*\\?-(?:[ \t]*(?:\r?\n|$)|[ \t]+)").expect("list marker pattern is valid")
});

/// A line break, optional whitespace, and another line break
static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("paragraph break pattern is valid"));

/// Normalize completion text into `<p>`-wrapped paragraphs.
///
/// ```
/// use ai_fallback::formatter::format_paragraphs;
///
/// assert_eq!(format_paragraphs("- a\n\nb"), "<p>a</p><p>b</p>");
/// ```
pub fn format_paragraphs(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let unmarked = LIST_MARKER.replace_all(trimmed, "");

    PARAGRAPH_BREAK
        .split(&unmarked)
        .map(str::trim)
        .filter(|group| !group.is_empty())
        .map(|group| format!("<p>{}</p>", group))
        .collect()
}
