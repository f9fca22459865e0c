//! Text cleanup applied to record text before chunking.
//!
//! [`normalize`] is the only transformation the chunker relies on. The
//! remaining helpers are small, char-safe utilities used when presenting
//! results.

use std::sync::LazyLock;

use regex::Regex;

/// Everything outside word characters, whitespace, the Turkish alphabet and
/// `. , ! ? ( ) : ; / -`.
static DISALLOWED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^\w\sğüşıöçĞÜŞİÖÇ.,!?():;/\-]").expect("static pattern is valid")
});

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("static pattern is valid"));

static SENTENCE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+").expect("static pattern is valid"));

/// Clean raw record text.
///
/// Removes characters outside the allow-list, collapses every whitespace run
/// to a single space and trims both ends. Character removal happens first so
/// that a removed symbol between two spaces cannot leave a double space
/// behind; this keeps the function idempotent.
///
/// # Example
///
/// ```rust
/// use tarih_rag::normalize::normalize;
///
/// assert_eq!(normalize("  Çanakkale   Savaşı *1915*  "), "Çanakkale Savaşı 1915");
/// ```
pub fn normalize(text: &str) -> String {
    let allowed = DISALLOWED.replace_all(text, "");
    let collapsed = WHITESPACE_RUN.replace_all(&allowed, " ");
    collapsed.trim().to_string()
}

/// Truncate `text` to at most `max_chars` characters, ending with `suffix` when cut.
///
/// Counts Unicode scalar values, so multi-byte letters are never split.
pub fn truncate_text(text: &str, max_chars: usize, suffix: &str) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(suffix.chars().count());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(suffix);
    out
}

/// Number of whitespace-separated words.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Split on runs of `.`, `!` and `?`, dropping empty pieces.
pub fn extract_sentences(text: &str) -> Vec<String> {
    SENTENCE_END
        .split(text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
