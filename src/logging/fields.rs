//! Field helpers for structured logging

/// Default number of characters kept by [`preview`] callers
pub const PREVIEW_CHARS: usize = 80;

/// Shorten user content for a log line.
///
/// Cuts on a character boundary and appends `…` when anything was dropped.
///
/// # Examples
///
/// ```
/// use memocha::logging::preview;
///
/// assert_eq!(preview("hello", 10), "hello");
/// assert_eq!(preview("hello world", 5), "hello…");
/// ```
pub fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}
