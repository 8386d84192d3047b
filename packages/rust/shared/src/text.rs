//! Small text helpers shared by prompt assembly and previews.

/// Marker appended when text was cut.
pub const ELLIPSIS: &str = "...";

/// Truncate `text` to at most `max_chars` characters, appending `...` only
/// when something was actually removed. Always cuts on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => format!("{}{ELLIPSIS}", &text[..byte_index]),
        None => text.to_string(),
    }
}

/// Count whitespace-delimited words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
