//! Utility functions for string manipulation and logging.

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` bytes with an ellipsis and byte
/// count indicator appended. Truncation backs up to the nearest character
/// boundary so multi-byte titles never split mid-character.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while cut > 0 && !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Convert a title to a URL-friendly slug.
///
/// Lowercases, removes everything that is not alphanumeric/space/hyphen,
/// and joins words with single hyphens. Used to derive episode website
/// URLs from feed titles.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(slugify_title("El precio del agua"), "el-precio-del-agua");
/// ```
pub fn slugify_title(title: &str) -> String {
    title
        .to_lowercase()
        .replace(|c: char| !c.is_alphanumeric() && c != ' ' && c != '-', "")
        .split(|c: char| c == ' ' || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
