use regex::Regex;
use std::sync::OnceLock;

// Older narratives carried inline section markers from before the form had a
// single detailed development field.
fn legacy_header_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?i)INTRODUCCIÓN:|DESARROLLO DETALLADO:|CONCLUSIÓN:").ok())
        .as_ref()
}

/// Removes the legacy section markers (case-insensitive) and trims the result.
///
/// Applying it twice gives the same output as applying it once: removal can
/// splice two halves of a marker together, so the pass repeats until stable.
pub fn strip_legacy_headers(text: &str) -> String {
    let mut current = text.trim().to_string();
    let Some(pattern) = legacy_header_pattern() else {
        return current;
    };
    loop {
        let next = pattern.replace_all(&current, "");
        let next = next.trim();
        if next == current {
            return current;
        }
        current = next.to_string();
    }
}
