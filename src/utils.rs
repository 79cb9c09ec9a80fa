// src/utils.rs

/// Keep at most `max_chars` characters, never splitting a code point.
pub fn truncate_chars(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((idx, _)) => value[..idx].to_string(),
        None => value.to_string(),
    }
}

/// Turn a display name into an ASCII file name stem, one `_` per other character
pub fn sanitize_filename(input: &str) -> String {
    let sanitized: String = input
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();

    if sanitized.is_empty() {
        "cv".to_string()
    } else {
        sanitized
    }
}

/// Normalize a language key: `"Northern Sami"` -> `"northern_sami"`.
pub fn normalize_language_key(lang: &str) -> String {
    lang.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

/// Split on commas and return the first non-empty trimmed item.
pub fn first_list_item(value: &str) -> Option<&str> {
    value
        .split(',')
        .next()
        .map(str::trim)
        .filter(|item| !item.is_empty())
}
