//! String normalization for titles, uploader names and file names

use std::path::Path;

/// Normalize a display string
///
/// Drops control characters, collapses whitespace runs into one space and
/// trims both ends.
pub fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .filter(|c| !c.is_control())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Sanitized file stem of a path, or an empty string
pub fn file_stem_title(path: &Path) -> String {
    path.file_stem()
        .map(|stem| sanitize(&stem.to_string_lossy()))
        .unwrap_or_default()
}

/// Turn a title into something safe to use as a file name
///
/// Path separators and characters reserved on common filesystems become
/// underscores; an empty result becomes `tracklist`.
pub fn sanitize_filename(title: &str) -> String {
    let cleaned: String = sanitize(title)
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            ' ' => '_',
            other => other,
        })
        .collect();

    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        "tracklist".to_string()
    } else {
        trimmed.to_string()
    }
}
