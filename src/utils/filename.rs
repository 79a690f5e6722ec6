//! Safe filename generation utilities

/// Name used when a title has nothing usable left
pub const FALLBACK_NAME: &str = "video";

/// Reduce a title to characters that are safe in any filesystem and in a
/// Content-Disposition header: alphanumerics, space, hyphen, underscore.
pub fn sanitize_title(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();

    let trimmed = kept.trim();
    if trimmed.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Build the filename suggested to the user for a delivered file
pub fn to_safe_filename(title: &str, extension: &str) -> String {
    let stem = sanitize_title(title);
    let ext = extension.trim_start_matches('.');
    if ext.is_empty() {
        stem
    } else {
        format!("{}.{}", stem, ext)
    }
}
