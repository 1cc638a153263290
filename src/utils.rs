//! Utility functions for naming files and chapters.

/// Substitutions applied, in order, to anything used as a path component.
const PATH_SUBSTITUTIONS: [(&str, &str); 4] = [(": ", " - "), (":", "-"), ("?", "_"), ("/", "_")];

/// Extension used when the server does not declare a usable content type.
const FALLBACK_EXTENSION: &str = "jpg";

/// Makes a series name or chapter label safe to use as a directory or file name.
///
/// Each substitution is applied once over the whole string, left to right.
pub fn sanitize_path_component(name: &str) -> String {
    PATH_SUBSTITUTIONS
        .iter()
        .fold(name.to_string(), |acc, (from, to)| acc.replace(from, to))
}

/// Extracts the stable chapter identifier from a display label.
///
/// The identifier is the text before the first `-`, trimmed.
/// `"901 - The Storm"` becomes `"901"`.
pub fn chapter_id_from_label(label: &str) -> String {
    label.split('-').next().unwrap_or_default().trim().to_string()
}

/// Builds the file name for a downloaded page, e.g. `007.png`.
pub fn page_file_name(index: u32, extension: &str) -> String {
    format!("{:03}.{}", index, extension)
}

/// Derives a file extension from a `Content-Type` header value.
///
/// Uses the media subtype (`image/png` gives `png`), ignoring parameters.
pub fn extension_from_content_type(content_type: Option<&str>) -> String {
    content_type
        .and_then(|ct| ct.split(';').next())
        .and_then(|mime| mime.rsplit('/').next())
        .map(|sub| sub.trim().to_ascii_lowercase())
        .filter(|sub| !sub.is_empty() && sub.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string())
}
