//! Pure helpers deriving identifiers from an object key.

use crate::models::image::ImageIdentifier;

/// Source format accepted by the pipeline.
pub const CONVERTIBLE_FORMAT: &str = "jpg";

/// True iff the piece after the first `.` of the whole key is exactly `jpg`.
///
/// This is a positional check, not a suffix match: `my.photo.jpg` yields
/// `photo` and is rejected, and `JPG` does not match.
pub fn is_convertible_source(key: &str) -> bool {
    key.split('.').nth(1) == Some(CONVERTIBLE_FORMAT)
}

/// Last path segment up to its first `.`. A key without `/` is one segment.
pub fn derive_base_name(key: &str) -> String {
    let segment = last_segment(key);
    segment.split('.').next().unwrap_or(segment).to_string()
}

/// Base name plus the text after the first `.` of the last path segment.
pub fn derive_identifier(key: &str) -> ImageIdentifier {
    let source_format = last_segment(key)
        .split_once('.')
        .map(|(_, format)| format)
        .unwrap_or_default();

    ImageIdentifier {
        base_name: derive_base_name(key),
        source_format: source_format.to_string(),
    }
}

fn last_segment(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}
