//! Image identifiers, target formats and the transport encoding of image bytes.

use base64::{Engine as _, engine::general_purpose};
use serde::Serialize;
use std::fmt;

/// Formats the pipeline converts every accepted source into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetFormat {
    Png,
    Gif,
}

impl TargetFormat {
    /// File extension and path segment used by the conversion API.
    pub fn extension(self) -> &'static str {
        match self {
            TargetFormat::Png => "png",
            TargetFormat::Gif => "gif",
        }
    }

    /// Destination key for a converted object, e.g. `sunset.png`.
    pub fn output_key(self, base_name: &str) -> String {
        format!("{}.{}", base_name, self.extension())
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Base name and source format derived from an object key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageIdentifier {
    pub base_name: String,
    pub source_format: String,
}

/// Base64 text of an image, scoped to one pipeline run.
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedImage(String);

impl EncodedImage {
    pub fn encode(bytes: &[u8]) -> Self {
        Self(general_purpose::STANDARD.encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length of the encoded text, not of the original bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[cfg(test)]
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        general_purpose::STANDARD.decode(&self.0)
    }
}

// Payloads can be megabytes of base64; keep them out of logs.
impl fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncodedImage({} chars)", self.0.len())
    }
}
