//! Wire shapes of the remote conversion API.
//!
//! The API takes a single file under `File`/`FileValue` for PNG output and a
//! list under `Files`/`FileValues` for GIF output. The two shapes are modelled
//! as distinct parameter variants rather than one struct with optional fields.

use crate::models::image::{EncodedImage, TargetFormat};
use serde::{Deserialize, Serialize};

/// File name announced to the API for the uploaded source.
pub const UPLOAD_FILE_NAME: &str = "source.jpg";

/// One conversion of one source image into one target format.
#[derive(Debug, Clone, Copy)]
pub struct ConversionRequest<'a> {
    pub target: TargetFormat,
    pub source: &'a EncodedImage,
    pub store_remotely: bool,
}

impl<'a> ConversionRequest<'a> {
    pub fn new(target: TargetFormat, source: &'a EncodedImage, store_remotely: bool) -> Self {
        Self {
            target,
            source,
            store_remotely,
        }
    }

    /// Build the JSON body for this request's target format.
    pub fn payload(&self) -> ConvertPayload<'a> {
        let file = FileValue {
            name: UPLOAD_FILE_NAME,
            data: self.source.as_str(),
        };

        let source = match self.target {
            TargetFormat::Png => Parameter::SingleFile {
                name: "File",
                file_value: file,
            },
            TargetFormat::Gif => Parameter::MultiFile {
                name: "Files",
                file_values: vec![file],
            },
        };

        ConvertPayload {
            parameters: vec![
                source,
                Parameter::Flag {
                    name: "StoreFile",
                    value: self.store_remotely,
                },
            ],
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConvertPayload<'a> {
    #[serde(rename = "Parameters")]
    pub parameters: Vec<Parameter<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Parameter<'a> {
    SingleFile {
        #[serde(rename = "Name")]
        name: &'static str,
        #[serde(rename = "FileValue")]
        file_value: FileValue<'a>,
    },
    MultiFile {
        #[serde(rename = "Name")]
        name: &'static str,
        #[serde(rename = "FileValues")]
        file_values: Vec<FileValue<'a>>,
    },
    Flag {
        #[serde(rename = "Name")]
        name: &'static str,
        #[serde(rename = "Value")]
        value: bool,
    },
}

#[derive(Debug, Serialize)]
pub struct FileValue<'a> {
    #[serde(rename = "Name")]
    pub name: &'a str,
    #[serde(rename = "Data")]
    pub data: &'a str,
}

/// Response body of a conversion call.
#[derive(Debug, Deserialize)]
pub struct ConvertResponse {
    #[serde(rename = "Files", default)]
    pub files: Vec<ConvertedFile>,
}

#[derive(Debug, Deserialize)]
pub struct ConvertedFile {
    #[serde(rename = "FileName")]
    pub file_name: Option<String>,
    #[serde(rename = "FileSize")]
    pub file_size: Option<u64>,
    /// Present when the API stored the result (`StoreFile: true`).
    #[serde(rename = "Url")]
    pub url: Option<String>,
    /// Base64 result body, present when the result is returned inline.
    #[serde(rename = "FileData")]
    pub file_data: Option<String>,
}
