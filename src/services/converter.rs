//! Client for the remote JPEG conversion API.
//!
//! Every call is fire-once: one POST to start the conversion, one GET to
//! download the stored result. Any failure along the way is a single
//! `ConversionError` for the caller to contain.

use crate::models::conversion::{ConversionRequest, ConvertResponse};
use crate::models::image::{EncodedImage, TargetFormat};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Upper bound on how much of an error body is kept in the error message.
const MAX_ERROR_BODY_LEN: usize = 512;

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("conversion request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("conversion service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed conversion response: {0}")]
    MalformedResponse(String),
    #[error("conversion response has no result file")]
    MissingFile,
    #[error("result download returned {0}")]
    DownloadStatus(u16),
    #[error("inline result is not valid base64: {0}")]
    InvalidInlineData(#[from] base64::DecodeError),
}

impl From<reqwest::Error> for ConversionError {
    // Request URLs carry the API secret as a query parameter.
    fn from(err: reqwest::Error) -> Self {
        ConversionError::Transport(err.without_url())
    }
}

/// Converts an encoded JPEG into one target format.
#[async_trait]
pub trait Converter: Send + Sync {
    async fn convert(
        &self,
        target: TargetFormat,
        source: &EncodedImage,
    ) -> Result<Bytes, ConversionError>;
}

#[derive(Clone)]
pub struct ConvertApiClient {
    http: reqwest::Client,
    base_url: String,
    secret: String,
    store_remotely: bool,
}

impl ConvertApiClient {
    /// `timeout` bounds each request (conversion and download) individually.
    pub fn new(
        base_url: impl Into<String>,
        secret: impl Into<String>,
        timeout: Duration,
        store_remotely: bool,
    ) -> Result<Self, ConversionError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url: String = base_url.into();

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            secret: secret.into(),
            store_remotely,
        })
    }

    fn endpoint(&self, target: TargetFormat) -> String {
        format!("{}/convert/jpg/to/{}", self.base_url, target.extension())
    }

    async fn download(&self, url: &str) -> Result<Bytes, ConversionError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ConversionError::DownloadStatus(status.as_u16()));
        }
        Ok(response.bytes().await?)
    }
}

#[async_trait]
impl Converter for ConvertApiClient {
    async fn convert(
        &self,
        target: TargetFormat,
        source: &EncodedImage,
    ) -> Result<Bytes, ConversionError> {
        let request = ConversionRequest::new(target, source, self.store_remotely);
        let start = Instant::now();

        let response = self
            .http
            .post(self.endpoint(target))
            .query(&[("Secret", self.secret.as_str())])
            .json(&request.payload())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConversionError::Status {
                status: status.as_u16(),
                body: error_body_prefix(response).await,
            });
        }

        let raw = response.bytes().await?;
        let parsed: ConvertResponse = serde_json::from_slice(&raw)
            .map_err(|e| ConversionError::MalformedResponse(e.to_string()))?;
        let file = parsed
            .files
            .into_iter()
            .next()
            .ok_or(ConversionError::MissingFile)?;

        tracing::debug!(
            format = %target,
            file_name = ?file.file_name,
            file_size = ?file.file_size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "conversion finished"
        );

        match (file.url, file.file_data) {
            (Some(url), _) => self.download(&url).await,
            (None, Some(data)) => Ok(Bytes::from(general_purpose::STANDARD.decode(data)?)),
            (None, None) => Err(ConversionError::MissingFile),
        }
    }
}

/// Read at most `MAX_ERROR_BODY_LEN` bytes of an error body, cut on a char boundary.
async fn error_body_prefix(mut response: reqwest::Response) -> String {
    let mut buf = Vec::with_capacity(MAX_ERROR_BODY_LEN);
    while buf.len() < MAX_ERROR_BODY_LEN {
        match response.chunk().await {
            Ok(Some(chunk)) => buf.extend_from_slice(&chunk),
            Ok(None) | Err(_) => break,
        }
    }
    buf.truncate(MAX_ERROR_BODY_LEN);

    match std::str::from_utf8(&buf) {
        Ok(text) => text.to_string(),
        Err(err) if err.error_len().is_none() => {
            String::from_utf8_lossy(&buf[..err.valid_up_to()]).into_owned()
        }
        Err(_) => String::from_utf8_lossy(&buf).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    const SECRET: &str = "test-secret";

    fn client(server: &mockito::Server, store_remotely: bool) -> ConvertApiClient {
        ConvertApiClient::new(
            format!("{}/", server.url()),
            SECRET,
            Duration::from_secs(5),
            store_remotely,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn png_conversion_downloads_stored_result() {
        let mut server = mockito::Server::new_async().await;
        let source = EncodedImage::encode(b"\xff\xd8\xff\xe0jpeg");

        let convert = server
            .mock("POST", "/convert/jpg/to/png")
            .match_query(Matcher::UrlEncoded("Secret".into(), SECRET.into()))
            .match_header("content-type", "application/json")
            .match_body(Matcher::PartialJson(json!({
                "Parameters": [
                    { "Name": "File", "FileValue": { "Data": source.as_str() } },
                    { "Name": "StoreFile", "Value": true }
                ]
            })))
            .with_status(200)
            .with_body(
                json!({
                    "ConversionCost": 1,
                    "Files": [{
                        "FileName": "source.png",
                        "FileSize": 8,
                        "Url": format!("{}/files/abc/source.png", server.url())
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await;
        let download = server
            .mock("GET", "/files/abc/source.png")
            .with_status(200)
            .with_body(b"\x89PNG\r\n\x1a\n")
            .create_async()
            .await;

        let result = client(&server, true)
            .convert(TargetFormat::Png, &source)
            .await
            .unwrap();

        assert_eq!(result.as_ref(), b"\x89PNG\r\n\x1a\n");
        convert.assert_async().await;
        download.assert_async().await;
    }

    #[tokio::test]
    async fn gif_request_carries_file_list_that_decodes_to_source() {
        let mut server = mockito::Server::new_async().await;
        let original: Vec<u8> = (0..=255u8).rev().cycle().take(777).collect();
        let source = EncodedImage::encode(&original);
        let expected_data = general_purpose::STANDARD.encode(&original);
        assert_eq!(general_purpose::STANDARD.decode(&expected_data).unwrap(), original);

        let convert = server
            .mock("POST", "/convert/jpg/to/gif")
            .match_query(Matcher::UrlEncoded("Secret".into(), SECRET.into()))
            .match_body(Matcher::PartialJson(json!({
                "Parameters": [
                    { "Name": "Files", "FileValues": [{ "Data": expected_data }] },
                    { "Name": "StoreFile", "Value": true }
                ]
            })))
            .with_body(
                json!({ "Files": [{ "Url": format!("{}/files/out.gif", server.url()) }] })
                    .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("GET", "/files/out.gif")
            .with_body(b"GIF89a")
            .create_async()
            .await;

        let result = client(&server, true)
            .convert(TargetFormat::Gif, &source)
            .await
            .unwrap();

        assert_eq!(result.as_ref(), b"GIF89a");
        convert.assert_async().await;
    }

    #[tokio::test]
    async fn inline_results_are_decoded_without_download() {
        let mut server = mockito::Server::new_async().await;
        let source = EncodedImage::encode(b"jpeg");

        server
            .mock("POST", "/convert/jpg/to/png")
            .match_query(Matcher::Any)
            .match_body(Matcher::PartialJson(json!({
                "Parameters": [{ "Name": "File" }, { "Name": "StoreFile", "Value": false }]
            })))
            .with_body(
                json!({ "Files": [{ "FileData": general_purpose::STANDARD.encode(b"png") }] })
                    .to_string(),
            )
            .create_async()
            .await;

        let result = client(&server, false)
            .convert(TargetFormat::Png, &source)
            .await
            .unwrap();
        assert_eq!(result.as_ref(), b"png");
    }

    #[tokio::test]
    async fn error_status_is_a_conversion_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/convert/jpg/to/png")
            .match_query(Matcher::Any)
            .with_status(401)
            .with_body(r#"{"Code":4010,"Message":"Invalid secret"}"#)
            .create_async()
            .await;

        let err = client(&server, true)
            .convert(TargetFormat::Png, &EncodedImage::encode(b"jpeg"))
            .await
            .unwrap_err();

        match err {
            ConversionError::Status { status, body } => {
                assert_eq!(status, 401);
                assert!(body.contains("Invalid secret"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn long_error_bodies_are_cut_to_a_bounded_prefix() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/convert/jpg/to/png")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("x".repeat(64 * 1024))
            .create_async()
            .await;
        server
            .mock("POST", "/convert/jpg/to/gif")
            .match_query(Matcher::Any)
            .with_status(502)
            .with_body("é".repeat(1000))
            .create_async()
            .await;

        let client = client(&server, true);
        let source = EncodedImage::encode(b"jpeg");

        match client.convert(TargetFormat::Png, &source).await.unwrap_err() {
            ConversionError::Status { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "x".repeat(MAX_ERROR_BODY_LEN));
            }
            other => panic!("unexpected error: {other}"),
        }
        match client.convert(TargetFormat::Gif, &source).await.unwrap_err() {
            ConversionError::Status { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body, "é".repeat(MAX_ERROR_BODY_LEN / 2));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn url_is_preferred_over_inline_data() {
        let mut server = mockito::Server::new_async().await;
        let source = EncodedImage::encode(b"jpeg");

        server
            .mock("POST", "/convert/jpg/to/png")
            .match_query(Matcher::Any)
            .with_body(
                json!({
                    "Files": [{
                        "FileName": "source.png",
                        "Url": format!("{}/files/both.png", server.url()),
                        "FileData": general_purpose::STANDARD.encode(b"inline")
                    }]
                })
                .to_string(),
            )
            .create_async()
            .await;
        let download = server
            .mock("GET", "/files/both.png")
            .with_body(b"downloaded")
            .expect(1)
            .create_async()
            .await;

        let result = client(&server, true)
            .convert(TargetFormat::Png, &source)
            .await
            .unwrap();

        assert_eq!(result.as_ref(), b"downloaded");
        download.assert_async().await;
    }

    #[tokio::test]
    async fn malformed_or_empty_responses_fail() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/convert/jpg/to/png")
            .match_query(Matcher::Any)
            .with_body("not json")
            .create_async()
            .await;
        server
            .mock("POST", "/convert/jpg/to/gif")
            .match_query(Matcher::Any)
            .with_body(r#"{"Files": []}"#)
            .create_async()
            .await;

        let client = client(&server, true);
        let source = EncodedImage::encode(b"jpeg");

        assert!(matches!(
            client.convert(TargetFormat::Png, &source).await,
            Err(ConversionError::MalformedResponse(_))
        ));
        assert!(matches!(
            client.convert(TargetFormat::Gif, &source).await,
            Err(ConversionError::MissingFile)
        ));
    }

    #[tokio::test]
    async fn failed_download_is_a_conversion_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/convert/jpg/to/png")
            .match_query(Matcher::Any)
            .with_body(
                json!({ "Files": [{ "Url": format!("{}/files/gone.png", server.url()) }] })
                    .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("GET", "/files/gone.png")
            .with_status(404)
            .create_async()
            .await;

        let err = client(&server, true)
            .convert(TargetFormat::Png, &EncodedImage::encode(b"jpeg"))
            .await
            .unwrap_err();
        assert!(matches!(err, ConversionError::DownloadStatus(404)));
    }

    #[tokio::test]
    async fn unreachable_service_does_not_leak_secret() {
        let client = ConvertApiClient::new(
            "http://127.0.0.1:1",
            SECRET,
            Duration::from_secs(2),
            true,
        )
        .unwrap();

        let err = client
            .convert(TargetFormat::Png, &EncodedImage::encode(b"jpeg"))
            .await
            .unwrap_err();

        assert!(matches!(err, ConversionError::Transport(_)));
        assert!(!err.to_string().contains(SECRET));
    }
}
