//! Image upload.
//!
//! The upload is the one network call in an export. It sits behind
//! [`ImageUploader`] so the pipeline can be driven by a recording mock in
//! tests and by [`HttpUploader`] in production.
//!
//! The HTTP contract: a multipart POST with `image` (base64 payload) and
//! `name` fields, the account key as the `key` query parameter, answered by
//!
//! ```json
//! {"success": true, "data": {"url": "https://..."}}
//! {"success": false, "error": {"message": "Invalid API v1 key."}}
//! ```

use std::future::Future;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::multipart::Form;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::UploadConfig;

/// Longest slice of a non-JSON error body kept in an error message.
const MAX_DETAIL_LEN: usize = 200;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid upload endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
    #[error("rejected by image API (status {status}): {detail}")]
    Rejected { status: u16, detail: String },
    #[error("malformed image API response: {0}")]
    MalformedResponse(String),
}

/// Something that can publish an encoded slice and return its public URL.
///
/// `Sync` so one uploader serves concurrent exports; the returned future is
/// `Send` so exports can run on a multi-threaded runtime.
pub trait ImageUploader: Sync {
    fn upload(
        &self,
        credential: &str,
        name: &str,
        bytes: &[u8],
    ) -> impl Future<Output = Result<String, UploadError>> + Send;
}

/// Uploader for imgbb-style HTTP image APIs.
#[derive(Debug, Clone)]
pub struct HttpUploader {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpUploader {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, UploadError> {
        let endpoint = Url::parse(endpoint)?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }

    pub fn from_config(config: &UploadConfig) -> Result<Self, UploadError> {
        Self::new(&config.endpoint, Duration::from_secs(config.timeout_secs))
    }
}

impl ImageUploader for HttpUploader {
    async fn upload(&self, credential: &str, name: &str, bytes: &[u8]) -> Result<String, UploadError> {
        let form = Form::new()
            .text("image", BASE64.encode(bytes))
            .text("name", name.to_string());

        debug!(name, bytes = bytes.len(), endpoint = %self.endpoint, "uploading slice");
        let response = self
            .client
            .post(self.endpoint.clone())
            .query(&[("key", credential)])
            .multipart(form)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        parse_upload_response(status, &body)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UploadResponse {
    success: bool,
    data: Option<UploadData>,
    error: Option<ApiError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UploadData {
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiError {
    message: Option<String>,
}

/// Turn an HTTP status and body into the uploaded image's URL.
pub fn parse_upload_response(status: u16, body: &str) -> Result<String, UploadError> {
    let ok_status = (200..300).contains(&status);
    let parsed: UploadResponse = match serde_json::from_str(body) {
        Ok(parsed) => parsed,
        Err(_) if !ok_status => {
            return Err(UploadError::Rejected {
                status,
                detail: truncate(body.trim(), MAX_DETAIL_LEN),
            });
        }
        Err(e) => return Err(UploadError::MalformedResponse(e.to_string())),
    };

    if parsed.success && ok_status {
        return parsed
            .data
            .and_then(|data| data.url)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                UploadError::MalformedResponse("success response without data.url".into())
            });
    }

    Err(UploadError::Rejected {
        status,
        detail: parsed
            .error
            .and_then(|e| e.message)
            .unwrap_or_else(|| "upload rejected".to_string()),
    })
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}
