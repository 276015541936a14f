//! `multipart/form-data` framing for a single file part.
//!
//! ```text
//! --<boundary>\r\n
//! Content-Disposition: form-data; name="file"; filename="<name>"\r\n
//! Content-Type: audio/wav\r\n
//! \r\n
//! <payload>\r\n
//! --<boundary>--\r\n
//! ```

use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::models::error::DiagnosticError;

const CRLF: &str = "\r\n";

/// MIME type of the uploaded capture.
pub const WAV_CONTENT_TYPE: &str = "audio/wav";

/// Form field the server reads the file from.
pub const FILE_FIELD: &str = "file";

/// One file destined for the prediction endpoint. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    target_url: String,
    filename: String,
    payload: Arc<[u8]>,
    content_type: String,
}

impl UploadRequest {
    pub fn new(target_url: impl Into<String>, filename: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            target_url: target_url.into(),
            filename: filename.into(),
            payload: payload.into(),
            content_type: WAV_CONTENT_TYPE.into(),
        }
    }

    /// Read `path` into a request named after the file.
    pub fn from_file(target_url: impl Into<String>, path: &Path) -> Result<Self, DiagnosticError> {
        let payload = fs::read(path)?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.wav".to_string());
        Ok(Self::new(target_url, filename, payload))
    }

    pub fn target_url(&self) -> &str {
        &self.target_url
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }
}

/// Boundary choice plus the encoder for the single-part body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartBody {
    boundary: String,
}

impl MultipartBody {
    /// Random boundary, unique per upload.
    pub fn new() -> Self {
        Self {
            boundary: format!("MachineDiagBoundary{}", uuid::Uuid::new_v4().simple()),
        }
    }

    /// Fixed boundary, for reproducible bodies.
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
        }
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// Value for the request's `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn encode(&self, request: &UploadRequest) -> Vec<u8> {
        let head = format!(
            "--{b}{crlf}Content-Disposition: form-data; name=\"{field}\"; filename=\"{name}\"{crlf}Content-Type: {ctype}{crlf}{crlf}",
            b = self.boundary,
            crlf = CRLF,
            field = FILE_FIELD,
            name = escape_filename(request.filename()),
            ctype = request.content_type(),
        );
        let tail = format!("{crlf}--{b}--{crlf}", b = self.boundary, crlf = CRLF);

        let mut body = Vec::with_capacity(head.len() + request.payload().len() + tail.len());
        body.extend_from_slice(head.as_bytes());
        body.extend_from_slice(request.payload());
        body.extend_from_slice(tail.as_bytes());
        body
    }
}

impl Default for MultipartBody {
    fn default() -> Self {
        Self::new()
    }
}

/// Percent-encode the characters that would break the quoted parameter.
fn escape_filename(name: &str) -> String {
    name.replace('"', "%22").replace('\r', "%0D").replace('\n', "%0A")
}
