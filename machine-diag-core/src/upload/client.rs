use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use tokio::runtime::{Builder, Runtime};

use crate::models::config::DiagnosticConfig;
use crate::models::error::DiagnosticError;
use crate::upload::multipart::{MultipartBody, UploadRequest};

/// HTTP client that posts one file and returns the response text.
///
/// Two independent bounds apply: `connect_timeout` covers connection
/// establishment, and `read_timeout` covers waiting for the response
/// (armed when the request is dispatched, then reset on every body read).
/// Exceeding either is `Timeout`. There are no retries.
///
/// `send` blocks the calling thread on a private current-thread runtime, so
/// it must not be called from inside another async runtime.
pub struct UploadClient {
    http: Client,
    runtime: Runtime,
    boundary: Option<String>,
}

impl UploadClient {
    pub fn new(config: &DiagnosticConfig) -> Result<Self, DiagnosticError> {
        let mut headers = HeaderMap::new();
        for (name, value) in config.request_headers() {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                DiagnosticError::ConfigurationFailed(format!("invalid header name {:?}: {}", name, e))
            })?;
            let value = HeaderValue::from_str(&value).map_err(|e| {
                DiagnosticError::ConfigurationFailed(format!("invalid header value {:?}: {}", value, e))
            })?;
            headers.append(name, value);
        }

        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DiagnosticError::ConfigurationFailed(format!("failed to start HTTP runtime: {}", e)))?;

        let http = {
            let _guard = runtime.enter();
            Client::builder()
                .connect_timeout(config.connect_timeout)
                .read_timeout(config.read_timeout)
                .user_agent(config.user_agent.clone())
                .default_headers(headers)
                .build()
                .map_err(|e| DiagnosticError::ConfigurationFailed(format!("failed to build HTTP client: {}", e)))?
        };

        Ok(Self {
            http,
            runtime,
            boundary: None,
        })
    }

    /// Use a fixed multipart boundary instead of a random one.
    pub fn with_boundary(mut self, boundary: impl Into<String>) -> Self {
        self.boundary = Some(boundary.into());
        self
    }

    /// POST the request and return the body of a 200 response as text.
    pub fn send(&self, request: &UploadRequest) -> Result<String, DiagnosticError> {
        self.runtime.block_on(self.post(request))
    }

    async fn post(&self, request: &UploadRequest) -> Result<String, DiagnosticError> {
        let multipart = match &self.boundary {
            Some(boundary) => MultipartBody::with_boundary(boundary.clone()),
            None => MultipartBody::new(),
        };
        let body = multipart.encode(request);

        log::info!(
            "Uploading {} ({} bytes) to {}",
            request.filename(),
            request.payload().len(),
            request.target_url()
        );

        let response = self
            .http
            .post(request.target_url())
            .header(CONTENT_TYPE, multipart.content_type())
            .body(body)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if status != StatusCode::OK {
            log::error!("Diagnostic server returned {}", status);
            return Err(DiagnosticError::ServerError {
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(classify)?;
        log::debug!("Diagnostic server replied with {} bytes", bytes.len());
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Timeouts (connect or read) are reported as such; every other transport
/// failure is a connection failure.
fn classify(err: reqwest::Error) -> DiagnosticError {
    if err.is_timeout() {
        log::warn!("Upload timed out: {}", err);
        DiagnosticError::Timeout
    } else {
        log::warn!("Upload failed: {}", err);
        DiagnosticError::ConnectionFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_header_is_a_configuration_error() {
        let config = DiagnosticConfig {
            extra_headers: vec![("bad header".into(), "x".into())],
            ..Default::default()
        };
        assert!(matches!(
            UploadClient::new(&config),
            Err(DiagnosticError::ConfigurationFailed(_))
        ));
    }

    #[test]
    fn malformed_url_is_a_connection_failure() {
        let client = UploadClient::new(&DiagnosticConfig::default()).unwrap();
        let request = UploadRequest::new("not a url", "a.wav", vec![0; 4]);
        assert!(matches!(
            client.send(&request),
            Err(DiagnosticError::ConnectionFailed(_))
        ));
    }
}
