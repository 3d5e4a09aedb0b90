//! HTTP client for the external conversion service.
//!
//! One [`ConversionClient`] is built at startup and shared by every request;
//! `reqwest::Client` pools connections internally, so cloning is cheap.
//! Each [`ConversionClient::convert`] makes exactly one outbound call and
//! never retries.

use crate::config::ProxyConfig;
use crate::error::{ConfigError, OperationError};
use crate::response::UpstreamReply;
use crate::upload::{UploadedDocument, DOCUMENT_FIELD};
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use tracing::{debug, info};

/// Filename forwarded when the client did not send one.
pub const FALLBACK_FILE_NAME: &str = "document.pdf";

/// Media type the document is always forwarded as.
pub const DOCUMENT_MEDIA_TYPE: &str = "application/pdf";

/// Longest slice of an upstream error body quoted back to the caller.
const MAX_QUOTED_BODY: usize = 200;

#[derive(Debug, Clone)]
pub struct ConversionClient {
    http: reqwest::Client,
    endpoint: String,
    timeout: Duration,
    max_reply_bytes: usize,
}

impl ConversionClient {
    pub fn new(config: &ProxyConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(ConfigError::HttpClient)?;
        Ok(Self {
            http,
            endpoint: config.upstream_endpoint(),
            timeout: config.request_timeout(),
            max_reply_bytes: config.max_reply_bytes,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Forward `document` and decode the service's reply.
    ///
    /// Every failure here is [`OperationError::Upstream`] except building
    /// the outbound form, which cannot depend on the upstream and is
    /// [`OperationError::Internal`].
    pub async fn convert(&self, document: &UploadedDocument) -> Result<UpstreamReply, OperationError> {
        let form = conversion_form(document)?;
        info!(endpoint = %self.endpoint, bytes = document.len(), "Forwarding document to conversion service");

        let response = self
            .http
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = self.read_capped(response).await?;

        if !status.is_success() {
            let reason = match failure_detail(&body) {
                Some(detail) => format!("HTTP {status}: {detail}"),
                None => format!("HTTP {status}"),
            };
            return Err(OperationError::upstream(reason));
        }

        let reply: UpstreamReply = serde_json::from_slice(&body).map_err(|e| {
            OperationError::upstream_with_cause(format!("Malformed response: {e}"), e)
        })?;
        debug!(
            success = reply.success,
            artifacts = reply.csv_content.len(),
            "Conversion service replied"
        );
        Ok(reply)
    }

    /// Buffer the reply body, refusing anything over `max_reply_bytes`.
    async fn read_capped(&self, mut response: reqwest::Response) -> Result<Vec<u8>, OperationError> {
        let limit = self.max_reply_bytes;
        if let Some(declared) = response.content_length() {
            if declared > limit as u64 {
                return Err(reply_too_large(limit));
            }
        }
        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| self.transport_error(e))?
        {
            if body.len() + chunk.len() > limit {
                return Err(reply_too_large(limit));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }

    fn transport_error(&self, e: reqwest::Error) -> OperationError {
        let reason = if e.is_timeout() {
            format!("Request timed out after {}s", self.timeout.as_secs())
        } else if e.is_connect() {
            format!("Connection to {} failed: {}", self.endpoint, error_chain(&e))
        } else {
            error_chain(&e)
        };
        OperationError::upstream_with_cause(reason, e)
    }
}

fn reply_too_large(limit: usize) -> OperationError {
    OperationError::upstream(format!("Response exceeds the {limit}-byte limit"))
}

/// Re-package a validated document for the conversion service.
fn conversion_form(document: &UploadedDocument) -> Result<Form, OperationError> {
    let file_name = document
        .file_name
        .as_deref()
        .filter(|name| !name.is_empty())
        .unwrap_or(FALLBACK_FILE_NAME)
        .to_string();
    let part = Part::bytes(document.data.to_vec())
        .file_name(file_name)
        .mime_str(DOCUMENT_MEDIA_TYPE)
        .map_err(|e| OperationError::internal_with_cause("Failed to build upstream request", e))?;
    Ok(Form::new().part(DOCUMENT_FIELD, part))
}

/// reqwest hides the interesting part ("Connection refused") in the source
/// chain; join it into one line.
fn error_chain(e: &(dyn std::error::Error + 'static)) -> String {
    let mut out = e.to_string();
    let mut source = e.source();
    while let Some(inner) = source {
        let text = inner.to_string();
        if !out.contains(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        source = inner.source();
    }
    out
}

/// Human-readable reason from a failed upstream reply: FastAPI's `detail`
/// when present, otherwise the (truncated) body text.
fn failure_detail(body: &[u8]) -> Option<String> {
    if let Ok(json) = serde_json::from_slice::<serde_json::Value>(body) {
        match json.get("detail") {
            Some(serde_json::Value::String(detail)) => return Some(detail.clone()),
            Some(other) => return Some(other.to_string()),
            None => {}
        }
    }
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some(text.chars().take(MAX_QUOTED_BODY).collect())
}
