//! The upload → validate → forward → map bridge.
//!
//! [`ConversionProxy`] holds no per-request state: concurrent requests share
//! one instance and never coordinate. Each call to
//! [`ConversionProxy::process`] either returns a complete
//! [`ConversionResult`] or exactly one [`OperationError`].

use crate::config::ProxyConfig;
use crate::error::{ConfigError, OperationError};
use crate::response::ConversionResult;
use crate::upload::{self, UploadedDocument};
use crate::upstream::ConversionClient;
use axum::extract::Multipart;
use std::time::Instant;
use tracing::info;

#[derive(Debug, Clone)]
pub struct ConversionProxy {
    client: ConversionClient,
}

impl ConversionProxy {
    /// Build a proxy for the upstream named in `config`.
    pub fn new(config: &ProxyConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            client: ConversionClient::new(config)?,
        })
    }

    /// Handle one inbound multipart body end to end.
    pub async fn handle_multipart(&self, multipart: Multipart) -> Result<ConversionResult, OperationError> {
        let parts = upload::collect_parts(multipart).await?;
        self.process(parts).await
    }

    /// Validate already-buffered parts, forward the document, map the reply.
    pub async fn process(&self, parts: Vec<UploadedDocument>) -> Result<ConversionResult, OperationError> {
        let start = Instant::now();

        // ── Step 1: Locate the document ──────────────────────────────────
        let document = upload::validate_upload(parts)?;
        info!(
            file_name = document.file_name.as_deref().unwrap_or("-"),
            content_type = document.content_type.as_deref().unwrap_or("-"),
            bytes = document.len(),
            "Accepted upload"
        );

        // ── Step 2: One upstream call ────────────────────────────────────
        let reply = self.client.convert(&document).await?;

        // ── Step 3: Reshape for the client ───────────────────────────────
        let result = ConversionResult::from(reply);
        info!(
            success = result.success,
            artifacts = result.csv_content.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Conversion complete"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use bytes::Bytes;

    fn proxy_for(url: &str) -> ConversionProxy {
        let config = ProxyConfig::builder()
            .upstream_url(url)
            .request_timeout_secs(5)
            .connect_timeout_secs(1)
            .build()
            .unwrap();
        ConversionProxy::new(&config).unwrap()
    }

    fn pdf_part(name: Option<&str>) -> UploadedDocument {
        UploadedDocument {
            field_name: "pdf".into(),
            file_name: name.map(str::to_string),
            content_type: Some("application/pdf".into()),
            data: Bytes::from_static(b"%PDF-1.4 statement"),
        }
    }

    #[tokio::test]
    async fn validation_failure_makes_no_outbound_call() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/process-pdf")
            .expect(0)
            .create_async()
            .await;

        let proxy = proxy_for(&server.url());
        let err = proxy.process(vec![]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn forwards_fallback_filename() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/process-pdf")
            .match_body(mockito::Matcher::Regex(
                r#"name="pdf"; filename="document.pdf""#.into(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success":true,"message":"ok","stats":{},"csv_content":{}}"#)
            .expect(1)
            .create_async()
            .await;

        let proxy = proxy_for(&server.url());
        let result = proxy.process(vec![pdf_part(None)]).await.unwrap();
        assert!(result.success);

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn malformed_reply_is_upstream_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/process-pdf")
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let proxy = proxy_for(&server.url());
        let err = proxy
            .process(vec![pdf_part(Some("statement.pdf"))])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Upstream);
        assert!(err.to_string().contains("Malformed response"), "got: {err}");
    }

    #[tokio::test]
    async fn oversized_reply_is_upstream_error() {
        let mut server = mockito::Server::new_async().await;
        let csv = "date,amount\n".repeat(200);
        let body = serde_json::json!({
            "success": true,
            "message": "ok",
            "stats": {},
            "csv_content": {"transactions": csv},
        })
        .to_string();
        let _mock = server
            .mock("POST", "/process-pdf")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let config = ProxyConfig::builder()
            .upstream_url(server.url())
            .request_timeout_secs(5)
            .max_reply_bytes(1024)
            .build()
            .unwrap();
        let proxy = ConversionProxy::new(&config).unwrap();
        let err = proxy.process(vec![pdf_part(None)]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Upstream);
        assert!(err.to_string().contains("exceeds the 1024-byte limit"), "got: {err}");
    }

    #[tokio::test]
    async fn missing_fields_are_upstream_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/process-pdf")
            .with_status(200)
            .with_body(r#"{"success":true}"#)
            .create_async()
            .await;

        let proxy = proxy_for(&server.url());
        let err = proxy.process(vec![pdf_part(None)]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Upstream);
    }
}
