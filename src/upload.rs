//! Inbound upload handling: read the multipart body, then find the document.
//!
//! Collection and validation are separate steps so the validator stays a pure
//! function over already-buffered parts and can be tested without a request.

use crate::error::OperationError;
use axum::extract::Multipart;
use bytes::Bytes;
use tracing::debug;

/// Form field that carries the statement PDF, inbound and upstream.
pub const DOCUMENT_FIELD: &str = "pdf";

/// One received multipart part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedDocument {
    /// Form field name; empty when the part had none.
    pub field_name: String,
    /// Client-supplied filename, if any.
    pub file_name: Option<String>,
    /// Declared media type, if any.
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl UploadedDocument {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Buffer every part of a multipart body.
///
/// A body that cannot be read (bad boundary, over the size limit, client
/// disconnect) is a [`OperationError::Validation`].
pub async fn collect_parts(mut multipart: Multipart) -> Result<Vec<UploadedDocument>, OperationError> {
    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await?;
        debug!(field = %field_name, bytes = data.len(), "Received multipart part");
        parts.push(UploadedDocument {
            field_name,
            file_name,
            content_type,
            data,
        });
    }
    Ok(parts)
}

/// Locate the document part among `parts`.
///
/// Fails when nothing was uploaded, when no part is named
/// [`DOCUMENT_FIELD`], or when that part is empty. The first matching part is
/// returned unchanged; other parts are dropped.
pub fn validate_upload(parts: Vec<UploadedDocument>) -> Result<UploadedDocument, OperationError> {
    if parts.is_empty() {
        return Err(OperationError::validation("No files uploaded"));
    }
    parts
        .into_iter()
        .find(|part| part.field_name == DOCUMENT_FIELD)
        .filter(|part| !part.is_empty())
        .ok_or_else(|| OperationError::validation("No PDF file uploaded"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn part(name: &str, data: &'static [u8]) -> UploadedDocument {
        UploadedDocument {
            field_name: name.to_string(),
            file_name: Some("statement.pdf".to_string()),
            content_type: Some("application/pdf".to_string()),
            data: Bytes::from_static(data),
        }
    }

    #[test]
    fn no_parts_is_validation_error() {
        let err = validate_upload(vec![]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string(), "No files uploaded");
    }

    #[test]
    fn missing_document_part() {
        let err = validate_upload(vec![part("file", b"%PDF-1.7")]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string(), "No PDF file uploaded");
    }

    #[test]
    fn empty_document_part() {
        let err = validate_upload(vec![part("pdf", b"")]).unwrap_err();
        assert_eq!(err.to_string(), "No PDF file uploaded");
    }

    #[test]
    fn returns_document_unchanged() {
        let doc = part("pdf", b"%PDF-1.7 body");
        let found = validate_upload(vec![part("locale", b"it"), doc.clone()]).unwrap();
        assert_eq!(found, doc);
    }

    #[test]
    fn first_document_part_wins() {
        let first = part("pdf", b"first");
        let found = validate_upload(vec![first.clone(), part("pdf", b"second")]).unwrap();
        assert_eq!(found.data, first.data);
    }

    #[test]
    fn empty_first_document_part_is_not_skipped() {
        let err = validate_upload(vec![part("pdf", b""), part("pdf", b"%PDF-1.7")]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.to_string(), "No PDF file uploaded");
    }

    #[test]
    fn no_content_sniffing() {
        // Not a PDF, still forwarded: the conversion service decides.
        let found = validate_upload(vec![part("pdf", b"hello")]).unwrap();
        assert_eq!(found.len(), 5);
    }
}
