//! Upload parsing.
//!
//! Only plain text and PDF are accepted. [`extract_text`] mirrors what the
//! upload widget does (anything it cannot read becomes an empty string);
//! [`parse_upload`] turns that into a typed [`ParseError`] for callers that
//! want to report why.

use std::path::Path;

use crate::error::ParseError;

pub const MIME_TEXT: &str = "text/plain";
pub const MIME_PDF: &str = "application/pdf";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    PlainText,
    Pdf,
}

impl MediaType {
    /// Accepts a `Content-Type` value, ignoring parameters such as `charset`.
    pub fn from_mime(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            MIME_TEXT => Some(Self::PlainText),
            MIME_PDF => Some(Self::Pdf),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "txt" => Some(Self::PlainText),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            Self::PlainText => MIME_TEXT,
            Self::Pdf => MIME_PDF,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    pub text: String,
    pub media_type: MediaType,
}

/// Lenient extraction: unsupported or unreadable input yields `""`.
pub fn extract_text(bytes: &[u8], content_type: &str) -> String {
    match MediaType::from_mime(content_type) {
        Some(media_type) => read(bytes, media_type).unwrap_or_default(),
        None => String::new(),
    }
}

pub fn parse_upload(
    bytes: &[u8],
    content_type: &str,
    max_bytes: usize,
) -> Result<Document, ParseError> {
    let media_type = MediaType::from_mime(content_type)
        .ok_or_else(|| ParseError::Unsupported(content_type.to_string()))?;

    if bytes.len() > max_bytes {
        return Err(ParseError::TooLarge {
            size: bytes.len(),
            limit: max_bytes,
        });
    }

    let text = read(bytes, media_type)?;
    if text.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    tracing::debug!(media_type = media_type.mime(), chars = text.len(), "parsed upload");
    Ok(Document { text, media_type })
}

fn read(bytes: &[u8], media_type: MediaType) -> Result<String, ParseError> {
    let unreadable = |reason: String| ParseError::Unreadable {
        media_type: media_type.mime().to_string(),
        reason,
    };

    match media_type {
        MediaType::PlainText => String::from_utf8(bytes.to_vec()).map_err(|e| unreadable(e.to_string())),
        // Pages with no extractable text come back as empty strings.
        MediaType::Pdf => pdf_extract::extract_text_from_mem_by_pages(bytes)
            .map(|pages| pages.concat())
            .map_err(|e| unreadable(e.to_string())),
    }
}
