//! `data:` URI parsing and encoding for document content.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use percent_encoding::percent_decode_str;
use thiserror::Error;

pub const PLAIN_TEXT: &str = "text/plain";
pub const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, Error, PartialEq)]
pub enum DataUriError {
    #[error("data URI is missing the ',' separator")]
    MissingSeparator,

    #[error("data URI payload is not valid base64: {0}")]
    InvalidBase64(String),
}

/// A parsed `data:<mime>[;base64],<payload>` URI borrowing its payload from the source string.
#[derive(Debug, Clone, PartialEq)]
pub struct DataUri<'a> {
    /// Lowercased; MIME types compare case-insensitively.
    pub mime_type: String,
    pub is_base64: bool,
    pub payload: &'a str,
}

impl<'a> DataUri<'a> {
    /// Returns `Ok(None)` when `content` is not a data URI at all.
    pub fn parse(content: &'a str) -> Result<Option<Self>, DataUriError> {
        let Some(rest) = content.strip_prefix("data:") else {
            return Ok(None);
        };
        let (header, payload) = rest.split_once(',').ok_or(DataUriError::MissingSeparator)?;

        let mut params = header.split(';');
        let mime_type = params
            .next()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(PLAIN_TEXT)
            .to_ascii_lowercase();
        let is_base64 = params.any(|p| p.trim().eq_ignore_ascii_case("base64"));

        Ok(Some(Self {
            mime_type,
            is_base64,
            payload,
        }))
    }

    pub fn is_text(&self) -> bool {
        self.mime_type.starts_with("text/")
    }

    pub fn decode(&self) -> Result<Vec<u8>, DataUriError> {
        if self.is_base64 {
            // Some encoders wrap long payloads; whitespace is not part of the alphabet.
            let compact: String = self
                .payload
                .chars()
                .filter(|c| !c.is_ascii_whitespace())
                .collect();
            STANDARD
                .decode(compact)
                .map_err(|e| DataUriError::InvalidBase64(e.to_string()))
        } else {
            Ok(percent_decode_str(self.payload).collect())
        }
    }

    /// The base64 form of the payload, re-encoding percent-encoded URIs.
    pub fn base64_payload(&self) -> Result<String, DataUriError> {
        if self.is_base64 {
            Ok(self.payload.chars().filter(|c| !c.is_ascii_whitespace()).collect())
        } else {
            Ok(STANDARD.encode(self.decode()?))
        }
    }
}

pub fn encode(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_content_is_not_a_data_uri() {
        assert_eq!(DataUri::parse("Lease agreement between...").unwrap(), None);
    }

    #[test]
    fn parses_base64_pdf_uri() {
        let uri = DataUri::parse("data:application/pdf;base64,JVBERi0xLjQ=")
            .unwrap()
            .unwrap();
        assert_eq!(uri.mime_type, "application/pdf");
        assert!(uri.is_base64);
        assert!(!uri.is_text());
        assert_eq!(uri.decode().unwrap(), b"%PDF-1.4");
    }

    #[test]
    fn encode_then_parse_preserves_unicode_text() {
        let content = encode("text/plain", "किरायेदार shall pay rent".as_bytes());
        let uri = DataUri::parse(&content).unwrap().unwrap();
        assert!(uri.is_text());
        assert_eq!(
            String::from_utf8(uri.decode().unwrap()).unwrap(),
            "किरायेदार shall pay rent"
        );
    }

    #[test]
    fn defaults_mime_and_percent_decodes() {
        let uri = DataUri::parse("data:,Hello%2C%20World").unwrap().unwrap();
        assert_eq!(uri.mime_type, "text/plain");
        assert!(!uri.is_base64);
        assert_eq!(uri.decode().unwrap(), b"Hello, World");
        assert_eq!(uri.base64_payload().unwrap(), "SGVsbG8sIFdvcmxk");
    }

    #[test]
    fn mime_type_is_lowercased() {
        let uri = DataUri::parse("data:Application/PDF;BASE64,JVBERi0=")
            .unwrap()
            .unwrap();
        assert_eq!(uri.mime_type, "application/pdf");
        assert!(uri.is_base64);
        assert!(DataUri::parse("data:Text/Plain,hi").unwrap().unwrap().is_text());
    }

    #[test]
    fn rejects_uri_without_separator() {
        assert_eq!(
            DataUri::parse("data:text/plain;base64").unwrap_err(),
            DataUriError::MissingSeparator
        );
    }

    #[test]
    fn rejects_corrupt_base64() {
        let uri = DataUri::parse("data:text/plain;base64,@@@").unwrap().unwrap();
        assert!(matches!(uri.decode(), Err(DataUriError::InvalidBase64(_))));
    }
}
