//! Documents — intake (upload / paste), preview, download and identity.
//!
//! Content is always stored the way the client sends it: either inline text
//! or a `data:` URI. Everything that needs bytes decodes on demand.

pub mod data_uri;
pub mod handlers;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::errors::AppError;
use data_uri::{DataUri, DataUriError, OCTET_STREAM, PLAIN_TEXT};

pub const PASTED_CONTENT_NAME: &str = "Pasted Content";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    pub name: String,
    pub content: String,
}

/// What the client needs to render a document.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DocumentPreview {
    pub mime_type: String,
    pub is_text: bool,
    pub text: Option<String>,
}

/// Decoded bytes ready to be served as a file download.
#[derive(Debug, Clone)]
pub struct DocumentDownload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl From<DataUriError> for AppError {
    fn from(value: DataUriError) -> Self {
        AppError::Validation(format!("Malformed document content: {value}"))
    }
}

impl Document {
    pub fn from_upload(name: &str, mime_type: Option<&str>, bytes: &[u8]) -> Result<Self, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Uploaded file has no name".to_string()));
        }
        if bytes.is_empty() {
            return Err(AppError::Validation(format!("Uploaded file '{name}' is empty")));
        }
        let mime_type = mime_type
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(OCTET_STREAM);

        Ok(Self {
            name: name.to_string(),
            content: data_uri::encode(mime_type, bytes),
        })
    }

    pub fn from_pasted_text(text: &str) -> Result<Self, AppError> {
        if text.trim().is_empty() {
            return Err(AppError::Validation(
                "Please paste some text to analyze.".to_string(),
            ));
        }
        Ok(Self {
            name: PASTED_CONTENT_NAME.to_string(),
            content: data_uri::encode(PLAIN_TEXT, text.as_bytes()),
        })
    }

    /// Identity used to deduplicate documents across sessions.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.name.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.content.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn data_uri(&self) -> Result<Option<DataUri<'_>>, AppError> {
        Ok(DataUri::parse(&self.content)?)
    }

    pub fn preview(&self) -> Result<DocumentPreview, AppError> {
        let Some(uri) = self.data_uri()? else {
            return Ok(DocumentPreview {
                mime_type: PLAIN_TEXT.to_string(),
                is_text: true,
                text: Some(self.content.clone()),
            });
        };

        let text = if uri.is_text() {
            Some(String::from_utf8_lossy(&uri.decode()?).into_owned())
        } else if uri.mime_type == "application/pdf" {
            match pdf_extract::extract_text_from_mem(&uri.decode()?) {
                Ok(text) => Some(text),
                Err(e) => {
                    warn!("PDF text extraction failed for '{}': {e}", self.name);
                    None
                }
            }
        } else {
            None
        };

        Ok(DocumentPreview {
            mime_type: uri.mime_type.to_string(),
            is_text: uri.is_text(),
            text,
        })
    }

    pub fn download(&self) -> Result<DocumentDownload, AppError> {
        let (mime_type, bytes) = match self.data_uri()? {
            Some(uri) => (uri.mime_type.to_string(), uri.decode()?),
            None => (PLAIN_TEXT.to_string(), self.content.as_bytes().to_vec()),
        };
        Ok(DocumentDownload {
            file_name: self.name.clone(),
            mime_type,
            bytes,
        })
    }

    /// Name without its extension, as used for derived file names.
    pub fn stem(&self) -> &str {
        self.name.split('.').next().unwrap_or(&self.name)
    }
}
