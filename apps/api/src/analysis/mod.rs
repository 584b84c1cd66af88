//! Analysis — the three LLM-backed document flows (demystify, compare, ask).
//!
//! `AppState` holds an `Arc<dyn DocumentAnalyst>`; production uses
//! `LlmAnalyst`, tests swap in a canned implementation.

pub mod models;
pub mod prompts;

use async_trait::async_trait;

use crate::documents::Document;
use crate::errors::AppError;
use crate::history::models::ChatMessage;
use crate::llm_client::prompts::{GROUNDING_INSTRUCTION, JSON_ONLY_SYSTEM, MARKDOWN_ANSWER_SYSTEM};
use crate::llm_client::{ContentBlock, LlmClient, MediaSource};
use models::{AnalysisResult, ComparisonResult};
use prompts::{ASK_INSTRUCTIONS, COMPARE_PROMPT, DEMYSTIFY_PROMPT};

const IMAGE_TYPES: [&str; 4] = ["image/png", "image/jpeg", "image/gif", "image/webp"];

#[async_trait]
pub trait DocumentAnalyst: Send + Sync {
    async fn demystify(&self, document: &Document) -> Result<AnalysisResult, AppError>;

    async fn compare(
        &self,
        document_a: &Document,
        document_b: &Document,
    ) -> Result<ComparisonResult, AppError>;

    /// Answers `question` from `document_text`. `history` excludes the question itself.
    async fn ask(
        &self,
        question: &str,
        document_text: &str,
        history: &[ChatMessage],
    ) -> Result<String, AppError>;
}

/// `DocumentAnalyst` backed by the hosted model.
pub struct LlmAnalyst {
    llm: LlmClient,
}

impl LlmAnalyst {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl DocumentAnalyst for LlmAnalyst {
    async fn demystify(&self, document: &Document) -> Result<AnalysisResult, AppError> {
        let content = vec![
            ContentBlock::text(format!("{DEMYSTIFY_PROMPT}\n\n{GROUNDING_INSTRUCTION}")),
            media_block(document)?,
        ];
        self.llm
            .call_json(JSON_ONLY_SYSTEM, &content)
            .await
            .map_err(|e| AppError::Llm(format!("Document analysis failed: {e}")))
    }

    async fn compare(
        &self,
        document_a: &Document,
        document_b: &Document,
    ) -> Result<ComparisonResult, AppError> {
        let content = vec![
            ContentBlock::text(format!("{COMPARE_PROMPT}\n\n{GROUNDING_INSTRUCTION}")),
            ContentBlock::text("DOCUMENT A:"),
            media_block(document_a)?,
            ContentBlock::text("DOCUMENT B:"),
            media_block(document_b)?,
        ];
        self.llm
            .call_json(JSON_ONLY_SYSTEM, &content)
            .await
            .map_err(|e| AppError::Llm(format!("Document comparison failed: {e}")))
    }

    async fn ask(
        &self,
        question: &str,
        document_text: &str,
        history: &[ChatMessage],
    ) -> Result<String, AppError> {
        let content = vec![
            ContentBlock::text(format!("DOCUMENT CONTEXT:\n{document_text}")),
            ContentBlock::text(build_ask_prompt(question, history)),
        ];
        self.llm
            .call_text(MARKDOWN_ANSWER_SYSTEM, &content)
            .await
            .map_err(|e| AppError::Llm(format!("Question answering failed: {e}")))
    }
}

/// Converts a stored document into the content block the model accepts for its type.
pub fn media_block(document: &Document) -> Result<ContentBlock, AppError> {
    let Some(uri) = document.data_uri()? else {
        return Ok(ContentBlock::text(document.content.clone()));
    };

    if uri.is_text() {
        let text = String::from_utf8_lossy(&uri.decode()?).into_owned();
        return Ok(ContentBlock::text(text));
    }
    if uri.mime_type == "application/pdf" {
        return Ok(ContentBlock::Document {
            source: MediaSource::base64(uri.mime_type.clone(), uri.base64_payload()?),
        });
    }
    if IMAGE_TYPES.iter().any(|t| *t == uri.mime_type) {
        return Ok(ContentBlock::Image {
            source: MediaSource::base64(uri.mime_type.clone(), uri.base64_payload()?),
        });
    }

    Err(AppError::Validation(format!(
        "Unsupported document type '{}' for '{}'. Upload a PDF, an image or plain text.",
        uri.mime_type, document.name
    )))
}

/// One `sender: content` line per message.
pub fn format_history(history: &[ChatMessage]) -> String {
    history
        .iter()
        .map(|m| format!("{}: {}", m.sender.as_str(), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// User text is appended after fixed headers and never scanned for placeholders.
fn build_ask_prompt(question: &str, history: &[ChatMessage]) -> String {
    format!(
        "{ASK_INSTRUCTIONS}\n\nCONVERSATION HISTORY:\n{}\n\nUSER QUESTION:\n{question}",
        format_history(history)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::models::Sender;

    fn doc(name: &str, content: &str) -> Document {
        Document {
            name: name.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn pdf_becomes_document_block() {
        let block = media_block(&doc("a.pdf", "data:application/pdf;base64,JVBERi0=")).unwrap();
        assert_eq!(
            block,
            ContentBlock::Document {
                source: MediaSource::base64("application/pdf", "JVBERi0=")
            }
        );
    }

    #[test]
    fn mime_matching_ignores_case() {
        let block = media_block(&doc("a.pdf", "data:Application/PDF;base64,JVBERi0=")).unwrap();
        assert_eq!(
            block,
            ContentBlock::Document {
                source: MediaSource::base64("application/pdf", "JVBERi0=")
            }
        );
        let block = media_block(&doc("scan.png", "data:IMAGE/PNG;base64,iVBO")).unwrap();
        assert!(matches!(block, ContentBlock::Image { .. }));
    }

    #[test]
    fn jpeg_becomes_image_block() {
        let block = media_block(&doc("scan.jpg", "data:image/jpeg;base64,/9j/")).unwrap();
        assert!(matches!(block, ContentBlock::Image { .. }));
    }

    #[test]
    fn text_uri_is_decoded_into_text_block() {
        let pasted = Document::from_pasted_text("Clause 1. Rent is due monthly.").unwrap();
        assert_eq!(
            media_block(&pasted).unwrap(),
            ContentBlock::text("Clause 1. Rent is due monthly.")
        );
    }

    #[test]
    fn inline_text_is_sent_verbatim() {
        assert_eq!(
            media_block(&doc("n", "plain words")).unwrap(),
            ContentBlock::text("plain words")
        );
    }

    #[test]
    fn unsupported_type_is_a_validation_error() {
        let err = media_block(&doc(
            "contract.docx",
            "data:application/vnd.openxmlformats-officedocument.wordprocessingml.document;base64,UEs=",
        ))
        .unwrap_err();
        match err {
            AppError::Validation(msg) => assert!(msg.contains("contract.docx")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn history_is_one_line_per_message() {
        let history = vec![
            ChatMessage {
                sender: Sender::User,
                content: "Who pays repairs?".to_string(),
            },
            ChatMessage {
                sender: Sender::Ai,
                content: "The tenant.".to_string(),
            },
        ];
        assert_eq!(
            format_history(&history),
            "user: Who pays repairs?\nai: The tenant."
        );
    }

    #[test]
    fn ask_prompt_keeps_brace_text_verbatim() {
        let history = vec![ChatMessage::user("What does the {question} field mean?")];
        let prompt = build_ask_prompt("Is {history} kept?", &history);
        assert!(prompt.contains("user: What does the {question} field mean?"));
        assert!(prompt.ends_with("USER QUESTION:\nIs {history} kept?"));
        assert_eq!(prompt.matches("Is {history} kept?").count(), 1);
    }

    #[test]
    fn ask_prompt_embeds_history_and_question() {
        let prompt = build_ask_prompt("Is there a lock-in?", &[]);
        assert!(prompt.contains("USER QUESTION:\nIs there a lock-in?"));
        assert!(!prompt.contains("{history}"));
    }
}
