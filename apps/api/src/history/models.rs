use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::analysis::models::{AnalysisResult, ComparisonResult};
use crate::documents::Document;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Ai,
}

impl Sender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Ai => "ai",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub sender: Sender,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            content: content.into(),
        }
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self {
            sender: Sender::Ai,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub document: Document,
    pub analysis: Option<AnalysisResult>,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompareSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub document_a: Document,
    pub document_b: Document,
    pub comparison: Option<ComparisonResult>,
}

/// A persisted session, tagged on the wire by `type`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HistoryItem {
    Chat(ChatSession),
    Compare(CompareSession),
}

impl HistoryItem {
    pub fn id(&self) -> Uuid {
        match self {
            HistoryItem::Chat(s) => s.id,
            HistoryItem::Compare(s) => s.id,
        }
    }

    pub fn into_chat(self) -> Option<ChatSession> {
        match self {
            HistoryItem::Chat(s) => Some(s),
            HistoryItem::Compare(_) => None,
        }
    }
}

/// Row shape of `history_items`. Both session kinds share one table.
#[derive(Debug, Clone, FromRow)]
pub struct HistoryItemRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: String,
    pub document: Option<Json<Document>>,
    pub document_a: Option<Json<Document>>,
    pub document_b: Option<Json<Document>>,
    pub analysis: Option<Json<AnalysisResult>>,
    pub comparison: Option<Json<ComparisonResult>>,
    pub messages: Json<Vec<ChatMessage>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<HistoryItemRow> for HistoryItem {
    type Error = anyhow::Error;

    fn try_from(row: HistoryItemRow) -> Result<Self, Self::Error> {
        match row.kind.as_str() {
            "chat" => Ok(HistoryItem::Chat(ChatSession {
                id: row.id,
                user_id: row.user_id,
                created_at: row.created_at,
                document: row
                    .document
                    .map(|d| d.0)
                    .ok_or_else(|| anyhow::anyhow!("chat session {} has no document", row.id))?,
                analysis: row.analysis.map(|a| a.0),
                messages: row.messages.0,
            })),
            "compare" => {
                let (Some(a), Some(b)) = (row.document_a, row.document_b) else {
                    anyhow::bail!("compare session {} is missing a document", row.id);
                };
                Ok(HistoryItem::Compare(CompareSession {
                    id: row.id,
                    user_id: row.user_id,
                    created_at: row.created_at,
                    document_a: a.0,
                    document_b: b.0,
                    comparison: row.comparison.map(|c| c.0),
                }))
            }
            other => anyhow::bail!("unknown history item kind '{other}'"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(kind: &str) -> HistoryItemRow {
        HistoryItemRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            kind: kind.to_string(),
            document: None,
            document_a: None,
            document_b: None,
            analysis: None,
            comparison: None,
            messages: Json(vec![]),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn chat_row_converts_with_document() {
        let mut r = row("chat");
        r.document = Some(Json(Document::from_pasted_text("hello").unwrap()));
        r.messages = Json(vec![ChatMessage::user("hi")]);
        let item = HistoryItem::try_from(r).unwrap();
        let chat = item.into_chat().unwrap();
        assert_eq!(chat.messages.len(), 1);
        assert!(chat.analysis.is_none());
    }

    #[test]
    fn chat_row_without_document_is_rejected() {
        assert!(HistoryItem::try_from(row("chat")).is_err());
    }

    #[test]
    fn compare_row_needs_both_documents() {
        let mut r = row("compare");
        r.document_a = Some(Json(Document::from_pasted_text("a").unwrap()));
        assert!(HistoryItem::try_from(r.clone()).is_err());
        r.document_b = Some(Json(Document::from_pasted_text("b").unwrap()));
        assert!(matches!(
            HistoryItem::try_from(r).unwrap(),
            HistoryItem::Compare(_)
        ));
    }

    #[test]
    fn serializes_with_type_tag() {
        let mut r = row("chat");
        r.document = Some(Json(Document::from_pasted_text("x").unwrap()));
        let value = serde_json::to_value(HistoryItem::try_from(r).unwrap()).unwrap();
        assert_eq!(value["type"], "chat");
        assert_eq!(value["document"]["name"], "Pasted Content");
        assert!(value["analysis"].is_null());
    }
}
