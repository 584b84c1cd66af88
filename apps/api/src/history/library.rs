//! Pure bookkeeping over a user's history: the document library, transcript
//! search, and merging edits into stored analyses.

use std::collections::HashMap;

use serde::Serialize;

use crate::analysis::models::{AnalysisResult, RiskLevel};
use crate::documents::Document;
use crate::errors::AppError;
use crate::history::models::{ChatMessage, ChatSession, HistoryItem, Sender};

pub const COMPARISON_DOCUMENT_SUMMARY: &str = "This document was used in a comparison.";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LibraryDocument {
    pub fingerprint: String,
    #[serde(flatten)]
    pub document: Document,
    pub summary: Option<String>,
}

/// Every distinct document across `history`, in history order.
///
/// A chat entry replaces an earlier entry for the same document only when
/// the earlier one has no summary and the chat session has been analysed;
/// the replacement keeps the earlier position.
pub fn build_library(history: &[HistoryItem]) -> Vec<LibraryDocument> {
    let mut library: Vec<LibraryDocument> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    let mut insert = |document: &Document, summary: Option<String>, replace: bool| {
        let fingerprint = document.fingerprint();
        match index.get(&fingerprint) {
            Some(&pos) => {
                if replace && library[pos].summary.is_none() && summary.is_some() {
                    library[pos].summary = summary;
                }
            }
            None => {
                index.insert(fingerprint.clone(), library.len());
                library.push(LibraryDocument {
                    fingerprint,
                    document: document.clone(),
                    summary,
                });
            }
        }
    };

    for item in history {
        match item {
            HistoryItem::Chat(chat) => {
                let summary = chat.analysis.as_ref().map(|a| a.summary.clone());
                insert(&chat.document, summary, true);
            }
            HistoryItem::Compare(compare) => {
                for document in [&compare.document_a, &compare.document_b] {
                    insert(document, Some(COMPARISON_DOCUMENT_SUMMARY.to_string()), false);
                }
            }
        }
    }

    library
}

/// Case-insensitive substring search over a transcript. Only an empty query
/// matches all; whitespace is searched for like any other text.
pub fn filter_messages(messages: &[ChatMessage], query: Option<&str>) -> Vec<ChatMessage> {
    let Some(query) = active_query(query) else {
        return messages.to_vec();
    };
    let needle = query.to_lowercase();
    messages
        .iter()
        .filter(|m| m.content.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// Suggested questions are offered once the document is analysed and the
/// conversation is either empty or waiting on the user.
pub fn suggestions_visible(session: &ChatSession) -> bool {
    session.analysis.is_some()
        && session
            .messages
            .last()
            .map_or(true, |m| m.sender == Sender::Ai)
}

/// The session's suggested questions, hidden while a search is active.
pub fn visible_suggestions(session: &ChatSession, query: Option<&str>) -> Option<Vec<String>> {
    if active_query(query).is_some() || !suggestions_visible(session) {
        return None;
    }
    session
        .analysis
        .as_ref()
        .map(|analysis| analysis.suggested_questions.clone())
}

fn active_query(query: Option<&str>) -> Option<&str> {
    query.filter(|q| !q.is_empty())
}

/// Copy of `analysis` with the risk at `index` regraded to `level`.
pub fn with_risk_level(
    analysis: &AnalysisResult,
    index: usize,
    level: RiskLevel,
) -> Result<AnalysisResult, AppError> {
    if index >= analysis.risk_analysis.len() {
        return Err(AppError::NotFound(format!(
            "Risk {index} not found ({} risks in analysis)",
            analysis.risk_analysis.len()
        )));
    }
    let mut updated = analysis.clone();
    updated.risk_analysis[index].risk_level = level;
    Ok(updated)
}
