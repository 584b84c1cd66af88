use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RiskLevel {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JargonTerm {
    pub term: String,
    pub definition: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Obligation {
    pub description: String,
    /// Either an exact `YYYY-MM-DD` date or a free-form timeframe.
    pub date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Risk {
    pub clause: String,
    pub risk_level: RiskLevel,
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PiiEntity {
    pub entity: String,
    pub original_text: String,
    pub masked_text: String,
}

/// Output of the demystify flow, persisted on chat sessions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    pub summary: String,
    #[serde(default)]
    pub jargon_buster: Vec<JargonTerm>,
    #[serde(default)]
    pub suggested_questions: Vec<String>,
    #[serde(default)]
    pub obligations: Vec<Obligation>,
    #[serde(default)]
    pub risk_analysis: Vec<Risk>,
    /// Full extracted text; context for follow-up questions.
    pub text: String,
    #[serde(default)]
    pub pii: Vec<PiiEntity>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClauseNote {
    pub clause: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangedTerm {
    pub clause: String,
    pub document_a_details: String,
    pub document_b_details: String,
    pub change_description: String,
}

/// Output of the compare flow, persisted on compare sessions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComparisonResult {
    pub summary: String,
    #[serde(default)]
    pub new_clauses: Vec<ClauseNote>,
    #[serde(default)]
    pub changed_terms: Vec<ChangedTerm>,
    #[serde(default)]
    pub deleted_clauses: Vec<ClauseNote>,
}

#[cfg(test)]
pub(crate) fn sample_analysis() -> AnalysisResult {
    AnalysisResult {
        summary: "A residential lease.".to_string(),
        jargon_buster: vec![JargonTerm {
            term: "Indemnify".to_string(),
            definition: "Cover the other side's losses.".to_string(),
        }],
        suggested_questions: vec!["Can the rent increase?".to_string()],
        obligations: vec![Obligation {
            description: "Pay security deposit".to_string(),
            date: "2025-03-01".to_string(),
        }],
        risk_analysis: vec![
            Risk {
                clause: "Early termination penalty".to_string(),
                risk_level: RiskLevel::High,
                explanation: "Three months' rent is forfeited.".to_string(),
            },
            Risk {
                clause: "Maintenance".to_string(),
                risk_level: RiskLevel::Low,
                explanation: "Tenant handles minor repairs.".to_string(),
            },
        ],
        text: "This lease is made between...".to_string(),
        pii: vec![],
    }
}
