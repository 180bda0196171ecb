use serde::{Deserialize, Serialize};
use time::Date;

use crate::sheets::TxnKind;

// --- Gemini wire types ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Content,
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    pub candidates: Option<Vec<Candidate>>,
}

// --- Parsed oracle output ---

/// Outcome of the intent-classification round-trip.
#[derive(Debug, Clone, Deserialize)]
pub struct Classification {
    #[serde(default)]
    pub is_transaction: bool,
    #[serde(default)]
    pub is_data_query: bool,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub response: String,
}

impl Classification {
    /// Fail-open default: ambiguous or unparseable input is treated as a
    /// transaction rather than dropped.
    pub fn fail_open() -> Self {
        Self {
            is_transaction: true,
            is_data_query: false,
            reasoning: "Analysis failed, defaulting to transaction".to_string(),
            response: String::new(),
        }
    }
}

/// Raw extraction payload as the oracle emits it. Every field is optional;
/// nothing here is trusted until it passes through the amount parser and the
/// category normalizer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawExtraction {
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub amount: Option<serde_json::Value>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub reasoning: Option<String>,
}

/// A normalized, extracted-but-unconfirmed transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Draft {
    pub date: Date,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: TxnKind,
    pub category: String,
    pub note: String,
    pub reasoning: String,
}

/// How a new utterance relates to the pending draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextIntent {
    UpdateTransaction,
    NewTransaction,
    Conversation,
}

impl ContextIntent {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "update_transaction" => Some(Self::UpdateTransaction),
            "new_transaction" => Some(Self::NewTransaction),
            "conversation" => Some(Self::Conversation),
            _ => None,
        }
    }
}

/// Result of context-aware extraction.
#[derive(Debug, Clone)]
pub enum ContextOutcome {
    Transaction { intent: ContextIntent, draft: Draft },
    Conversation,
}
