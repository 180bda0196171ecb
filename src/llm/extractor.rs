use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use time::macros::format_description;
use time::Date;
use tracing::{debug, info, warn};

use crate::llm::client::{LanguageModel, LlmError};
use crate::llm::prompts;
use crate::llm::types::{Classification, ContextIntent, ContextOutcome, Draft, RawExtraction};
use crate::sheets::TxnKind;
use crate::utils::{format_amount, normalize_category, parse_amount};

/// Strip an optional fenced ```json block; otherwise the whole trimmed
/// response is treated as JSON.
fn unwrap_json(raw: &str) -> String {
    lazy_static! {
        static ref FENCED: Regex = Regex::new(r"(?s)```json\s*(.*?)\s*```").unwrap();
    }
    match FENCED.captures(raw) {
        Some(c) => c[1].to_string(),
        None => raw.trim().to_string(),
    }
}

fn value_to_string(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Turn the oracle's raw field soup into a usable draft. The oracle's amount
/// and category are never taken at face value.
fn normalize(raw: RawExtraction, today: Date) -> Result<Draft, LlmError> {
    let date_fmt = format_description!("[year]-[month]-[day]");
    let date = raw
        .date
        .as_deref()
        .and_then(|d| Date::parse(d.trim(), &date_fmt).ok())
        .unwrap_or(today);

    let amount = raw
        .amount
        .as_ref()
        .map(value_to_string)
        .ok_or_else(|| LlmError::Malformed("extraction is missing an amount".to_string()))?;
    let amount = parse_amount(&amount)
        .map_err(|e| LlmError::Malformed(e.to_string()))?;

    let category = normalize_category(raw.category.as_deref());
    let kind = raw
        .kind
        .as_deref()
        .and_then(TxnKind::parse)
        .unwrap_or(if category == "income" {
            TxnKind::Income
        } else {
            TxnKind::Expense
        });

    Ok(Draft {
        date,
        amount,
        kind,
        category,
        note: raw.note.unwrap_or_default(),
        reasoning: raw.reasoning.unwrap_or_default(),
    })
}

/// Wraps the oracle with the three prompt templates and their parsing
/// contracts.
#[derive(Clone)]
pub struct Extractor {
    model: Arc<dyn LanguageModel>,
}

impl Extractor {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Classify an utterance. Never fails: any network or parse problem
    /// fail-opens to "treat it as a transaction" so financial input is not
    /// silently dropped.
    pub async fn classify(&self, text: &str) -> Classification {
        let prompt = prompts::CLASSIFY.replace("{text}", text);
        let raw = match self.model.generate(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "classification call failed, defaulting to transaction");
                return Classification::fail_open();
            }
        };
        match serde_json::from_str::<Classification>(&unwrap_json(&raw)) {
            Ok(c) => {
                debug!(
                    is_transaction = c.is_transaction,
                    is_data_query = c.is_data_query,
                    "classified utterance"
                );
                c
            }
            Err(e) => {
                warn!(error = %e, "unparseable classification, defaulting to transaction");
                Classification::fail_open()
            }
        }
    }

    /// Extract a draft transaction from free text.
    pub async fn extract(&self, text: &str, today: Date) -> Result<Draft, LlmError> {
        let prompt = prompts::EXTRACT
            .replace("{today}", &today.to_string())
            .replace("{text}", text);
        let raw = self.model.generate(&prompt).await?;
        let parsed: RawExtraction = serde_json::from_str(&unwrap_json(&raw))
            .map_err(|e| LlmError::Malformed(format!("extraction JSON: {}", e)))?;
        normalize(parsed, today)
    }

    /// Extract against a pending draft: the oracle decides whether the new
    /// utterance updates it, replaces it, or is just talk. If the
    /// context-aware round-trip fails in any way, fall back to context-free
    /// extraction.
    pub async fn extract_with_context(
        &self,
        text: &str,
        today: Date,
        prior: &Draft,
    ) -> Result<ContextOutcome, LlmError> {
        let prompt = prompts::EXTRACT_WITH_CONTEXT
            .replace("{prior_date}", &prior.date.to_string())
            .replace("{prior_amount}", &format_amount(prior.amount))
            .replace("{prior_type}", prior.kind.as_str())
            .replace("{prior_category}", &prior.category)
            .replace("{prior_note}", &prior.note)
            .replace("{today}", &today.to_string())
            .replace("{text}", text);

        let attempt = async {
            let raw = self.model.generate(&prompt).await?;
            serde_json::from_str::<RawExtraction>(&unwrap_json(&raw))
                .map_err(|e| LlmError::Malformed(format!("context extraction JSON: {}", e)))
        };

        let parsed = match attempt.await {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "context-aware extraction failed, retrying without context");
                let draft = self.extract(text, today).await?;
                return Ok(ContextOutcome::Transaction {
                    intent: ContextIntent::NewTransaction,
                    draft,
                });
            }
        };

        let intent = parsed
            .intent
            .as_deref()
            .and_then(ContextIntent::parse)
            .unwrap_or(ContextIntent::NewTransaction);

        if intent == ContextIntent::Conversation {
            return Ok(ContextOutcome::Conversation);
        }

        let draft = normalize(parsed, today)?;
        info!(?intent, amount = draft.amount, "context-aware extraction");
        Ok(ContextOutcome::Transaction { intent, draft })
    }

    /// Answer a data question grounded in the pre-aggregated summary.
    /// Best-effort: a fixed apology on any failure.
    pub async fn answer(&self, query: &str, data_summary: &str) -> String {
        let prompt = prompts::DATA_QUERY
            .replace("{text}", query)
            .replace("{data_summary}", data_summary);
        match self.model.generate(&prompt).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!(error = %e, "data query answer failed");
                prompts::FALLBACK_ANALYSIS.to_string()
            }
        }
    }

    /// Friendly reply for pure conversation. Best-effort.
    pub async fn respond(&self, text: &str) -> String {
        let prompt = prompts::FRIENDLY.replace("{text}", text);
        match self.model.generate(&prompt).await {
            Ok(reply) => reply.trim().to_string(),
            Err(e) => {
                warn!(error = %e, "friendly response failed");
                prompts::FALLBACK_REPLY.to_string()
            }
        }
    }
}
