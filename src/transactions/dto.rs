use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::{Date, OffsetDateTime};

use crate::error::AppError;
use crate::sheets::{SheetRow, Transaction, TxnKind};
use crate::utils::{normalize_category, parse_amount};

fn default_limit() -> usize {
    20
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

/// Manual entry payload; also the full-replacement body for updates.
/// The amount accepts the same shorthand the chat does ("25k", "1.200,50").
#[derive(Debug, Deserialize)]
pub struct TransactionPayload {
    pub amount: serde_json::Value,
    #[serde(rename = "type")]
    pub kind: String,
    pub date: Option<String>,
    pub category: Option<String>,
    pub note: Option<String>,
}

impl TransactionPayload {
    pub fn into_transaction(self, today: Date) -> Result<Transaction, AppError> {
        let amount = match &self.amount {
            serde_json::Value::Number(n) => n
                .as_f64()
                .ok_or_else(|| AppError::validation("amount is not a number"))?,
            serde_json::Value::String(s) => parse_amount(s)?,
            _ => return Err(AppError::validation("amount must be a number or a string")),
        };
        if amount <= 0.0 {
            return Err(AppError::validation("amount must be positive"));
        }

        let kind = TxnKind::parse(&self.kind)
            .ok_or_else(|| AppError::validation("type must be 'expense' or 'income'"))?;

        let date_fmt = format_description!("[year]-[month]-[day]");
        let date = match self.date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            Some(d) => Date::parse(d, &date_fmt)
                .map_err(|_| AppError::validation("date must be YYYY-MM-DD"))?,
            None => today,
        };

        Ok(Transaction {
            timestamp: OffsetDateTime::now_utc(),
            date,
            amount,
            kind,
            category: normalize_category(self.category.as_deref()),
            note: self.note.unwrap_or_default().trim().to_string(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub total: usize,
    pub rows: Vec<SheetRow>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub count: usize,
    pub total_income: f64,
    pub total_expense: f64,
    pub balance: f64,
    /// Indonesian-formatted renderings of the totals, for direct display.
    pub total_income_formatted: String,
    pub total_expense_formatted: String,
    pub balance_formatted: String,
    /// Same pre-aggregated text the chat grounds its answers in.
    pub summary: String,
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    #[serde(rename = "type")]
    pub kind: String,
    pub period: Option<String>,
    pub category: Option<String>,
}

fn default_search_limit() -> usize {
    10
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub report: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    const TODAY: Date = date!(2025 - 08 - 30);

    fn payload(amount: serde_json::Value) -> TransactionPayload {
        TransactionPayload {
            amount,
            kind: "expense".into(),
            date: Some("2025-08-29".into()),
            category: Some("makanan".into()),
            note: Some(" kopi ".into()),
        }
    }

    #[test]
    fn builds_a_transaction_from_shorthand_amount() {
        let txn = payload(serde_json::json!("25k")).into_transaction(TODAY).unwrap();
        assert_eq!(txn.amount, 25000.0);
        assert_eq!(txn.kind, TxnKind::Expense);
        assert_eq!(txn.date, date!(2025 - 08 - 29));
        assert_eq!(txn.category, "food");
        assert_eq!(txn.note, "kopi");
    }

    #[test]
    fn missing_date_defaults_to_today() {
        let mut p = payload(serde_json::json!(15000));
        p.date = None;
        assert_eq!(p.into_transaction(TODAY).unwrap().date, TODAY);
    }

    #[test]
    fn rejects_nonpositive_amounts() {
        assert!(payload(serde_json::json!(0)).into_transaction(TODAY).is_err());
        assert!(payload(serde_json::json!(-5)).into_transaction(TODAY).is_err());
    }

    #[test]
    fn rejects_unknown_type_and_bad_date() {
        let mut p = payload(serde_json::json!(1000));
        p.kind = "transfer".into();
        assert!(p.into_transaction(TODAY).is_err());

        let mut p = payload(serde_json::json!(1000));
        p.date = Some("yesterday".into());
        assert!(p.into_transaction(TODAY).is_err());
    }

    #[test]
    fn list_query_defaults() {
        let q: ListQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(q.limit, 20);
        assert_eq!(q.offset, 0);
    }
}
