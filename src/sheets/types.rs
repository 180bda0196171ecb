use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

/// Column order of the transactions worksheet; row 1 holds exactly these.
pub const SHEET_HEADER: [&str; 6] = ["timestamp", "date", "amount", "type", "category", "note"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxnKind {
    Expense,
    Income,
}

impl TxnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxnKind::Expense => "expense",
            TxnKind::Income => "income",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "expense" => Some(TxnKind::Expense),
            "income" => Some(TxnKind::Income),
            _ => None,
        }
    }
}

/// One data row of the sheet. The timestamp is server-set on every write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub date: Date,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: TxnKind,
    pub category: String,
    pub note: String,
}

/// A transaction together with its 1-based sheet row index (data starts at 2).
#[derive(Debug, Clone, Serialize)]
pub struct SheetRow {
    pub row_index: i64,
    #[serde(flatten)]
    pub txn: Transaction,
}

impl Transaction {
    /// Cells in sheet column order, timestamp refreshed to now.
    pub fn to_cells(&self) -> Vec<serde_json::Value> {
        let ts = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default();
        vec![
            serde_json::Value::String(ts),
            serde_json::Value::String(self.date.to_string()),
            serde_json::json!(self.amount),
            serde_json::Value::String(self.kind.as_str().to_string()),
            serde_json::Value::String(self.category.clone()),
            serde_json::Value::String(self.note.clone()),
        ]
    }

    /// Rebuild a transaction from raw sheet cells.
    ///
    /// Unparseable amounts collapse to 0.0 (bad rows should not hide the rest
    /// of the history); a broken date or type makes the row unusable.
    pub fn from_cells(cells: &[serde_json::Value]) -> anyhow::Result<Self> {
        let cell = |i: usize| -> String {
            match cells.get(i) {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(v) => v.to_string(),
                None => String::new(),
            }
        };

        let date_fmt = format_description!("[year]-[month]-[day]");
        let date = Date::parse(cell(1).trim(), &date_fmt)
            .map_err(|e| anyhow::anyhow!("bad date '{}': {}", cell(1), e))?;
        let kind = TxnKind::parse(&cell(3))
            .ok_or_else(|| anyhow::anyhow!("unknown transaction type '{}'", cell(3)))?;

        let timestamp = OffsetDateTime::parse(cell(0).trim(), &Rfc3339)
            .unwrap_or(OffsetDateTime::UNIX_EPOCH);
        let amount = crate::utils::parse_amount(&cell(2)).unwrap_or(0.0);

        Ok(Self {
            timestamp,
            date,
            amount,
            kind,
            category: cell(4),
            note: cell(5),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn cells(ts: &str, d: &str, amt: &str, kind: &str) -> Vec<serde_json::Value> {
        vec![
            serde_json::json!(ts),
            serde_json::json!(d),
            serde_json::json!(amt),
            serde_json::json!(kind),
            serde_json::json!("food"),
            serde_json::json!("kopi"),
        ]
    }

    #[test]
    fn round_trips_cells() {
        let txn = Transaction {
            timestamp: OffsetDateTime::UNIX_EPOCH,
            date: date!(2025 - 08 - 30),
            amount: 25000.0,
            kind: TxnKind::Expense,
            category: "food".into(),
            note: "kopi".into(),
        };
        let out = txn.to_cells();
        assert_eq!(out.len(), SHEET_HEADER.len());
        assert_eq!(out[1], serde_json::json!("2025-08-30"));
        assert_eq!(out[3], serde_json::json!("expense"));
    }

    #[test]
    fn parses_cells_with_numeric_amount() {
        let mut c = cells("2025-08-30T10:00:00Z", "2025-08-30", "", "income");
        c[2] = serde_json::json!(150000.0);
        let txn = Transaction::from_cells(&c).unwrap();
        assert_eq!(txn.amount, 150000.0);
        assert_eq!(txn.kind, TxnKind::Income);
    }

    #[test]
    fn bad_amount_becomes_zero() {
        let c = cells("2025-08-30T10:00:00Z", "2025-08-30", "???", "expense");
        let txn = Transaction::from_cells(&c).unwrap();
        assert_eq!(txn.amount, 0.0);
    }

    #[test]
    fn bad_date_is_rejected() {
        let c = cells("2025-08-30T10:00:00Z", "yesterday", "100", "expense");
        assert!(Transaction::from_cells(&c).is_err());
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let c = cells("2025-08-30T10:00:00Z", "2025-08-30", "100", "transfer");
        assert!(Transaction::from_cells(&c).is_err());
    }
}
