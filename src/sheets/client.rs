use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::sheets::types::{SheetRow, Transaction, SHEET_HEADER};

const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

#[derive(Debug, Error)]
pub enum SheetError {
    #[error("row index must be >= 2 (row 1 is the header), got {0}")]
    InvalidRowIndex(i64),

    #[error("row {0} does not exist")]
    RowMissing(i64),

    #[error("sheets api error: {0}")]
    Api(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl From<SheetError> for crate::error::AppError {
    fn from(e: SheetError) -> Self {
        match e {
            SheetError::InvalidRowIndex(_) => Self::Validation(e.to_string()),
            SheetError::RowMissing(_) => Self::NotFound,
            other => Self::External(other.into()),
        }
    }
}

fn check_row_index(row_index: i64) -> Result<(), SheetError> {
    if row_index < 2 {
        return Err(SheetError::InvalidRowIndex(row_index));
    }
    Ok(())
}

/// Row-level access to a user's transactions worksheet.
///
/// Rows are addressed by 1-based position with the header at row 1; there is
/// no stable row id, so a concurrent delete can shift indexes under a caller.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    async fn append(&self, spreadsheet_id: &str, txn: &Transaction) -> Result<(), SheetError>;
    async fn list(&self, spreadsheet_id: &str) -> Result<Vec<SheetRow>, SheetError>;
    async fn update(
        &self,
        spreadsheet_id: &str,
        row_index: i64,
        txn: &Transaction,
    ) -> Result<(), SheetError>;
    async fn delete(&self, spreadsheet_id: &str, row_index: i64) -> Result<(), SheetError>;
}

/// Google Sheets values API client. No retries; a spreadsheet missing the
/// named worksheet gets it created with a header row on first use.
pub struct SheetsClient {
    client: Client,
    api_token: String,
    sheet_name: String,
    base_url: String,
    /// Spreadsheets whose worksheet has been verified this process.
    ensured: Mutex<HashSet<String>>,
}

impl SheetsClient {
    pub fn new(api_token: String, sheet_name: String) -> Self {
        Self::with_base_url(api_token, sheet_name, SHEETS_BASE_URL.to_string())
    }

    fn with_base_url(api_token: String, sheet_name: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_token,
            sheet_name,
            base_url,
            ensured: Mutex::new(HashSet::new()),
        }
    }

    async fn check(&self, res: reqwest::Response, what: &str) -> Result<reqwest::Response, SheetError> {
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(SheetError::Api(format!(
                "{} failed (status {}): {}",
                what, status, body
            )));
        }
        Ok(res)
    }

    /// Find the numeric id of the named worksheet from spreadsheet metadata,
    /// if it exists. batchUpdate requests address sheets by id, not title.
    async fn lookup_sheet_id(&self, spreadsheet_id: &str) -> Result<Option<i64>, SheetError> {
        let url = format!(
            "{}/{}?fields=sheets.properties",
            self.base_url, spreadsheet_id
        );
        let res = self
            .client
            .get(&url)
            .bearer_auth(&self.api_token)
            .send()
            .await?;
        let body: serde_json::Value = self.check(res, "spreadsheet metadata").await?.json().await?;

        Ok(body
            .get("sheets")
            .and_then(|s| s.as_array())
            .into_iter()
            .flatten()
            .filter_map(|s| s.get("properties"))
            .find(|p| p.get("title").and_then(|t| t.as_str()) == Some(self.sheet_name.as_str()))
            .and_then(|p| p.get("sheetId").and_then(|id| id.as_i64())))
    }

    async fn resolve_sheet_id(&self, spreadsheet_id: &str) -> Result<i64, SheetError> {
        self.lookup_sheet_id(spreadsheet_id).await?.ok_or_else(|| {
            SheetError::Api(format!("worksheet '{}' not found", self.sheet_name))
        })
    }

    /// Create the worksheet and its header row if the spreadsheet does not
    /// have them yet. Verified once per spreadsheet per process.
    async fn ensure_worksheet(&self, spreadsheet_id: &str) -> Result<(), SheetError> {
        if self.ensured.lock().await.contains(spreadsheet_id) {
            return Ok(());
        }

        if self.lookup_sheet_id(spreadsheet_id).await?.is_none() {
            let url = format!("{}/{}:batchUpdate", self.base_url, spreadsheet_id);
            let payload = json!({
                "requests": [{
                    "addSheet": { "properties": { "title": self.sheet_name } }
                }]
            });
            let res = self
                .client
                .post(&url)
                .bearer_auth(&self.api_token)
                .json(&payload)
                .send()
                .await?;
            self.check(res, "add worksheet").await?;

            let url = format!(
                "{}/{}/values/{}!A1:F1:append?valueInputOption=USER_ENTERED",
                self.base_url, spreadsheet_id, self.sheet_name
            );
            let payload = json!({ "values": [SHEET_HEADER] });
            let res = self
                .client
                .post(&url)
                .bearer_auth(&self.api_token)
                .json(&payload)
                .send()
                .await?;
            self.check(res, "write header row").await?;
            info!(%spreadsheet_id, sheet = %self.sheet_name, "worksheet created with header row");
        }

        self.ensured.lock().await.insert(spreadsheet_id.to_string());
        Ok(())
    }
}

#[async_trait]
impl TransactionStore for SheetsClient {
    async fn append(&self, spreadsheet_id: &str, txn: &Transaction) -> Result<(), SheetError> {
        self.ensure_worksheet(spreadsheet_id).await?;
        let url = format!(
            "{}/{}/values/{}!A1:F1:append?valueInputOption=USER_ENTERED",
            self.base_url, spreadsheet_id, self.sheet_name
        );
        let payload = json!({ "values": [txn.to_cells()] });
        debug!(%spreadsheet_id, "appending transaction row");
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(&payload)
            .send()
            .await?;
        self.check(res, "append").await?;
        info!(%spreadsheet_id, "transaction appended");
        Ok(())
    }

    async fn list(&self, spreadsheet_id: &str) -> Result<Vec<SheetRow>, SheetError> {
        self.ensure_worksheet(spreadsheet_id).await?;
        let url = format!(
            "{}/{}/values/{}!A2:F",
            self.base_url, spreadsheet_id, self.sheet_name
        );
        let res = self
            .client
            .get(&url)
            .bearer_auth(&self.api_token)
            .send()
            .await?;
        let body: serde_json::Value = self.check(res, "list").await?.json().await?;

        let values = body
            .get("values")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        let mut rows = Vec::with_capacity(values.len());
        for (i, cells) in values.iter().enumerate() {
            let row_index = i as i64 + 2;
            let cells = cells.as_array().cloned().unwrap_or_default();
            match Transaction::from_cells(&cells) {
                Ok(txn) => rows.push(SheetRow { row_index, txn }),
                Err(e) => warn!(row_index, error = %e, "skipping unreadable sheet row"),
            }
        }
        Ok(rows)
    }

    async fn update(
        &self,
        spreadsheet_id: &str,
        row_index: i64,
        txn: &Transaction,
    ) -> Result<(), SheetError> {
        check_row_index(row_index)?;
        self.ensure_worksheet(spreadsheet_id).await?;
        let url = format!(
            "{}/{}/values/{}!A{row}:F{row}?valueInputOption=USER_ENTERED",
            self.base_url,
            spreadsheet_id,
            self.sheet_name,
            row = row_index
        );
        let payload = json!({ "values": [txn.to_cells()] });
        let res = self
            .client
            .put(&url)
            .bearer_auth(&self.api_token)
            .json(&payload)
            .send()
            .await?;
        self.check(res, "update").await?;
        info!(%spreadsheet_id, row_index, "transaction updated");
        Ok(())
    }

    async fn delete(&self, spreadsheet_id: &str, row_index: i64) -> Result<(), SheetError> {
        check_row_index(row_index)?;
        self.ensure_worksheet(spreadsheet_id).await?;
        let sheet_id = self.resolve_sheet_id(spreadsheet_id).await?;
        let url = format!("{}/{}:batchUpdate", self.base_url, spreadsheet_id);
        let payload = json!({
            "requests": [{
                "deleteDimension": {
                    "range": {
                        "sheetId": sheet_id,
                        "dimension": "ROWS",
                        "startIndex": row_index - 1,
                        "endIndex": row_index
                    }
                }
            }]
        });
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(&payload)
            .send()
            .await?;
        self.check(res, "delete").await?;
        info!(%spreadsheet_id, row_index, "transaction row deleted");
        Ok(())
    }
}

/// In-memory store with the same positional semantics, for tests and local
/// runs without Sheets credentials.
#[derive(Default)]
pub struct MemoryStore {
    sheets: Mutex<HashMap<String, Vec<Transaction>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransactionStore for MemoryStore {
    async fn append(&self, spreadsheet_id: &str, txn: &Transaction) -> Result<(), SheetError> {
        let mut sheets = self.sheets.lock().await;
        sheets
            .entry(spreadsheet_id.to_string())
            .or_default()
            .push(txn.clone());
        Ok(())
    }

    async fn list(&self, spreadsheet_id: &str) -> Result<Vec<SheetRow>, SheetError> {
        let sheets = self.sheets.lock().await;
        let rows = sheets
            .get(spreadsheet_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
            .iter()
            .enumerate()
            .map(|(i, txn)| SheetRow {
                row_index: i as i64 + 2,
                txn: txn.clone(),
            })
            .collect();
        Ok(rows)
    }

    async fn update(
        &self,
        spreadsheet_id: &str,
        row_index: i64,
        txn: &Transaction,
    ) -> Result<(), SheetError> {
        check_row_index(row_index)?;
        let mut sheets = self.sheets.lock().await;
        let rows = sheets
            .get_mut(spreadsheet_id)
            .ok_or(SheetError::RowMissing(row_index))?;
        let slot = rows
            .get_mut((row_index - 2) as usize)
            .ok_or(SheetError::RowMissing(row_index))?;
        *slot = txn.clone();
        Ok(())
    }

    async fn delete(&self, spreadsheet_id: &str, row_index: i64) -> Result<(), SheetError> {
        check_row_index(row_index)?;
        let mut sheets = self.sheets.lock().await;
        let rows = sheets
            .get_mut(spreadsheet_id)
            .ok_or(SheetError::RowMissing(row_index))?;
        let i = (row_index - 2) as usize;
        if i >= rows.len() {
            return Err(SheetError::RowMissing(row_index));
        }
        rows.remove(i);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheets::types::TxnKind;
    use time::macros::date;
    use time::OffsetDateTime;

    fn txn(amount: f64, note: &str) -> Transaction {
        Transaction {
            timestamp: OffsetDateTime::UNIX_EPOCH,
            date: date!(2025 - 08 - 30),
            amount,
            kind: TxnKind::Expense,
            category: "food".into(),
            note: note.into(),
        }
    }

    #[tokio::test]
    async fn append_then_list_assigns_row_indexes_from_two() {
        let store = MemoryStore::new();
        store.append("sheet-a", &txn(100.0, "a")).await.unwrap();
        store.append("sheet-a", &txn(200.0, "b")).await.unwrap();

        let rows = store.list("sheet-a").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row_index, 2);
        assert_eq!(rows[1].row_index, 3);
        assert_eq!(rows[1].txn.amount, 200.0);
    }

    #[tokio::test]
    async fn update_rejects_header_row() {
        let store = MemoryStore::new();
        store.append("s", &txn(1.0, "x")).await.unwrap();
        let err = store.update("s", 1, &txn(2.0, "y")).await.unwrap_err();
        assert!(matches!(err, SheetError::InvalidRowIndex(1)));
    }

    #[tokio::test]
    async fn delete_rejects_header_and_missing_rows() {
        let store = MemoryStore::new();
        store.append("s", &txn(1.0, "x")).await.unwrap();
        assert!(matches!(
            store.delete("s", 0).await.unwrap_err(),
            SheetError::InvalidRowIndex(0)
        ));
        assert!(matches!(
            store.delete("s", 9).await.unwrap_err(),
            SheetError::RowMissing(9)
        ));
        store.delete("s", 2).await.unwrap();
        assert!(store.list("s").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_shifts_following_rows() {
        let store = MemoryStore::new();
        store.append("s", &txn(1.0, "a")).await.unwrap();
        store.append("s", &txn(2.0, "b")).await.unwrap();
        store.delete("s", 2).await.unwrap();

        // Positional addressing: "b" now lives at row 2.
        let rows = store.list("s").await.unwrap();
        assert_eq!(rows[0].row_index, 2);
        assert_eq!(rows[0].txn.note, "b");
    }

    #[tokio::test]
    async fn stores_are_isolated_per_spreadsheet() {
        let store = MemoryStore::new();
        store.append("a", &txn(1.0, "x")).await.unwrap();
        assert!(store.list("b").await.unwrap().is_empty());
    }

    mod provisioning {
        use super::*;
        use axum::http::{Method, Uri};
        use axum::response::IntoResponse;
        use axum::routing::any;
        use axum::{Json, Router};
        use std::sync::Arc;

        /// (method, path+query, body) of every request the client made.
        #[derive(Clone, Default)]
        struct Recorded(Arc<Mutex<Vec<(String, String, String)>>>);

        /// Local stand-in for the Sheets API whose spreadsheet metadata
        /// reports a single worksheet with the given title.
        async fn spawn_fake_sheets(recorded: Recorded, existing_title: &'static str) -> String {
            let app = Router::new().route(
                "/*path",
                any(move |method: Method, uri: Uri, body: String| {
                    let recorded = recorded.clone();
                    async move {
                        let is_metadata = method == Method::GET && uri.to_string().contains("fields=");
                        recorded
                            .0
                            .lock()
                            .await
                            .push((method.to_string(), uri.to_string(), body));
                        if is_metadata {
                            Json(json!({
                                "sheets": [{"properties": {"title": existing_title, "sheetId": 7}}]
                            }))
                            .into_response()
                        } else {
                            Json(json!({})).into_response()
                        }
                    }
                }),
            );
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });
            format!("http://{}", addr)
        }

        #[tokio::test]
        async fn append_provisions_a_missing_worksheet_with_header() {
            let recorded = Recorded::default();
            let base = spawn_fake_sheets(recorded.clone(), "Sheet1").await;
            let client = SheetsClient::with_base_url("tok".into(), "transactions".into(), base);

            client.append("fresh", &txn(25000.0, "kopi")).await.unwrap();

            let calls = recorded.0.lock().await;
            assert_eq!(calls.len(), 4);
            assert!(calls[0].0 == "GET" && calls[0].1.contains("fields=sheets.properties"));
            assert!(calls[1].1.ends_with(":batchUpdate") && calls[1].2.contains("addSheet"));
            assert!(calls[2].1.contains("A1:F1:append") && calls[2].2.contains("\"timestamp\""));
            assert!(calls[3].1.contains(":append") && calls[3].2.contains("kopi"));
            drop(calls);

            // The worksheet check is cached, so only the row append remains.
            client.append("fresh", &txn(1.0, "lagi")).await.unwrap();
            assert_eq!(recorded.0.lock().await.len(), 5);
        }

        #[tokio::test]
        async fn existing_worksheet_is_left_alone() {
            let recorded = Recorded::default();
            let base = spawn_fake_sheets(recorded.clone(), "transactions").await;
            let client = SheetsClient::with_base_url("tok".into(), "transactions".into(), base);

            client.append("known", &txn(100.0, "x")).await.unwrap();

            let calls = recorded.0.lock().await;
            assert_eq!(calls.len(), 2);
            assert!(calls[0].1.contains("fields=sheets.properties"));
            assert!(calls[1].1.contains(":append") && !calls[1].2.contains("addSheet"));
        }
    }
}
