use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use time::OffsetDateTime;
use tracing::{info, instrument};

use super::dto::{
    ListQuery, ListResponse, ReportQuery, ReportResponse, SearchQuery, SummaryResponse,
    TransactionPayload,
};
use crate::analyzer::{self, Period};
use crate::auth::{SessionUser, UserSpreadsheet};
use crate::error::AppError;
use crate::sheets::{Transaction, TxnKind};
use crate::state::AppState;
use crate::utils::format_amount;

async fn active_spreadsheet(state: &AppState, session: &SessionUser) -> Result<String, AppError> {
    UserSpreadsheet::latest(&state.db, session.user.id)
        .await?
        .map(|s| s.spreadsheet_id)
        .ok_or_else(|| AppError::validation("no spreadsheet registered"))
}

async fn load_transactions(
    state: &AppState,
    spreadsheet_id: &str,
) -> Result<Vec<Transaction>, AppError> {
    let rows = state.store.list(spreadsheet_id).await?;
    Ok(rows.into_iter().map(|r| r.txn).collect())
}

#[instrument(skip(state, session))]
pub async fn list(
    State(state): State<AppState>,
    session: SessionUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, AppError> {
    let spreadsheet_id = active_spreadsheet(&state, &session).await?;
    let rows = state.store.list(&spreadsheet_id).await?;
    let total = rows.len();
    let rows = rows
        .into_iter()
        .skip(query.offset)
        .take(query.limit)
        .collect();
    Ok(Json(ListResponse { total, rows }))
}

#[instrument(skip(state, session, payload))]
pub async fn create(
    State(state): State<AppState>,
    session: SessionUser,
    Json(payload): Json<TransactionPayload>,
) -> Result<impl IntoResponse, AppError> {
    let spreadsheet_id = active_spreadsheet(&state, &session).await?;
    let txn = payload.into_transaction(OffsetDateTime::now_utc().date())?;
    state.store.append(&spreadsheet_id, &txn).await?;
    info!(user_id = %session.user.id, amount = txn.amount, "manual transaction added");
    Ok((StatusCode::CREATED, Json(txn)))
}

#[instrument(skip(state, session, payload))]
pub async fn update(
    State(state): State<AppState>,
    session: SessionUser,
    Path(row_index): Path<i64>,
    Json(payload): Json<TransactionPayload>,
) -> Result<Json<Transaction>, AppError> {
    let spreadsheet_id = active_spreadsheet(&state, &session).await?;
    let txn = payload.into_transaction(OffsetDateTime::now_utc().date())?;
    state.store.update(&spreadsheet_id, row_index, &txn).await?;
    info!(user_id = %session.user.id, row_index, "transaction updated");
    Ok(Json(txn))
}

#[instrument(skip(state, session))]
pub async fn delete(
    State(state): State<AppState>,
    session: SessionUser,
    Path(row_index): Path<i64>,
) -> Result<StatusCode, AppError> {
    let spreadsheet_id = active_spreadsheet(&state, &session).await?;
    state.store.delete(&spreadsheet_id, row_index).await?;
    info!(user_id = %session.user.id, row_index, "transaction deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, session))]
pub async fn summary(
    State(state): State<AppState>,
    session: SessionUser,
) -> Result<Json<SummaryResponse>, AppError> {
    let spreadsheet_id = active_spreadsheet(&state, &session).await?;
    let txns = load_transactions(&state, &spreadsheet_id).await?;

    let total_income: f64 = txns
        .iter()
        .filter(|t| t.kind == TxnKind::Income)
        .map(|t| t.amount)
        .sum();
    let total_expense: f64 = txns
        .iter()
        .filter(|t| t.kind == TxnKind::Expense)
        .map(|t| t.amount)
        .sum();

    let balance = total_income - total_expense;
    Ok(Json(SummaryResponse {
        count: txns.len(),
        total_income,
        total_expense,
        balance,
        total_income_formatted: format_amount(total_income),
        total_expense_formatted: format_amount(total_expense),
        balance_formatted: format_amount(balance),
        summary: analyzer::data_summary(&txns, OffsetDateTime::now_utc().date()),
    }))
}

#[instrument(skip(state, session))]
pub async fn report(
    State(state): State<AppState>,
    session: SessionUser,
    Query(query): Query<ReportQuery>,
) -> Result<Json<ReportResponse>, AppError> {
    let kind = TxnKind::parse(&query.kind)
        .ok_or_else(|| AppError::validation("type must be 'expense' or 'income'"))?;
    let period = match query.period.as_deref() {
        None => Period::All,
        Some(p) => Period::parse(p).ok_or_else(|| {
            AppError::validation(
                "period must be one of all, current_month, last_month, last_3_months",
            )
        })?,
    };

    let spreadsheet_id = active_spreadsheet(&state, &session).await?;
    let txns = load_transactions(&state, &spreadsheet_id).await?;
    let report = analyzer::totals_by_category(
        &txns,
        kind,
        period,
        query.category.as_deref(),
        OffsetDateTime::now_utc().date(),
    );
    Ok(Json(ReportResponse { report }))
}

#[instrument(skip(state, session))]
pub async fn search(
    State(state): State<AppState>,
    session: SessionUser,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ReportResponse>, AppError> {
    let keyword = query.q.trim();
    if keyword.is_empty() {
        return Err(AppError::validation("q is required"));
    }

    let spreadsheet_id = active_spreadsheet(&state, &session).await?;
    let txns = load_transactions(&state, &spreadsheet_id).await?;
    let report = analyzer::search_by_keyword(&txns, keyword, query.limit);
    Ok(Json(ReportResponse { report }))
}
