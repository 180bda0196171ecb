use time::OffsetDateTime;
use tracing::{info, warn};

use super::dto::{ChatReplyKind, ChatResponse};
use crate::analyzer;
use crate::error::AppError;
use crate::llm::prompts;
use crate::llm::{ContextIntent, ContextOutcome, Draft};
use crate::sheets::{Transaction, TxnKind};
use crate::state::AppState;
use crate::utils::format_amount;

/// Sent when the oracle sees a transaction but cannot pin down an amount.
const CLARIFY: &str = "Maaf, aku belum menangkap jumlahnya. Bisa tulis ulang dengan nominalnya? Contoh: 'beli kopi 25rb'.";

const SAVED: &str = "✅ Transaksi berhasil disimpan!";
const CANCELLED: &str = "❌ Oke, transaksi dibatalkan.";
const NOTHING_PENDING: &str = "Tidak ada transaksi yang menunggu konfirmasi.";

fn kind_label(kind: TxnKind) -> &'static str {
    match kind {
        TxnKind::Expense => "pengeluaran",
        TxnKind::Income => "pemasukan",
    }
}

fn preview_text(draft: &Draft, updated: bool) -> String {
    let heading = if updated {
        "📝 Transaksi diperbarui:"
    } else {
        "📝 Transaksi terdeteksi:"
    };
    let mut text = format!(
        "{heading}\nTanggal: {}\nJumlah: Rp {}\nJenis: {}\nKategori: {}\nCatatan: {}",
        draft.date,
        format_amount(draft.amount),
        kind_label(draft.kind),
        draft.category,
        draft.note,
    );
    if !draft.reasoning.trim().is_empty() {
        text.push_str(&format!("\nPerhitungan: {}", draft.reasoning.trim()));
    }
    text.push_str("\n\nSimpan transaksi ini?");
    text
}

fn draft_to_transaction(draft: &Draft) -> Transaction {
    Transaction {
        timestamp: OffsetDateTime::now_utc(),
        date: draft.date,
        amount: draft.amount,
        kind: draft.kind,
        category: draft.category.clone(),
        note: draft.note.clone(),
    }
}

/// One turn of the chat loop: classify, then either answer from the sheet,
/// drive the pending-transaction state machine, or just chat back.
///
/// Infallible: oracle and sheet failures degrade to a visible bot message.
pub async fn handle_message(
    state: &AppState,
    token: &str,
    spreadsheet_id: &str,
    text: &str,
) -> ChatResponse {
    let today = OffsetDateTime::now_utc().date();
    let classification = state.extractor.classify(text).await;

    if classification.is_data_query {
        let txns: Vec<Transaction> = match state.store.list(spreadsheet_id).await {
            Ok(rows) => rows.into_iter().map(|r| r.txn).collect(),
            Err(e) => {
                warn!(error = %e, "sheet read failed during data query");
                return ChatResponse::analysis(prompts::FALLBACK_ANALYSIS);
            }
        };
        let summary = analyzer::data_summary(&txns, today);
        let reply = state.extractor.answer(text, &summary).await;
        return ChatResponse::analysis(reply);
    }

    if classification.is_transaction {
        let outcome = match state.pending_draft(token).await {
            Some(prior) => {
                state
                    .extractor
                    .extract_with_context(text, today, &prior)
                    .await
            }
            None => state.extractor.extract(text, today).await.map(|draft| {
                ContextOutcome::Transaction {
                    intent: ContextIntent::NewTransaction,
                    draft,
                }
            }),
        };

        return match outcome {
            Ok(ContextOutcome::Transaction { intent, draft }) => {
                let updated = intent == ContextIntent::UpdateTransaction;
                state.set_pending(token, draft.clone()).await;
                info!(amount = draft.amount, updated, "draft awaiting confirmation");
                ChatResponse::preview(preview_text(&draft, updated), draft)
            }
            Ok(ContextOutcome::Conversation) => {
                ChatResponse::conversation(state.extractor.respond(text).await)
            }
            Err(e) => {
                warn!(error = %e, "extraction failed, asking for clarification");
                ChatResponse::conversation(CLARIFY)
            }
        };
    }

    let response = classification.response.trim().to_string();
    let reply = if response.is_empty() {
        state.extractor.respond(text).await
    } else {
        response
    };
    ChatResponse::conversation(reply)
}

/// Persist the pending draft. On a sheet failure the draft is restored so
/// the user can retry the confirmation.
pub async fn confirm(
    state: &AppState,
    token: &str,
    spreadsheet_id: &str,
) -> Result<ChatResponse, AppError> {
    let draft = state
        .take_pending(token)
        .await
        .ok_or_else(|| AppError::validation("no pending transaction to confirm"))?;

    let txn = draft_to_transaction(&draft);
    if let Err(e) = state.store.append(spreadsheet_id, &txn).await {
        state.set_pending(token, draft).await;
        return Err(e.into());
    }

    info!(amount = txn.amount, kind = txn.kind.as_str(), "transaction saved");
    Ok(ChatResponse {
        reply: format!(
            "{SAVED}\nRp {} ({}) tercatat di kategori {}.",
            format_amount(txn.amount),
            kind_label(txn.kind),
            txn.category,
        ),
        kind: ChatReplyKind::Saved,
        draft: None,
    })
}

/// Discard the pending draft. Safe to call when nothing is pending.
pub async fn cancel(state: &AppState, token: &str) -> ChatResponse {
    let reply = match state.take_pending(token).await {
        Some(_) => CANCELLED,
        None => NOTHING_PENDING,
    };
    ChatResponse {
        reply: reply.to_string(),
        kind: ChatReplyKind::Cancelled,
        draft: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use crate::llm::{LanguageModel, LlmError};
    use crate::sheets::{MemoryStore, TransactionStore};

    struct FakeModel {
        replies: Mutex<VecDeque<String>>,
    }

    impl FakeModel {
        fn new(replies: Vec<&str>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into_iter().map(String::from).collect()),
            })
        }
    }

    #[async_trait]
    impl LanguageModel for FakeModel {
        async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
            Ok(self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("fake model ran out of replies"))
        }
    }

    const CLASSIFY_TX: &str =
        r#"{"is_transaction": true, "is_data_query": false, "reasoning": "", "response": ""}"#;
    const CLASSIFY_QUERY: &str =
        r#"{"is_transaction": false, "is_data_query": true, "reasoning": "", "response": ""}"#;
    const EXTRACT_COFFEE: &str =
        r#"{"amount": "25k", "type": "expense", "category": "makanan", "note": "kopi"}"#;

    fn state(replies: Vec<&str>) -> AppState {
        AppState::fake(FakeModel::new(replies), Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn transaction_message_sets_a_pending_draft() {
        let state = state(vec![CLASSIFY_TX, EXTRACT_COFFEE]);
        let resp = handle_message(&state, "tok", "sheet", "beli kopi 25rb").await;

        assert_eq!(resp.kind, ChatReplyKind::TransactionPreview);
        assert!(resp.reply.contains("25.000"));
        assert!(!resp.reply.contains("Perhitungan"));
        let pending = state.pending_draft("tok").await.expect("draft pending");
        assert_eq!(pending.amount, 25000.0);
        assert_eq!(pending.category, "food");
    }

    #[tokio::test]
    async fn confirm_appends_and_clears_the_draft() {
        let state = state(vec![CLASSIFY_TX, EXTRACT_COFFEE]);
        handle_message(&state, "tok", "sheet", "beli kopi 25rb").await;

        let resp = confirm(&state, "tok", "sheet").await.unwrap();
        assert_eq!(resp.kind, ChatReplyKind::Saved);
        assert!(state.pending_draft("tok").await.is_none());

        let rows = state.store.list("sheet").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].txn.amount, 25000.0);

        // Nothing left to confirm.
        assert!(confirm(&state, "tok", "sheet").await.is_err());
    }

    #[tokio::test]
    async fn cancel_discards_and_is_idempotent() {
        let state = state(vec![CLASSIFY_TX, EXTRACT_COFFEE]);
        handle_message(&state, "tok", "sheet", "beli kopi 25rb").await;

        let resp = cancel(&state, "tok").await;
        assert_eq!(resp.kind, ChatReplyKind::Cancelled);
        assert!(state.pending_draft("tok").await.is_none());
        assert!(state.store.list("sheet").await.unwrap().is_empty());

        let again = cancel(&state, "tok").await;
        assert_eq!(again.kind, ChatReplyKind::Cancelled);
        assert_eq!(again.reply, NOTHING_PENDING);
    }

    #[tokio::test]
    async fn confirming_then_repeating_creates_two_rows() {
        let state = state(vec![CLASSIFY_TX, EXTRACT_COFFEE, CLASSIFY_TX, EXTRACT_COFFEE]);
        handle_message(&state, "tok", "sheet", "beli kopi 25rb").await;
        confirm(&state, "tok", "sheet").await.unwrap();

        // The same text again is a fresh transaction, not a merge.
        handle_message(&state, "tok", "sheet", "beli kopi 25rb").await;
        confirm(&state, "tok", "sheet").await.unwrap();

        let rows = state.store.list("sheet").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row_index, 2);
        assert_eq!(rows[1].row_index, 3);
        assert_eq!(rows[0].txn.amount, 25000.0);
        assert_eq!(rows[1].txn.amount, 25000.0);
    }

    #[tokio::test]
    async fn followup_new_transaction_replaces_the_draft_outright() {
        let state = state(vec![
            CLASSIFY_TX,
            EXTRACT_COFFEE,
            CLASSIFY_TX,
            r#"{"intent": "new_transaction", "amount": 50000, "type": "expense", "category": "transportasi", "note": "gojek"}"#,
        ]);
        handle_message(&state, "tok", "sheet", "beli kopi 25rb").await;
        let resp = handle_message(&state, "tok", "sheet", "gojek ke kantor 50rb").await;

        assert!(resp.reply.contains("terdeteksi"));
        let pending = state.pending_draft("tok").await.unwrap();
        assert_eq!(pending.amount, 50000.0);
        assert_eq!(pending.category, "transport");

        // Only the replacement draft gets saved; the coffee never does.
        confirm(&state, "tok", "sheet").await.unwrap();
        let rows = state.store.list("sheet").await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].txn.note, "gojek");
    }

    #[tokio::test]
    async fn preview_shows_the_amount_reasoning_when_present() {
        let state = state(vec![
            CLASSIFY_TX,
            r#"{"amount": 45000, "type": "expense", "category": "makanan", "note": "3 kopi", "reasoning": "3 x 15.000 = 45.000"}"#,
        ]);
        let resp = handle_message(&state, "tok", "sheet", "beli 3 kopi @15rb").await;
        assert!(resp.reply.contains("Perhitungan: 3 x 15.000 = 45.000"));
    }

    #[tokio::test]
    async fn followup_update_overwrites_the_pending_draft() {
        let state = state(vec![
            CLASSIFY_TX,
            EXTRACT_COFFEE,
            CLASSIFY_TX,
            r#"{"intent": "update_transaction", "amount": 30000, "type": "expense", "category": "makanan", "note": "kopi + roti"}"#,
        ]);
        handle_message(&state, "tok", "sheet", "beli kopi 25rb").await;
        let resp = handle_message(&state, "tok", "sheet", "eh tambah roti, jadi 30rb").await;

        assert!(resp.reply.contains("diperbarui"));
        let pending = state.pending_draft("tok").await.unwrap();
        assert_eq!(pending.amount, 30000.0);
        assert_eq!(pending.note, "kopi + roti");
    }

    #[tokio::test]
    async fn data_query_answers_from_the_sheet_summary() {
        let state = state(vec![
            CLASSIFY_QUERY,
            "Bulan ini kamu belum punya transaksi.",
        ]);
        let resp = handle_message(&state, "tok", "sheet", "berapa pengeluaranku bulan ini?").await;
        assert_eq!(resp.kind, ChatReplyKind::Analysis);
        assert_eq!(resp.reply, "Bulan ini kamu belum punya transaksi.");
    }

    #[tokio::test]
    async fn small_talk_reuses_the_classifier_reply() {
        let state = state(vec![
            r#"{"is_transaction": false, "is_data_query": false, "reasoning": "", "response": "Halo! Ada yang bisa kubantu?"}"#,
        ]);
        let resp = handle_message(&state, "tok", "sheet", "halo").await;
        assert_eq!(resp.kind, ChatReplyKind::Conversation);
        assert_eq!(resp.reply, "Halo! Ada yang bisa kubantu?");
        assert!(state.pending_draft("tok").await.is_none());
    }

    #[tokio::test]
    async fn unextractable_amount_asks_for_clarification() {
        let state = state(vec![
            CLASSIFY_TX,
            r#"{"type": "expense", "category": "makanan", "note": "jajan"}"#,
        ]);
        let resp = handle_message(&state, "tok", "sheet", "tadi jajan").await;
        assert_eq!(resp.kind, ChatReplyKind::Conversation);
        assert_eq!(resp.reply, CLARIFY);
        assert!(state.pending_draft("tok").await.is_none());
    }

    #[tokio::test]
    async fn drafts_are_isolated_per_session() {
        let state = state(vec![CLASSIFY_TX, EXTRACT_COFFEE]);
        handle_message(&state, "tok-a", "sheet", "beli kopi 25rb").await;
        assert!(state.pending_draft("tok-b").await.is_none());
    }
}
