use serde::{Deserialize, Serialize};

use crate::llm::Draft;

#[derive(Debug, Deserialize)]
pub struct ChatMessageRequest {
    pub text: String,
}

/// What the reply is, so clients can render previews and confirmations
/// differently from plain chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatReplyKind {
    TransactionPreview,
    Analysis,
    Conversation,
    Saved,
    Cancelled,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub kind: ChatReplyKind,
    /// Present while a transaction is awaiting confirmation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft: Option<Draft>,
}

impl ChatResponse {
    pub fn conversation(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            kind: ChatReplyKind::Conversation,
            draft: None,
        }
    }

    pub fn analysis(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            kind: ChatReplyKind::Analysis,
            draft: None,
        }
    }

    pub fn preview(reply: impl Into<String>, draft: Draft) -> Self {
        Self {
            reply: reply.into(),
            kind: ChatReplyKind::TransactionPreview,
            draft: Some(draft),
        }
    }
}
