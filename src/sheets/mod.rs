pub mod client;
pub mod types;

pub use client::{MemoryStore, SheetError, SheetsClient, TransactionStore};
pub use types::{SheetRow, Transaction, TxnKind, SHEET_HEADER};
