//! Read-side aggregation over the transaction table. The oracle never sees
//! raw rows; data questions are answered against the bounded text summary
//! built here.

use std::collections::HashMap;

use time::{Date, Duration};

use crate::sheets::{Transaction, TxnKind};
use crate::utils::format_amount;

pub const NO_DATA: &str = "Tidak ada data transaksi yang tersedia.";

/// Reporting window for the per-category breakdowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    All,
    CurrentMonth,
    LastMonth,
    Last3Months,
}

impl Period {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "all" => Some(Self::All),
            "current_month" => Some(Self::CurrentMonth),
            "last_month" => Some(Self::LastMonth),
            "last_3_months" => Some(Self::Last3Months),
            _ => None,
        }
    }
}

fn first_of_month(d: Date) -> Date {
    d.replace_day(1).expect("day 1 is always valid")
}

fn previous_month_start(d: Date) -> Date {
    first_of_month(first_of_month(d) - Duration::days(1))
}

fn in_period(date: Date, period: Period, today: Date) -> bool {
    let current_start = first_of_month(today);
    match period {
        Period::All => true,
        Period::CurrentMonth => date >= current_start,
        Period::LastMonth => date >= previous_month_start(today) && date < current_start,
        Period::Last3Months => date >= current_start - Duration::days(90),
    }
}

fn sum_by_kind(txns: &[Transaction], kind: TxnKind) -> f64 {
    txns.iter()
        .filter(|t| t.kind == kind)
        .map(|t| t.amount)
        .sum()
}

/// Per-category sums for one transaction type, sorted descending.
fn category_totals(txns: &[Transaction], kind: TxnKind) -> Vec<(String, f64)> {
    let mut by_cat: HashMap<&str, f64> = HashMap::new();
    for t in txns.iter().filter(|t| t.kind == kind) {
        *by_cat.entry(t.category.as_str()).or_default() += t.amount;
    }
    let mut totals: Vec<(String, f64)> = by_cat
        .into_iter()
        .map(|(c, a)| (c.to_string(), a))
        .collect();
    totals.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    totals
}

fn fmt_date(d: Date) -> String {
    format!("{:02}/{:02}/{}", d.day(), u8::from(d.month()), d.year())
}

/// Build the full Indonesian data summary injected into the data-query
/// prompt: totals, month-over-month trend, category breakdowns with
/// percentages, ten largest and ten most recent transactions.
pub fn data_summary(txns: &[Transaction], today: Date) -> String {
    if txns.is_empty() {
        return NO_DATA.to_string();
    }

    let total_income = sum_by_kind(txns, TxnKind::Income);
    let total_expense = sum_by_kind(txns, TxnKind::Expense);
    let balance = total_income - total_expense;

    let current_start = first_of_month(today);
    let last_start = previous_month_start(today);

    let current: Vec<Transaction> = txns
        .iter()
        .filter(|t| t.date >= current_start)
        .cloned()
        .collect();
    let last: Vec<Transaction> = txns
        .iter()
        .filter(|t| t.date >= last_start && t.date < current_start)
        .cloned()
        .collect();

    let mut summary = format!(
        "\nRINGKASAN DATA KEUANGAN:\n\n\
         STATISTIK UMUM:\n\
         - Total Pemasukan: Rp {}\n\
         - Total Pengeluaran: Rp {}\n\
         - Saldo Bersih: Rp {}\n\
         - Jumlah Transaksi: {}\n\n\
         TREN BULANAN:\n\
         Bulan Ini ({} {}):\n\
         - Pemasukan: Rp {}\n\
         - Pengeluaran: Rp {}\n\n\
         Bulan Lalu ({} {}):\n\
         - Pemasukan: Rp {}\n\
         - Pengeluaran: Rp {}\n\n\
         PENGELUARAN PER KATEGORI:\n",
        format_amount(total_income),
        format_amount(total_expense),
        format_amount(balance),
        txns.len(),
        current_start.month(),
        current_start.year(),
        format_amount(sum_by_kind(&current, TxnKind::Income)),
        format_amount(sum_by_kind(&current, TxnKind::Expense)),
        last_start.month(),
        last_start.year(),
        format_amount(sum_by_kind(&last, TxnKind::Income)),
        format_amount(sum_by_kind(&last, TxnKind::Expense)),
    );

    for (category, amount) in category_totals(txns, TxnKind::Expense) {
        summary.push_str(&format!(
            "- {}: Rp {} ({:.1}%)\n",
            category,
            format_amount(amount),
            amount / total_expense * 100.0
        ));
    }

    summary.push_str("\nPEMASUKAN PER KATEGORI:\n");
    for (category, amount) in category_totals(txns, TxnKind::Income) {
        summary.push_str(&format!(
            "- {}: Rp {} ({:.1}%)\n",
            category,
            format_amount(amount),
            amount / total_income * 100.0
        ));
    }

    let mut largest: Vec<&Transaction> = txns.iter().filter(|t| t.kind == TxnKind::Expense).collect();
    largest.sort_by(|a, b| b.amount.partial_cmp(&a.amount).unwrap_or(std::cmp::Ordering::Equal));
    summary.push_str("\n10 TRANSAKSI TERBESAR:\n");
    for t in largest.iter().take(10) {
        summary.push_str(&format!(
            "- {}: {} ({}) - Rp {}\n",
            fmt_date(t.date),
            t.note,
            t.category,
            format_amount(t.amount)
        ));
    }

    let mut recent: Vec<&Transaction> = txns.iter().collect();
    recent.sort_by(|a, b| b.date.cmp(&a.date));
    summary.push_str("\n10 TRANSAKSI TERAKHIR:\n");
    for t in recent.iter().take(10) {
        summary.push_str(&format!(
            "- {}: {} ({}) - Rp {} ({})\n",
            fmt_date(t.date),
            t.note,
            t.category,
            format_amount(t.amount),
            t.kind.as_str()
        ));
    }

    summary
}

/// Per-category totals of one type within a period, optionally narrowed to a
/// single category.
pub fn totals_by_category(
    txns: &[Transaction],
    kind: TxnKind,
    period: Period,
    category: Option<&str>,
    today: Date,
) -> String {
    let label = match kind {
        TxnKind::Expense => "PENGELUARAN",
        TxnKind::Income => "PEMASUKAN",
    };
    let period_name = match period {
        Period::All => "all",
        Period::CurrentMonth => "current_month",
        Period::LastMonth => "last_month",
        Period::Last3Months => "last_3_months",
    };

    if txns.is_empty() {
        return NO_DATA.to_string();
    }

    let filtered: Vec<Transaction> = txns
        .iter()
        .filter(|t| t.kind == kind)
        .filter(|t| in_period(t.date, period, today))
        .filter(|t| category.map_or(true, |c| c == "all" || t.category == c))
        .cloned()
        .collect();

    if filtered.is_empty() {
        let what = match kind {
            TxnKind::Expense => "pengeluaran",
            TxnKind::Income => "pemasukan",
        };
        return format!(
            "Tidak ada data {} yang ditemukan untuk kategori '{}' dalam periode {}.",
            what,
            category.unwrap_or("all"),
            period_name
        );
    }

    let totals = category_totals(&filtered, kind);
    let grand: f64 = totals.iter().map(|(_, a)| a).sum();

    let mut result = label.to_string();
    if let Some(c) = category.filter(|c| *c != "all") {
        result.push_str(&format!(" UNTUK KATEGORI '{}'", c));
    }
    result.push_str(&format!(" ({}):\n\n", period_name));
    for (cat, amount) in &totals {
        result.push_str(&format!("- {}: Rp {}\n", cat, format_amount(*amount)));
    }
    result.push_str(&format!("\nTotal: Rp {}", format_amount(grand)));
    result
}

/// Most recent transactions whose note contains the keyword
/// (case-insensitive).
pub fn search_by_keyword(txns: &[Transaction], keyword: &str, limit: usize) -> String {
    if txns.is_empty() {
        return NO_DATA.to_string();
    }

    let needle = keyword.to_lowercase();
    let mut hits: Vec<&Transaction> = txns
        .iter()
        .filter(|t| t.note.to_lowercase().contains(&needle))
        .collect();

    if hits.is_empty() {
        return format!(
            "Tidak ada transaksi yang ditemukan dengan kata kunci '{}'.",
            keyword
        );
    }

    hits.sort_by(|a, b| b.date.cmp(&a.date));

    let mut result = format!("TRANSAKSI DENGAN KATA KUNCI '{}':\n\n", keyword);
    for t in hits.iter().take(limit) {
        result.push_str(&format!(
            "- {}: {} ({}) - Rp {} ({})\n",
            fmt_date(t.date),
            t.note,
            t.category,
            format_amount(t.amount),
            t.kind.as_str()
        ));
    }
    result
}
