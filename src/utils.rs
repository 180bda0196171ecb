use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

/// Raised when a free-form amount string cannot be turned into a number.
#[derive(Debug, Error)]
#[error("cannot parse amount from '{input}'")]
pub struct ParseError {
    pub input: String,
}

/// Parse amounts like "50k", "Rp 1.200.000", "1,200.50", "1000" into a float.
///
/// Currency symbols and whitespace are stripped first. A trailing "k" means
/// thousands with comma accepted as the decimal point. Otherwise repeated
/// separators of a single kind are thousands separators, and a lone comma is
/// the decimal point.
pub fn parse_amount(text: &str) -> Result<f64, ParseError> {
    let err = || ParseError {
        input: text.to_string(),
    };

    let lowered = text.to_lowercase();
    let mut s: String = lowered
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-' | 'k'))
        .collect();

    if s.contains('k') {
        let num: String = s.chars().filter(|&c| c != 'k').collect();
        let num = num.replace(',', ".");
        let value: f64 = num.parse().map_err(|_| err())?;
        return Ok(value * 1000.0);
    }

    if s.contains('.') && s.contains(',') {
        // Mixed separators: the last-occurring one is the decimal point.
        if s.rfind('.') > s.rfind(',') {
            s = s.replace(',', "");
        } else {
            s = s.replace('.', "").replace(',', ".");
        }
    } else if s.matches('.').count() > 1 {
        s = s.replace('.', "");
    } else if s.matches(',').count() > 1 {
        s = s.replace(',', "");
    }

    if s.contains(',') && !s.contains('.') {
        s = s.replace(',', ".");
    }

    s.parse().map_err(|_| err())
}

/// Map free-form or Indonesian category words onto the canonical set.
///
/// Unmapped categories pass through with spaces replaced by underscores, so
/// the sheet can hold categories outside the closed set used in prompts.
pub fn normalize_category(cat: Option<&str>) -> String {
    let cat = match cat {
        Some(c) if !c.trim().is_empty() => c.trim().to_lowercase(),
        _ => return "uncategorized".to_string(),
    };
    match cat.as_str() {
        "makan" | "makanan" => "food".to_string(),
        "transport" | "transportasi" => "transport".to_string(),
        "gaji" => "income".to_string(),
        "bayar" | "tagihan" => "bills".to_string(),
        "belanja" => "shopping".to_string(),
        "hiburan" => "entertainment".to_string(),
        "kesehatan" => "health".to_string(),
        "pendidikan" => "education".to_string(),
        other => other.replace(' ', "_"),
    }
}

/// Format to Indonesian convention: dot as thousands separator, comma as
/// decimal separator, always two decimals ("1.200.000,50").
pub fn format_amount(amount: f64) -> String {
    let negative = amount < 0.0;
    let fixed = format!("{:.2}", amount.abs());
    let (int_part, dec_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    let int_grouped: String = grouped.chars().rev().collect();

    format!(
        "{}{},{}",
        if negative { "-" } else { "" },
        int_grouped,
        dec_part
    )
}

/// Pull the spreadsheet id out of a Google Sheets URL, if it looks like one.
pub fn extract_spreadsheet_id(url: &str) -> Option<String> {
    lazy_static! {
        static ref SHEET_ID_RE: Regex =
            Regex::new(r"/spreadsheets/d/([a-zA-Z0-9-_]+)").unwrap();
    }
    SHEET_ID_RE
        .captures(url)
        .map(|c| c[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_k_shorthand() {
        assert_eq!(parse_amount("50k").unwrap(), 50000.0);
        assert_eq!(parse_amount("25 k").unwrap(), 25000.0);
        assert_eq!(parse_amount("1,5k").unwrap(), 1500.0);
    }

    #[test]
    fn parses_dotted_thousands() {
        assert_eq!(parse_amount("Rp 1.200.000").unwrap(), 1_200_000.0);
        assert_eq!(parse_amount("1,200,000").unwrap(), 1_200_000.0);
    }

    #[test]
    fn parses_mixed_separators() {
        assert_eq!(parse_amount("1,200.50").unwrap(), 1200.50);
        assert_eq!(parse_amount("1.200.000,50").unwrap(), 1_200_000.50);
    }

    #[test]
    fn lone_comma_is_decimal_point() {
        assert_eq!(parse_amount("12,5").unwrap(), 12.5);
    }

    #[test]
    fn plain_numbers_pass_through() {
        assert_eq!(parse_amount("1000").unwrap(), 1000.0);
        assert_eq!(parse_amount("Rp 50000").unwrap(), 50000.0);
    }

    #[test]
    fn garbage_fails_with_original_input() {
        let err = parse_amount("abc").unwrap_err();
        assert_eq!(err.input, "abc");
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn normalizes_known_categories() {
        assert_eq!(normalize_category(Some("Makanan")), "food");
        assert_eq!(normalize_category(Some("gaji")), "income");
        assert_eq!(normalize_category(Some("  Transportasi ")), "transport");
    }

    #[test]
    fn empty_category_is_uncategorized() {
        assert_eq!(normalize_category(None), "uncategorized");
        assert_eq!(normalize_category(Some("")), "uncategorized");
        assert_eq!(normalize_category(Some("   ")), "uncategorized");
    }

    #[test]
    fn unknown_categories_pass_through_with_underscores() {
        assert_eq!(normalize_category(Some("random thing")), "random_thing");
    }

    #[test]
    fn formats_indonesian_style() {
        assert_eq!(format_amount(1_200_000.5), "1.200.000,50");
        assert_eq!(format_amount(0.0), "0,00");
        assert_eq!(format_amount(999.0), "999,00");
        assert_eq!(format_amount(-1500.0), "-1.500,00");
    }

    #[test]
    fn extracts_sheet_id_from_url() {
        let url = "https://docs.google.com/spreadsheets/d/1abc-DEF_456/edit#gid=0";
        assert_eq!(extract_spreadsheet_id(url).as_deref(), Some("1abc-DEF_456"));
        assert_eq!(extract_spreadsheet_id("not a url"), None);
    }
}
