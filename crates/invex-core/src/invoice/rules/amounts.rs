//! Amount normalization.
//!
//! Turns captured monetary text ("TSH 150,000.00", "1.234,50", "30 000")
//! into an exact [`Decimal`]. Malformed input becomes `None`, never an error.

use rust_decimal::Decimal;
use std::str::FromStr;

/// Parse a monetary string into an exact decimal.
///
/// Keeps digits, separators and a leading minus sign, drops everything else
/// (currency tokens, spaces, stray punctuation), removes thousands
/// separators and parses the rest without going through floating point.
pub fn to_decimal(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    let negative = trimmed
        .chars()
        .find(|c| c.is_ascii_digit() || *c == '-')
        .is_some_and(|c| c == '-');

    let cleaned: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();

    let cleaned = cleaned.trim_matches(|c| c == ',' || c == '.');
    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let normalized = normalize_separators(cleaned)?;
    let value = Decimal::from_str(&normalized).ok()?;

    Some(if negative { -value } else { value })
}

/// Resolve which separator is the decimal point and drop the others.
fn normalize_separators(s: &str) -> Option<String> {
    let last_comma = s.rfind(',');
    let last_dot = s.rfind('.');

    let decimal_pos = match (last_comma, last_dot) {
        // "1.234,50": comma after the last dot is the decimal separator
        (Some(c), Some(d)) if c > d => Some(c),
        (Some(_), Some(d)) => Some(d),
        // "1234,5" / "12,50": a trailing one- or two-digit comma group is decimal
        (Some(c), None) => {
            let tail = s.len() - c - 1;
            (s.matches(',').count() == 1 && (1..=2).contains(&tail)).then_some(c)
        }
        // "1.234.567": repeated dots are grouping
        (None, Some(d)) => (s.matches('.').count() == 1).then_some(d),
        (None, None) => None,
    };

    let mut out = String::with_capacity(s.len());
    for (idx, c) in s.char_indices() {
        match c {
            '0'..='9' => out.push(c),
            _ if Some(idx) == decimal_pos => out.push('.'),
            _ => {}
        }
    }

    if out.is_empty() || out == "." { None } else { Some(out) }
}

/// Format a decimal the way amounts appear in the output record.
pub fn format_amount(amount: Decimal) -> String {
    amount.to_string()
}
