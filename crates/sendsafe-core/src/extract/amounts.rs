//! Reading locale-formatted amounts.
//!
//! NF-e files carry dot decimals (`10.5000`) while values typed by users are
//! often in Brazilian notation (`1.234,56`). Line items keep the original text;
//! these helpers are only used for totals and display.

use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;

lazy_static! {
    /// Digits with optional grouping and decimal separators, an optional sign
    /// and an optional `R$` prefix.
    static ref AMOUNT: Regex = Regex::new(
        r"^\s*(-)?\s*(?:R\$)?\s*(\d[\d.,\s\u{00a0}]*)\s*$"
    ).unwrap();
}

/// Parse an amount such as `1.234,56`, `1,234.56`, `10.5000` or `R$ 99,90`.
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let caps = AMOUNT.captures(s)?;
    let negative = caps.get(1).is_some();

    let cleaned: String = caps[2]
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();

    let normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
        // Decimal comma, dots group thousands.
        (Some(c), Some(d)) if c > d => cleaned.replace('.', "").replace(',', "."),
        // Decimal dot, commas group thousands.
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(_), None) => {
            if cleaned.matches(',').count() > 1 {
                cleaned.replace(',', "")
            } else {
                cleaned.replace(',', ".")
            }
        }
        (None, Some(_)) => {
            if cleaned.matches('.').count() > 1 {
                cleaned.replace('.', "")
            } else {
                cleaned
            }
        }
        (None, None) => cleaned,
    };

    let value = Decimal::from_str(&normalized).ok()?;
    Some(if negative { -value } else { value })
}

/// Format an amount in Brazilian notation with two decimals (`1.234,56`).
pub fn format_amount(amount: Decimal) -> String {
    let s = format!("{:.2}", amount.abs());
    let Some((integer_part, decimal_part)) = s.split_once('.') else {
        return s;
    };

    let chars: Vec<char> = integer_part.chars().collect();
    let mut formatted = String::new();
    if amount.is_sign_negative() && !amount.is_zero() {
        formatted.push('-');
    }

    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            formatted.push('.');
        }
        formatted.push(*c);
    }

    format!("{},{}", formatted, decimal_part)
}
