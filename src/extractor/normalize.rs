//! Turning marketplace price strings into numbers.
//!
//! Listings are formatted the Brazilian way (`R$ 1.234,56`) while structured data
//! uses a decimal point (`1234.56`), so the separator handling has to guess.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::str::FromStr;

use crate::utils::error::{AppError, Result};

/// Parses a noisy price or percentage string.
///
/// Everything except digits, `.` and `,` is dropped. When a `,` is present it is the
/// decimal separator and every `.` is a thousands separator. Without a `,`, a dot
/// is the decimal point only when it is the only one and one or two digits follow
/// it (`1299.90`); otherwise dots are thousands separators (`1.299`, and
/// `3.19990` where the cents span follows the fraction).
pub fn normalize_price(text: &str) -> Result<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();

    let canonical = if cleaned.contains(',') {
        cleaned.replace('.', "").replace(',', ".")
    } else if has_decimal_point(&cleaned) {
        cleaned
    } else {
        cleaned.replace('.', "")
    };

    Decimal::from_str(&canonical)
        .ok()
        .and_then(|value| value.to_f64())
        .ok_or_else(|| AppError::UnparsablePrice { text: text.to_string() })
}

fn has_decimal_point(digits: &str) -> bool {
    match digits.split_once('.') {
        Some((_, fraction)) => !fraction.contains('.') && (1..=2).contains(&fraction.len()),
        None => false,
    }
}

/// Lowest parseable candidate.
///
/// Heuristic: when a page shows several prices for one listing, the smallest is
/// usually the promotional one. Installment amounts can beat it; accepted.
pub fn pick_lowest(candidates: &[String]) -> Option<&str> {
    pick_by(candidates, |best, value| value < best)
}

/// Highest parseable candidate.
///
/// Heuristic: among untagged prices the largest is usually the struck-through
/// original. Nothing guarantees this on every layout.
pub fn pick_highest(candidates: &[String]) -> Option<&str> {
    pick_by(candidates, |best, value| value > best)
}

fn pick_by<F>(candidates: &[String], better: F) -> Option<&str>
where
    F: Fn(f64, f64) -> bool,
{
    let mut best: Option<(f64, &str)> = None;
    for candidate in candidates {
        let Ok(value) = normalize_price(candidate) else {
            continue;
        };
        match best {
            Some((current, _)) if !better(current, value) => {}
            _ => best = Some((value, candidate.as_str())),
        }
    }
    best.map(|(_, text)| text)
}
