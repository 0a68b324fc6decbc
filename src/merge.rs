use std::collections::HashMap;

use crate::types::{fields, MergedRecord, Record};

/// Inner-join `primary` (live trading) with `secondary` (52-week data) on Symbol.
///
/// Output follows primary order. Unmatched rows are dropped. A symbol repeated in
/// `secondary` resolves to its last occurrence. Fields already present on the primary
/// row are never overwritten.
pub fn merge(primary: &[Record], secondary: &[Record]) -> Vec<MergedRecord> {
    let mut by_symbol: HashMap<&str, &Record> = HashMap::with_capacity(secondary.len());
    for row in secondary {
        if let Some(symbol) = row.symbol() {
            by_symbol.insert(symbol, row);
        }
    }

    primary
        .iter()
        .filter_map(|row| {
            let other = by_symbol.get(row.symbol()?)?;
            let mut record = row.clone();
            for (name, value) in other.iter() {
                if !record.contains(name) {
                    record.insert(name, value);
                }
            }

            let ltp = record.number(fields::LTP);
            let high = record.number(fields::WEEK52_HIGH);
            let low = record.number(fields::WEEK52_LOW);

            Some(MergedRecord {
                pct_below_high: pct_below_high(ltp, high),
                pct_above_low: pct_above_low(ltp, low),
                record,
            })
        })
        .collect()
}

/// `(high - ltp) / high * 100`. `None` if an operand is missing or `high` is zero.
pub fn pct_below_high(ltp: Option<f64>, high: Option<f64>) -> Option<f64> {
    match (ltp, high) {
        (Some(ltp), Some(high)) if high != 0.0 => Some((high - ltp) / high * 100.0),
        _ => None,
    }
}

/// `(ltp - low) / low * 100`. `None` if an operand is missing or `low` is zero.
pub fn pct_above_low(ltp: Option<f64>, low: Option<f64>) -> Option<f64> {
    match (ltp, low) {
        (Some(ltp), Some(low)) if low != 0.0 => Some((ltp - low) / low * 100.0),
        _ => None,
    }
}
