use scraper::Html;

use crate::error::{AppError, Result};
use crate::scrape::table::{cell_text, selector};
use crate::types::SummaryItem;

/// Extract the label/value pairs of the `div.market-summary` block, in page order.
/// Rows missing a label or a value are skipped.
pub fn extract_market_summary(markup: &str) -> Result<Vec<SummaryItem>> {
    let document = Html::parse_document(markup);
    let container_sel = selector("div.market-summary")?;
    let row_sel = selector("div.summary-row")?;
    let label_sel = selector("div.label")?;
    let value_sel = selector("div.value")?;

    let container = document
        .select(&container_sel)
        .next()
        .ok_or_else(|| AppError::Parse("market summary block not found".to_string()))?;

    let items = container
        .select(&row_sel)
        .filter_map(|row| {
            let label = row.select(&label_sel).next().map(cell_text)?;
            let value = row.select(&value_sel).next().map(cell_text)?;
            if label.is_empty() {
                return None;
            }
            Some(SummaryItem { label, value })
        })
        .collect();

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_rows_in_order() {
        let html = r#"
            <div class="market-summary">
              <div class="summary-row"><div class="label">NEPSE Index</div><div class="value">2,745.12</div></div>
              <div class="summary-row"><div class="label">Daily Gain</div><div class="value"> 1.25% </div></div>
              <div class="summary-row"><div class="label">Orphan label</div></div>
              <div class="summary-row"><div class="label">Turnover</div><div class="value">5,123,456,789</div></div>
            </div>
        "#;
        let items = extract_market_summary(html).unwrap();
        let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec!["NEPSE Index", "Daily Gain", "Turnover"]);
        assert_eq!(items[1].value, "1.25%");
    }

    #[test]
    fn missing_block_is_parse_error() {
        let err = extract_market_summary("<html><body></body></html>").unwrap_err();
        assert!(matches!(err, AppError::Parse(_)));
    }
}
