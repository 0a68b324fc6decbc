use scraper::{ElementRef, Html, Selector};

use crate::config::NA;
use crate::error::{AppError, Result};
use crate::types::{fields, is_sentinel, Record};

/// Maps fixed cell positions of one upstream table onto named fields.
#[derive(Debug, Clone, Copy)]
pub struct TableLayout {
    pub name: &'static str,
    /// CSS selector for the table element. The first match is used.
    pub table_selector: &'static str,
    /// (field, zero-based `td` index)
    pub columns: &'static [(&'static str, usize)],
}

/// Live trading page: S.No, Symbol, LTP, Point Change, % Change, Open, High, Low,
/// Volume, Prev. Close.
pub const LIVE_TRADING: TableLayout = TableLayout {
    name: "live_trading",
    table_selector: "table",
    columns: &[
        (fields::SN, 0),
        (fields::SYMBOL, 1),
        (fields::LTP, 2),
        (fields::CHANGE_PCT, 4),
        (fields::DAY_HIGH, 6),
        (fields::DAY_LOW, 7),
        (fields::VOLUME, 8),
        (fields::PREV_CLOSE, 9),
    ],
};

/// Today's share price page. The 52-week range sits in the last two columns.
pub const TODAY_PRICE: TableLayout = TableLayout {
    name: "today_price",
    table_selector: "table",
    columns: &[
        (fields::SYMBOL, 1),
        (fields::TURNOVER, 10),
        (fields::WEEK52_HIGH, 19),
        (fields::WEEK52_LOW, 20),
    ],
};

/// Rows with fewer cells than this are headers or separators.
const MIN_CELLS: usize = 2;

pub(crate) fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| AppError::Parse(format!("invalid selector '{css}': {e:?}")))
}

/// Cell text with surrounding and repeated whitespace collapsed.
pub(crate) fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extract every data row of the layout's table.
///
/// Cells past the end of a row and blank/dash cells become `N/A`. A missing table is
/// a parse failure; an empty table is not.
pub fn extract_table(markup: &str, layout: &TableLayout) -> Result<Vec<Record>> {
    let document = Html::parse_document(markup);
    let table_sel = selector(layout.table_selector)?;
    let row_sel = selector("tr")?;
    let cell_sel = selector("td")?;

    let table = document.select(&table_sel).next().ok_or_else(|| {
        AppError::Parse(format!(
            "{}: no element matches '{}'",
            layout.name, layout.table_selector
        ))
    })?;

    let mut records = Vec::new();
    for row in table.select(&row_sel) {
        let cells: Vec<String> = row.select(&cell_sel).map(cell_text).collect();
        if cells.len() < MIN_CELLS {
            continue;
        }

        let record: Record = layout
            .columns
            .iter()
            .map(|&(name, idx)| {
                let value = match cells.get(idx) {
                    Some(text) if !is_sentinel(text) => text.clone(),
                    _ => NA.to_string(),
                };
                (name, value)
            })
            .collect();
        records.push(record);
    }

    Ok(records)
}
