//! HTML report and chat reply rendering.
//!
//! Output depends only on the inputs: the caller supplies the `updated_at` stamp, so two
//! renders of the same data differ in nothing else.

use chrono::{DateTime, Utc};

use crate::config::{MARKET_TZ, NA};
use crate::types::{fields, parse_number, MergedRecord, SummaryItem};

pub const REPORT_TITLE: &str = "NEPSE Live Data";

/// Report columns, in display order.
const COLUMNS: &[&str] = &[
    fields::SN,
    fields::SYMBOL,
    fields::LTP,
    fields::CHANGE_PCT,
    fields::DAY_HIGH,
    fields::DAY_LOW,
    fields::VOLUME,
    fields::TURNOVER,
    fields::WEEK52_HIGH,
    fields::WEEK52_LOW,
];

const STYLE: &str = r#"
    body { font-family: Arial, sans-serif; margin: 0; padding: 0; }
    h1 { text-align: center; font-size: 40px; margin-top: 20px; }
    .updated-time, .market-summary, .search-container { text-align: center; margin: 10px 0; }
    .summary-row { margin-bottom: 5px; }
    .table-container { margin: 0 auto; width: 95%; overflow-x: auto; }
    table { width: 100%; border-collapse: collapse; font-size: 14px; margin-top: 10px; }
    th, td { border: 1px solid #ddd; padding: 8px; text-align: center; }
    th { background-color: #8B4513; color: white; cursor: pointer; }
    .light-red { background-color: #FFCCCB; }
    .light-green { background-color: #D4EDDA; }
    .light-blue { background-color: #CCE5FF; }
"#;

const SCRIPT: &str = r##"
    document.getElementById("searchInput").addEventListener("keyup", function () {
        var filter = this.value.toUpperCase();
        var rows = document.querySelectorAll("#reportTable tbody tr");
        rows.forEach(function (row) {
            var symbol = row.cells[1] ? row.cells[1].textContent.toUpperCase() : "";
            row.style.display = symbol.indexOf(filter) > -1 ? "" : "none";
        });
    });
    document.querySelectorAll("#reportTable th").forEach(function (th, idx) {
        th.addEventListener("click", function () {
            var tbody = document.querySelector("#reportTable tbody");
            var rows = Array.from(tbody.rows);
            var asc = th.dataset.order !== "asc";
            th.dataset.order = asc ? "asc" : "desc";
            var key = function (row) {
                var text = row.cells[idx].textContent.replace(/[,%]/g, "");
                var num = parseFloat(text);
                return isNaN(num) ? text : num;
            };
            rows.sort(function (a, b) {
                var x = key(a), y = key(b);
                if (x < y) return asc ? -1 : 1;
                if (x > y) return asc ? 1 : -1;
                return 0;
            });
            rows.forEach(function (row) { tbody.appendChild(row); });
        });
    });
"##;

/// Exchange-local display stamp, e.g. `2026-10-19 13:05:00`.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.with_timezone(&MARKET_TZ).format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Two decimals, or the sentinel.
pub fn format_pct(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v:.2}"),
        None => NA.to_string(),
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Row highlight by the sign of Change%. Unparseable change gets no class.
fn change_class(change: &str) -> Option<&'static str> {
    let v = parse_number(change)?;
    Some(if v > 0.0 {
        "light-green"
    } else if v < 0.0 {
        "light-red"
    } else {
        "light-blue"
    })
}

/// Text color for a summary row. Only "Daily Gain" is signed.
fn summary_color(item: &SummaryItem) -> &'static str {
    if !item.label.contains("Daily Gain") {
        return "blue";
    }
    match parse_number(&item.value) {
        Some(v) if v > 0.0 => "green",
        Some(v) if v < 0.0 => "red",
        _ => "blue",
    }
}

pub fn render_summary(summary: &[SummaryItem]) -> String {
    let mut html = String::from(r#"<div class="market-summary">"#);
    for item in summary {
        html.push_str(&format!(
            r#"<div class="summary-row" style="color: {};"><span>{}:</span> {}</div>"#,
            summary_color(item),
            escape_html(&item.label),
            escape_html(&item.value),
        ));
    }
    html.push_str("</div>");
    html
}

fn render_row(row: &MergedRecord) -> String {
    let record = &row.record;
    let class = change_class(record.get_or_na(fields::CHANGE_PCT))
        .map(|c| format!(r#" class="{c}""#))
        .unwrap_or_default();

    let mut html = format!("\n<tr{class}>");
    for column in COLUMNS {
        html.push_str(&format!("<td>{}</td>", escape_html(record.get_or_na(column))));
    }
    html.push_str(&format!(
        "<td>{}</td><td>{}</td></tr>",
        format_pct(row.pct_below_high),
        format_pct(row.pct_above_low),
    ));
    html
}

/// Render the full report document. An empty `records` still yields a complete page.
pub fn render_report(records: &[MergedRecord], summary: &[SummaryItem], updated_at: &str) -> String {
    let mut html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title}</title>
<style>{STYLE}</style>
</head>
<body>
<h1>{title}</h1>
<div class="updated-time">Updated on: {updated}</div>
{summary}
<div class="search-container">
<input type="text" id="searchInput" placeholder="Search for symbols...">
</div>
<div class="table-container">
<table id="reportTable">
<thead>
<tr>"#,
        title = REPORT_TITLE,
        updated = escape_html(updated_at),
        summary = render_summary(summary),
    );

    for column in COLUMNS {
        html.push_str(&format!("<th>{}</th>", escape_html(column)));
    }
    html.push_str("<th>% Below 52W High</th><th>% Above 52W Low</th></tr>\n</thead>\n<tbody>");

    for row in records {
        html.push_str(&render_row(row));
    }

    html.push_str(&format!(
        "\n</tbody>\n</table>\n</div>\n<script>{SCRIPT}</script>\n</body>\n</html>\n"
    ));
    html
}

/// Chat reply for one symbol (Telegram HTML parse mode).
pub fn render_symbol_reply(row: &MergedRecord, updated_at: &str) -> String {
    let r = &row.record;
    let field = |name: &str| escape_html(r.get_or_na(name));
    format!(
        "<b>{symbol}</b>\n\
         LTP: {ltp} ({change}%)\n\
         Day High/Low: {day_high} / {day_low}\n\
         Volume: {volume}\n\
         Turnover: {turnover}\n\
         52W High/Low: {high} / {low}\n\
         Below 52W High: {below}%\n\
         Above 52W Low: {above}%\n\
         <i>Updated {updated}</i>",
        symbol = field(fields::SYMBOL),
        ltp = field(fields::LTP),
        change = field(fields::CHANGE_PCT),
        day_high = field(fields::DAY_HIGH),
        day_low = field(fields::DAY_LOW),
        volume = field(fields::VOLUME),
        turnover = field(fields::TURNOVER),
        high = field(fields::WEEK52_HIGH),
        low = field(fields::WEEK52_LOW),
        below = format_pct(row.pct_below_high),
        above = format_pct(row.pct_above_low),
        updated = escape_html(updated_at),
    )
}
