//! HTML extraction: fixed-position tables and the market-summary block.

pub mod summary;
pub mod table;

pub use summary::extract_market_summary;
pub use table::{extract_table, TableLayout, LIVE_TRADING, TODAY_PRICE};
