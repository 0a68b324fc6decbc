use std::time::Duration;

use tracing::{debug, warn};

use crate::error::Result;
use crate::scrape::{extract_market_summary, extract_table, TableLayout};
use crate::types::{Record, SummaryItem};

/// Some upstream pages reject requests without a browser-like agent.
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) nepse-report/0.1";

/// Shared client. One timeout applies to every request; there are no retries.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()?)
}

/// Single GET, returning the body text. Non-2xx statuses are errors.
pub async fn fetch_page(client: &reqwest::Client, url: &str) -> Result<String> {
    let resp = client.get(url).send().await?.error_for_status()?;
    let body = resp.text().await?;
    debug!(url, bytes = body.len(), "fetched page");
    Ok(body)
}

/// Fetch and extract one table. Any failure is logged and yields no rows.
pub async fn fetch_table(client: &reqwest::Client, url: &str, layout: &TableLayout) -> Vec<Record> {
    let markup = match fetch_page(client, url).await {
        Ok(m) => m,
        Err(e) => {
            warn!(table = layout.name, "fetch failed for {url}: {e}");
            return Vec::new();
        }
    };
    match extract_table(&markup, layout) {
        Ok(rows) => {
            debug!(table = layout.name, rows = rows.len(), "extracted table");
            rows
        }
        Err(e) => {
            warn!(table = layout.name, "extract failed for {url}: {e}");
            Vec::new()
        }
    }
}

/// Fetch and extract the market summary. Any failure is logged and yields no items.
pub async fn fetch_summary(client: &reqwest::Client, url: &str) -> Vec<SummaryItem> {
    let markup = match fetch_page(client, url).await {
        Ok(m) => m,
        Err(e) => {
            warn!("market summary fetch failed for {url}: {e}");
            return Vec::new();
        }
    };
    extract_market_summary(&markup).unwrap_or_else(|e| {
        warn!("market summary extract failed for {url}: {e}");
        Vec::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::scrape::LIVE_TRADING;
    use crate::types::fields;

    #[tokio::test]
    async fn fetch_page_returns_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/live")
            .with_status(200)
            .with_body("<html>ok</html>")
            .create_async()
            .await;

        let client = build_client(Duration::from_secs(5)).unwrap();
        let body = fetch_page(&client, &format!("{}/live", server.url())).await.unwrap();
        assert_eq!(body, "<html>ok</html>");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn error_status_is_http_error() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/live").with_status(503).create_async().await;

        let client = build_client(Duration::from_secs(5)).unwrap();
        let err = fetch_page(&client, &format!("{}/live", server.url())).await.unwrap_err();
        assert!(matches!(err, AppError::Http(_)));
    }

    #[tokio::test]
    async fn fetch_table_degrades_to_empty() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/down").with_status(500).create_async().await;
        server
            .mock("GET", "/no-table")
            .with_status(200)
            .with_body("<p>maintenance</p>")
            .create_async()
            .await;

        let client = build_client(Duration::from_secs(5)).unwrap();
        let down = fetch_table(&client, &format!("{}/down", server.url()), &LIVE_TRADING).await;
        let no_table =
            fetch_table(&client, &format!("{}/no-table", server.url()), &LIVE_TRADING).await;
        assert!(down.is_empty());
        assert!(no_table.is_empty());
    }

    #[tokio::test]
    async fn fetch_table_extracts_rows() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/live")
            .with_status(200)
            .with_body("<table><tr><td>1</td><td>NABIL</td><td>500</td></tr></table>")
            .create_async()
            .await;

        let client = build_client(Duration::from_secs(5)).unwrap();
        let rows = fetch_table(&client, &format!("{}/live", server.url()), &LIVE_TRADING).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get(fields::SYMBOL), Some("NABIL"));
    }
}
