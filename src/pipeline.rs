use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::api::{PipelineHealth, RunLatency};
use crate::config::{market_hours, Config};
use crate::error::Result;
use crate::fetcher::{build_client, fetch_summary, fetch_table};
use crate::merge::merge;
use crate::publish::{publish_all, FilePublisher, FtpPublisher, Publisher};
use crate::render::{format_timestamp, render_report};
use crate::scrape::{LIVE_TRADING, TODAY_PRICE};
use crate::state::ReportStore;
use crate::types::{DataSource, MergedRecord, Snapshot, SummaryItem};

/// Remote and local name of the published report.
pub const REPORT_FILE_NAME: &str = "index.html";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub source: DataSource,
    pub rows: usize,
    pub published: usize,
}

/// Fetch → extract → merge → render → publish.
pub struct Pipeline {
    cfg: Config,
    client: reqwest::Client,
    store: Arc<ReportStore>,
    publishers: Vec<Box<dyn Publisher>>,
    health: Arc<PipelineHealth>,
    latency: Arc<RunLatency>,
}

impl Pipeline {
    pub fn new(
        cfg: Config,
        client: reqwest::Client,
        store: Arc<ReportStore>,
        publishers: Vec<Box<dyn Publisher>>,
        health: Arc<PipelineHealth>,
        latency: Arc<RunLatency>,
    ) -> Self {
        Self { cfg, client, store, publishers, health, latency }
    }

    /// Build the client and the publishers enabled by `cfg`.
    pub fn from_config(
        cfg: Config,
        store: Arc<ReportStore>,
        health: Arc<PipelineHealth>,
        latency: Arc<RunLatency>,
    ) -> Result<Self> {
        let client = build_client(cfg.http_timeout)?;

        let mut publishers: Vec<Box<dyn Publisher>> = Vec::new();
        if !cfg.output_path.is_empty() {
            publishers.push(Box::new(FilePublisher::new(&cfg.output_path)));
        }
        if let Some(ftp) = &cfg.ftp {
            publishers.push(Box::new(FtpPublisher::new(ftp.clone(), REPORT_FILE_NAME)));
        }

        Ok(Self::new(cfg, client, store, publishers, health, latency))
    }

    pub fn publisher_names(&self) -> Vec<&str> {
        self.publishers.iter().map(|p| p.name()).collect()
    }

    /// Fetch all three sources concurrently and join them. Never fails: each source
    /// degrades to empty on its own.
    pub async fn collect(&self) -> (Vec<MergedRecord>, Vec<SummaryItem>) {
        let (live, week52, summary) = tokio::join!(
            fetch_table(&self.client, &self.cfg.live_url, &LIVE_TRADING),
            fetch_table(&self.client, &self.cfg.week52_url, &TODAY_PRICE),
            fetch_summary(&self.client, &self.cfg.summary_url),
        );

        let merged = merge(&live, &week52);
        if merged.len() < live.len() {
            info!(
                live = live.len(),
                week52 = week52.len(),
                merged = merged.len(),
                "dropped {} live rows without a 52-week match",
                live.len() - merged.len()
            );
        }
        (merged, summary)
    }

    pub async fn run_once(&self) -> RunOutcome {
        self.run_at(Utc::now()).await
    }

    /// One full run as of `now`. Market hours and the snapshot stamp use `now`.
    pub async fn run_at(&self, now: DateTime<Utc>) -> RunOutcome {
        let started = Instant::now();
        let (view, source) = self.resolve_data(now).await;

        let document = render_report(&view.records, &view.summary, &format_timestamp(view.taken_at));
        self.store.set_document(document.clone());

        let published = publish_all(&self.publishers, &document).await;
        let failed = self.publishers.len() - published;
        if failed > 0 {
            self.health.add_publish_failures(failed as u64);
        }

        let rows = view.records.len();
        self.health.record_run(source, rows, now.timestamp());
        self.latency.record(source, started.elapsed());

        info!(
            source = %source,
            rows,
            published,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "report run complete"
        );
        RunOutcome { source, rows, published }
    }

    /// Pick the data to render: snapshot while the market is closed, otherwise a live
    /// fetch, falling back to the snapshot (or nothing) when the fetch comes back empty.
    async fn resolve_data(&self, now: DateTime<Utc>) -> (Arc<Snapshot>, DataSource) {
        let market_open = market_hours().contains(now);

        if !market_open {
            if let Some(snapshot) = self.store.snapshot() {
                info!(taken_at = %snapshot.taken_at, "market closed, rendering last snapshot");
                return (snapshot, DataSource::Snapshot);
            }
        }

        let (records, summary) = self.collect().await;
        if !records.is_empty() {
            let snapshot = Arc::new(Snapshot { records, summary, taken_at: now });
            self.store.set_snapshot(Arc::clone(&snapshot));
            return (snapshot, DataSource::Live);
        }

        match self.store.snapshot() {
            Some(snapshot) => {
                warn!(taken_at = %snapshot.taken_at, "no live rows, falling back to last snapshot");
                (snapshot, DataSource::Snapshot)
            }
            None => {
                warn!("no live rows and no snapshot, rendering empty report");
                (Arc::new(Snapshot { records: Vec::new(), summary, taken_at: now }), DataSource::Empty)
            }
        }
    }

    /// Look up one symbol for a chat reply. Uses the snapshot when present, otherwise
    /// fetches once (without rendering or publishing) and keeps a non-empty result.
    pub async fn lookup(&self, symbol: &str) -> Option<(MergedRecord, DateTime<Utc>)> {
        let snapshot = match self.store.snapshot() {
            Some(s) => s,
            None => {
                let (records, summary) = self.collect().await;
                if records.is_empty() {
                    return None;
                }
                let snapshot = Arc::new(Snapshot { records, summary, taken_at: Utc::now() });
                self.store.set_snapshot(Arc::clone(&snapshot));
                snapshot
            }
        };
        snapshot.find(symbol).cloned().map(|r| (r, snapshot.taken_at))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::MARKET_TZ;
    use crate::types::fields;
    use chrono::TimeZone;

    pub(crate) fn live_html() -> String {
        r#"<table>
            <tr><th>S.No</th><th>Symbol</th><th>LTP</th></tr>
            <tr><td>1</td><td>NABIL</td><td>1,000</td><td>15</td><td>1.52</td><td>985</td><td>1,010</td><td>980</td><td>12,000</td><td>985</td></tr>
            <tr><td>2</td><td>NICA</td><td>800</td><td>-4</td><td>-0.50</td><td>804</td><td>810</td><td>795</td><td>8,000</td><td>804</td></tr>
            <tr><td>3</td><td>NEWCO</td><td>100</td><td>0</td><td>0</td><td>100</td><td>100</td><td>100</td><td>10</td><td>100</td></tr>
        </table>"#
            .to_string()
    }

    fn week_row(symbol: &str, high: &str, low: &str) -> String {
        let mut cells: Vec<String> = (0..21).map(|i| i.to_string()).collect();
        cells[1] = symbol.to_string();
        cells[10] = "1,000,000".to_string();
        cells[19] = high.to_string();
        cells[20] = low.to_string();
        let tds: String = cells.iter().map(|c| format!("<td>{c}</td>")).collect();
        format!("<tr>{tds}</tr>")
    }

    pub(crate) fn week52_html() -> String {
        format!(
            "<table><tr><th>Symbol</th></tr>{}{}</table>",
            week_row("NABIL", "1,250", "800"),
            week_row("NICA", "1,000", "750"),
        )
    }

    pub(crate) fn summary_html() -> String {
        r#"<div class="market-summary">
            <div class="summary-row"><div class="label">Daily Gain</div><div class="value">0.75%</div></div>
        </div>"#
            .to_string()
    }

    /// Monday 12:00 exchange-local.
    fn during_market() -> DateTime<Utc> {
        MARKET_TZ.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap().with_timezone(&Utc)
    }

    /// Saturday 12:00 exchange-local.
    fn market_closed() -> DateTime<Utc> {
        MARKET_TZ.with_ymd_and_hms(2026, 10, 24, 12, 0, 0).unwrap().with_timezone(&Utc)
    }

    pub(crate) fn pipeline(base_url: &str, store: Arc<ReportStore>) -> Pipeline {
        let cfg = Config::for_test(base_url);
        Pipeline::from_config(
            cfg,
            store,
            Arc::new(PipelineHealth::new()),
            Arc::new(RunLatency::new()),
        )
        .unwrap()
    }

    async fn serve_all(server: &mut mockito::ServerGuard) {
        server.mock("GET", "/live-trading").with_body(live_html()).create_async().await;
        server.mock("GET", "/today-share-price").with_body(week52_html()).create_async().await;
        server.mock("GET", "/live-market").with_body(summary_html()).create_async().await;
    }

    #[tokio::test]
    async fn live_run_renders_and_stores_snapshot() {
        let mut server = mockito::Server::new_async().await;
        serve_all(&mut server).await;
        let store = ReportStore::new();
        let p = pipeline(&server.url(), Arc::clone(&store));

        let outcome = p.run_at(during_market()).await;
        assert_eq!(outcome, RunOutcome { source: DataSource::Live, rows: 2, published: 0 });

        let doc = store.document().unwrap();
        assert!(doc.contains("<td>NABIL</td>"));
        assert!(doc.contains("<td>NICA</td>"));
        // unmatched live row is dropped
        assert!(!doc.contains("NEWCO"));
        assert!(doc.contains("Daily Gain"));
        assert!(doc.contains("Updated on: 2026-10-19 12:00:00"));

        let snap = store.snapshot().unwrap();
        let nabil = snap.find("NABIL").unwrap();
        assert_eq!(nabil.record.get(fields::TURNOVER), Some("1,000,000"));
        assert!((nabil.pct_below_high.unwrap() - 20.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn closed_market_reuses_snapshot_without_fetching() {
        let mut server = mockito::Server::new_async().await;
        serve_all(&mut server).await;
        let store = ReportStore::new();
        let p = pipeline(&server.url(), Arc::clone(&store));
        p.run_at(during_market()).await;
        let first = store.document().unwrap();

        // any further fetch would hit this 500 instead
        let mut closed = mockito::Server::new_async().await;
        let live = closed.mock("GET", "/live-trading").with_status(500).expect(0).create_async().await;
        let p2 = pipeline(&closed.url(), Arc::clone(&store));

        let outcome = p2.run_at(market_closed()).await;
        assert_eq!(outcome.source, DataSource::Snapshot);
        assert_eq!(outcome.rows, 2);
        assert_eq!(*store.document().unwrap(), *first);
        live.assert_async().await;
    }

    #[tokio::test]
    async fn failed_fetch_without_snapshot_renders_empty_shell() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/live-trading").with_status(503).create_async().await;
        server.mock("GET", "/today-share-price").with_status(503).create_async().await;
        server.mock("GET", "/live-market").with_status(503).create_async().await;
        let store = ReportStore::new();
        let p = pipeline(&server.url(), Arc::clone(&store));

        let outcome = p.run_at(during_market()).await;
        assert_eq!(outcome.source, DataSource::Empty);
        assert_eq!(outcome.rows, 0);
        let doc = store.document().unwrap();
        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains("<tbody>\n</tbody>"));
        assert!(store.snapshot().is_none());
    }

    #[tokio::test]
    async fn failed_fetch_falls_back_to_snapshot() {
        let mut good = mockito::Server::new_async().await;
        serve_all(&mut good).await;
        let store = ReportStore::new();
        pipeline(&good.url(), Arc::clone(&store)).run_at(during_market()).await;

        let mut bad = mockito::Server::new_async().await;
        bad.mock("GET", "/live-trading").with_body("<p>maintenance</p>").create_async().await;
        bad.mock("GET", "/today-share-price").with_body(week52_html()).create_async().await;
        bad.mock("GET", "/live-market").with_status(500).create_async().await;

        let outcome = pipeline(&bad.url(), Arc::clone(&store)).run_at(during_market()).await;
        assert_eq!(outcome.source, DataSource::Snapshot);
        assert_eq!(outcome.rows, 2);
    }

    #[tokio::test]
    async fn file_publisher_receives_document() {
        let mut server = mockito::Server::new_async().await;
        serve_all(&mut server).await;
        let path = std::env::temp_dir().join(format!("nepse-pipeline-{}.html", std::process::id()));

        let mut cfg = Config::for_test(&server.url());
        cfg.output_path = path.to_string_lossy().to_string();
        let store = ReportStore::new();
        let p = Pipeline::from_config(
            cfg,
            Arc::clone(&store),
            Arc::new(PipelineHealth::new()),
            Arc::new(RunLatency::new()),
        )
        .unwrap();
        assert_eq!(p.publisher_names(), vec!["file"]);

        let outcome = p.run_at(during_market()).await;
        assert_eq!(outcome.published, 1);
        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(written, *store.document().unwrap());
        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn identical_sources_give_identical_reports() {
        let mut server = mockito::Server::new_async().await;
        serve_all(&mut server).await;
        let a = ReportStore::new();
        let b = ReportStore::new();
        pipeline(&server.url(), Arc::clone(&a)).run_at(during_market()).await;
        pipeline(&server.url(), Arc::clone(&b)).run_at(during_market()).await;
        assert_eq!(a.document(), b.document());
    }

    #[tokio::test]
    async fn lookup_fetches_once_then_uses_snapshot() {
        let mut server = mockito::Server::new_async().await;
        let live = server
            .mock("GET", "/live-trading")
            .with_body(live_html())
            .expect(1)
            .create_async()
            .await;
        server.mock("GET", "/today-share-price").with_body(week52_html()).create_async().await;
        server.mock("GET", "/live-market").with_body(summary_html()).create_async().await;
        let p = pipeline(&server.url(), ReportStore::new());

        let (nabil, _) = p.lookup("nabil").await.unwrap();
        assert_eq!(nabil.record.get(fields::LTP), Some("1,000"));
        assert!(p.lookup("NEWCO").await.is_none());
        live.assert_async().await;
    }
}
