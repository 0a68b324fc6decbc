//! Shared health state for the /health endpoint.
//! Updated by the pipeline after every run.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use serde::Serialize;

use crate::types::DataSource;

/// Run counters. Written by the pipeline, read by the API.
#[derive(Default)]
pub struct PipelineHealth {
    runs_total: AtomicU64,
    /// Runs that rendered freshly scraped data.
    runs_live: AtomicU64,
    /// Runs that rendered the snapshot or an empty report.
    runs_fallback: AtomicU64,
    publish_failures: AtomicU64,
    /// Unix seconds of the last live run (0 = none).
    last_live_at: AtomicI64,
    last_row_count: AtomicU64,
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub runs_total: u64,
    pub runs_live: u64,
    pub runs_fallback: u64,
    pub publish_failures: u64,
    pub last_live_at: Option<i64>,
    pub last_row_count: u64,
}

impl PipelineHealth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_run(&self, source: DataSource, rows: usize, at_secs: i64) {
        self.runs_total.fetch_add(1, Ordering::Relaxed);
        self.last_row_count.store(rows as u64, Ordering::Relaxed);
        match source {
            DataSource::Live => {
                self.runs_live.fetch_add(1, Ordering::Relaxed);
                self.last_live_at.store(at_secs, Ordering::Relaxed);
            }
            DataSource::Snapshot | DataSource::Empty => {
                self.runs_fallback.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn add_publish_failures(&self, n: u64) {
        self.publish_failures.fetch_add(n, Ordering::Relaxed);
    }

    pub fn report(&self) -> HealthReport {
        let runs_total = self.runs_total.load(Ordering::Relaxed);
        let last_live_at = match self.last_live_at.load(Ordering::Relaxed) {
            0 => None,
            secs => Some(secs),
        };
        HealthReport {
            status: if runs_total == 0 { "starting" } else { "ok" },
            runs_total,
            runs_live: self.runs_live.load(Ordering::Relaxed),
            runs_fallback: self.runs_fallback.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
            last_live_at,
            last_row_count: self.last_row_count.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_live_and_fallback_runs() {
        let h = PipelineHealth::new();
        assert_eq!(h.report().status, "starting");

        h.record_run(DataSource::Live, 220, 1_700_000_000);
        h.record_run(DataSource::Snapshot, 220, 1_700_000_900);
        h.record_run(DataSource::Empty, 0, 1_700_001_800);
        h.add_publish_failures(2);

        let r = h.report();
        assert_eq!(r.status, "ok");
        assert_eq!(r.runs_total, 3);
        assert_eq!(r.runs_live, 1);
        assert_eq!(r.runs_fallback, 2);
        assert_eq!(r.publish_failures, 2);
        assert_eq!(r.last_live_at, Some(1_700_000_000));
        assert_eq!(r.last_row_count, 0);
    }
}
