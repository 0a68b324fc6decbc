//! Pipeline run durations (fetch through publish), split by where the data came from.

use std::sync::Mutex;
use std::time::Duration;

use hdrhistogram::Histogram;
use serde::Serialize;

use crate::types::DataSource;

/// Longest run the histogram resolves: one hour in milliseconds.
const MAX_RUN_MS: u64 = 3_600_000;

/// What `/stats/latency` reports.
#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct LatencySummary {
    pub samples: u64,
    pub live_runs: u64,
    pub snapshot_runs: u64,
    pub empty_runs: u64,
    pub p50_ms: Option<u64>,
    pub p95_ms: Option<u64>,
    pub p99_ms: Option<u64>,
    pub max_ms: Option<u64>,
}

struct Runs {
    durations: Histogram<u64>,
    live: u64,
    snapshot: u64,
    empty: u64,
}

pub struct RunLatency {
    inner: Mutex<Runs>,
}

impl RunLatency {
    pub fn new() -> Self {
        // 1ms..1h at 3 significant figures; bounds are constant and valid
        let durations = Histogram::new_with_bounds(1, MAX_RUN_MS, 3).expect("valid histogram bounds");
        Self {
            inner: Mutex::new(Runs { durations, live: 0, snapshot: 0, empty: 0 }),
        }
    }

    /// Record one finished run. Durations past an hour are clamped.
    pub fn record(&self, source: DataSource, elapsed: Duration) {
        let Ok(mut runs) = self.inner.lock() else {
            return;
        };
        let ms = u64::try_from(elapsed.as_millis()).unwrap_or(MAX_RUN_MS).clamp(1, MAX_RUN_MS);
        let _ = runs.durations.record(ms);
        match source {
            DataSource::Live => runs.live += 1,
            DataSource::Snapshot => runs.snapshot += 1,
            DataSource::Empty => runs.empty += 1,
        }
    }

    pub fn summary(&self) -> LatencySummary {
        let Ok(runs) = self.inner.lock() else {
            return LatencySummary::default();
        };
        let h = &runs.durations;
        let has_samples = h.len() > 0;
        let at = |q: f64| has_samples.then(|| h.value_at_quantile(q));
        LatencySummary {
            samples: h.len(),
            live_runs: runs.live,
            snapshot_runs: runs.snapshot,
            empty_runs: runs.empty,
            p50_ms: at(0.5),
            p95_ms: at(0.95),
            p99_ms: at(0.99),
            max_ms: has_samples.then(|| h.max()),
        }
    }
}

impl Default for RunLatency {
    fn default() -> Self {
        Self::new()
    }
}
