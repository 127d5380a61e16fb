//! Stage timings: dataset fetch, index build, lookups and scans.
//! Each stage keeps its most recent samples and reports p50/p95/p99 over them.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;

const WINDOW: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Fetch,
    Build,
    Lookup,
    Scan,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Fetch, Stage::Build, Stage::Lookup, Stage::Scan];

    fn slot(self) -> usize {
        self as usize
    }
}

/// Measures one run of a stage; recorded by `finish`.
pub struct TimingSpan {
    stage: Stage,
    start: Instant,
    registry: Arc<MetricsRegistry>,
}

impl TimingSpan {
    /// Record and return the elapsed microseconds.
    pub fn finish(self) -> f64 {
        let elapsed_us = self.start.elapsed().as_micros() as f64;
        self.registry.record(self.stage, elapsed_us);
        elapsed_us
    }
}

#[derive(Default)]
struct Window {
    samples: VecDeque<f64>,
    total: u64,
}

impl Window {
    fn push(&mut self, value: f64) {
        if self.samples.len() == WINDOW {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
        self.total += 1;
    }

    /// Nearest-rank percentile over the window.
    fn percentiles(&self, ps: &[f64]) -> Vec<f64> {
        if self.samples.is_empty() {
            return vec![0.0; ps.len()];
        }
        let mut sorted: Vec<f64> = self.samples.iter().copied().collect();
        sorted.sort_by(f64::total_cmp);
        let last = sorted.len() - 1;
        ps.iter()
            .map(|p| sorted[(((p / 100.0) * last as f64).round() as usize).min(last)])
            .collect()
    }
}

pub struct MetricsRegistry {
    windows: Mutex<[Window; 4]>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            windows: Mutex::new(Default::default()),
        }
    }

    /// Record one sample, in microseconds.
    pub fn record(&self, stage: Stage, value_us: f64) {
        self.windows.lock()[stage.slot()].push(value_us);
        tracing::debug!(?stage, value_us, "stage timing");
    }

    pub fn span(self: &Arc<Self>, stage: Stage) -> TimingSpan {
        TimingSpan {
            stage,
            start: Instant::now(),
            registry: Arc::clone(self),
        }
    }

    /// Percentile (0-100) in microseconds; 0 when nothing was recorded.
    pub fn percentile(&self, stage: Stage, p: f64) -> f64 {
        self.windows.lock()[stage.slot()].percentiles(&[p])[0]
    }

    /// Stages that have at least one sample.
    pub fn summary(&self) -> Vec<StageSummary> {
        let windows = self.windows.lock();
        Stage::ALL
            .iter()
            .filter_map(|&stage| {
                let w = &windows[stage.slot()];
                if w.total == 0 {
                    return None;
                }
                let p = w.percentiles(&[50.0, 95.0, 99.0]);
                Some(StageSummary {
                    stage,
                    p50_us: p[0],
                    p95_us: p[1],
                    p99_us: p[2],
                    count: w.total,
                })
            })
            .collect()
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StageSummary {
    pub stage: Stage,
    pub p50_us: f64,
    pub p95_us: f64,
    pub p99_us: f64,
    /// All samples ever recorded, not just the window.
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentiles_over_recorded_samples() {
        let registry = MetricsRegistry::new();
        for v in 1..=100 {
            registry.record(Stage::Lookup, v as f64);
        }
        assert_eq!(registry.percentile(Stage::Lookup, 0.0), 1.0);
        assert_eq!(registry.percentile(Stage::Lookup, 100.0), 100.0);
        assert_eq!(registry.percentile(Stage::Fetch, 50.0), 0.0);

        let summary = registry.summary();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].stage, Stage::Lookup);
        assert_eq!(summary[0].count, 100);
    }

    #[test]
    fn window_keeps_latest_samples() {
        let registry = MetricsRegistry::new();
        for _ in 0..WINDOW {
            registry.record(Stage::Scan, 1.0);
        }
        registry.record(Stage::Scan, 500.0);
        assert_eq!(registry.percentile(Stage::Scan, 100.0), 500.0);
        assert_eq!(registry.summary()[0].count, WINDOW as u64 + 1);
    }

    #[test]
    fn span_records_on_finish() {
        let registry = Arc::new(MetricsRegistry::new());
        registry.span(Stage::Build).finish();
        assert_eq!(registry.summary()[0].stage, Stage::Build);
    }
}
