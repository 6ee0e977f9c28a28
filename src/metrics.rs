// PromptDeck: Metrics and observability.
//
// Lightweight in-process counters for generation requests, remote latency,
// placeholder fallbacks and per-model usage. Exposes a simple report API.

use crate::generation::{Generation, GenerationSource};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Global metrics collector.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<RwLock<MetricsInner>>,
    start_time: Instant,
}

#[derive(Default)]
struct MetricsInner {
    /// Total generation requests served.
    generations: u64,
    /// Requests answered by the remote model.
    remote_successes: u64,
    /// Cumulative remote latency in milliseconds.
    remote_total_ms: u64,
    /// Placeholder outputs, keyed by fallback reason label.
    fallbacks: HashMap<String, u64>,
    /// Per-model request counts.
    model_requests: HashMap<String, u64>,
    /// Runs recorded in the ledger.
    runs_recorded: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(MetricsInner::default())),
            start_time: Instant::now(),
        }
    }

    /// Record the outcome of one generation.
    pub async fn record_generation(&self, model: &str, generation: &Generation) {
        let mut m = self.inner.write().await;
        m.generations += 1;
        *m.model_requests.entry(model.to_string()).or_insert(0) += 1;
        match &generation.source {
            GenerationSource::Remote => {
                m.remote_successes += 1;
                m.remote_total_ms += generation.elapsed.as_millis() as u64;
            }
            GenerationSource::Stub(reason) => {
                *m.fallbacks.entry(reason.label().to_string()).or_insert(0) += 1;
            }
        }
    }

    /// Record a run written to the ledger.
    pub async fn record_run(&self) {
        self.inner.write().await.runs_recorded += 1;
    }

    /// Get uptime.
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Generate a structured metrics report.
    pub async fn report(&self) -> MetricsReport {
        let m = self.inner.read().await;

        let avg_remote_ms = if m.remote_successes > 0 {
            m.remote_total_ms / m.remote_successes
        } else {
            0
        };

        MetricsReport {
            uptime_secs: self.uptime().as_secs(),
            generations: m.generations,
            remote_successes: m.remote_successes,
            stub_fallbacks: m.fallbacks.values().sum(),
            avg_remote_ms,
            fallbacks: m.fallbacks.clone(),
            model_requests: m.model_requests.clone(),
            runs_recorded: m.runs_recorded,
        }
    }

    /// Format report as a displayable string.
    pub async fn format_report(&self) -> String {
        let r = self.report().await;
        let mut out = String::new();

        let hours = r.uptime_secs / 3600;
        let mins = (r.uptime_secs % 3600) / 60;
        let secs = r.uptime_secs % 60;

        out.push_str(&format!(
            "═══ PromptDeck Metrics ═══\n\
             Uptime:       {:02}:{:02}:{:02}\n\
             Generations:  {} ({} remote, {} placeholder)\n\
             Avg Latency:  {}ms\n\
             Runs:         {}\n",
            hours,
            mins,
            secs,
            r.generations,
            r.remote_successes,
            r.stub_fallbacks,
            r.avg_remote_ms,
            r.runs_recorded,
        ));

        if !r.fallbacks.is_empty() {
            out.push_str("\n─── Fallbacks ───\n");
            let mut reasons: Vec<_> = r.fallbacks.iter().collect();
            reasons.sort();
            for (reason, count) in reasons {
                out.push_str(&format!("  {:<20} {:>4}\n", reason, count));
            }
        }

        if !r.model_requests.is_empty() {
            out.push_str("\n─── Models ───\n");
            let mut models: Vec<_> = r.model_requests.iter().collect();
            models.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
            for (model, count) in models {
                out.push_str(&format!("  {:<30} {:>4} requests\n", model, count));
            }
        }

        out
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Structured metrics report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsReport {
    pub uptime_secs: u64,
    pub generations: u64,
    pub remote_successes: u64,
    pub stub_fallbacks: u64,
    pub avg_remote_ms: u64,
    pub fallbacks: HashMap<String, u64>,
    pub model_requests: HashMap<String, u64>,
    pub runs_recorded: u64,
}
