//! Prometheus-compatible metrics exporter.
//!
//! Endpoint: GET /metrics (on the web port, default 8080)

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use chrono::{DateTime, Utc};

use crate::engine::GradingEngine;

/// Counters updated from request handling
pub struct MetricsCounters {
    /// Grading requests that reached the engine
    pub requests_total: AtomicU64,
    /// Requests rejected by validation
    pub rejected_total: AtomicU64,
    /// Requests downgraded to heuristic-only by the rate limiter
    pub rate_limited_total: AtomicU64,
    /// Results produced by the assisted grader
    pub assisted_total: AtomicU64,
    /// Assisted attempts that failed and fell back
    pub assist_failures_total: AtomicU64,
    /// Results produced by the heuristic scorer
    pub heuristic_total: AtomicU64,
    pub share_decodes_total: AtomicU64,
    pub share_decode_failures_total: AtomicU64,
    pub start_time: Instant,
    pub started_at: DateTime<Utc>,
}

impl MetricsCounters {
    pub fn new() -> Self {
        Self {
            requests_total: AtomicU64::new(0),
            rejected_total: AtomicU64::new(0),
            rate_limited_total: AtomicU64::new(0),
            assisted_total: AtomicU64::new(0),
            assist_failures_total: AtomicU64::new(0),
            heuristic_total: AtomicU64::new(0),
            share_decodes_total: AtomicU64::new(0),
            share_decode_failures_total: AtomicU64::new(0),
            start_time: Instant::now(),
            started_at: Utc::now(),
        }
    }

    #[inline]
    pub fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> serde_json::Value {
        serde_json::json!({
            "started_at": self.started_at.to_rfc3339(),
            "uptime_secs": self.start_time.elapsed().as_secs(),
            "requests": self.requests_total.load(Ordering::Relaxed),
            "rejected": self.rejected_total.load(Ordering::Relaxed),
            "rate_limited": self.rate_limited_total.load(Ordering::Relaxed),
            "assisted": self.assisted_total.load(Ordering::Relaxed),
            "assist_failures": self.assist_failures_total.load(Ordering::Relaxed),
            "heuristic": self.heuristic_total.load(Ordering::Relaxed),
            "share_decodes": self.share_decodes_total.load(Ordering::Relaxed),
            "share_decode_failures": self.share_decode_failures_total.load(Ordering::Relaxed),
        })
    }
}

impl Default for MetricsCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate Prometheus-format metrics text
pub fn render_metrics(engine: &GradingEngine) -> String {
    let mut out = String::with_capacity(2048);
    let c = &engine.metrics;

    write_help_type(&mut out, "grader_up", "Whether the grading service is up.", "gauge");
    writeln!(out, "grader_up 1").ok();

    write_help_type(&mut out, "grader_time_up_seconds_total", "Uptime since start in seconds.", "counter");
    writeln!(out, "grader_time_up_seconds_total {:.3}", c.start_time.elapsed().as_secs_f64()).ok();

    write_help_type(&mut out, "grader_requests_total", "Grading requests received.", "counter");
    writeln!(out, "grader_requests_total {}", c.requests_total.load(Ordering::Relaxed)).ok();

    write_help_type(&mut out, "grader_rejected_total", "Grading requests rejected by validation.", "counter");
    writeln!(out, "grader_rejected_total {}", c.rejected_total.load(Ordering::Relaxed)).ok();

    write_help_type(&mut out, "grader_rate_limited_total", "Requests downgraded to heuristic-only by the rate limiter.", "counter");
    writeln!(out, "grader_rate_limited_total {}", c.rate_limited_total.load(Ordering::Relaxed)).ok();

    write_help_type(&mut out, "grader_results_total", "Results returned, by the path that produced them.", "counter");
    writeln!(out, "grader_results_total{{source=\"assisted\"}} {}", c.assisted_total.load(Ordering::Relaxed)).ok();
    writeln!(out, "grader_results_total{{source=\"heuristic\"}} {}", c.heuristic_total.load(Ordering::Relaxed)).ok();

    write_help_type(&mut out, "grader_assist_failures_total", "Assisted attempts that failed and fell back.", "counter");
    writeln!(out, "grader_assist_failures_total {}", c.assist_failures_total.load(Ordering::Relaxed)).ok();

    write_help_type(&mut out, "grader_share_decodes_total", "Share token decode attempts.", "counter");
    writeln!(out, "grader_share_decodes_total {}", c.share_decodes_total.load(Ordering::Relaxed)).ok();
    write_help_type(&mut out, "grader_share_decode_failures_total", "Share tokens rejected as malformed.", "counter");
    writeln!(out, "grader_share_decode_failures_total {}", c.share_decode_failures_total.load(Ordering::Relaxed)).ok();

    write_help_type(&mut out, "grader_rate_limit_tracked_keys", "Client keys currently tracked by the assisted-path limiter.", "gauge");
    writeln!(out, "grader_rate_limit_tracked_keys {}", engine.limiter.tracked_keys()).ok();

    write_help_type(&mut out, "grader_assist_configured", "Whether the assisted grader is configured.", "gauge");
    writeln!(out, "grader_assist_configured {}", engine.has_assist() as u8).ok();

    write_help_type(&mut out, "grader_build_info", "Build information.", "gauge");
    writeln!(out, "grader_build_info{{version=\"{}\"}} 1", env!("CARGO_PKG_VERSION")).ok();

    out
}

// ── helpers ─────────────────────────────────────────

fn write_help_type(out: &mut String, name: &str, help: &str, metric_type: &str) {
    writeln!(out, "# HELP {} {}", name, help).ok();
    writeln!(out, "# TYPE {} {}", name, metric_type).ok();
}
