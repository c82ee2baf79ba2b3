use std::sync::Arc;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::assist::AssistedGrader;
use crate::grading::{self, GradingResult, ValidationError};
use crate::metrics::MetricsCounters;
use crate::rate_limit::SlidingWindowLimiter;

/// User-visible failures. Everything else degrades to the heuristic.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("{0}")]
    Validation(#[from] ValidationError),
}

/// Which path produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradeSource {
    Assisted,
    /// No assisted capability configured
    Heuristic,
    /// Client over its assisted-path budget
    RateLimited,
    /// Assisted attempt failed; heuristic substituted
    AssistFailed,
}

impl GradeSource {
    pub fn name(&self) -> &'static str {
        match self {
            GradeSource::Assisted => "assisted",
            GradeSource::Heuristic => "heuristic",
            GradeSource::RateLimited => "rate_limited",
            GradeSource::AssistFailed => "assist_failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Graded {
    pub result: GradingResult,
    pub source: GradeSource,
}

impl Graded {
    pub fn into_result(self) -> GradingResult {
        self.result
    }
}

/// Grading orchestrator: validate, rate check, assisted attempt, heuristic fallback.
pub struct GradingEngine {
    pub limiter: SlidingWindowLimiter,
    pub metrics: MetricsCounters,
    assist: Option<Arc<dyn AssistedGrader>>,
}

impl GradingEngine {
    pub fn new(limiter: SlidingWindowLimiter, assist: Option<Arc<dyn AssistedGrader>>) -> Self {
        Self {
            limiter,
            metrics: MetricsCounters::new(),
            assist,
        }
    }

    pub fn has_assist(&self) -> bool {
        self.assist.is_some()
    }

    /// Grade one raw request. Only validation errors escape; rate limiting and
    /// assisted failures fall back to the heuristic result.
    pub async fn handle(&self, raw: &Value, client_key: &str) -> Result<Graded, RequestError> {
        MetricsCounters::inc(&self.metrics.requests_total);

        let input = grading::validate(raw).map_err(|e| {
            debug!("Rejected grading request from {}: {}", client_key, e);
            MetricsCounters::inc(&self.metrics.rejected_total);
            e
        })?;

        if !self.limiter.check(client_key) {
            info!("Rate limited {} on the assisted path, serving heuristic", client_key);
            MetricsCounters::inc(&self.metrics.rate_limited_total);
            return Ok(self.heuristic(&input, GradeSource::RateLimited));
        }

        let Some(assist) = &self.assist else {
            return Ok(self.heuristic(&input, GradeSource::Heuristic));
        };

        match assist.grade(&input).await {
            Ok(result) => {
                debug!("Assisted grade for '{}': {} ({})", input.startup_name, result.score, result.grade);
                MetricsCounters::inc(&self.metrics.assisted_total);
                Ok(Graded { result, source: GradeSource::Assisted })
            }
            Err(e) => {
                warn!("Assisted grading failed for {}: {} (falling back to heuristic)", client_key, e);
                MetricsCounters::inc(&self.metrics.assist_failures_total);
                Ok(self.heuristic(&input, GradeSource::AssistFailed))
            }
        }
    }

    fn heuristic(&self, input: &grading::GradingInput, source: GradeSource) -> Graded {
        MetricsCounters::inc(&self.metrics.heuristic_total);
        Graded {
            result: grading::score(input),
            source,
        }
    }

    pub fn get_stats(&self) -> Value {
        serde_json::json!({
            "assist_configured": self.has_assist(),
            "counters": self.metrics.get_stats(),
            "rate_limit": self.limiter.get_stats(),
        })
    }
}
