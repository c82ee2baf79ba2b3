mod assist;
mod clock;
mod config;
mod engine;
mod grading;
mod metrics;
mod rate_limit;
mod share;
mod web;

use std::sync::Arc;
use tracing::{error, info};

use crate::assist::{AssistedGrader, HttpAssistedGrader};
use crate::config::Config;
use crate::engine::GradingEngine;
use crate::rate_limit::SlidingWindowLimiter;
use crate::web::server::WebServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "positioning_grader=info,tower_http=info".into()),
        )
        .init();

    info!("📝 positioning-grader v{} starting...", env!("CARGO_PKG_VERSION"));

    // Load config
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "positioning-grader.toml".to_string());

    let config = Config::load(&config_path)?;
    info!("Config loaded from {}", config_path);

    // Assisted path is optional; without it every request is graded heuristically
    let assist: Option<Arc<dyn AssistedGrader>> = match HttpAssistedGrader::from_config(&config.assist)? {
        Some(grader) => Some(Arc::new(grader)),
        None => {
            info!("Serving heuristic grades only");
            None
        }
    };

    let limits = &config.rate_limit;
    info!(
        "Rate limits: assisted {}/{}ms, availability {}/{}ms",
        limits.assisted.limit, limits.assisted.window_ms, limits.availability.limit, limits.availability.window_ms
    );

    let engine = Arc::new(GradingEngine::new(
        SlidingWindowLimiter::new("assisted", &limits.assisted),
        assist,
    ));
    let availability = Arc::new(SlidingWindowLimiter::new("availability", &limits.availability));

    let web = WebServer::new(engine, availability, config.web.clone());
    if let Err(e) = web.run().await {
        error!("Web server error: {}", e);
        return Err(e);
    }
    Ok(())
}
