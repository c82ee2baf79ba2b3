use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub rate_limit: RateLimitsConfig,
    #[serde(default)]
    pub assist: AssistConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    #[serde(default = "default_web_address")]
    pub address: String,
    #[serde(default = "default_web_port")]
    pub port: u16,
    /// Origins allowed to POST grading requests. Empty = no origin check.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    /// Key clients by X-Forwarded-For / X-Real-IP. Only enable behind a
    /// proxy that sets them; otherwise the socket peer address is used.
    #[serde(default)]
    pub trust_forwarded_headers: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            address: default_web_address(),
            port: default_web_port(),
            allowed_origins: Vec::new(),
            trust_forwarded_headers: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitsConfig {
    /// Budget for the expensive assisted path
    #[serde(default = "default_assisted_limit")]
    pub assisted: RateLimitConfig,
    /// Budget for cheap read-only endpoints
    #[serde(default = "default_availability_limit")]
    pub availability: RateLimitConfig,
}

impl Default for RateLimitsConfig {
    fn default() -> Self {
        Self {
            assisted: default_assisted_limit(),
            availability: default_availability_limit(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    pub limit: usize,
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,
    /// Minimum tracked-key count before idle windows are swept
    #[serde(default = "default_gc_threshold")]
    pub gc_threshold: usize,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AssistConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// OpenAI-compatible chat completions URL
    #[serde(default = "default_assist_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_assist_model")]
    pub model: String,
    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_assist_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_assist_endpoint(),
            model: default_assist_model(),
            api_key_env: default_api_key_env(),
            timeout_ms: default_assist_timeout_ms(),
        }
    }
}

impl AssistConfig {
    /// API key from the configured env var, if present and non-empty.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }
}

// Default value functions
fn default_true() -> bool { true }
fn default_web_address() -> String { "0.0.0.0".to_string() }
fn default_web_port() -> u16 { 8080 }
fn default_window_ms() -> u64 { 60_000 }
fn default_gc_threshold() -> usize { 1024 }
fn default_assist_endpoint() -> String { "https://api.openai.com/v1/chat/completions".to_string() }
fn default_assist_model() -> String { "gpt-4o-mini".to_string() }
fn default_api_key_env() -> String { "OPENAI_API_KEY".to_string() }
fn default_assist_timeout_ms() -> u64 { 8000 }

fn default_assisted_limit() -> RateLimitConfig {
    RateLimitConfig { limit: 5, window_ms: default_window_ms(), gc_threshold: default_gc_threshold() }
}

fn default_availability_limit() -> RateLimitConfig {
    RateLimitConfig { limit: 30, window_ms: default_window_ms(), gc_threshold: default_gc_threshold() }
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        if !Path::new(path).exists() {
            info!("Config file '{}' not found, using defaults", path);
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path, e))?;
        Self::parse(&content).map_err(|e| anyhow::anyhow!("Failed to parse config '{}': {}", path, e))
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
