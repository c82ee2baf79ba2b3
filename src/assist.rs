use std::time::Duration;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::AssistConfig;
use crate::grading::{Dimension, Dimensions, GradingInput, GradingResult, MAX_DIFFERENTIATOR_CHARS};

/// Every way the assisted path can fail. The engine treats them all alike.
#[derive(Debug, Error)]
pub enum AssistError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("grader returned HTTP {0}")]
    Status(u16),

    #[error("grader response missing field '{0}'")]
    MissingField(&'static str),

    #[error("grader field '{field}' out of range: {value}")]
    OutOfRange { field: &'static str, value: String },

    #[error("grader response malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Higher-quality grading capability behind a fallible remote call.
/// One attempt per call; deadlines belong to the implementation.
#[async_trait]
pub trait AssistedGrader: Send + Sync {
    async fn grade(&self, input: &GradingInput) -> Result<GradingResult, AssistError>;
}

const SYSTEM_PROMPT: &str = "You grade startup positioning copy. Score each dimension \
from 0 to 100: clarity (plain, jargon-free headline), specificity (numbers, named \
outcomes, concrete nouns), differentiation (explicit contrast with the default option), \
brevity (headline of 6 to 12 words), valueClarity (who benefits and what they get). \
Reply with one JSON object: {\"clarity\": int, \"specificity\": int, \"differentiation\": int, \
\"brevity\": int, \"valueClarity\": int, \"differentiator\": string}. The differentiator \
is one sentence naming the weakest dimension and how to fix it.";

/// OpenAI-compatible chat completions client.
pub struct HttpAssistedGrader {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl HttpAssistedGrader {
    /// Returns `None` when the assisted path is disabled or has no API key.
    pub fn from_config(config: &AssistConfig) -> anyhow::Result<Option<Self>> {
        if !config.enabled {
            info!("Assisted grading disabled by config");
            return Ok(None);
        }
        let Some(api_key) = config.api_key() else {
            info!("Assisted grading unavailable: ${} not set", config.api_key_env);
            return Ok(None);
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build assisted grader client: {}", e))?;

        info!("Assisted grading via {} (model {}, timeout {}ms)", config.endpoint, config.model, config.timeout_ms);
        Ok(Some(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
        }))
    }

    fn request_body(&self, input: &GradingInput) -> Value {
        serde_json::json!({
            "model": self.model,
            "temperature": 0,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": serde_json::to_string(input).unwrap_or_default() },
            ],
        })
    }
}

#[async_trait]
impl AssistedGrader for HttpAssistedGrader {
    async fn grade(&self, input: &GradingInput) -> Result<GradingResult, AssistError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(input))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AssistError::Status(status.as_u16()));
        }

        let completion: ChatCompletion = response.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(AssistError::MissingField("choices[0].message.content"))?;
        debug!("Assisted grader replied with {} bytes", content.len());

        map_payload(&input.startup_name, serde_json::from_str(&content)?)
    }
}

#[derive(Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Map the grader's JSON object onto the shared result shape. The aggregate,
/// grade and tier are recomputed locally so both paths share one rubric.
pub fn map_payload(name: &str, payload: Value) -> Result<GradingResult, AssistError> {
    let obj = payload
        .as_object()
        .ok_or(AssistError::MissingField("object"))?;

    let sub = |dimension: Dimension| -> Result<u8, AssistError> {
        let field = dimension.name();
        let value = obj.get(field).ok_or(AssistError::MissingField(field))?;
        let n = value.as_f64().ok_or_else(|| AssistError::OutOfRange {
            field,
            value: value.to_string(),
        })?;
        if !(0.0..=100.0).contains(&n) || n.fract() != 0.0 {
            return Err(AssistError::OutOfRange { field, value: value.to_string() });
        }
        Ok(n as u8)
    };

    let dimensions = Dimensions {
        clarity: sub(Dimension::Clarity)?,
        specificity: sub(Dimension::Specificity)?,
        differentiation: sub(Dimension::Differentiation)?,
        brevity: sub(Dimension::Brevity)?,
        value_clarity: sub(Dimension::ValueClarity)?,
    };

    let differentiator = obj
        .get("differentiator")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(AssistError::MissingField("differentiator"))?;
    if differentiator.chars().count() > MAX_DIFFERENTIATOR_CHARS {
        return Err(AssistError::OutOfRange {
            field: "differentiator",
            value: format!("{} chars", differentiator.chars().count()),
        });
    }

    Ok(GradingResult::from_dimensions(name, dimensions, differentiator.to_string()))
}
