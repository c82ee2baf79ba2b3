use serde_json::Value;
use thiserror::Error;

use super::types::GradingInput;

pub const MAX_STARTUP_NAME: usize = 100;
pub const MAX_HEADLINE: usize = 500;
pub const MAX_ONE_LINER: usize = 1000;
pub const MAX_TARGET_AUDIENCE: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Not an object, a required field missing/empty, or a non-string value.
    #[error("Missing or invalid field: {field}")]
    MissingOrInvalidFields { field: &'static str },

    #[error("Startup name must be at most 100 characters")]
    StartupNameTooLong,

    #[error("Headline must be at most 500 characters")]
    HeadlineTooLong,

    #[error("One-liner must be at most 1000 characters")]
    OneLinerTooLong,

    #[error("Target audience must be at most 200 characters")]
    TargetAudienceTooLong,
}

/// Turn a raw JSON payload into a trimmed, bounds-checked `GradingInput`.
/// Oversized fields are rejected, never truncated.
pub fn validate(raw: &Value) -> Result<GradingInput, ValidationError> {
    let obj = raw
        .as_object()
        .ok_or(ValidationError::MissingOrInvalidFields { field: "body" })?;

    let startup_name = required(obj.get("startupName"), "startupName")?;
    let headline = required(obj.get("headline"), "headline")?;
    let one_liner = optional(obj.get("oneLiner"), "oneLiner")?;
    let target_audience = optional(obj.get("targetAudience"), "targetAudience")?;

    check_len(&startup_name, MAX_STARTUP_NAME, ValidationError::StartupNameTooLong)?;
    check_len(&headline, MAX_HEADLINE, ValidationError::HeadlineTooLong)?;
    check_len(&one_liner, MAX_ONE_LINER, ValidationError::OneLinerTooLong)?;
    check_len(&target_audience, MAX_TARGET_AUDIENCE, ValidationError::TargetAudienceTooLong)?;

    Ok(GradingInput {
        startup_name,
        headline,
        one_liner,
        target_audience,
    })
}

fn required(value: Option<&Value>, field: &'static str) -> Result<String, ValidationError> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(ValidationError::MissingOrInvalidFields { field }),
    }
}

fn optional(value: Option<&Value>, field: &'static str) -> Result<String, ValidationError> {
    match value {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.trim().to_string()),
        Some(_) => Err(ValidationError::MissingOrInvalidFields { field }),
    }
}

fn check_len(value: &str, max: usize, err: ValidationError) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        Err(err)
    } else {
        Ok(())
    }
}
