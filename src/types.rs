//! Core data types for the scheduling pipeline
//!
//! Every value here is built fresh per invocation and never persisted:
//! a [`ScheduleRequest`] goes in, a [`PipelineResult`] comes out.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Pipeline Stage
// ============================================================================

/// One network call step in the fallback sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Local backend `/optimize` endpoint
    Backend,
    /// Direct call to the prompt-compression service
    Compression,
    /// Direct call to the generation service
    Generation,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Backend => write!(f, "backend"),
            Stage::Compression => write!(f, "compression"),
            Stage::Generation => write!(f, "generation"),
        }
    }
}

// ============================================================================
// Request
// ============================================================================

/// Errors raised while building a [`ScheduleRequest`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    #[error("Please enter a valid ScaleDown API Key to proceed")]
    MissingCompressionKey,

    #[error("Please enter a valid Gemini API Key to proceed (required for schedule generation)")]
    MissingGenerationKey,

    #[error("Please enter a model ID")]
    MissingModel,
}

/// Raw inputs for one scheduling run.
///
/// Immutable once constructed; use [`ScheduleRequest::new`] to get the
/// non-emptiness checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRequest {
    calendar_text: String,
    preferences_text: String,
    compression_api_key: String,
    generation_api_key: String,
    model_id: String,
}

impl ScheduleRequest {
    /// Build a request, rejecting blank API keys.
    ///
    /// A blank `model_id` resolves to `default_model`; if that is blank too
    /// the request is rejected.
    pub fn new(
        calendar_text: impl Into<String>,
        preferences_text: impl Into<String>,
        compression_api_key: impl Into<String>,
        generation_api_key: impl Into<String>,
        model_id: impl Into<String>,
        default_model: &str,
    ) -> Result<Self, RequestError> {
        let compression_api_key = compression_api_key.into().trim().to_string();
        if compression_api_key.is_empty() {
            return Err(RequestError::MissingCompressionKey);
        }

        let generation_api_key = generation_api_key.into().trim().to_string();
        if generation_api_key.is_empty() {
            return Err(RequestError::MissingGenerationKey);
        }

        let mut model_id = model_id.into().trim().to_string();
        if model_id.is_empty() {
            model_id = default_model.trim().to_string();
        }
        if model_id.is_empty() {
            return Err(RequestError::MissingModel);
        }

        Ok(Self {
            calendar_text: calendar_text.into(),
            preferences_text: preferences_text.into(),
            compression_api_key,
            generation_api_key,
            model_id,
        })
    }

    pub fn calendar_text(&self) -> &str {
        &self.calendar_text
    }

    pub fn preferences_text(&self) -> &str {
        &self.preferences_text
    }

    pub fn compression_api_key(&self) -> &str {
        &self.compression_api_key
    }

    pub fn generation_api_key(&self) -> &str {
        &self.generation_api_key
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Combined size of calendar and preferences, in characters.
    pub fn raw_input_size(&self) -> usize {
        self.calendar_text.chars().count() + self.preferences_text.chars().count()
    }
}

// ============================================================================
// Result
// ============================================================================

/// Outcome marker carried in the result record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    Success,
    Error,
}

/// Which path produced the result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// The local backend ran the whole pipeline
    Backend,
    /// The compression and generation services were called directly
    Direct,
}

/// Size and latency figures for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineMetrics {
    pub raw_input_size: usize,
    pub compressed_input_size: usize,
    /// One decimal place with a trailing `%`; may be negative
    pub compression_ratio_percent: String,
    pub compression_latency_ms: f64,
    pub generation_latency_ms: f64,
    pub total_latency_ms: f64,
}

/// Unified result of a pipeline run, regardless of which path produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub status: PipelineStatus,
    pub mode: ExecutionMode,
    /// JSON-array-shaped text, repaired when possible, raw otherwise
    pub schedule: String,
    pub compressed_text: String,
    pub metrics: PipelineMetrics,
}

impl PipelineResult {
    /// Meeting options parsed from `schedule`, or `None` when the text is
    /// not a JSON array and must be shown raw.
    pub fn meeting_options(&self) -> Option<Vec<MeetingOption>> {
        crate::repair::parse_meeting_options(&self.schedule)
    }
}

// ============================================================================
// Meeting Option
// ============================================================================

/// One proposed meeting slot as returned by the generation service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MeetingOption {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(
        default,
        rename = "duration",
        deserialize_with = "deserialize_duration"
    )]
    pub duration_minutes: f64,
    #[serde(default)]
    pub reasoning: String,
}

/// Models sometimes quote numbers; accept `30`, `"30"` and `"30 minutes"`.
fn deserialize_duration<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) => s
            .split_whitespace()
            .next()
            .and_then(|tok| tok.parse::<f64>().ok())
            .unwrap_or(0.0),
        _ => 0.0,
    })
}

// ============================================================================
// Tests
// ============================================================================
