//! ScaleDown compression client
//!
//! Sends the calendar as context and the preferences as the query, and pulls
//! the compressed text out of a loosely typed response body.

use super::{mask_key, CompressionService};
use crate::config::CompressionConfig;
use crate::pipeline::PipelineError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

/// HTTP client for the compression service
#[derive(Clone)]
pub struct ScaleDownClient {
    http: Client,
    url: String,
    target_model: String,
    rate: String,
}

impl ScaleDownClient {
    pub fn new(http: Client, config: &CompressionConfig) -> Self {
        Self {
            http,
            url: config.url.clone(),
            target_model: config.target_model.clone(),
            rate: config.rate.clone(),
        }
    }
}

#[derive(Serialize)]
struct CompressPayload<'a> {
    context: &'a str,
    prompt: String,
    model: &'a str,
    scaledown: RateOptions<'a>,
}

#[derive(Serialize)]
struct RateOptions<'a> {
    rate: &'a str,
}

/// Query sent alongside the calendar context
pub fn compression_prompt(preferences_text: &str) -> String {
    format!("Based on the context, schedule a meeting with these constraints: {preferences_text}")
}

fn non_empty_str<'a>(value: Option<&'a Value>) -> Option<&'a str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Compressed text from a response body.
///
/// Checks `results.compressed_prompt`, `compressed_prompt`, `compressed_text`
/// and `text` in that order; an unrecognized shape yields the serialized body.
pub fn extract_compressed_text(body: &Value) -> String {
    let found = non_empty_str(body.get("results").and_then(|r| r.get("compressed_prompt")))
        .or_else(|| non_empty_str(body.get("compressed_prompt")))
        .or_else(|| non_empty_str(body.get("compressed_text")))
        .or_else(|| non_empty_str(body.get("text")));

    match found {
        Some(text) => text.to_string(),
        None => {
            let keys: Vec<&str> = body
                .as_object()
                .map(|o| o.keys().map(String::as_str).collect())
                .unwrap_or_default();
            warn!(?keys, "ScaleDown: compressed text field missing, using whole body");
            body.to_string()
        }
    }
}

#[async_trait]
impl CompressionService for ScaleDownClient {
    async fn compress(
        &self,
        calendar_text: &str,
        preferences_text: &str,
        api_key: &str,
    ) -> Result<String, PipelineError> {
        info!(url = %self.url, key = %mask_key(api_key), "ScaleDown: sending compression request");

        let payload = CompressPayload {
            context: calendar_text,
            prompt: compression_prompt(preferences_text),
            model: &self.target_model,
            scaledown: RateOptions { rate: &self.rate },
        };

        let resp = self
            .http
            .post(&self.url)
            .header("x-api-key", api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| PipelineError::CompressionTransport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PipelineError::CompressionService {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| PipelineError::CompressionTransport(format!("Invalid response body: {e}")))?;

        Ok(extract_compressed_text(&body))
    }
}
