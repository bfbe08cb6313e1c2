//! Local backend client
//!
//! The backend runs compression and generation server-side and answers with
//! its own field names. Everything it returns is mapped into the same
//! [`PipelineResult`] shape the direct path produces.

use super::{mask_key, ScheduleBackend};
use crate::config::BackendConfig;
use crate::pipeline::metrics::{compression_ratio_percent, fraction_to_percent};
use crate::pipeline::PipelineError;
use crate::repair::repair;
use crate::types::{
    ExecutionMode, PipelineMetrics, PipelineResult, PipelineStatus, ScheduleRequest,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// HTTP client for `POST {base_url}/optimize`
#[derive(Clone)]
pub struct BackendClient {
    http: Client,
    base_url: String,
    client_errors_fatal: bool,
}

impl BackendClient {
    pub fn new(http: Client, config: &BackendConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client_errors_fatal: config.client_errors_fatal,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[derive(Serialize)]
struct OptimizePayload<'a> {
    calendar_text: &'a str,
    preferences_text: &'a str,
    api_key: &'a str,
    gemini_api_key: &'a str,
    gemini_model: &'a str,
}

/// Number that may arrive as a JSON number or a numeric string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Loose {
    Number(f64),
    Text(String),
}

impl Loose {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Loose::Number(n) => Some(*n),
            Loose::Text(s) => s.trim().trim_end_matches('%').trim().parse().ok(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct BackendMetrics {
    raw_input_size: Option<Loose>,
    compressed_input_size: Option<Loose>,
    compression_ratio: Option<Loose>,
    compression_latency_ms: Option<Loose>,
    generation_latency_ms: Option<Loose>,
    total_pipeline_ms: Option<Loose>,
}

#[derive(Debug, Deserialize)]
struct OptimizeResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    schedule: Option<String>,
    #[serde(default)]
    compressed_text: Option<String>,
    #[serde(default)]
    metrics: Option<BackendMetrics>,
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn loose_size(value: Option<&Loose>) -> Option<usize> {
    value
        .and_then(Loose::as_f64)
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n as usize)
}

fn loose_ms(value: Option<&Loose>) -> Option<f64> {
    value.and_then(Loose::as_f64).filter(|n| n.is_finite())
}

/// Map a backend response body into the internal result shape.
///
/// Missing sizes are recomputed from the request and compressed text; a
/// numeric `compression_ratio` is a fraction, a string one is used verbatim.
/// A body with `status: "error"` or that is not an object counts as the
/// backend being unavailable.
pub fn normalize_backend_response(
    body: serde_json::Value,
    request: &ScheduleRequest,
) -> Result<PipelineResult, PipelineError> {
    let response: OptimizeResponse =
        serde_json::from_value(body).map_err(|e| PipelineError::BackendUnavailable {
            reason: format!("Unexpected response shape: {e}"),
        })?;

    if response.status.as_deref().is_some_and(|s| s.eq_ignore_ascii_case("error")) {
        return Err(PipelineError::BackendUnavailable {
            reason: "Backend reported status \"error\"".to_string(),
        });
    }

    let compressed_text = response.compressed_text.unwrap_or_default();
    let schedule = repair(response.schedule.as_deref().unwrap_or_default());
    let m = response.metrics.unwrap_or_default();

    let raw_input_size =
        loose_size(m.raw_input_size.as_ref()).unwrap_or_else(|| request.raw_input_size());
    let compressed_input_size = loose_size(m.compressed_input_size.as_ref())
        .unwrap_or_else(|| compressed_text.chars().count());

    let compression_ratio_percent = match m.compression_ratio {
        Some(Loose::Text(s)) => s,
        Some(Loose::Number(fraction)) => fraction_to_percent(fraction),
        None => compression_ratio_percent(raw_input_size, compressed_input_size),
    };

    let compression_latency_ms = loose_ms(m.compression_latency_ms.as_ref()).unwrap_or(0.0);
    let generation_latency_ms = loose_ms(m.generation_latency_ms.as_ref()).unwrap_or(0.0);
    let total_latency_ms = loose_ms(m.total_pipeline_ms.as_ref())
        .unwrap_or(compression_latency_ms + generation_latency_ms);

    Ok(PipelineResult {
        status: PipelineStatus::Success,
        mode: ExecutionMode::Backend,
        schedule,
        compressed_text,
        metrics: PipelineMetrics {
            raw_input_size,
            compressed_input_size,
            compression_ratio_percent,
            compression_latency_ms,
            generation_latency_ms,
            total_latency_ms,
        },
    })
}

/// Pull a human-readable reason out of an error body (`{"detail": ...}`)
fn error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[async_trait]
impl ScheduleBackend for BackendClient {
    async fn optimize(&self, request: &ScheduleRequest) -> Result<PipelineResult, PipelineError> {
        let url = format!("{}/optimize", self.base_url);
        info!(
            url = %url,
            model = %request.model_id(),
            key = %mask_key(request.compression_api_key()),
            "Sending optimization request to backend"
        );

        let payload = OptimizePayload {
            calendar_text: request.calendar_text(),
            preferences_text: request.preferences_text(),
            api_key: request.compression_api_key(),
            gemini_api_key: request.generation_api_key(),
            gemini_model: request.model_id(),
        };

        let resp = self
            .http
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| PipelineError::BackendUnavailable {
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("Unknown").to_string();
            if self.client_errors_fatal && status.is_client_error() {
                let body = resp.text().await.unwrap_or_default();
                return Err(PipelineError::BackendRejected {
                    status: status.as_u16(),
                    message: error_detail(&body).unwrap_or(reason),
                });
            }
            return Err(PipelineError::BackendUnavailable {
                reason: format!("Server Error: {} {reason}", status.as_u16()),
            });
        }

        let body: serde_json::Value =
            resp.json()
                .await
                .map_err(|e| PipelineError::BackendUnavailable {
                    reason: format!("Invalid response body: {e}"),
                })?;
        debug!("Backend response received, normalizing");

        normalize_backend_response(body, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> ScheduleRequest {
        ScheduleRequest::new("MONDAY 9-10 Sync", "Avoid Tuesday", "sd", "gm", "gemini-2.5-flash", "")
            .unwrap()
    }

    #[test]
    fn test_normalize_full_backend_body() {
        let body = json!({
            "status": "success",
            "schedule": "```json\n[{\"title\":\"Sync\"}]\n```",
            "compressed_text": "CONTEXT: Mon 9-10",
            "metrics": {
                "raw_input_size": 200,
                "compressed_input_size": 50,
                "compression_ratio": "75.0%",
                "compression_latency_ms": 120.5,
                "generation_latency_ms": 800.25,
                "total_pipeline_ms": 920.75,
                "speedup_factor": "1.2x"
            }
        });
        let result = normalize_backend_response(body, &request()).unwrap();
        assert_eq!(result.mode, ExecutionMode::Backend);
        assert_eq!(result.status, PipelineStatus::Success);
        assert_eq!(result.schedule, r#"[{"title":"Sync"}]"#);
        assert_eq!(result.compressed_text, "CONTEXT: Mon 9-10");
        assert_eq!(result.metrics.raw_input_size, 200);
        assert_eq!(result.metrics.compressed_input_size, 50);
        assert_eq!(result.metrics.compression_ratio_percent, "75.0%");
        assert_eq!(result.metrics.total_latency_ms, 920.75);
    }

    #[test]
    fn test_numeric_ratio_is_a_fraction() {
        let body = json!({
            "schedule": "[]",
            "compressed_text": "x",
            "metrics": { "compression_ratio": 0.425 }
        });
        let result = normalize_backend_response(body, &request()).unwrap();
        assert_eq!(result.metrics.compression_ratio_percent, "42.5%");
    }

    #[test]
    fn test_missing_metrics_are_recomputed() {
        let body = json!({ "schedule": "[]", "compressed_text": "abcd" });
        let req = request();
        let result = normalize_backend_response(body, &req).unwrap();
        assert_eq!(result.metrics.raw_input_size, req.raw_input_size());
        assert_eq!(result.metrics.compressed_input_size, 4);
        assert_eq!(result.metrics.total_latency_ms, 0.0);
    }

    #[test]
    fn test_string_latencies_accepted() {
        let body = json!({
            "schedule": "[]",
            "compressed_text": "",
            "metrics": { "compression_latency_ms": "100", "generation_latency_ms": "250" }
        });
        let result = normalize_backend_response(body, &request()).unwrap();
        assert_eq!(result.metrics.compression_latency_ms, 100.0);
        assert_eq!(result.metrics.total_latency_ms, 350.0);
    }

    #[test]
    fn test_error_status_means_unavailable() {
        let body = json!({ "status": "error", "schedule": "" });
        let err = normalize_backend_response(body, &request()).unwrap_err();
        assert!(matches!(err, PipelineError::BackendUnavailable { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_non_object_body_means_unavailable() {
        let err = normalize_backend_response(json!([1, 2]), &request()).unwrap_err();
        assert!(matches!(err, PipelineError::BackendUnavailable { .. }));
    }

    #[test]
    fn test_error_detail_extraction() {
        assert_eq!(
            error_detail(r#"{"detail":"field required"}"#).as_deref(),
            Some("field required")
        );
        assert!(error_detail("<html>").is_none());
    }
}
