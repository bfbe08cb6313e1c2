//! Gemini generation client
//!
//! Builds the scheduling prompt from the compressed calendar and the user's
//! preferences and returns the first candidate's text untouched. Repair of the
//! returned JSON happens in the orchestrator.

use super::{mask_key, GenerationService};
use crate::config::GenerationConfig;
use crate::pipeline::PipelineError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

/// HTTP client for `models/{model}:generateContent`
#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    base_url: String,
    temperature: f32,
    max_output_tokens: u32,
    thinking_budget: i32,
}

impl GeminiClient {
    pub fn new(http: Client, config: &GenerationConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            thinking_budget: config.thinking_budget,
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationParams,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<TextPart>,
}

#[derive(Serialize)]
struct TextPart {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationParams {
    temperature: f32,
    max_output_tokens: u32,
    thinking_config: ThinkingConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: i32,
}

/// Subset of the generateContent response we read
#[derive(Debug, Default, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Option<Vec<ResponsePart>>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

// ============================================================================
// Prompt & Extraction
// ============================================================================

/// Prompt asking for exactly three options as a bare JSON array.
pub fn build_generation_prompt(compressed_text: &str, preferences_text: &str) -> String {
    format!(
        "You are an expert meeting scheduler.
Based on the following compressed calendar context and user preferences, propose 3 optimal meeting times.

COMPRESSED CALENDAR CONTEXT:
{compressed_text}

USER PREFERENCES:
{preferences_text}

OUTPUT FORMAT (JSON ONLY):
Return a valid JSON array with exactly 3 meeting options. Each option must have:
- \"title\": Short title (max 5 words)
- \"date\": Day name from the calendar (e.g., \"Monday\", \"Tuesday\")
- \"time\": Time range (e.g., \"10:00 AM - 11:00 AM\")
- \"duration\": Duration in minutes (number)
- \"reasoning\": One sentence, max 15 words, explaining why this slot works

Keep the entire response under 500 characters. Return ONLY the JSON array. No markdown, no code fences, no extra text."
    )
}

/// `candidates[0].content.parts[0].text`, or `EmptyGenerationResponse`.
pub fn extract_candidate_text(response: &GenerateResponse) -> Result<String, PipelineError> {
    response
        .candidates
        .as_ref()
        .and_then(|c| c.first())
        .and_then(|c| c.content.as_ref())
        .and_then(|c| c.parts.as_ref())
        .and_then(|p| p.first())
        .and_then(|p| p.text.as_ref())
        .filter(|t| !t.is_empty())
        .cloned()
        .ok_or(PipelineError::EmptyGenerationResponse)
}

/// `error.message` from a failed call's body, if any
fn service_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("message")?
        .as_str()
        .map(str::to_string)
}

#[async_trait]
impl GenerationService for GeminiClient {
    async fn generate(
        &self,
        compressed_text: &str,
        preferences_text: &str,
        api_key: &str,
        model: &str,
    ) -> Result<String, PipelineError> {
        info!(model = %model, key = %mask_key(api_key), "Calling Gemini generation API");

        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![TextPart {
                    text: build_generation_prompt(compressed_text, preferences_text),
                }],
            }],
            generation_config: GenerationParams {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
                thinking_config: ThinkingConfig {
                    thinking_budget: self.thinking_budget,
                },
            },
        };

        let resp = self
            .http
            .post(self.endpoint(model))
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::GenerationTransport(e.without_url().to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let message = service_error_message(&text)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown").to_string());
            return Err(PipelineError::GenerationService {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateResponse = resp.json().await.map_err(|e| {
            PipelineError::GenerationTransport(format!("Invalid response body: {}", e.without_url()))
        })?;

        extract_candidate_text(&parsed)
    }
}
