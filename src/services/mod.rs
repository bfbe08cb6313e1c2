//! External service clients
//!
//! One client per collaborator, each behind an async trait so the
//! orchestrator can be driven by test doubles:
//!
//! - **BackendClient**: local `/optimize` endpoint that runs the whole pipeline
//! - **ScaleDownClient**: prompt-compression service
//! - **GeminiClient**: generation service

mod backend;
mod gemini;
mod scaledown;

pub use backend::{normalize_backend_response, BackendClient};
pub use gemini::{build_generation_prompt, extract_candidate_text, GeminiClient, GenerateResponse};
pub use scaledown::{compression_prompt, extract_compressed_text, ScaleDownClient};

use crate::pipeline::PipelineError;
use crate::types::{PipelineResult, ScheduleRequest};
use async_trait::async_trait;

/// Local backend that runs compression and generation server-side
#[async_trait]
pub trait ScheduleBackend: Send + Sync {
    /// Run the full pipeline remotely and return the normalized result
    async fn optimize(&self, request: &ScheduleRequest) -> Result<PipelineResult, PipelineError>;
}

/// Prompt-compression service
#[async_trait]
pub trait CompressionService: Send + Sync {
    /// Compress the calendar context for a downstream model
    async fn compress(
        &self,
        calendar_text: &str,
        preferences_text: &str,
        api_key: &str,
    ) -> Result<String, PipelineError>;
}

/// LLM generation service
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Generate the raw (unrepaired) schedule text
    async fn generate(
        &self,
        compressed_text: &str,
        preferences_text: &str,
        api_key: &str,
        model: &str,
    ) -> Result<String, PipelineError>;
}

/// Key suitable for logs: only the last four characters survive.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 4 {
        return "...".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("...{tail}")
}
