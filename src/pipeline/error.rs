//! Pipeline error taxonomy
//!
//! Every variant knows which [`Stage`] produced it, so callers can branch on
//! the failing stage without matching on message text.

use crate::types::Stage;
use thiserror::Error;

/// Errors from any stage of the scheduling pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Backend unreachable, non-2xx, undecodable or timed out.
    /// Converted into the direct fallback path, never surfaced.
    #[error("Backend unavailable: {reason}")]
    BackendUnavailable { reason: String },

    /// Backend answered 4xx and client errors are configured as fatal
    #[error("Backend rejected request ({status}): {message}")]
    BackendRejected { status: u16, message: String },

    /// Compression service answered non-2xx
    #[error("ScaleDown API Error: {status} - {status_text}")]
    CompressionService { status: u16, status_text: String },

    /// Compression service could not be reached or its body was unreadable
    #[error("ScaleDown connection failed: {0}")]
    CompressionTransport(String),

    /// Generation service answered non-2xx
    #[error("Gemini API Error ({status}): {message}")]
    GenerationService { status: u16, message: String },

    /// Generation service could not be reached or its body was unreadable
    #[error("Gemini connection failed: {0}")]
    GenerationTransport(String),

    /// No `candidates[0].content.parts[0].text` in the generation response
    #[error("Gemini returned empty response")]
    EmptyGenerationResponse,

    /// Stage exceeded its configured time limit
    #[error("{stage} stage timed out after {ms} ms")]
    Timeout { stage: Stage, ms: u64 },

    /// Run was cancelled while this stage was in flight
    #[error("{stage} stage cancelled")]
    Cancelled { stage: Stage },

    /// HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

impl PipelineError {
    /// Stage this error belongs to
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::BackendUnavailable { .. } | PipelineError::BackendRejected { .. } => {
                Stage::Backend
            }
            PipelineError::CompressionService { .. } | PipelineError::CompressionTransport(_) => {
                Stage::Compression
            }
            PipelineError::GenerationService { .. }
            | PipelineError::GenerationTransport(_)
            | PipelineError::EmptyGenerationResponse => Stage::Generation,
            PipelineError::Timeout { stage, .. } | PipelineError::Cancelled { stage } => *stage,
            PipelineError::HttpClient(_) => Stage::Backend,
        }
    }

    /// Whether the error ends the run instead of triggering fallback.
    ///
    /// Only backend failures are recoverable; a backend timeout counts as
    /// unavailability.
    pub fn is_fatal(&self) -> bool {
        match self {
            PipelineError::BackendUnavailable { .. } => false,
            PipelineError::Timeout { stage, .. } => *stage != Stage::Backend,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_status() {
        let e = PipelineError::CompressionService {
            status: 401,
            status_text: "Unauthorized".to_string(),
        };
        assert_eq!(e.to_string(), "ScaleDown API Error: 401 - Unauthorized");

        let e = PipelineError::GenerationService {
            status: 400,
            message: "API key not valid".to_string(),
        };
        assert_eq!(e.to_string(), "Gemini API Error (400): API key not valid");
    }

    #[test]
    fn test_stage_tagging() {
        assert_eq!(PipelineError::EmptyGenerationResponse.stage(), Stage::Generation);
        assert_eq!(
            PipelineError::CompressionTransport("refused".into()).stage(),
            Stage::Compression
        );
        assert_eq!(
            PipelineError::Timeout { stage: Stage::Generation, ms: 5000 }.stage(),
            Stage::Generation
        );
    }

    #[test]
    fn test_fatality() {
        assert!(!PipelineError::BackendUnavailable { reason: "down".into() }.is_fatal());
        assert!(!PipelineError::Timeout { stage: Stage::Backend, ms: 1000 }.is_fatal());
        assert!(PipelineError::Timeout { stage: Stage::Compression, ms: 1000 }.is_fatal());
        assert!(PipelineError::BackendRejected { status: 422, message: String::new() }.is_fatal());
        assert!(PipelineError::Cancelled { stage: Stage::Backend }.is_fatal());
        assert!(PipelineError::EmptyGenerationResponse.is_fatal());
    }

    #[test]
    fn test_timeout_message_keeps_sub_second_limits() {
        let e = PipelineError::Timeout { stage: Stage::Compression, ms: 50 };
        assert_eq!(e.to_string(), "compression stage timed out after 50 ms");
    }
}
