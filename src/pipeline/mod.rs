//! Scheduling Pipeline
//!
//! Backend-first orchestration with a direct compression → generation
//! fallback, plus the metrics and error taxonomy it reports.

mod error;
pub mod metrics;
mod orchestrator;

pub use error::PipelineError;
pub use orchestrator::{PipelineOrchestrator, StageTimeouts};
