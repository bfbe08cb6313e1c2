//! Meeting Scheduler: calendar compression and LLM schedule generation
//!
//! Takes a calendar blob and a free-text preference statement and returns
//! proposed meeting slots.
//!
//! ## Architecture
//!
//! - **Pipeline Orchestrator**: tries the local backend, falls back to calling
//!   the compression and generation services directly, and measures latency
//!   of each stage
//! - **Response Repair**: strips markdown fences and closes truncated JSON
//!   returned by the generation service
//! - **Services**: HTTP clients for the backend, ScaleDown and Gemini
//! - **Config**: TOML endpoints, models and per-stage timeouts

pub mod config;
pub mod demo;
pub mod pipeline;
pub mod render;
pub mod repair;
pub mod services;
pub mod types;

pub use config::SchedulerConfig;

pub use pipeline::{PipelineError, PipelineOrchestrator, StageTimeouts};

pub use repair::{
    parse_meeting_options, repair, repair_with_outcome, strip_code_fences, RepairOutcome,
};

pub use types::{
    ExecutionMode, MeetingOption, PipelineMetrics, PipelineResult, PipelineStatus, RequestError,
    ScheduleRequest, Stage,
};
