//! Scheduler Configuration Module
//!
//! Endpoints, model settings and per-stage timeouts loaded from TOML.
//!
//! ## Loading Order
//!
//! 1. `SCHEDULER_CONFIG` environment variable (path to TOML file)
//! 2. `scheduler_config.toml` in the current working directory
//! 3. Built-in defaults (production endpoints)
//!
//! `SCHEDULER_BACKEND_URL` then overrides `backend.base_url`.
//!
//! ```ignore
//! let config = SchedulerConfig::load();
//! let orchestrator = PipelineOrchestrator::from_config(&config)?;
//! ```

mod scheduler_config;
pub mod validation;

pub use scheduler_config::*;
