//! Pipeline Orchestrator
//!
//! Runs one scheduling request through the stage sequence:
//!
//! 1. **Backend**: local `/optimize`. Any failure (network, non-2xx, timeout,
//!    undecodable body) silently switches to the direct path.
//! 2. **Compression**: direct compression call. Failure is fatal.
//! 3. **Generation**: direct generation call on the compressed text, followed
//!    by JSON repair of the answer. Failure is fatal.
//!
//! Stages run strictly one after another because each feeds the next. Every
//! stage is bounded by its configured timeout, and a cancelled token stops the
//! in-flight stage and keeps later stages from starting.

use super::error::PipelineError;
use super::metrics::{compression_ratio_percent, StageTimer};
use crate::config::SchedulerConfig;
use crate::repair::{repair_with_outcome, RepairOutcome};
use crate::services::{
    mask_key, BackendClient, CompressionService, GeminiClient, GenerationService,
    ScaleDownClient, ScheduleBackend,
};
use crate::types::{
    ExecutionMode, PipelineMetrics, PipelineResult, PipelineStatus, ScheduleRequest, Stage,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Connect timeout shared by all service clients
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Time limit per stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTimeouts {
    pub backend: Duration,
    pub compression: Duration,
    pub generation: Duration,
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            backend: Duration::from_secs(30),
            compression: Duration::from_secs(30),
            generation: Duration::from_secs(60),
        }
    }
}

impl StageTimeouts {
    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self {
            backend: config.backend.timeout(),
            compression: config.compression.timeout(),
            generation: config.generation.timeout(),
        }
    }
}

/// Backend-first pipeline with direct-call fallback.
///
/// Holds no per-run state: concurrent runs on one orchestrator are fully
/// independent of each other.
pub struct PipelineOrchestrator {
    backend: Option<Arc<dyn ScheduleBackend>>,
    compressor: Arc<dyn CompressionService>,
    generator: Arc<dyn GenerationService>,
    timeouts: StageTimeouts,
}

impl PipelineOrchestrator {
    /// Assemble from explicit stage implementations. `backend = None` skips
    /// straight to the direct path.
    pub fn new(
        backend: Option<Arc<dyn ScheduleBackend>>,
        compressor: Arc<dyn CompressionService>,
        generator: Arc<dyn GenerationService>,
        timeouts: StageTimeouts,
    ) -> Self {
        Self {
            backend,
            compressor,
            generator,
            timeouts,
        }
    }

    /// Build the HTTP-backed stages from configuration.
    pub fn from_config(config: &SchedulerConfig) -> Result<Self, PipelineError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(concat!("meeting-scheduler/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PipelineError::HttpClient(e.to_string()))?;

        let backend: Option<Arc<dyn ScheduleBackend>> = if config.backend.enabled {
            Some(Arc::new(BackendClient::new(http.clone(), &config.backend)))
        } else {
            info!("Backend stage disabled, using direct API mode only");
            None
        };

        Ok(Self::new(
            backend,
            Arc::new(ScaleDownClient::new(http.clone(), &config.compression)),
            Arc::new(GeminiClient::new(http, &config.generation)),
            StageTimeouts::from_config(config),
        ))
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    /// Run the pipeline to completion.
    pub async fn run(&self, request: &ScheduleRequest) -> Result<PipelineResult, PipelineError> {
        self.run_with_cancel(request, &CancellationToken::new()).await
    }

    /// Run the pipeline, aborting as soon as `cancel` fires.
    pub async fn run_with_cancel(
        &self,
        request: &ScheduleRequest,
        cancel: &CancellationToken,
    ) -> Result<PipelineResult, PipelineError> {
        if let Some(backend) = &self.backend {
            let attempt = guarded(
                Stage::Backend,
                self.timeouts.backend,
                cancel,
                backend.optimize(request),
            )
            .await;

            match attempt {
                Ok(result) => {
                    info!(
                        ratio = %result.metrics.compression_ratio_percent,
                        total_ms = result.metrics.total_latency_ms,
                        "Schedule produced by backend"
                    );
                    return Ok(result);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(error = %e, "Backend unreachable, trying direct API calls");
                }
            }
        }

        self.run_direct(request, cancel).await
    }

    /// Compression then generation, called directly.
    async fn run_direct(
        &self,
        request: &ScheduleRequest,
        cancel: &CancellationToken,
    ) -> Result<PipelineResult, PipelineError> {
        let raw_input_size = request.raw_input_size();

        // Stage 1: compression
        let timer = StageTimer::start();
        let compressed_text = guarded(
            Stage::Compression,
            self.timeouts.compression,
            cancel,
            self.compressor.compress(
                request.calendar_text(),
                request.preferences_text(),
                request.compression_api_key(),
            ),
        )
        .await?;
        let compression_latency_ms = timer.elapsed_ms();

        let compressed_input_size = compressed_text.chars().count();
        let compression_ratio_percent =
            compression_ratio_percent(raw_input_size, compressed_input_size);
        info!(
            raw = raw_input_size,
            compressed = compressed_input_size,
            ratio = %compression_ratio_percent,
            latency_ms = compression_latency_ms,
            "Compression complete"
        );

        // Stage 2: generation
        info!(
            model = %request.model_id(),
            key = %mask_key(request.generation_api_key()),
            "Requesting schedule generation"
        );
        let timer = StageTimer::start();
        let raw_schedule = guarded(
            Stage::Generation,
            self.timeouts.generation,
            cancel,
            self.generator.generate(
                &compressed_text,
                request.preferences_text(),
                request.generation_api_key(),
                request.model_id(),
            ),
        )
        .await?;
        let generation_latency_ms = timer.elapsed_ms();
        info!(latency_ms = generation_latency_ms, "Generation complete");

        let (schedule, outcome) = repair_with_outcome(&raw_schedule);
        if outcome == RepairOutcome::Exhausted {
            warn!("Schedule is not valid JSON, it will be shown as raw text");
        }

        Ok(PipelineResult {
            status: PipelineStatus::Success,
            mode: ExecutionMode::Direct,
            schedule,
            compressed_text,
            metrics: PipelineMetrics {
                raw_input_size,
                compressed_input_size,
                compression_ratio_percent,
                compression_latency_ms,
                generation_latency_ms,
                total_latency_ms: compression_latency_ms + generation_latency_ms,
            },
        })
    }
}

/// Run one stage under its time limit and the run's cancellation token.
async fn guarded<T, F>(
    stage: Stage,
    limit: Duration,
    cancel: &CancellationToken,
    fut: F,
) -> Result<T, PipelineError>
where
    F: Future<Output = Result<T, PipelineError>>,
{
    if cancel.is_cancelled() {
        return Err(PipelineError::Cancelled { stage });
    }

    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(PipelineError::Cancelled { stage }),
        outcome = tokio::time::timeout(limit, fut) => match outcome {
            Ok(result) => result,
            Err(_) => Err(PipelineError::Timeout {
                stage,
                ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
            }),
        },
    }
}

// ============================================================================
// Tests
// ============================================================================
