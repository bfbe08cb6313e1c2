//! Meeting Scheduler CLI
//!
//! Proposes meeting slots from a calendar dump and a preference statement.
//!
//! # Usage
//!
//! ```bash
//! # Built-in demo calendar and preferences
//! meeting-scheduler --demo
//!
//! # Your own inputs, printed as JSON
//! meeting-scheduler --calendar week.txt --preferences prefs.txt --json
//!
//! # Skip the local backend entirely
//! meeting-scheduler --demo --no-backend
//! ```
//!
//! # Environment Variables
//!
//! - `SCALEDOWN_API_KEY`: compression service key (also read from `.env`)
//! - `GEMINI_API_KEY`: generation service key (also read from `.env`)
//! - `GEMINI_MODEL`: model id (default: `generation.default_model`)
//! - `SCHEDULER_CONFIG`: path to a TOML config file
//! - `SCHEDULER_BACKEND_URL`: backend base URL override
//! - `RUST_LOG`: logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use meeting_scheduler::demo::{DEMO_CALENDAR, DEMO_PREFERENCES};
use meeting_scheduler::render::render_result;
use meeting_scheduler::{PipelineOrchestrator, ScheduleRequest, SchedulerConfig};
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "meeting-scheduler")]
#[command(about = "Propose meeting slots from a calendar and scheduling preferences")]
#[command(version)]
struct CliArgs {
    /// Text file with the calendar to schedule around
    #[arg(long, value_name = "FILE", required_unless_present = "demo")]
    calendar: Option<PathBuf>,

    /// Text file with the scheduling preferences
    #[arg(long, value_name = "FILE", required_unless_present = "demo")]
    preferences: Option<PathBuf>,

    /// Use the built-in demo calendar and preferences for missing inputs
    #[arg(long)]
    demo: bool,

    /// ScaleDown API key
    #[arg(long, env = "SCALEDOWN_API_KEY", hide_env_values = true, default_value = "")]
    scaledown_key: String,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, default_value = "")]
    gemini_key: String,

    /// Gemini model id (blank = configured default)
    #[arg(long, env = "GEMINI_MODEL", default_value = "")]
    model: String,

    /// Path to a TOML config file (overrides SCHEDULER_CONFIG)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Call the compression and generation services directly
    #[arg(long)]
    no_backend: bool,

    /// Print the result as JSON instead of cards
    #[arg(long)]
    json: bool,
}

fn read_input(path: Option<&Path>, demo: &str, what: &str) -> Result<String> {
    match path {
        Some(p) => std::fs::read_to_string(p)
            .with_context(|| format!("Failed to read {what} from {}", p.display())),
        None => Ok(demo.to_string()),
    }
}

fn load_config(args: &CliArgs) -> Result<SchedulerConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let mut config = SchedulerConfig::load_from_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?;
            config.apply_env_overrides();
            config
        }
        None => SchedulerConfig::load(),
    };
    if args.no_backend {
        config.backend.enabled = false;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Missing .env is fine; keys may come from the environment or flags
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();
    let config = load_config(&args)?;

    let calendar = read_input(args.calendar.as_deref(), DEMO_CALENDAR, "calendar")?;
    let preferences = read_input(args.preferences.as_deref(), DEMO_PREFERENCES, "preferences")?;

    let request = ScheduleRequest::new(
        calendar,
        preferences,
        &args.scaledown_key,
        &args.gemini_key,
        &args.model,
        &config.generation.default_model,
    )?;
    info!(
        chars = request.raw_input_size(),
        model = %request.model_id(),
        "Scheduling request ready"
    );

    let orchestrator = PipelineOrchestrator::from_config(&config)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling pipeline");
            on_interrupt.cancel();
        }
    });

    let result = orchestrator.run_with_cancel(&request, &cancel).await?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).context("Failed to serialize result")?
        );
    } else {
        print!("{}", render_result(&result));
    }

    Ok(())
}
