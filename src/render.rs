//! Plain-text rendering of a pipeline result
//!
//! Metrics first, then the compressed context, then one card per meeting
//! option. A schedule that is not a JSON array is printed as-is.

use crate::types::{ExecutionMode, MeetingOption, PipelineResult};
use std::fmt::Write;

const RULE: &str = "────────────────────────────────────────────────────────";

/// One meeting option as a text card; `index` is zero-based.
pub fn render_card(option: &MeetingOption, index: usize) -> String {
    let title = if option.title.trim().is_empty() {
        format!("Option {}", index + 1)
    } else {
        option.title.clone()
    };

    let mut out = String::new();
    let _ = writeln!(out, "┌ {title}");
    if !option.date.is_empty() {
        let _ = writeln!(out, "│ Date:     {}", option.date);
    }
    if !option.time.is_empty() {
        let _ = writeln!(out, "│ Time:     {}", option.time);
    }
    if option.duration_minutes > 0.0 {
        let _ = writeln!(out, "│ Duration: {} min", option.duration_minutes);
    }
    if !option.reasoning.is_empty() {
        let _ = writeln!(out, "│ Why:      {}", option.reasoning);
    }
    out.push_str("└\n");
    out
}

/// Full report for the terminal.
pub fn render_result(result: &PipelineResult) -> String {
    let m = &result.metrics;
    let mut out = String::new();

    if result.mode == ExecutionMode::Direct {
        out.push_str("Running via direct API mode (no backend)\n\n");
    }

    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "Original size:    {} chars", m.raw_input_size);
    let _ = writeln!(out, "Compressed size:  {} chars", m.compressed_input_size);
    let _ = writeln!(out, "Reduction:        {}", m.compression_ratio_percent);
    let _ = writeln!(
        out,
        "Latency:          {:.0} ms compression + {:.0} ms generation = {:.0} ms",
        m.compression_latency_ms, m.generation_latency_ms, m.total_latency_ms
    );
    let _ = writeln!(out, "{RULE}");

    out.push_str("\nCompressed context:\n");
    if result.compressed_text.is_empty() {
        out.push_str("Error: No compressed text returned.\n");
    } else {
        let _ = writeln!(out, "{}", result.compressed_text);
    }

    if result.schedule.trim().is_empty() {
        return out;
    }

    out.push_str("\nProposed meetings:\n");
    match result.meeting_options() {
        Some(options) if !options.is_empty() => {
            for (i, option) in options.iter().enumerate() {
                out.push_str(&render_card(option, i));
            }
        }
        _ => {
            let _ = writeln!(out, "{}", result.schedule);
        }
    }

    out
}
