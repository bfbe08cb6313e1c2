//! Response Repair & Normalizer
//!
//! Generation responses are expected to be a JSON array but arrive wrapped in
//! markdown fences or cut off mid-string when the model hits its output limit.
//! These functions turn "almost JSON" into JSON without ever failing: the worst
//! case is getting the cleaned input back.
//!
//! The truncation heuristic assumes the cut happens inside a string value that
//! is the last token emitted, and that nesting depth is recoverable from the
//! bracket-count imbalance alone. Brackets that close in the wrong relative
//! order are not rebalanced.

use crate::types::MeetingOption;
use regex::Regex;
use std::sync::OnceLock;
use tracing::{info, warn};

/// What [`repair_with_outcome`] had to do to the text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairOutcome {
    /// Parsed as-is after fence stripping
    AlreadyValid,
    /// Closing quote/braces/brackets were appended and the result parses
    Repaired,
    /// Nothing worked; the cleaned text is returned unchanged
    Exhausted,
}

/// Opening or closing fence: three backticks plus an optional language tag.
fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"```[A-Za-z0-9_+-]*[ \t]*\n?").expect("fence regex is valid"))
}

/// Trim the text and, if it opens with a fence marker, remove every fence
/// marker in it.
pub fn strip_code_fences(raw: &str) -> String {
    let trimmed = raw.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }
    fence_regex().replace_all(trimmed, "").trim().to_string()
}

fn is_valid_json(text: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(text).is_ok()
}

/// Last character looks like the middle of a plain string value.
fn ends_mid_content(text: &str) -> bool {
    text.chars().last().is_some_and(|c| {
        c.is_ascii_alphanumeric() || matches!(c, '.' | ',' | '!' | '?' | ' ')
    })
}

/// Append the closers a truncated string/object/array needs.
///
/// Returns `None` when the tail does not look like a cut-off string value.
fn close_truncated(text: &str) -> Option<String> {
    if !(text.ends_with('"') || ends_mid_content(text)) {
        return None;
    }

    let count = |c: char| text.chars().filter(|&x| x == c).count();
    let missing_braces = count('{').saturating_sub(count('}'));
    let missing_brackets = count('[').saturating_sub(count(']'));

    let mut fixed = String::with_capacity(text.len() + 1 + missing_braces + missing_brackets);
    fixed.push_str(text);
    if !fixed.ends_with('"') {
        fixed.push('"');
    }
    fixed.extend(std::iter::repeat('}').take(missing_braces));
    fixed.extend(std::iter::repeat(']').take(missing_brackets));
    Some(fixed)
}

/// Clean and, if needed, repair a generation response.
pub fn repair_with_outcome(raw: &str) -> (String, RepairOutcome) {
    let cleaned = strip_code_fences(raw);

    if is_valid_json(&cleaned) {
        return (cleaned, RepairOutcome::AlreadyValid);
    }

    warn!(len = cleaned.len(), "Generation JSON needs repair, attempting fix");

    match close_truncated(&cleaned) {
        Some(fixed) if is_valid_json(&fixed) => {
            info!("JSON repair successful");
            (fixed, RepairOutcome::Repaired)
        }
        _ => {
            warn!("JSON repair failed, returning cleaned text");
            (cleaned, RepairOutcome::Exhausted)
        }
    }
}

/// Best-effort repair; never fails, never returns something worse than the
/// fence-stripped input.
pub fn repair(raw: &str) -> String {
    repair_with_outcome(raw).0
}

/// Parse a schedule into meeting options.
///
/// Returns `None` when the text is not a JSON array, in which case callers
/// display the raw text instead.
pub fn parse_meeting_options(schedule: &str) -> Option<Vec<MeetingOption>> {
    let cleaned = strip_code_fences(schedule);
    if cleaned.is_empty() {
        return None;
    }
    match serde_json::from_str::<Vec<MeetingOption>>(&cleaned) {
        Ok(options) => Some(options),
        Err(e) => {
            tracing::debug!(error = %e, "Schedule is not a meeting array");
            None
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
