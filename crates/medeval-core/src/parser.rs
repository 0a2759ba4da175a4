//! Parsing boundary for raw model output.
//!
//! This is the one place in the system where untrusted free-form LLM text
//! becomes typed domain data, so the policy is spelled out here:
//!
//! - The severity label is accepted anywhere in the response, not only on
//!   the first line. The prompts ask for a label-only first line, but models
//!   routinely pad their answers; the lenient whole-word scan keeps the
//!   classification recoverable in that case. First match wins.
//! - No label at all defaults to `NINGUNA`. Parse failure never escalates.

use lazy_static::lazy_static;
use regex::Regex;

use crate::types::Severity;

lazy_static! {
    /// Whole-word scan over the uppercased response.
    static ref LABEL: Regex = Regex::new(r"\b(NINGUNA|LEVE|GRAVE)\b").unwrap();

    /// A trimmed line consisting solely of a label token.
    static ref LABEL_ONLY_LINE: Regex = Regex::new(r"^(NINGUNA|LEVE|GRAVE)$").unwrap();
}

/// Extract the severity label from a raw model response.
///
/// Case-insensitive; takes the first whole-word occurrence of any label
/// token. Responses containing no token parse as `Severity::None` - the
/// conservative "no error detected" fallback.
pub fn parse_severity(response: &str) -> Severity {
    let upper = response.to_uppercase();
    match LABEL.find(&upper).and_then(|m| Severity::from_token(m.as_str())) {
        Some(severity) => severity,
        None => {
            tracing::debug!("no severity label in model response, defaulting to NINGUNA");
            Severity::None
        }
    }
}

/// Recover the free-text justification from a raw model response.
///
/// Splits into lines, drops lines that are empty after trimming or that
/// consist solely of a label token, and joins the survivors with single
/// spaces. Callers force the result to an empty string when the parsed
/// severity is `NINGUNA`.
pub fn extract_explanation(response: &str) -> String {
    response
        .trim()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !LABEL_ONLY_LINE.is_match(&line.to_uppercase()))
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}
