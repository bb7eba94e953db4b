//! Input sanitization
//!
//! Claim narratives end up in prompts sent to the classification service, so
//! free text is cleaned before it is validated or stored: control characters
//! are stripped, fields are truncated, and instruction-like phrases in the
//! descriptions are replaced with `[redacted]`.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::claim::ClaimInput;

pub const MAX_INCIDENT_DESCRIPTION: usize = 5000;
pub const MAX_DAMAGE_DESCRIPTION: usize = 3000;
pub const MAX_POLICY_NUMBER: usize = 64;
pub const MAX_VIN: usize = 32;
pub const MAX_VEHICLE_MAKE: usize = 64;
pub const MAX_VEHICLE_MODEL: usize = 128;

const REDACTED: &str = "[redacted]";

static INJECTION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)ignore\s+(?:all\s+)?(?:previous|above|prior)\s+instructions?",
        r"(?i)disregard\s+(?:all\s+)?(?:previous|above|prior)",
        r"(?i)forget\s+(?:everything|all)\s+(?:you\s+)?(?:know|learned)",
        r"(?i)you\s+are\s+now\s+",
        r"(?i)new\s+instructions?\s*:",
        r"(?i)system\s*:\s*",
        r"(?i)<\|[a-z_]+\|>",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

/// Returns a cleaned copy of the submission. Numeric and date fields pass
/// through untouched; they are validated separately.
pub fn sanitize_claim_input(input: &ClaimInput) -> ClaimInput {
    ClaimInput {
        policy_number: clean_text(&input.policy_number, MAX_POLICY_NUMBER),
        vin: clean_text(&input.vin, MAX_VIN),
        vehicle_year: input.vehicle_year,
        vehicle_make: input
            .vehicle_make
            .as_deref()
            .map(|make| clean_text(make, MAX_VEHICLE_MAKE))
            .filter(|make| !make.is_empty()),
        vehicle_model: input
            .vehicle_model
            .as_deref()
            .map(|model| clean_text(model, MAX_VEHICLE_MODEL))
            .filter(|model| !model.is_empty()),
        incident_date: input.incident_date,
        incident_description: clean_narrative(
            &input.incident_description,
            MAX_INCIDENT_DESCRIPTION,
        ),
        damage_description: clean_narrative(&input.damage_description, MAX_DAMAGE_DESCRIPTION),
        estimated_damage: input.estimated_damage,
    }
}

/// Strips control characters (keeping tab, newline, carriage return), trims,
/// and truncates to `max_chars` characters.
pub fn clean_text(text: &str, max_chars: usize) -> String {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\t' | '\n' | '\r'))
        .collect();
    cleaned.trim().chars().take(max_chars).collect()
}

/// Redacts before truncating: `[redacted]` is longer than some of the
/// phrases it replaces, so the cut has to come last.
fn clean_narrative(text: &str, max_chars: usize) -> String {
    let redacted = redact_injection(&clean_text(text, usize::MAX));
    redacted.trim_end().chars().take(max_chars).collect()
}

pub fn redact_injection(text: &str) -> String {
    INJECTION_PATTERNS
        .iter()
        .fold(text.to_string(), |acc, pattern| {
            pattern.replace_all(&acc, REDACTED).into_owned()
        })
}
