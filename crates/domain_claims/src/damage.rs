//! Damage wording analysis
//!
//! Keyword rules that read the damage and incident narratives: catastrophic
//! events, explicit total-loss wording, and repairable parts. Matching is on
//! whole words so "accident" never counts as a "dent".

use std::fmt;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::text::{matching_phrases, tokens, contains_phrase};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| item.to_string()).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DamageLexicon {
    pub catastrophic_events: Vec<String>,
    pub total_loss_terms: Vec<String>,
    pub repairable_parts: Vec<String>,
    /// Repair cost over vehicle value at or above which a loss is economic total
    pub partial_loss_threshold: Decimal,
}

impl Default for DamageLexicon {
    fn default() -> Self {
        Self {
            catastrophic_events: strings(&[
                "flood", "flooded", "flooding", "fire", "fires", "submerged", "rollover",
                "rolled over", "roof crushed", "burned", "burning", "burnt",
            ]),
            total_loss_terms: strings(&[
                "totaled", "total loss", "destroyed", "beyond repair", "unrepairable",
                "complete loss", "write-off", "write off", "frame bent", "frame damage",
            ]),
            repairable_parts: strings(&[
                "door", "doors", "fender", "bumper", "hood", "trunk", "mirror", "light",
                "headlight", "taillight", "dent", "scratch", "panel", "quarter panel",
                "windshield", "window", "paint",
            ]),
            partial_loss_threshold: dec!(0.75),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Unknown,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Unknown => "unknown",
            Severity::Medium => "medium",
            Severity::High => "high",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageProfile {
    /// Flood, fire, rollover and friends in either narrative
    pub catastrophic_event: bool,
    /// Damage text says total loss outright or names a catastrophic event
    pub indicates_total_loss: bool,
    /// Damage names replaceable parts and nothing catastrophic
    pub repairable: bool,
    pub severity: Severity,
    pub damaged_parts: Vec<String>,
}

impl DamageLexicon {
    pub fn analyze(&self, incident_description: &str, damage_description: &str) -> DamageProfile {
        let damage_tokens = tokens(damage_description);
        let incident_tokens = tokens(incident_description);

        let event_in = |toks: &[String]| {
            self.catastrophic_events.iter().any(|kw| contains_phrase(toks, kw))
        };
        let damage_event = event_in(&damage_tokens);
        let catastrophic_event = damage_event || event_in(&incident_tokens);
        let explicit_total = self
            .total_loss_terms
            .iter()
            .any(|kw| contains_phrase(&damage_tokens, kw));
        let indicates_total_loss = explicit_total || damage_event;

        let damaged_parts: Vec<String> = matching_phrases(&[damage_description], &self.repairable_parts)
            .into_iter()
            .map(str::to_string)
            .collect();
        let repairable = !damaged_parts.is_empty() && !indicates_total_loss;

        let severity = if damage_tokens.is_empty() {
            Severity::Unknown
        } else if indicates_total_loss {
            Severity::High
        } else {
            Severity::Medium
        };

        DamageProfile {
            catastrophic_event,
            indicates_total_loss,
            repairable,
            severity,
            damaged_parts,
        }
    }

    /// Cost at or above the partial-loss share of value is an economic total
    /// loss, unless the damage is repairable-only and still below full value.
    pub fn is_economic_total_loss(&self, repair_cost: Decimal, vehicle_value: Decimal, repairable: bool) -> bool {
        if vehicle_value <= Decimal::ZERO || repair_cost <= Decimal::ZERO {
            return false;
        }
        let over_threshold = repair_cost >= self.partial_loss_threshold * vehicle_value;
        if over_threshold && repairable && repair_cost < vehicle_value {
            return false;
        }
        over_threshold
    }
}
