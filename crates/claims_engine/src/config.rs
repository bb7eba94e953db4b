//! Engine configuration
//!
//! Every rule set defaults to the documented constants. Overrides come from
//! `CLAIMS__`-prefixed environment variables with `__` between levels, e.g.
//! `CLAIMS__ESCALATION__HIGH_VALUE_THRESHOLD=30000` or
//! `CLAIMS__STAGE_TIMEOUT_SECS=30`.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use core_kernel::RetryPolicy;
use domain_claims::damage::DamageLexicon;
use domain_claims::{DuplicateRules, EscalationRules, FraudRules};

use crate::reference::ValuationRules;
use crate::stages::RepairRules;

pub const DEFAULT_DETAILS_MAX_CHARS: usize = 500;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    /// JSON file with policies and vehicle values; built-in samples when unset
    pub reference_data_path: Option<PathBuf>,
    /// Wall-clock budget for classification and for each stage
    pub stage_timeout_secs: Option<u64>,
    /// Status details longer than this are cut and suffixed with `...`
    pub details_max_chars: usize,
    pub escalation: EscalationRules,
    pub duplicates: DuplicateRules,
    pub fraud: FraudRules,
    pub damage: DamageLexicon,
    pub repair: RepairRules,
    pub valuation: ValuationRules,
    /// Applied to the classifier only
    pub retry: RetryPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            database_max_connections: 10,
            reference_data_path: None,
            stage_timeout_secs: None,
            details_max_chars: DEFAULT_DETAILS_MAX_CHARS,
            escalation: EscalationRules::default(),
            duplicates: DuplicateRules::default(),
            fraud: FraudRules::default(),
            damage: DamageLexicon::default(),
            repair: RepairRules::default(),
            valuation: ValuationRules::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Loads configuration from environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::with_prefix("CLAIMS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn stage_timeout(&self) -> Option<Duration> {
        self.stage_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults_match_documented_constants() {
        let config = EngineConfig::default();
        assert_eq!(config.details_max_chars, 500);
        assert_eq!(config.escalation.high_value_threshold, dec!(25000));
        assert_eq!(config.duplicates.date_window_days, 7);
        assert_eq!(config.retry.max_attempts, 3);
        assert!(config.stage_timeout().is_none());
    }

    #[test]
    fn test_partial_document_keeps_other_defaults() {
        let config: EngineConfig = config::Config::builder()
            .set_override("stage_timeout_secs", 30)
            .unwrap()
            .set_override("escalation.high_value_threshold", "30000")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.stage_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.escalation.high_value_threshold, dec!(30000));
        assert_eq!(config.escalation.confidence_threshold, 0.7);
        assert_eq!(config.database_url, "sqlite::memory:");
    }
}
