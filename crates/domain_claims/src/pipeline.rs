//! Specialist stages and per-type pipelines
//!
//! A run threads one [`StageContext`] through the stages of its pipeline. Each
//! stage sees the claim, the classification, and every earlier stage's
//! output, and returns its own output; the orchestrator appends it and hands
//! the grown context to the next stage. Nothing is shared between stages
//! except through this value.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::PortError;
use crate::claim::{Claim, ClaimType};

/// Output of one stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageOutput {
    pub summary: String,
    #[serde(default)]
    pub data: serde_json::Value,
    /// Set by stages that settle an amount
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payout_amount: Option<Decimal>,
}

impl StageOutput {
    pub fn new(summary: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            summary: summary.into(),
            data,
            payout_amount: None,
        }
    }

    pub fn with_payout(mut self, amount: Decimal) -> Self {
        self.payout_amount = Some(amount);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: String,
    #[serde(flatten)]
    pub output: StageOutput,
}

/// Accumulated state of a run
#[derive(Debug, Clone)]
pub struct StageContext {
    pub claim: Claim,
    pub claim_type: ClaimType,
    pub rationale: String,
    records: Vec<StageRecord>,
}

impl StageContext {
    pub fn new(claim: Claim, claim_type: ClaimType, rationale: impl Into<String>) -> Self {
        Self {
            claim,
            claim_type,
            rationale: rationale.into(),
            records: Vec::new(),
        }
    }

    pub fn records(&self) -> &[StageRecord] {
        &self.records
    }

    /// Output of the named stage, if it already ran
    pub fn output(&self, stage: &str) -> Option<&StageOutput> {
        self.records
            .iter()
            .rev()
            .find(|record| record.stage == stage)
            .map(|record| &record.output)
    }

    /// Deserializes the named stage's `data`
    pub fn data<T: serde::de::DeserializeOwned>(&self, stage: &str) -> Result<T, PortError> {
        let output = self
            .output(stage)
            .ok_or_else(|| PortError::validation(format!("no output from stage {stage}")))?;
        serde_json::from_value(output.data.clone())
            .map_err(|e| PortError::transformation(format!("output of stage {stage}: {e}")))
    }

    /// The last payout amount any stage settled on
    pub fn payout_amount(&self) -> Option<Decimal> {
        self.records.iter().rev().find_map(|record| record.output.payout_amount)
    }

    pub fn push(&mut self, stage: impl Into<String>, output: StageOutput) {
        self.records.push(StageRecord {
            stage: stage.into(),
            output,
        });
    }

    pub fn into_records(self) -> Vec<StageRecord> {
        self.records
    }
}

/// One specialist step of a pipeline
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, context: &StageContext) -> Result<StageOutput, PortError>;
}

/// Claim type to ordered stage list
#[derive(Clone, Default)]
pub struct PipelineRegistry {
    pipelines: HashMap<ClaimType, Vec<Arc<dyn Stage>>>,
}

impl PipelineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, claim_type: ClaimType, stages: Vec<Arc<dyn Stage>>) -> &mut Self {
        self.pipelines.insert(claim_type, stages);
        self
    }

    pub fn with(mut self, claim_type: ClaimType, stages: Vec<Arc<dyn Stage>>) -> Self {
        self.register(claim_type, stages);
        self
    }

    /// Stages for a type; an unregistered type has an empty pipeline
    pub fn stages(&self, claim_type: ClaimType) -> &[Arc<dyn Stage>] {
        self.pipelines
            .get(&claim_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn stage_names(&self, claim_type: ClaimType) -> Vec<String> {
        self.stages(claim_type)
            .iter()
            .map(|stage| stage.name().to_string())
            .collect()
    }
}

impl std::fmt::Debug for PipelineRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for claim_type in ClaimType::ALL {
            if self.pipelines.contains_key(&claim_type) {
                map.entry(&claim_type.as_str(), &self.stage_names(claim_type));
            }
        }
        map.finish()
    }
}
