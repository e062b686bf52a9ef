use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Health summary consumed by the dashboard. Every score is in `0..=100`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AlignmentMetrics {
    pub alignment_score: u8,
    pub completeness_score: u8,
    pub connection_density: u8,
    pub conflict_score: u8,
    pub insights: Vec<String>,
}
