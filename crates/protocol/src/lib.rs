//! # Compass Protocol
//!
//! Data model shared by every crate of the alignment engine: the authored
//! statement snapshot consumed from the host, the ontology graph and metrics
//! produced for dashboards, and the durable layout and command types that
//! flow back into the host's state store.

use anyhow::{Context, Result};
use serde::Serialize;

mod command;
mod graph;
mod layout;
mod lenient;
mod metrics;
mod snapshot;

pub use command::StoreCommand;
pub use graph::{
    Concept, ConceptTag, Conflict, ConflictItem, Layer, Node, NodeType, OntologyGraph, PairKey,
    RelationType, Relationship, Severity, STRUCTURAL_EDGE_PREFIX,
};
pub use layout::{GraphLayout, Position};
pub use metrics::AlignmentMetrics;
pub use snapshot::{
    GoalRecord, PersonRecord, RoleRecord, StatementRecord, StatementSnapshot, ValueRecord,
};

pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// Parse a snapshot from JSON bytes.
///
/// Missing or malformed collections degrade to empty ones; only a document
/// that is not a JSON object at all is rejected.
pub fn parse_snapshot(bytes: &[u8]) -> Result<StatementSnapshot> {
    serde_json::from_slice(bytes).context("snapshot is not a valid JSON object")
}

pub fn serialize_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(Into::into)
}

pub fn serialize_json_pretty<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(Into::into)
}
