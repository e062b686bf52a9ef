use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of authored statement a node was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Purpose,
    Vision,
    Mission,
    Strategy,
    Value,
    Principle,
    Behavior,
    Goal,
    Role,
}

impl NodeType {
    pub const ALL: [Self; 9] = [
        Self::Purpose,
        Self::Vision,
        Self::Mission,
        Self::Strategy,
        Self::Value,
        Self::Principle,
        Self::Behavior,
        Self::Goal,
        Self::Role,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Purpose => "purpose",
            Self::Vision => "vision",
            Self::Mission => "mission",
            Self::Strategy => "strategy",
            Self::Value => "value",
            Self::Principle => "principle",
            Self::Behavior => "behavior",
            Self::Goal => "goal",
            Self::Role => "role",
        }
    }

    #[must_use]
    pub const fn layer(self) -> Layer {
        match self {
            Self::Purpose | Self::Vision | Self::Mission => Layer::Identity,
            Self::Value | Self::Principle => Layer::Culture,
            Self::Behavior => Layer::Behavior,
            Self::Strategy | Self::Goal | Self::Role => Layer::Execution,
        }
    }

    /// Top-level statements have exactly one node with the type name as id.
    #[must_use]
    pub const fn is_singleton(self) -> bool {
        matches!(
            self,
            Self::Purpose | Self::Vision | Self::Mission | Self::Strategy
        )
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(raw))
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse grouping of node types for visual banding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Identity,
    Culture,
    Behavior,
    Execution,
}

/// Fixed concept vocabulary used by the semantic tagger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Concept {
    Speed,
    Quality,
    Innovation,
    Stability,
    Autonomy,
    Control,
    Collaboration,
    Individual,
    Customer,
    Business,
    Transparency,
    Privacy,
}

impl Concept {
    pub const ALL: [Self; 12] = [
        Self::Speed,
        Self::Quality,
        Self::Innovation,
        Self::Stability,
        Self::Autonomy,
        Self::Control,
        Self::Collaboration,
        Self::Individual,
        Self::Customer,
        Self::Business,
        Self::Transparency,
        Self::Privacy,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Speed => "SPEED",
            Self::Quality => "QUALITY",
            Self::Innovation => "INNOVATION",
            Self::Stability => "STABILITY",
            Self::Autonomy => "AUTONOMY",
            Self::Control => "CONTROL",
            Self::Collaboration => "COLLABORATION",
            Self::Individual => "INDIVIDUAL",
            Self::Customer => "CUSTOMER",
            Self::Business => "BUSINESS",
            Self::Transparency => "TRANSPARENCY",
            Self::Privacy => "PRIVACY",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(raw))
    }
}

impl fmt::Display for Concept {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ConceptTag {
    pub concept: Concept,
    /// In `[0, 1]`.
    pub confidence: f32,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Node {
    pub id: String,
    pub node_type: NodeType,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub layer: Layer,
    #[serde(default)]
    pub semantic_tags: Vec<ConceptTag>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    DerivesFrom,
    Implements,
    Supports,
    ConflictsWith,
    Reinforces,
    Requires,
    UserDefined,
}

impl RelationType {
    pub const ALL: [Self; 7] = [
        Self::DerivesFrom,
        Self::Implements,
        Self::Supports,
        Self::ConflictsWith,
        Self::Reinforces,
        Self::Requires,
        Self::UserDefined,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DerivesFrom => "derives_from",
            Self::Implements => "implements",
            Self::Supports => "supports",
            Self::ConflictsWith => "conflicts_with",
            Self::Reinforces => "reinforces",
            Self::Requires => "requires",
            Self::UserDefined => "user_defined",
        }
    }

    /// Accepts snake_case, kebab-case, or upper-case spellings.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Self::ALL.into_iter().find(|t| t.as_str() == normalized)
    }

    /// Types that express the authored hierarchy (as opposed to lateral
    /// links drawn by users or flagged as tension).
    #[must_use]
    pub const fn is_hierarchical(self) -> bool {
        !matches!(self, Self::ConflictsWith | Self::UserDefined)
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Relationship {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    pub source_type: NodeType,
    pub target_type: NodeType,
    pub relation_type: RelationType,
    /// 0..=100
    pub strength: u8,
    /// 0..=100
    pub confidence: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default)]
    pub auto_detected: bool,
}

/// Id prefix reserved for edges derived from the statement hierarchy.
pub const STRUCTURAL_EDGE_PREFIX: &str = "rel:";

impl Relationship {
    #[must_use]
    pub fn structural_id(source_id: &str, target_id: &str) -> String {
        format!("{STRUCTURAL_EDGE_PREFIX}{source_id}:{target_id}")
    }

    /// Derived from the statement hierarchy, not drawn, suggested or saved.
    /// Only these edges decide layout ranks.
    #[must_use]
    pub fn is_structural(&self) -> bool {
        self.id.starts_with(STRUCTURAL_EDGE_PREFIX)
            && !self.auto_detected
            && self.relation_type.is_hierarchical()
    }

    #[must_use]
    pub fn pair_key(&self) -> PairKey {
        PairKey::new(&self.source_id, &self.target_id)
    }

    #[must_use]
    pub fn touches(&self, node_id: &str) -> bool {
        self.source_id == node_id || self.target_id == node_id
    }
}

/// Unordered endpoint pair: `(a, b)` and `(b, a)` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey(String, String);

impl PairKey {
    #[must_use]
    pub fn new(a: &str, b: &str) -> Self {
        if a <= b {
            Self(a.to_string(), b.to_string())
        } else {
            Self(b.to_string(), a.to_string())
        }
    }

    #[must_use]
    pub fn first(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn second(&self) -> &str {
        &self.1
    }
}

/// Ordered from mildest to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    HealthyTension,
    PotentialConflict,
    CriticalConflict,
}

impl Severity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HealthyTension => "HEALTHY_TENSION",
            Self::PotentialConflict => "POTENTIAL_CONFLICT",
            Self::CriticalConflict => "CRITICAL_CONFLICT",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ConflictItem {
    pub id: String,
    pub node_type: NodeType,
    pub text: String,
}

/// Tension between two nodes. Recomputed every evaluation, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Conflict {
    pub id: String,
    pub dimension: String,
    pub severity: Severity,
    pub item1: ConflictItem,
    pub item2: ConflictItem,
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_resolution: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct OntologyGraph {
    pub nodes: Vec<Node>,
    pub relationships: Vec<Relationship>,
    pub conflicts: Vec<Conflict>,
}

impl OntologyGraph {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.relationships.is_empty() && self.conflicts.is_empty()
    }

    #[must_use]
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    #[must_use]
    pub fn contains_node(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    /// Undirected lookup.
    #[must_use]
    pub fn has_relationship_between(&self, a: &str, b: &str) -> bool {
        let key = PairKey::new(a, b);
        self.relationships.iter().any(|r| r.pair_key() == key)
    }

    #[must_use]
    pub fn nodes_of_type(&self, node_type: NodeType) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |n| n.node_type == node_type)
    }

    /// Node ids sorted, the identity the enhancer debounces against.
    #[must_use]
    pub fn node_set_key(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.nodes.iter().map(|n| n.id.clone()).collect();
        ids.sort();
        ids
    }
}
