use async_trait::async_trait;
use compass_protocol::{NodeType, OntologyGraph, RelationType};
use serde::{Deserialize, Serialize};

/// Compact view of a graph handed to the suggestion capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphSummary {
    pub nodes: Vec<SummaryNode>,
    pub edges: Vec<SummaryEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryNode {
    pub id: String,
    pub node_type: NodeType,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryEdge {
    pub source_id: String,
    pub target_id: String,
    pub relation_type: RelationType,
}

impl GraphSummary {
    #[must_use]
    pub fn of(graph: &OntologyGraph) -> Self {
        Self {
            nodes: graph
                .nodes
                .iter()
                .map(|n| SummaryNode {
                    id: n.id.clone(),
                    node_type: n.node_type,
                    label: n.label.clone(),
                })
                .collect(),
            edges: graph
                .relationships
                .iter()
                .map(|r| SummaryEdge {
                    source_id: r.source_id.clone(),
                    target_id: r.target_id.clone(),
                    relation_type: r.relation_type,
                })
                .collect(),
        }
    }
}

/// One candidate edge as returned by the capability. Fields are loosely
/// typed; the enhancer validates and normalizes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedRelationship {
    pub source_id: String,
    pub target_id: String,
    pub relation_type: String,
    #[serde(default)]
    pub strength: f64,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub explanation: Option<String>,
}

/// External capability that proposes additional relationships.
///
/// Implementations may fail or hang; the enhancer treats both as "no
/// suggestions".
#[async_trait]
pub trait RelationshipSuggester: Send + Sync {
    async fn suggest(&self, summary: &GraphSummary) -> anyhow::Result<Vec<SuggestedRelationship>>;

    fn name(&self) -> &str {
        "suggester"
    }
}

/// Suggests nothing. Used when no capability is configured.
pub struct NoopSuggester;

#[async_trait]
impl RelationshipSuggester for NoopSuggester {
    async fn suggest(&self, _summary: &GraphSummary) -> anyhow::Result<Vec<SuggestedRelationship>> {
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "noop"
    }
}

/// Replays a fixed batch of suggestions, whatever the graph.
pub struct StaticSuggester {
    suggestions: Vec<SuggestedRelationship>,
}

impl StaticSuggester {
    #[must_use]
    pub fn new(suggestions: Vec<SuggestedRelationship>) -> Self {
        Self { suggestions }
    }
}

#[async_trait]
impl RelationshipSuggester for StaticSuggester {
    async fn suggest(&self, _summary: &GraphSummary) -> anyhow::Result<Vec<SuggestedRelationship>> {
        Ok(self.suggestions.clone())
    }

    fn name(&self) -> &str {
        "static"
    }
}
