use crate::error::{EnhancerError, Result};
use crate::suggester::{GraphSummary, RelationshipSuggester, SuggestedRelationship};
use compass_protocol::{OntologyGraph, PairKey, RelationType, Relationship};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct EnhancerConfig {
    /// Upper bound on one capability call. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Accepted suggestions per call; the rest are dropped.
    pub max_suggestions: usize,
}

impl Default for EnhancerConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            max_suggestions: 64,
        }
    }
}

/// Augments a base graph with capability-suggested edges.
///
/// Never fails from the caller's point of view: capability errors, timeouts
/// and malformed suggestions all degrade to fewer (or no) added edges.
#[derive(Clone)]
pub struct RelationshipEnhancer {
    suggester: Arc<dyn RelationshipSuggester>,
    config: EnhancerConfig,
}

impl RelationshipEnhancer {
    pub fn new(suggester: Arc<dyn RelationshipSuggester>, config: EnhancerConfig) -> Self {
        Self { suggester, config }
    }

    #[must_use]
    pub fn config(&self) -> EnhancerConfig {
        self.config
    }

    /// Base edges plus accepted suggestions. Graphs with fewer than two
    /// nodes are returned untouched without calling the capability.
    pub async fn enhance(&self, base: OntologyGraph) -> OntologyGraph {
        if base.nodes.len() < 2 {
            return base;
        }
        match self.suggest_edges(&base).await {
            Ok(edges) => merge_suggestions(base, edges),
            Err(err) => {
                log::warn!(
                    "Relationship enhancement via '{}' failed, keeping base graph: {err}",
                    self.suggester.name()
                );
                base
            }
        }
    }

    /// Validated, deduplicated edges suggested for `base`, not yet merged.
    pub async fn suggest_edges(&self, base: &OntologyGraph) -> Result<Vec<Relationship>> {
        let summary = GraphSummary::of(base);
        let call = self.suggester.suggest(&summary);
        let raw = match self.config.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| EnhancerError::Timeout(limit))??,
            None => call.await?,
        };
        let received = raw.len();
        let accepted = self.accept(base, raw);
        log::debug!(
            "Suggester '{}' returned {received} candidate(s), accepted {}",
            self.suggester.name(),
            accepted.len()
        );
        Ok(accepted)
    }

    fn accept(&self, base: &OntologyGraph, raw: Vec<SuggestedRelationship>) -> Vec<Relationship> {
        let mut seen: HashSet<PairKey> = base.relationships.iter().map(Relationship::pair_key).collect();
        let mut accepted = Vec::new();

        for suggestion in raw {
            if accepted.len() >= self.config.max_suggestions {
                break;
            }
            let (Some(source), Some(target)) =
                (base.node(&suggestion.source_id), base.node(&suggestion.target_id))
            else {
                log::debug!(
                    "Dropping suggestion {} -> {}: unknown node id",
                    suggestion.source_id,
                    suggestion.target_id
                );
                continue;
            };
            if source.id == target.id {
                continue;
            }
            let Some(relation_type) = RelationType::parse(&suggestion.relation_type) else {
                log::debug!(
                    "Dropping suggestion {} -> {}: unknown relation type '{}'",
                    source.id,
                    target.id,
                    suggestion.relation_type
                );
                continue;
            };
            if !seen.insert(PairKey::new(&source.id, &target.id)) {
                continue;
            }
            accepted.push(Relationship {
                id: format!("ai:{}:{}", source.id, target.id),
                source_id: source.id.clone(),
                target_id: target.id.clone(),
                source_type: source.node_type,
                target_type: target.node_type,
                relation_type,
                strength: percent(suggestion.strength),
                confidence: percent(suggestion.confidence),
                explanation: suggestion.explanation.filter(|e| !e.trim().is_empty()),
                auto_detected: true,
            });
        }
        accepted
    }
}

/// Append `edges` to `base`, skipping pairs or endpoints that no longer fit.
/// Safe to call with edges computed for an earlier graph over the same
/// node set.
#[must_use]
pub fn merge_suggestions(mut base: OntologyGraph, edges: Vec<Relationship>) -> OntologyGraph {
    let mut seen: HashSet<PairKey> = base.relationships.iter().map(Relationship::pair_key).collect();
    for edge in edges {
        if !base.contains_node(&edge.source_id) || !base.contains_node(&edge.target_id) {
            continue;
        }
        if seen.insert(edge.pair_key()) {
            base.relationships.push(edge);
        }
    }
    base
}

fn percent(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, 100.0) as u8
}
