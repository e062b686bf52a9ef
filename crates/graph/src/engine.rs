use crate::builder::GraphBuilder;
use crate::conflicts::ConflictDetector;
use crate::lexicon::Lexicon;
use crate::scorer::AlignmentScorer;
use crate::tagger::SemanticTagger;
use compass_protocol::{AlignmentMetrics, OntologyGraph, StatementSnapshot};
use serde::Serialize;

/// Output of one synchronous evaluation of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub graph: OntologyGraph,
    pub metrics: AlignmentMetrics,
}

/// Runs builder, conflict detector and scorer over a snapshot. Every call
/// is a full re-evaluation; nothing is cached between snapshots.
#[derive(Clone, Debug, Default)]
pub struct AlignmentEngine {
    lexicon: Lexicon,
}

impl AlignmentEngine {
    #[must_use]
    pub fn new(lexicon: Lexicon) -> Self {
        Self { lexicon }
    }

    #[must_use]
    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    #[must_use]
    pub fn tagger(&self) -> SemanticTagger<'_> {
        SemanticTagger::new(&self.lexicon)
    }

    /// Base graph with conflicts attached.
    #[must_use]
    pub fn build_graph(&self, snapshot: &StatementSnapshot) -> OntologyGraph {
        let mut graph = GraphBuilder::new(self.tagger()).build(snapshot);
        graph.conflicts = ConflictDetector::new(&self.lexicon).detect(&graph.nodes);
        graph
    }

    #[must_use]
    pub fn score(&self, snapshot: &StatementSnapshot, graph: &OntologyGraph) -> AlignmentMetrics {
        AlignmentScorer::new(&self.lexicon).score(snapshot, graph)
    }

    #[must_use]
    pub fn evaluate(&self, snapshot: &StatementSnapshot) -> Evaluation {
        let graph = self.build_graph(snapshot);
        let metrics = self.score(snapshot, &graph);
        log::info!(
            "Evaluated snapshot: {} nodes, {} relationships, {} conflicts, alignment {}",
            graph.nodes.len(),
            graph.relationships.len(),
            graph.conflicts.len(),
            metrics.alignment_score
        );
        Evaluation { graph, metrics }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compass_protocol::{Severity, ValueRecord};
    use pretty_assertions::assert_eq;

    #[test]
    fn values_only_snapshot_reports_the_tension() {
        let snapshot = StatementSnapshot {
            values: ["Speed", "Perfect Quality"]
                .iter()
                .enumerate()
                .map(|(i, name)| ValueRecord {
                    id: format!("v{i}"),
                    name: (*name).to_string(),
                    description: String::new(),
                })
                .collect(),
            ..StatementSnapshot::default()
        };
        let evaluation = AlignmentEngine::default().evaluate(&snapshot);
        assert_eq!(evaluation.graph.nodes.len(), 2);
        assert!(evaluation.graph.relationships.is_empty());
        assert_eq!(evaluation.graph.conflicts.len(), 1);
        assert!(evaluation.graph.conflicts[0].dimension.contains("SPEED"));
        assert!(evaluation.graph.conflicts[0].severity >= Severity::PotentialConflict);
        assert_eq!(evaluation.metrics.completeness_score, 13);
        assert_eq!(evaluation.metrics.connection_density, 0);
    }

    #[test]
    fn empty_snapshot_evaluates_to_empty_graph() {
        let evaluation = AlignmentEngine::default().evaluate(&StatementSnapshot::default());
        assert_eq!(evaluation.graph, OntologyGraph::default());
        assert_eq!(evaluation.metrics.completeness_score, 0);
        assert_eq!(evaluation.metrics.connection_density, 0);
    }
}
