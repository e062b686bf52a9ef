use compass_protocol::{GraphLayout, OntologyGraph, Position};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{depth_first_search, DfsEvent};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

pub const DEFAULT_RANK_SEP: f64 = 150.0;
pub const DEFAULT_NODE_SEP: f64 = 220.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// Ranks grow downwards (`y`), siblings spread along `x`.
    #[default]
    TopBottom,
    /// Ranks grow rightwards (`x`), siblings spread along `y`.
    LeftRight,
}

impl Orientation {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "tb" | "td" | "top-bottom" | "top_bottom" => Some(Self::TopBottom),
            "lr" | "left-right" | "left_right" => Some(Self::LeftRight),
            _ => None,
        }
    }

    #[must_use]
    pub const fn mermaid(self) -> &'static str {
        match self {
            Self::TopBottom => "TD",
            Self::LeftRight => "LR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutConfig {
    pub rank_sep: f64,
    pub node_sep: f64,
    pub orientation: Orientation,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            rank_sep: DEFAULT_RANK_SEP,
            node_sep: DEFAULT_NODE_SEP,
            orientation: Orientation::TopBottom,
        }
    }
}

/// Layered layout over the authored hierarchy.
///
/// Rank is the longest path from a root, following the structural edges
/// the graph builder derives. Drawn, suggested and saved relationships are
/// lateral and never move a node. Within a rank nodes keep the order they
/// appear in the graph, and every rank is centred on zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutEngine {
    config: LayoutConfig,
}

impl LayoutEngine {
    #[must_use]
    pub const fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> LayoutConfig {
        self.config
    }

    #[must_use]
    pub fn compute(&self, graph: &OntologyGraph) -> GraphLayout {
        let ranks = assign_ranks(graph);

        let rank_count = ranks.iter().copied().max().map_or(0, |max| max + 1);
        let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); rank_count];
        for (index, rank) in ranks.iter().enumerate() {
            buckets[*rank].push(index);
        }

        let mut layout = GraphLayout::default();
        for (rank, members) in buckets.iter().enumerate() {
            let centre = (members.len() as f64 - 1.0) / 2.0;
            for (slot, index) in members.iter().enumerate() {
                let position = Position::new(
                    (slot as f64 - centre) * self.config.node_sep,
                    rank as f64 * self.config.rank_sep,
                );
                layout
                    .positions
                    .insert(graph.nodes[*index].id.clone(), self.orient(position));
            }
        }
        layout
    }

    /// Shift `position` along the in-rank axis until it clears `occupied`.
    #[must_use]
    pub fn nudge(&self, mut position: Position, occupied: &[Position]) -> Position {
        for _ in 0..=occupied.len() {
            if !occupied.iter().any(|p| p.coincides(position)) {
                break;
            }
            match self.config.orientation {
                Orientation::TopBottom => position.x += self.config.node_sep,
                Orientation::LeftRight => position.y += self.config.node_sep,
            }
        }
        position
    }

    fn orient(&self, position: Position) -> Position {
        match self.config.orientation {
            Orientation::TopBottom => position,
            Orientation::LeftRight => position.transposed(),
        }
    }
}

/// Longest-path ranks via Kahn's algorithm, indexed like `graph.nodes`.
///
/// Only structural edges count. Back edges found by a depth-first pass in
/// node order are dropped first, so a cycle costs one edge instead of its
/// whole component.
fn assign_ranks(graph: &OntologyGraph) -> Vec<usize> {
    let mut dag: DiGraph<(), ()> = DiGraph::with_capacity(graph.nodes.len(), graph.relationships.len());
    let index: HashMap<&str, NodeIndex> = graph
        .nodes
        .iter()
        .map(|node| (node.id.as_str(), dag.add_node(())))
        .collect();

    for rel in graph.relationships.iter().filter(|r| r.is_structural()) {
        if let (Some(&source), Some(&target)) =
            (index.get(rel.source_id.as_str()), index.get(rel.target_id.as_str()))
        {
            if source != target && dag.find_edge(source, target).is_none() {
                dag.add_edge(source, target, ());
            }
        }
    }

    let mut back_edges = Vec::new();
    depth_first_search(&dag, dag.node_indices(), |event| {
        if let DfsEvent::BackEdge(source, target) = event {
            back_edges.push((source, target));
        }
    });
    for (source, target) in back_edges {
        if let Some(edge) = dag.find_edge(source, target) {
            log::debug!(
                "Ignoring cyclic hierarchy edge {} -> {}",
                graph.nodes[source.index()].id,
                graph.nodes[target.index()].id
            );
            dag.remove_edge(edge);
        }
    }

    let mut in_degree: Vec<usize> = dag
        .node_indices()
        .map(|n| dag.neighbors_directed(n, Direction::Incoming).count())
        .collect();
    let mut ranks = vec![0usize; dag.node_count()];
    let mut queue: VecDeque<NodeIndex> = dag
        .node_indices()
        .filter(|n| in_degree[n.index()] == 0)
        .collect();

    while let Some(current) = queue.pop_front() {
        for next in dag.neighbors_directed(current, Direction::Outgoing) {
            ranks[next.index()] = ranks[next.index()].max(ranks[current.index()] + 1);
            in_degree[next.index()] -= 1;
            if in_degree[next.index()] == 0 {
                queue.push_back(next);
            }
        }
    }
    ranks
}

#[cfg(test)]
mod tests {
    use super::*;
    use compass_protocol::{Node, NodeType, RelationType, Relationship};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn node(id: &str, node_type: NodeType) -> Node {
        Node {
            id: id.to_string(),
            node_type,
            label: id.to_string(),
            text: None,
            layer: node_type.layer(),
            semantic_tags: Vec::new(),
        }
    }

    fn edge(source: &str, target: &str, relation_type: RelationType) -> Relationship {
        Relationship {
            id: format!("rel:{source}:{target}"),
            source_id: source.to_string(),
            target_id: target.to_string(),
            source_type: NodeType::Value,
            target_type: NodeType::Value,
            relation_type,
            strength: 100,
            confidence: 100,
            explanation: None,
            auto_detected: false,
        }
    }

    fn hierarchy() -> OntologyGraph {
        OntologyGraph {
            nodes: vec![
                node("purpose", NodeType::Purpose),
                node("vision", NodeType::Vision),
                node("mission", NodeType::Mission),
                node("value-a", NodeType::Value),
                node("value-b", NodeType::Value),
            ],
            relationships: vec![
                edge("purpose", "vision", RelationType::DerivesFrom),
                edge("vision", "mission", RelationType::DerivesFrom),
                edge("mission", "value-a", RelationType::Reinforces),
                edge("mission", "value-b", RelationType::Reinforces),
            ],
            conflicts: Vec::new(),
        }
    }

    #[test]
    fn ranks_follow_longest_path_and_centre_each_row() {
        let layout = LayoutEngine::default().compute(&hierarchy());
        assert_eq!(layout.position("purpose"), Some(Position::new(0.0, 0.0)));
        assert_eq!(layout.position("mission"), Some(Position::new(0.0, 300.0)));
        assert_eq!(layout.position("value-a"), Some(Position::new(-110.0, 450.0)));
        assert_eq!(layout.position("value-b"), Some(Position::new(110.0, 450.0)));
    }

    #[test]
    fn lateral_and_suggested_edges_do_not_affect_ranks() {
        let mut graph = hierarchy();
        graph
            .relationships
            .push(edge("value-a", "value-b", RelationType::UserDefined));
        let mut suggested = edge("value-b", "purpose", RelationType::Supports);
        suggested.auto_detected = true;
        graph.relationships.push(suggested);
        assert_eq!(
            LayoutEngine::default().compute(&graph),
            LayoutEngine::default().compute(&hierarchy())
        );
    }

    #[test]
    fn left_right_transposes_coordinates() {
        let engine = LayoutEngine::new(LayoutConfig {
            orientation: Orientation::LeftRight,
            ..LayoutConfig::default()
        });
        let layout = engine.compute(&hierarchy());
        assert_eq!(layout.position("value-a"), Some(Position::new(450.0, -110.0)));
    }

    #[test]
    fn saved_relationships_do_not_move_ranks() {
        let mut graph = hierarchy();
        let mut upward = edge("value-a", "purpose", RelationType::Supports);
        upward.id = "ai:value-a:purpose".into();
        let mut sibling = edge("value-a", "value-b", RelationType::Supports);
        sibling.id = "ai:value-a:value-b".into();
        graph.relationships.push(upward);
        graph.relationships.push(sibling);
        assert_eq!(
            LayoutEngine::default().compute(&graph),
            LayoutEngine::default().compute(&hierarchy())
        );
    }

    #[test]
    fn cycles_drop_a_back_edge_instead_of_a_component() {
        let mut graph = hierarchy();
        graph
            .relationships
            .push(edge("value-a", "purpose", RelationType::Supports));
        graph.nodes.push(node("goal-1", NodeType::Goal));
        graph.nodes.push(node("goal-2", NodeType::Goal));
        graph
            .relationships
            .push(edge("goal-1", "goal-2", RelationType::Requires));
        graph
            .relationships
            .push(edge("goal-2", "goal-1", RelationType::Requires));
        let layout = LayoutEngine::default().compute(&graph);
        let y = |id: &str| layout.position(id).map(|p| p.y);
        assert_eq!(y("purpose"), Some(0.0));
        assert_eq!(y("vision"), Some(150.0));
        assert_eq!(y("mission"), Some(300.0));
        assert_eq!(y("value-a"), Some(450.0));
        assert_eq!(y("goal-1"), Some(0.0));
        assert_eq!(y("goal-2"), Some(150.0));
    }

    #[test]
    fn nudge_moves_along_the_rank() {
        let engine = LayoutEngine::default();
        let occupied = [Position::new(0.0, 150.0), Position::new(220.0, 150.0)];
        assert_eq!(
            engine.nudge(Position::new(0.0, 150.0), &occupied),
            Position::new(440.0, 150.0)
        );
        assert_eq!(
            engine.nudge(Position::new(0.0, 0.0), &occupied),
            Position::new(0.0, 0.0)
        );
    }

    #[test]
    fn orientation_parses_cli_spellings() {
        assert_eq!(Orientation::parse("LR"), Some(Orientation::LeftRight));
        assert_eq!(Orientation::parse("tb"), Some(Orientation::TopBottom));
        assert_eq!(Orientation::parse("diagonal"), None);
    }

    proptest! {
        #[test]
        fn every_node_gets_a_distinct_position(count in 0usize..12, links in prop::collection::vec((0usize..12, 0usize..12), 0..20)) {
            let nodes: Vec<Node> = (0..count).map(|i| node(&format!("value-{i}"), NodeType::Value)).collect();
            let relationships = links
                .into_iter()
                .filter(|(a, b)| *a < count && *b < count)
                .map(|(a, b)| edge(&format!("value-{a}"), &format!("value-{b}"), RelationType::Implements))
                .collect();
            let graph = OntologyGraph { nodes, relationships, conflicts: Vec::new() };
            let layout = LayoutEngine::default().compute(&graph);
            prop_assert_eq!(layout.len(), count);
            let positions: Vec<Position> = layout.positions.values().copied().collect();
            for (i, a) in positions.iter().enumerate() {
                for b in &positions[i + 1..] {
                    prop_assert!(!a.coincides(*b));
                }
            }
        }
    }
}
