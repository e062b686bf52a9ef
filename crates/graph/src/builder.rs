use crate::tagger::SemanticTagger;
use compass_protocol::{
    Node, NodeType, OntologyGraph, PairKey, RelationType, Relationship, StatementSnapshot,
    STRUCTURAL_EDGE_PREFIX,
};
use std::collections::{HashMap, HashSet};

/// Deterministic transform of a statement snapshot into typed nodes and
/// hierarchical edges. Conflicts are left empty; see `ConflictDetector`.
pub struct GraphBuilder<'a> {
    tagger: SemanticTagger<'a>,
}

/// Accumulates nodes and edges while keeping ids and endpoint pairs unique.
struct GraphDraft<'t> {
    tagger: SemanticTagger<'t>,
    graph: OntologyGraph,
    node_ids: HashSet<String>,
    pairs: HashSet<PairKey>,
}

impl<'a> GraphBuilder<'a> {
    #[must_use]
    pub const fn new(tagger: SemanticTagger<'a>) -> Self {
        Self { tagger }
    }

    #[must_use]
    pub fn build(&self, snapshot: &StatementSnapshot) -> OntologyGraph {
        let mut draft = GraphDraft::new(self.tagger);

        // Phase 1: nodes, in authoring order.
        let purpose = draft.add_statement(NodeType::Purpose, &snapshot.purpose);
        let vision = draft.add_statement(NodeType::Vision, &snapshot.vision);
        let mission = draft.add_statement(NodeType::Mission, &snapshot.mission);
        draft.add_statement(NodeType::Strategy, &snapshot.strategy);

        // record id -> node id, first occurrence wins
        let mut value_nodes: HashMap<&str, String> = HashMap::new();
        let mut value_order: Vec<String> = Vec::new();
        for (index, value) in snapshot.values.iter().enumerate() {
            let text = value.full_text();
            if text.trim().is_empty() {
                continue;
            }
            let label = if value.name.trim().is_empty() {
                value.description.clone()
            } else {
                value.name.clone()
            };
            let id = draft.add_entry(NodeType::Value, &value.id, index, label, text);
            if !value.id.trim().is_empty() {
                value_nodes.entry(value.id.trim()).or_insert_with(|| id.clone());
            }
            value_order.push(id);
        }

        let mut derived: Vec<(String, &[String])> = Vec::new();
        for (node_type, records) in [
            (NodeType::Principle, &snapshot.principles),
            (NodeType::Behavior, &snapshot.behaviors),
        ] {
            for (index, record) in records.iter().enumerate() {
                if record.text.trim().is_empty() {
                    continue;
                }
                let id = draft.add_entry(
                    node_type,
                    &record.id,
                    index,
                    record.text.clone(),
                    record.text.clone(),
                );
                derived.push((id, record.source_value_ids.as_slice()));
            }
        }

        for (index, goal) in snapshot.goals.iter().enumerate() {
            if goal.text().trim().is_empty() {
                continue;
            }
            draft.add_entry(
                NodeType::Goal,
                goal.stable_id().unwrap_or_default(),
                index,
                goal.text().to_string(),
                goal.text().to_string(),
            );
        }

        let mut role_order: Vec<String> = Vec::new();
        for (index, role) in snapshot.roles.iter().enumerate() {
            if role.title().trim().is_empty() {
                continue;
            }
            let id = draft.add_entry(
                NodeType::Role,
                role.stable_id().unwrap_or_default(),
                index,
                role.title().to_string(),
                role.title().to_string(),
            );
            role_order.push(id);
        }

        // Phase 2: hierarchical edges. Siblings are never linked here.
        if let (Some(purpose), Some(vision)) = (&purpose, &vision) {
            draft.add_edge(purpose, vision, RelationType::DerivesFrom);
        }
        if let (Some(vision), Some(mission)) = (&vision, &mission) {
            draft.add_edge(vision, mission, RelationType::DerivesFrom);
        }
        if let Some(mission) = &mission {
            for value in &value_order {
                draft.add_edge(mission, value, RelationType::Reinforces);
            }
        }
        for (node_id, sources) in &derived {
            for source in sources.iter() {
                if let Some(value) = value_nodes.get(source.trim()) {
                    draft.add_edge(value, node_id, RelationType::Implements);
                }
            }
        }
        if let Some(mission) = &mission {
            for role in &role_order {
                draft.add_edge(mission, role, RelationType::Requires);
            }
        }

        // Phase 3: durable relationships the team drew or accepted.
        for relationship in &snapshot.relationships {
            draft.add_persisted(relationship);
        }

        let graph = draft.finish();
        log::debug!(
            "Built ontology graph: {} nodes, {} relationships",
            graph.nodes.len(),
            graph.relationships.len()
        );
        graph
    }
}

impl<'t> GraphDraft<'t> {
    fn new(tagger: SemanticTagger<'t>) -> Self {
        Self {
            tagger,
            graph: OntologyGraph::default(),
            node_ids: HashSet::new(),
            pairs: HashSet::new(),
        }
    }

    fn add_statement(&mut self, node_type: NodeType, text: &str) -> Option<String> {
        if text.trim().is_empty() {
            return None;
        }
        let id = node_type.as_str().to_string();
        self.push_node(id.clone(), node_type, text.to_string(), text.to_string());
        Some(id)
    }

    /// Array entries are keyed by their record id, falling back to position
    /// for records without one. Repeated ids get a `~n` suffix.
    fn add_entry(
        &mut self,
        node_type: NodeType,
        record_id: &str,
        index: usize,
        label: String,
        text: String,
    ) -> String {
        let record_id = record_id.trim();
        let base = if record_id.is_empty() {
            format!("{}-{index}", node_type.as_str())
        } else {
            format!("{}-{record_id}", node_type.as_str())
        };
        let mut id = base.clone();
        let mut n = 2usize;
        while self.node_ids.contains(&id) {
            id = format!("{base}~{n}");
            n += 1;
        }
        self.push_node(id.clone(), node_type, label, text);
        id
    }

    fn push_node(&mut self, id: String, node_type: NodeType, label: String, text: String) {
        let semantic_tags = self.tagger.tag(&text);
        self.node_ids.insert(id.clone());
        self.graph.nodes.push(Node {
            id,
            node_type,
            label,
            text: Some(text),
            layer: node_type.layer(),
            semantic_tags,
        });
    }

    fn node_type(&self, id: &str) -> Option<NodeType> {
        self.graph.node(id).map(|n| n.node_type)
    }

    fn add_edge(&mut self, source: &str, target: &str, relation_type: RelationType) {
        let (Some(source_type), Some(target_type)) = (self.node_type(source), self.node_type(target))
        else {
            return;
        };
        if !self.pairs.insert(PairKey::new(source, target)) {
            return;
        }
        self.graph.relationships.push(Relationship {
            id: Relationship::structural_id(source, target),
            source_id: source.to_string(),
            target_id: target.to_string(),
            source_type,
            target_type,
            relation_type,
            strength: 100,
            confidence: 100,
            explanation: None,
            auto_detected: false,
        });
    }

    fn add_persisted(&mut self, relationship: &Relationship) {
        let source = relationship.source_id.as_str();
        let target = relationship.target_id.as_str();
        if source == target {
            return;
        }
        let (Some(source_type), Some(target_type)) = (self.node_type(source), self.node_type(target))
        else {
            log::debug!(
                "Skipping stored relationship {} with unknown endpoint",
                relationship.id
            );
            return;
        };
        if !self.pairs.insert(relationship.pair_key()) {
            return;
        }
        // `rel:` is reserved for the hierarchy above.
        let id = if relationship.id.starts_with(STRUCTURAL_EDGE_PREFIX) {
            format!("saved:{source}:{target}")
        } else {
            relationship.id.clone()
        };
        self.graph.relationships.push(Relationship {
            id,
            source_type,
            target_type,
            strength: relationship.strength.min(100),
            confidence: relationship.confidence.min(100),
            ..relationship.clone()
        });
    }

    fn finish(self) -> OntologyGraph {
        self.graph
    }
}
