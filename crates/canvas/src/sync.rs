use crate::error::{CanvasError, Result};
use crate::host::GraphHost;
use crate::label::display_label;
use crate::layout::LayoutEngine;
use compass_protocol::{
    ConceptTag, GraphLayout, Layer, Node, NodeType, OntologyGraph, PairKey, Position,
    RelationType, Relationship, StatementSnapshot,
};
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedNode {
    pub id: String,
    pub node_type: NodeType,
    pub label: String,
    pub text: Option<String>,
    pub layer: Layer,
    pub semantic_tags: Vec<ConceptTag>,
    pub position: Position,
    /// Set once the user dragged the node (or it came from the durable
    /// layout). Such positions are never recomputed.
    pub user_positioned: bool,
}

impl RenderedNode {
    fn from_node(node: &Node, position: Position, user_positioned: bool) -> Self {
        Self {
            id: node.id.clone(),
            node_type: node.node_type,
            label: node.label.clone(),
            text: node.text.clone(),
            layer: node.layer,
            semantic_tags: node.semantic_tags.clone(),
            position,
            user_positioned,
        }
    }

    fn refresh(&mut self, node: &Node) {
        self.node_type = node.node_type;
        self.label.clone_from(&node.label);
        self.text.clone_from(&node.text);
        self.layer = node.layer;
        self.semantic_tags.clone_from(&node.semantic_tags);
    }

    #[must_use]
    pub fn display_label(&self) -> String {
        display_label(&self.label)
    }
}

/// What the canvas currently shows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderedGraph {
    pub nodes: Vec<RenderedNode>,
    pub edges: Vec<Relationship>,
}

impl RenderedGraph {
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&RenderedNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    fn node_mut(&mut self, id: &str) -> Option<&mut RenderedNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    #[must_use]
    pub fn has_edge_between(&self, a: &str, b: &str) -> bool {
        let key = PairKey::new(a, b);
        self.edges.iter().any(|e| e.pair_key() == key)
    }

    /// Current positions of every rendered node.
    #[must_use]
    pub fn layout(&self) -> GraphLayout {
        let mut layout = GraphLayout::default();
        layout.merge(self.nodes.iter().map(|n| (n.id.clone(), n.position)));
        layout
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Idle,
    Diffing,
    Applying,
}

/// Ids touched by one synchronization pass, in application order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncDelta {
    pub removed_nodes: Vec<String>,
    pub removed_edges: Vec<String>,
    pub added_nodes: Vec<String>,
    pub added_edges: Vec<String>,
    pub updated_nodes: Vec<String>,
    pub updated_edges: Vec<String>,
}

impl SyncDelta {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.removed_nodes.is_empty()
            && self.removed_edges.is_empty()
            && self.added_nodes.is_empty()
            && self.added_edges.is_empty()
            && self.updated_nodes.is_empty()
            && self.updated_edges.is_empty()
    }
}

/// Keeps the rendered graph in step with freshly computed graphs without
/// discarding what the user did on the canvas.
///
/// Each [`sync`](Self::sync) diffs by id: nodes and edges that disappeared
/// are removed first, new ones are added, and survivors are refreshed in
/// place with their positions untouched. Durable state only changes through
/// [`GraphHost`] callbacks (`end_drag`, `connect`, `save_suggestions`).
#[derive(Debug, Clone)]
pub struct GraphSynchronizer {
    engine: LayoutEngine,
    state: SyncState,
    rendered: RenderedGraph,
    durable_layout: GraphLayout,
    durable_relationships: Vec<Relationship>,
}

impl GraphSynchronizer {
    #[must_use]
    pub fn new(engine: LayoutEngine) -> Self {
        Self {
            engine,
            state: SyncState::Idle,
            rendered: RenderedGraph::default(),
            durable_layout: GraphLayout::default(),
            durable_relationships: Vec::new(),
        }
    }

    #[must_use]
    pub fn state(&self) -> SyncState {
        self.state
    }

    #[must_use]
    pub fn rendered(&self) -> &RenderedGraph {
        &self.rendered
    }

    #[must_use]
    pub fn durable_layout(&self) -> &GraphLayout {
        &self.durable_layout
    }

    /// Reconcile the canvas with `computed`. `snapshot` supplies the
    /// durable layout and relationship list as last persisted.
    pub fn sync(&mut self, computed: &OntologyGraph, snapshot: &StatementSnapshot) -> SyncDelta {
        self.state = SyncState::Diffing;
        self.durable_layout = snapshot.layout.clone();
        self.durable_relationships = snapshot.relationships.clone();

        let computed_nodes: HashSet<&str> = computed.nodes.iter().map(|n| n.id.as_str()).collect();
        let computed_edges = unique_edges(computed, &computed_nodes);
        let computed_edge_ids: HashSet<&str> =
            computed_edges.iter().map(|e| e.id.as_str()).collect();

        let mut delta = SyncDelta::default();
        for node in &self.rendered.nodes {
            if !computed_nodes.contains(node.id.as_str()) {
                delta.removed_nodes.push(node.id.clone());
            }
        }
        for edge in &self.rendered.edges {
            if !computed_edge_ids.contains(edge.id.as_str()) {
                delta.removed_edges.push(edge.id.clone());
            }
        }

        self.state = SyncState::Applying;
        self.rendered
            .nodes
            .retain(|n| computed_nodes.contains(n.id.as_str()));
        self.rendered
            .edges
            .retain(|e| computed_edge_ids.contains(e.id.as_str()));

        self.apply_nodes(computed, &mut delta);
        self.apply_edges(&computed_edges, &mut delta);

        self.state = SyncState::Idle;
        if !delta.is_empty() {
            log::debug!(
                "Canvas sync: -{} +{} ~{} nodes, -{} +{} ~{} edges",
                delta.removed_nodes.len(),
                delta.added_nodes.len(),
                delta.updated_nodes.len(),
                delta.removed_edges.len(),
                delta.added_edges.len(),
                delta.updated_edges.len()
            );
        }
        delta
    }

    fn apply_nodes(&mut self, computed: &OntologyGraph, delta: &mut SyncDelta) {
        let needs_layout = computed
            .nodes
            .iter()
            .any(|n| self.rendered.node(&n.id).is_none());
        let fresh = if needs_layout {
            self.engine.compute(computed)
        } else {
            GraphLayout::default()
        };

        let mut ordered = Vec::with_capacity(computed.nodes.len());
        for node in &computed.nodes {
            let existing = self
                .rendered
                .nodes
                .iter()
                .position(|r| r.id == node.id)
                .map(|index| self.rendered.nodes.swap_remove(index));

            let rendered = match existing {
                Some(mut rendered) => {
                    rendered.refresh(node);
                    delta.updated_nodes.push(node.id.clone());
                    rendered
                }
                None => {
                    let rendered = match self.durable_layout.position(&node.id) {
                        Some(saved) => RenderedNode::from_node(node, saved, true),
                        None => {
                            let occupied: Vec<Position> = ordered
                                .iter()
                                .chain(&self.rendered.nodes)
                                .map(|n: &RenderedNode| n.position)
                                .collect();
                            let proposed = fresh.position(&node.id).unwrap_or_default();
                            RenderedNode::from_node(node, self.engine.nudge(proposed, &occupied), false)
                        }
                    };
                    delta.added_nodes.push(node.id.clone());
                    rendered
                }
            };
            ordered.push(rendered);
        }
        self.rendered.nodes = ordered;
    }

    fn apply_edges(&mut self, computed_edges: &[&Relationship], delta: &mut SyncDelta) {
        let mut ordered: Vec<Relationship> = Vec::with_capacity(computed_edges.len());
        for edge in computed_edges {
            match self.rendered.edges.iter().position(|r| r.id == edge.id) {
                Some(index) => {
                    ordered.push((*edge).clone());
                    self.rendered.edges.swap_remove(index);
                    delta.updated_edges.push(edge.id.clone());
                }
                None => {
                    let key = edge.pair_key();
                    let taken = ordered
                        .iter()
                        .chain(&self.rendered.edges)
                        .any(|e| e.pair_key() == key);
                    if !taken {
                        ordered.push((*edge).clone());
                        delta.added_edges.push(edge.id.clone());
                    }
                }
            }
        }
        self.rendered.edges = ordered;
    }

    /// Move a node during a drag gesture. Nothing is persisted until
    /// [`end_drag`](Self::end_drag).
    pub fn move_node(&mut self, id: &str, position: Position) -> Result<()> {
        let node = self
            .rendered
            .node_mut(id)
            .ok_or_else(|| CanvasError::UnknownNode(id.to_string()))?;
        node.position = position;
        Ok(())
    }

    /// Finish a drag: pin the node and persist the merged durable layout.
    pub fn end_drag<H: GraphHost + ?Sized>(&mut self, id: &str, host: &mut H) -> Result<GraphLayout> {
        let node = self
            .rendered
            .node_mut(id)
            .ok_or_else(|| CanvasError::UnknownNode(id.to_string()))?;
        node.user_positioned = true;

        let mut merged = self.durable_layout.clone();
        merged.merge(
            self.rendered
                .nodes
                .iter()
                .filter(|n| n.user_positioned)
                .map(|n| (n.id.clone(), n.position)),
        );
        host.persist_layout(merged.clone())
            .map_err(|source| CanvasError::Persist {
                what: "layout",
                source,
            })?;
        self.durable_layout = merged.clone();
        Ok(merged)
    }

    /// Draw a user-defined edge between two rendered nodes and persist it.
    ///
    /// Returns `None` (and persists nothing) for self loops, unknown
    /// endpoints, or a pair that is already connected in either direction.
    pub fn connect<H: GraphHost + ?Sized>(
        &mut self,
        source_id: &str,
        target_id: &str,
        host: &mut H,
    ) -> Result<Option<Relationship>> {
        if source_id == target_id {
            return Ok(None);
        }
        let (Some(source), Some(target)) =
            (self.rendered.node(source_id), self.rendered.node(target_id))
        else {
            return Ok(None);
        };
        let key = PairKey::new(source_id, target_id);
        if self.rendered.has_edge_between(source_id, target_id)
            || self.durable_relationships.iter().any(|r| r.pair_key() == key)
        {
            log::debug!("Ignoring duplicate manual edge {source_id} <-> {target_id}");
            return Ok(None);
        }

        let edge = Relationship {
            id: format!("user:{source_id}:{target_id}"),
            source_id: source.id.clone(),
            target_id: target.id.clone(),
            source_type: source.node_type,
            target_type: target.node_type,
            relation_type: RelationType::UserDefined,
            strength: 100,
            confidence: 100,
            explanation: None,
            auto_detected: false,
        };

        let mut relationships = self.durable_relationships.clone();
        relationships.push(edge.clone());
        host.persist_relationships(relationships.clone())
            .map_err(|source| CanvasError::Persist {
                what: "relationships",
                source,
            })?;
        self.durable_relationships = relationships;
        self.rendered.edges.push(edge.clone());
        Ok(Some(edge))
    }

    /// Promote every rendered AI-suggested edge into the durable list.
    /// Returns how many edges were newly saved.
    pub fn save_suggestions<H: GraphHost + ?Sized>(&mut self, host: &mut H) -> Result<usize> {
        let mut relationships = self.durable_relationships.clone();
        let mut seen: HashSet<PairKey> = relationships.iter().map(Relationship::pair_key).collect();
        let mut saved = 0usize;
        for edge in self.rendered.edges.iter().filter(|e| e.auto_detected) {
            if seen.insert(edge.pair_key()) {
                relationships.push(Relationship {
                    auto_detected: false,
                    ..edge.clone()
                });
                saved += 1;
            }
        }
        if saved == 0 {
            return Ok(0);
        }

        host.persist_relationships(relationships.clone())
            .map_err(|source| CanvasError::Persist {
                what: "relationships",
                source,
            })?;
        self.durable_relationships = relationships;
        for edge in &mut self.rendered.edges {
            edge.auto_detected = false;
        }
        log::info!("Saved {saved} suggested relationship(s)");
        Ok(saved)
    }
}

/// Computed edges with both endpoints present, first occurrence per pair.
fn unique_edges<'g>(computed: &'g OntologyGraph, nodes: &HashSet<&str>) -> Vec<&'g Relationship> {
    let mut seen = HashSet::new();
    computed
        .relationships
        .iter()
        .filter(|e| nodes.contains(e.source_id.as_str()) && nodes.contains(e.target_id.as_str()))
        .filter(|e| e.source_id != e.target_id)
        .filter(|e| seen.insert(e.pair_key()))
        .collect()
}
