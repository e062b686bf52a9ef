use crate::label::display_label;
use crate::layout::Orientation;
use crate::sync::RenderedGraph;
use compass_protocol::{Conflict, Layer, OntologyGraph, RelationType, Relationship};
use std::collections::HashMap;
use std::fmt::Write as _;

/// Mermaid flowchart of a computed graph, conflicts drawn as `x--x` links.
#[must_use]
pub fn to_mermaid(graph: &OntologyGraph, orientation: Orientation) -> String {
    render(
        orientation,
        graph
            .nodes
            .iter()
            .map(|n| (n.id.as_str(), n.label.as_str(), n.layer)),
        &graph.relationships,
        &graph.conflicts,
    )
}

impl RenderedGraph {
    /// Mermaid flowchart of what the canvas currently shows.
    #[must_use]
    pub fn to_mermaid(&self, orientation: Orientation) -> String {
        render(
            orientation,
            self.nodes
                .iter()
                .map(|n| (n.id.as_str(), n.label.as_str(), n.layer)),
            &self.edges,
            &[],
        )
    }
}

fn render<'a>(
    orientation: Orientation,
    nodes: impl Iterator<Item = (&'a str, &'a str, Layer)>,
    edges: &[Relationship],
    conflicts: &[Conflict],
) -> String {
    let mut out = format!("graph {}\n", orientation.mermaid());
    let mut aliases: HashMap<&str, String> = HashMap::new();
    let mut classes: Vec<(String, Layer)> = Vec::new();

    for (index, (id, label, layer)) in nodes.enumerate() {
        let alias = format!("n{index}");
        let _ = writeln!(out, "    {alias}[\"{}\"]", escape(&display_label(label)));
        classes.push((alias.clone(), layer));
        aliases.insert(id, alias);
    }

    for edge in edges {
        let (Some(source), Some(target)) = (
            aliases.get(edge.source_id.as_str()),
            aliases.get(edge.target_id.as_str()),
        ) else {
            continue;
        };
        let arrow = if edge.auto_detected || edge.relation_type == RelationType::UserDefined {
            "-.->"
        } else {
            "-->"
        };
        let _ = writeln!(
            out,
            "    {source} {arrow}|{}| {target}",
            edge.relation_type.as_str()
        );
    }

    for conflict in conflicts {
        if let (Some(a), Some(b)) = (
            aliases.get(conflict.item1.id.as_str()),
            aliases.get(conflict.item2.id.as_str()),
        ) {
            let _ = writeln!(out, "    {a} x--x|{}| {b}", escape(&conflict.dimension));
        }
    }

    for layer in [Layer::Identity, Layer::Culture, Layer::Behavior, Layer::Execution] {
        let members: Vec<&str> = classes
            .iter()
            .filter(|(_, l)| *l == layer)
            .map(|(alias, _)| alias.as_str())
            .collect();
        if members.is_empty() {
            continue;
        }
        let name = layer_class(layer);
        let _ = writeln!(out, "    classDef {name} {}", layer_style(layer));
        let _ = writeln!(out, "    class {} {name}", members.join(","));
    }
    out
}

fn escape(text: &str) -> String {
    text.replace('"', "#quot;").replace(['\n', '\r'], " ")
}

const fn layer_class(layer: Layer) -> &'static str {
    match layer {
        Layer::Identity => "identity",
        Layer::Culture => "culture",
        Layer::Behavior => "behavior",
        Layer::Execution => "execution",
    }
}

const fn layer_style(layer: Layer) -> &'static str {
    match layer {
        Layer::Identity => "fill:#e8f0fe,stroke:#1a73e8",
        Layer::Culture => "fill:#fef7e0,stroke:#f9ab00",
        Layer::Behavior => "fill:#e6f4ea,stroke:#188038",
        Layer::Execution => "fill:#fce8e6,stroke:#d93025",
    }
}
