use crate::graph::{NodeType, Relationship};
use crate::layout::GraphLayout;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Discrete, serialized actions applied by the single state-owning writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum StoreCommand {
    /// Rewrite the label-bearing field of the record behind a node.
    EditNode {
        id: String,
        node_type: NodeType,
        new_label: String,
    },
    /// Overlay positions onto the durable layout after a drag ends.
    SaveLayout { layout: GraphLayout },
    /// User connected two nodes on the canvas.
    AddManualEdge { source_id: String, target_id: String },
    /// Merge relationships (e.g. accepted suggestions) into the durable list.
    SaveRelationships { relationships: Vec<Relationship> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_are_tagged() {
        let cmd: StoreCommand = serde_json::from_str(
            r#"{"command":"edit_node","id":"value-v1","node_type":"value","new_label":"Pace"}"#,
        )
        .unwrap();
        assert_eq!(
            cmd,
            StoreCommand::EditNode {
                id: "value-v1".into(),
                node_type: NodeType::Value,
                new_label: "Pace".into()
            }
        );
    }
}
