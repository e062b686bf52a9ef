use compass_protocol::NodeType;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("No {node_type} node with id '{id}'")]
    NodeNotFound { id: String, node_type: NodeType },

    #[error("Unknown node id '{0}'")]
    UnknownNode(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse snapshot {path}: {source:#}")]
    Parse {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store has no backing file; use save_to")]
    NoBackingFile,

    #[error("Snippet text for {0} is empty")]
    EmptySnippet(NodeType),
}
