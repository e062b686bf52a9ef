use thiserror::Error;

pub type Result<T> = std::result::Result<T, CanvasError>;

#[derive(Error, Debug)]
pub enum CanvasError {
    #[error("Node not rendered: {0}")]
    UnknownNode(String),

    #[error("Host failed to persist {what}: {source:#}")]
    Persist {
        what: &'static str,
        #[source]
        source: anyhow::Error,
    },
}
