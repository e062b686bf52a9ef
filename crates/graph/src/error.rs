use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Invalid lexicon: {0}")]
    InvalidLexicon(String),

    #[error("Lexicon is not valid JSON or TOML: {0}")]
    LexiconParse(String),

    #[error("Failed to read lexicon {path}: {source}")]
    LexiconIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
