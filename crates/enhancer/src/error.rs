use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EnhancerError>;

/// Failures of the external suggestion capability. These never reach the
/// caller of `enhance`; they are logged and the base graph is kept.
#[derive(Error, Debug)]
pub enum EnhancerError {
    #[error("suggestion capability failed: {0:#}")]
    Capability(#[from] anyhow::Error),

    #[error("suggestion capability timed out after {0:?}")]
    Timeout(Duration),
}
