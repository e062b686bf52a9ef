//! # Compass Canvas
//!
//! Visual side of the identity graph: where nodes go and how the picture
//! follows a graph that is rebuilt from scratch on every edit.
//!
//! ```text
//! OntologyGraph (computed) ──┐
//! StatementSnapshot (durable)┤
//!                            └──> GraphSynchronizer ── Idle → Diffing → Applying → Idle
//!                                   ├─ LayoutEngine (ranks over the hierarchy)
//!                                   ├─ RenderedGraph (positions, user pins)
//!                                   └─ GraphHost callbacks (layout, relationships)
//! ```
//!
//! User edits (dragged positions, drawn edges) survive every sync; only
//! the host decides what becomes durable.

mod dismissals;
mod error;
mod host;
mod label;
mod layout;
mod mermaid;
mod sync;

pub use dismissals::ConflictDismissals;
pub use error::{CanvasError, Result};
pub use host::GraphHost;
pub use label::{display_label, MAX_LABEL_CHARS};
pub use layout::{LayoutConfig, LayoutEngine, Orientation, DEFAULT_NODE_SEP, DEFAULT_RANK_SEP};
pub use mermaid::to_mermaid;
pub use sync::{GraphSynchronizer, RenderedGraph, RenderedNode, SyncDelta, SyncState};
