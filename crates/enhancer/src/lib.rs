//! # Compass Enhancer
//!
//! Asynchronous half of the alignment engine: asks an external capability
//! for extra relationships and folds the accepted ones into a base graph.
//!
//! ```text
//! OntologyGraph (base)
//!     │
//!     └──> EnhancementScheduler ── debounce ── generation check
//!            │
//!            ├─ cache hit (same node set) ─────────────┐
//!            │                                         │
//!            └──> RelationshipEnhancer                 │
//!                   ├─ RelationshipSuggester::suggest  │
//!                   ├─ validate / clamp / dedup        │
//!                   └─ merge ─────────────────────────>┴──> watch channel
//! ```
//!
//! Capability failures never propagate: the base graph is published instead.

mod enhancer;
mod error;
mod scheduler;
mod suggester;

pub use enhancer::{merge_suggestions, EnhancerConfig, RelationshipEnhancer};
pub use error::{EnhancerError, Result};
pub use scheduler::{EnhancedGraph, EnhancementScheduler, SchedulerConfig};
pub use suggester::{
    GraphSummary, NoopSuggester, RelationshipSuggester, StaticSuggester, SuggestedRelationship,
    SummaryEdge, SummaryNode,
};
