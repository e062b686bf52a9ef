//! # Compass Graph
//!
//! Synchronous half of the alignment engine: everything that is recomputed
//! from scratch on every snapshot change.
//!
//! ## Architecture
//!
//! ```text
//! StatementSnapshot
//!     │
//!     ├──> Graph Builder
//!     │      ├─ One node per filled statement / array entry
//!     │      ├─ Semantic tags per node (keyword lexicon)
//!     │      └─ Hierarchical edges + stored user relationships
//!     │
//!     ├──> Conflict Detector
//!     │      └─ Pairwise opposing-concept scan (symmetric)
//!     │
//!     └──> Alignment Scorer
//!            ├─ completeness / density / conflict scores
//!            └─ templated insights
//! ```

mod builder;
mod conflicts;
mod engine;
mod error;
mod lexicon;
mod scorer;
mod tagger;

pub use builder::GraphBuilder;
pub use conflicts::ConflictDetector;
pub use engine::{AlignmentEngine, Evaluation};
pub use error::{GraphError, Result};
pub use lexicon::{AlignmentWeights, ConflictPenalties, Lexicon, Opposition, SeverityThresholds};
pub use scorer::{completeness, density, AlignmentScorer};
pub use tagger::SemanticTagger;
