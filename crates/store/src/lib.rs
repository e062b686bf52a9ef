//! # Compass Store
//!
//! Durable side of the engine. [`IdentityStore`] is the single writer of
//! the authored snapshot (including the canvas layout and relationship
//! list) and the [`GraphHost`](compass_canvas::GraphHost) the canvas
//! persists through. [`SnippetLibrary`] is an unrelated pub/sub catalogue
//! of reusable statement wording.

mod error;
mod library;
mod locate;
mod store;

pub use error::{Result, StoreError};
pub use library::{LibraryEvent, Snippet, SnippetLibrary};
pub use store::IdentityStore;
