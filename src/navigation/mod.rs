//! Category tree walks and verse grouping over already-fetched archive data.

mod tree;
mod verse_layout;

pub use tree::{CategoryForest, MAX_BREADCRUMB_DEPTH};
pub use verse_layout::{layout, HemistichPair, VerseLayout};
