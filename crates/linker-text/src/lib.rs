//! linker-text
//!
//! Tantivy label index over knowledge-base entities and the candidate
//! generator that queries it. See `index` for building, `search` for the
//! read side and `candidates` for mention → candidate generation.
pub mod candidates;
pub mod index;
pub mod search;
pub mod tantivy_utils;

pub use candidates::CandidateGenerator;
pub use index::{EntityDoc, LabelIndexer};
pub use search::LabelSearcher;
