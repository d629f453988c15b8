//! linker-kb
//!
//! Knowledge-base side of entity linking: the in-memory triple store, the
//! serialized gateway in front of it, the per-category scorers and the
//! candidate ranker that picks one knowledge-base id per mention.
pub mod gateway;
pub mod ranker;
pub mod scorer;
pub mod store;

pub use gateway::{Gateway, GatewaySession};
pub use ranker::CandidateRanker;
pub use scorer::{Scorer, Vocabulary};
pub use store::TripleStore;
