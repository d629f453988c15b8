//! Seams to the collaborators around the linking core.
//!
//! Each one has a default implementation elsewhere in the workspace (WARC
//! header parser, HTML extractor, gazetteer, tantivy label index, in-memory
//! triple store) and a fake in the tests.
use crate::types::{AttributeSet, KbId, Mention, RecordKey, SearchHit};

pub trait MetadataParser: Send + Sync {
    /// Fails with [`crate::Error::MissingIdentifier`] when the record has no
    /// primary id.
    fn parse(&self, raw: &str) -> crate::Result<RecordKey>;
}

pub trait TextExtractor: Send + Sync {
    /// Plain text of the record's page. Malformed input yields an empty string.
    fn extract(&self, raw: &str) -> String;
}

pub trait EntityRecognizer: Send + Sync {
    /// Mentions in extraction order. May contain repeats.
    fn recognize(&self, text: &str) -> Vec<Mention>;

    /// Knowledge-base id the recognizer already knows for `mention`, letting
    /// the caller skip candidate search and ranking.
    fn known_id(&self, _mention: &Mention) -> Option<String> {
        None
    }
}

pub trait SearchIndex: Send + Sync {
    /// Keyword search restricted to `fields`; hits in descending relevance.
    fn search(&self, query: &str, fields: &[&str], limit: usize) -> anyhow::Result<Vec<SearchHit>>;
}

/// Read contract of the knowledge-base store. Implementations need not be
/// safe for concurrent reads; callers serialize access.
pub trait KnowledgeBase: Send {
    fn lookup_id(&self, uri: &str) -> anyhow::Result<Option<KbId>>;
    fn attributes_of(&self, id: KbId) -> anyhow::Result<AttributeSet>;
    fn exists(&self, subject: KbId, predicate: KbId, object: KbId) -> anyhow::Result<bool>;
}
