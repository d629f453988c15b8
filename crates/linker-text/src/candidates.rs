//! Mention → candidate generation over the label index.
//!
//! Results are memoized per mention for the lifetime of the generator,
//! including empty results from failed searches.
use std::sync::Arc;

use linker_core::cache::Memo;
use linker_core::traits::SearchIndex;
use linker_core::types::{Candidate, Mention, SearchHit};

use crate::tantivy_utils::{DESCRIPTION_FIELD, LABEL_FIELDS};

pub const DISAMBIGUATION_MARKER: &str = "Wikimedia disambiguation page";

pub struct CandidateGenerator {
    index: Arc<dyn SearchIndex>,
    limit: usize,
    cache: Memo<Mention, Arc<Vec<Candidate>>>,
}

impl CandidateGenerator {
    pub fn new(index: Arc<dyn SearchIndex>, limit: usize) -> Self {
        Self { index, limit, cache: Memo::new() }
    }

    /// Candidates for `mention` in descending search relevance. Never fails:
    /// a search error yields no candidates.
    pub fn generate(&self, mention: &Mention) -> Arc<Vec<Candidate>> {
        self.cache.get_or_insert_with(mention, || Arc::new(self.query(mention)))
    }

    fn query(&self, mention: &Mention) -> Vec<Candidate> {
        match self.index.search(&mention.name, &LABEL_FIELDS, self.limit) {
            Ok(hits) => hits.into_iter().filter_map(to_candidate).collect(),
            Err(e) => {
                tracing::warn!(
                    mention = %mention.name,
                    category = %mention.category,
                    error = %e,
                    "candidate search failed"
                );
                Vec::new()
            }
        }
    }

    pub fn cached_mentions(&self) -> usize {
        self.cache.len()
    }
}

fn to_candidate(hit: SearchHit) -> Option<Candidate> {
    let description = hit.fields.get(DESCRIPTION_FIELD).cloned().unwrap_or_default();
    if description.contains(DISAMBIGUATION_MARKER) {
        return None;
    }
    let label = LABEL_FIELDS.iter().find_map(|f| hit.fields.get(*f)).cloned().unwrap_or_default();
    Some(Candidate { id: hit.id, relevance: hit.score, label, description })
}
