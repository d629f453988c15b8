use std::sync::Arc;

use linker_core::cache::Memo;
use linker_core::types::{Candidate, Mention};

use crate::gateway::{Gateway, GatewaySession};
use crate::scorer::{Scorer, Vocabulary};

/// Picks one knowledge-base id per mention from its candidates.
///
/// Decisions are memoized per mention; the first decision for a mention is
/// the one every later call returns.
pub struct CandidateRanker {
    gateway: Arc<Gateway>,
    vocab: Vocabulary,
    decisions: Memo<Mention, String>,
}

impl CandidateRanker {
    pub fn new(gateway: Arc<Gateway>, vocab: Vocabulary) -> Self {
        Self { gateway, vocab, decisions: Memo::new() }
    }

    /// Highest scoring candidate id. Ties go to the earliest candidate, so
    /// `candidates` must arrive in a fixed order (search relevance).
    pub fn choose(&self, mention: &Mention, candidates: &[Candidate]) -> Option<String> {
        if candidates.is_empty() {
            return None;
        }
        if let Some(id) = self.decisions.get(mention) {
            return Some(id);
        }
        let scores = self.score_all(mention, candidates);
        let mut best = 0;
        for (i, score) in scores.iter().enumerate().skip(1) {
            if *score > scores[best] {
                best = i;
            }
        }
        let chosen = candidates[best].id.clone();
        tracing::debug!(
            mention = %mention.name,
            category = %mention.category,
            chosen = %chosen,
            score = scores[best],
            candidates = candidates.len(),
            "mention resolved"
        );
        Some(self.decisions.insert(mention.clone(), chosen))
    }

    /// Scores aligned with `candidates`, computed under one gateway session.
    pub fn score_all(&self, mention: &Mention, candidates: &[Candidate]) -> Vec<f64> {
        let scorer = Scorer::for_category(mention.category);
        if scorer == Scorer::Neutral {
            return vec![0.0; candidates.len()];
        }
        let session = self.gateway.session();
        candidates.iter().map(|c| self.score(&session, scorer, c)).collect()
    }

    fn score(&self, session: &GatewaySession<'_>, scorer: Scorer, candidate: &Candidate) -> f64 {
        match session.lookup_id(&self.vocab.entity(&candidate.id)) {
            Some(subject) => scorer.score(session, &self.vocab, subject),
            None => 0.0,
        }
    }

    pub fn cached_decisions(&self) -> usize {
        self.decisions.len()
    }
}
