//! Per-record work: identify the record, find its mentions, resolve each
//! mention and hand the result to the job table.
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};

use linker_core::config::PipelineSettings;
use linker_core::traits::{EntityRecognizer, MetadataParser, TextExtractor};
use linker_core::types::{Mapping, Mention};
use linker_kb::CandidateRanker;
use linker_text::CandidateGenerator;

use crate::job_table::JobTable;

/// The record-level collaborators: header parser, text extractor and
/// entity recognizer.
#[derive(Clone)]
pub struct Collaborators {
    pub parser: Arc<dyn MetadataParser>,
    pub extractor: Arc<dyn TextExtractor>,
    pub recognizer: Arc<dyn EntityRecognizer>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// No primary id; never entered the table.
    Skipped,
    /// Id already seen in this run.
    Duplicate,
    Completed { mentions: usize },
    /// Gave up after the record timeout; completed with no mappings.
    TimedOut,
}

pub struct RecordProcessor {
    table: Arc<JobTable>,
    collaborators: Collaborators,
    generator: Arc<CandidateGenerator>,
    ranker: Arc<CandidateRanker>,
    mention_workers: usize,
    timeout: Duration,
}

impl RecordProcessor {
    pub fn new(
        table: Arc<JobTable>,
        collaborators: Collaborators,
        generator: Arc<CandidateGenerator>,
        ranker: Arc<CandidateRanker>,
        settings: &PipelineSettings,
    ) -> Self {
        Self {
            table,
            collaborators,
            generator,
            ranker,
            mention_workers: settings.mention_workers.max(1),
            timeout: settings.record_timeout(),
        }
    }

    pub async fn process(&self, raw: String) -> RecordOutcome {
        let key = match self.collaborators.parser.parse(&raw) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!(error = %e, "skipping record");
                return RecordOutcome::Skipped;
            }
        };
        if !self.table.insert_pending(key.clone()) {
            tracing::warn!(record = %key, "duplicate record id, skipping");
            return RecordOutcome::Duplicate;
        }
        match tokio::time::timeout(self.timeout, self.link(raw)).await {
            Ok(mappings) => {
                let mentions = mappings.len();
                self.table.complete(&key, mappings);
                tracing::debug!(record = %key, mentions, "record linked");
                RecordOutcome::Completed { mentions }
            }
            Err(_) => {
                let timeout_secs = self.timeout.as_secs_f64();
                tracing::warn!(record = %key, timeout_secs, "record timed out, completing without mappings");
                self.table.complete(&key, Vec::new());
                RecordOutcome::TimedOut
            }
        }
    }

    async fn link(&self, raw: String) -> Vec<Mapping> {
        let extractor = self.collaborators.extractor.clone();
        let recognizer = self.collaborators.recognizer.clone();
        let mentions = tokio::task::spawn_blocking(move || recognizer.recognize(&extractor.extract(&raw)))
            .await
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "entity recognition task failed");
                Vec::new()
            });
        stream::iter(dedup(mentions))
            .map(|mention| self.resolve(mention))
            .buffered(self.mention_workers)
            .collect()
            .await
    }

    async fn resolve(&self, mention: Mention) -> Mapping {
        if let Some(id) = self.collaborators.recognizer.known_id(&mention) {
            tracing::trace!(mention = %mention.name, %id, "resolved from gazetteer");
            return Mapping { mention, resolved_id: Some(id) };
        }
        let generator = self.generator.clone();
        let ranker = self.ranker.clone();
        let key = mention.clone();
        let resolved_id = tokio::task::spawn_blocking(move || {
            let candidates = generator.generate(&key);
            ranker.choose(&key, &candidates)
        })
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "mention resolution task failed");
            None
        });
        Mapping { mention, resolved_id }
    }
}

/// Drop repeated mentions, keeping first-seen order.
fn dedup(mentions: Vec<Mention>) -> Vec<Mention> {
    let mut seen = std::collections::HashSet::new();
    mentions.into_iter().filter(|m| seen.insert(m.clone())).collect()
}
