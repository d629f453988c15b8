use anyhow::{Context, Result};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::sync::{mpsc, watch};

use linker_core::config::{resolve_with_base, PipelineSettings, Settings};
use linker_core::error::Error;
use linker_core::types::Category;
use linker_kb::{CandidateRanker, Gateway, TripleStore, Vocabulary};
use linker_text::{CandidateGenerator, LabelSearcher};

use crate::flush::FlushDaemon;
use crate::gazetteer::GazetteerRecognizer;
use crate::html::HtmlTextExtractor;
use crate::job_table::JobTable;
use crate::processor::{Collaborators, RecordOutcome, RecordProcessor};
use crate::sink::Sink;
use crate::warc::{list_archives, open_archive, WarcMetadataParser};

/// Counters for one or more archives.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub archives: usize,
    pub records: usize,
    pub skipped: usize,
    pub duplicates: usize,
    pub completed: usize,
    pub timed_out: usize,
    pub mentions: usize,
    pub read_errors: usize,
    pub lines: usize,
}

impl RunReport {
    fn record(&mut self, outcome: RecordOutcome) {
        self.records += 1;
        match outcome {
            RecordOutcome::Skipped => self.skipped += 1,
            RecordOutcome::Duplicate => self.duplicates += 1,
            RecordOutcome::Completed { mentions } => {
                self.completed += 1;
                self.mentions += mentions;
            }
            RecordOutcome::TimedOut => self.timed_out += 1,
        }
    }

    pub fn merge(&mut self, other: RunReport) {
        self.archives += other.archives;
        self.records += other.records;
        self.skipped += other.skipped;
        self.duplicates += other.duplicates;
        self.completed += other.completed;
        self.timed_out += other.timed_out;
        self.mentions += other.mentions;
        self.read_errors += other.read_errors;
        self.lines += other.lines;
    }
}

pub struct Pipeline {
    table: Arc<JobTable>,
    processor: Arc<RecordProcessor>,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(table: Arc<JobTable>, processor: Arc<RecordProcessor>, settings: PipelineSettings) -> Self {
        Self { table, processor, settings }
    }

    /// Wire the default collaborators from configuration. Relative paths
    /// resolve against `base`. Loading the knowledge base, the label index or
    /// a gazetteer is fatal.
    pub fn from_settings(settings: &Settings, base: &Path) -> Result<Self> {
        let table = Arc::new(JobTable::new(settings.pipeline.job_table_shards));

        let index_dir = resolve_with_base(base, &settings.search.index_dir);
        let searcher = LabelSearcher::open(index_dir)?;
        tracing::info!(documents = searcher.num_docs(), "label index opened");
        let limit = settings.search.candidate_limit;
        let generator = Arc::new(CandidateGenerator::new(Arc::new(searcher), limit));

        let store = TripleStore::open(&resolve_with_base(base, &settings.kb.path))?;
        let gateway = Arc::new(Gateway::new(Box::new(store)));
        let vocab = Vocabulary::from_settings(&settings.kb);
        let ranker = Arc::new(CandidateRanker::new(gateway, vocab));

        let mut recognizer = GazetteerRecognizer::new();
        for g in &settings.ner.gazetteers {
            let category = Category::parse(&g.category)
                .ok_or_else(|| Error::InvalidConfig(format!("unknown gazetteer category '{}'", g.category)))?;
            recognizer.load_file(&resolve_with_base(base, &g.path), category)?;
        }
        if recognizer.is_empty() {
            tracing::warn!("no gazetteer labels loaded, no mentions will be recognised");
        }

        let collaborators = Collaborators {
            parser: Arc::new(WarcMetadataParser),
            extractor: Arc::new(HtmlTextExtractor),
            recognizer: Arc::new(recognizer),
        };
        let processor =
            Arc::new(RecordProcessor::new(table.clone(), collaborators, generator, ranker, &settings.pipeline));
        Ok(Self::new(table, processor, settings.pipeline.clone()))
    }

    pub fn table(&self) -> &Arc<JobTable> {
        &self.table
    }

    /// Process one archive's records: start the flush daemon, run the worker
    /// pool over the stream, wait for the table to drain, stop the daemon.
    /// A read error ends the archive early and is counted in the report.
    /// Records the sink kept rejecting make the whole archive fail once the
    /// table has drained.
    pub async fn run_archive<I, S>(&self, records: I, sink: S) -> Result<(S, RunReport)>
    where
        I: Iterator<Item = io::Result<String>> + Send + 'static,
        S: Sink + 'static,
    {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let daemon = FlushDaemon::new(self.table.clone(), sink, self.settings.flush_interval())
            .with_max_attempts(self.settings.sink_retries);
        let daemon = tokio::spawn(daemon.run(shutdown_rx));

        let workers = self.settings.workers.max(1);
        let (tx, rx) = mpsc::channel::<io::Result<String>>(workers * 2);
        let reader = tokio::task::spawn_blocking(move || {
            for item in records {
                let failed = item.is_err();
                if tx.blocking_send(item).is_err() || failed {
                    break;
                }
            }
        });

        let mut read_errors = 0;
        let incoming = stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|item| (item, rx)) });
        let outcomes: Vec<_> = incoming
            .filter_map(|item| {
                let raw = match item {
                    Ok(raw) => Some(raw),
                    Err(e) => {
                        tracing::error!(error = %e, "archive read failed, stopping this archive");
                        read_errors += 1;
                        None
                    }
                };
                async move { raw }
            })
            .map(|raw| {
                let processor = self.processor.clone();
                async move { tokio::spawn(async move { processor.process(raw).await }).await }
            })
            .buffer_unordered(workers)
            .collect()
            .await;

        let mut report = RunReport { archives: 1, read_errors, ..Default::default() };
        for outcome in outcomes {
            match outcome {
                Ok(outcome) => report.record(outcome),
                Err(e) => tracing::error!(error = %e, "record task failed"),
            }
        }
        reader.await.context("archive reader task failed")?;

        while !self.table.is_empty() && !daemon.is_finished() {
            tracing::debug!(remaining = self.table.len(), "waiting for job table to drain");
            tokio::time::sleep(self.settings.drain_poll()).await;
        }
        // A dead daemon drops its receiver; the join below reports why.
        let _ = shutdown_tx.send(true);
        let (sink, summary) = daemon.await.context("flush daemon failed")?;
        if summary.dropped > 0 {
            anyhow::bail!(
                "sink rejected {} records after {} attempts each: {}",
                summary.dropped,
                self.settings.sink_retries,
                summary.last_error.unwrap_or_default()
            );
        }
        report.lines = summary.lines;
        Ok((sink, report))
    }

    /// Run every archive under `inputs` in turn. An archive that cannot be
    /// opened aborts the run.
    pub async fn run_paths<S>(&self, inputs: &[PathBuf], mut sink: S) -> Result<(S, RunReport)>
    where
        S: Sink + 'static,
    {
        let archives = list_archives(inputs)?;
        tracing::info!(archives = archives.len(), "starting run");
        let mut total = RunReport::default();
        for path in archives {
            let reader = open_archive(&path)?;
            let (returned, report) = self
                .run_archive(reader, sink)
                .await
                .with_context(|| format!("Failed to process {}", path.display()))?;
            sink = returned;
            tracing::info!(
                archive = %path.display(),
                records = report.records,
                completed = report.completed,
                skipped = report.skipped,
                timed_out = report.timed_out,
                lines = report.lines,
                "archive done"
            );
            total.merge(report);
        }
        Ok((sink, total))
    }
}
