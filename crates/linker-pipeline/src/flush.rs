//! Background drain of finished records from the job table to the sink.
use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use linker_core::types::RecordKey;

use crate::job_table::JobTable;
use crate::sink::Sink;

/// Outcome of one [`flush_cycle`].
#[derive(Debug, Default)]
pub struct FlushPass {
    pub lines: usize,
    /// Entries the sink rejected; they stay done and unflushed.
    pub failed: Vec<(RecordKey, io::Error)>,
    pub flush_error: Option<io::Error>,
}

/// One pass over the table: write every done-but-unflushed entry, mark it
/// flushed, then remove it. Pending entries are left alone.
///
/// A rejected entry does not stop the pass; it is reported in
/// [`FlushPass::failed`] and left in place for the next pass.
pub fn flush_cycle(table: &JobTable, sink: &mut dyn Sink) -> FlushPass {
    let mut pass = FlushPass::default();
    for key in table.keys() {
        let Some(entry) = table.get(&key) else {
            continue;
        };
        if !entry.is_ready() {
            continue;
        }
        match sink.emit(&key, entry.mappings()) {
            Ok(()) => {
                pass.lines += entry.mappings().len();
                if table.mark_flushed(&key) {
                    table.remove(&key);
                }
            }
            Err(e) => pass.failed.push((key, e)),
        }
    }
    if pass.lines > 0 {
        pass.flush_error = sink.flush().err();
    }
    pass
}

/// What the daemon did over its lifetime.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FlushSummary {
    pub lines: usize,
    /// Records dropped after the sink rejected them too many times.
    pub dropped: usize,
    pub last_error: Option<String>,
}

pub struct FlushDaemon<S: Sink> {
    table: Arc<JobTable>,
    sink: S,
    interval: Duration,
    max_attempts: u32,
    attempts: HashMap<RecordKey, u32>,
    summary: FlushSummary,
}

impl<S: Sink> FlushDaemon<S> {
    pub fn new(table: Arc<JobTable>, sink: S, interval: Duration) -> Self {
        Self { table, sink, interval, max_attempts: 3, attempts: HashMap::new(), summary: FlushSummary::default() }
    }

    /// Failed writes tolerated per record before it is removed unwritten.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Flush on every tick or completion signal until `shutdown` flips to
    /// true (or its sender is dropped), then run one final pass. Returns the
    /// sink and a summary of the writes.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> (S, FlushSummary) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let table = self.table.clone();
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = table.completed().notified() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
            self.cycle();
        }
        self.cycle();
        tracing::debug!(lines = self.summary.lines, dropped = self.summary.dropped, "flush daemon stopped");
        (self.sink, self.summary)
    }

    fn cycle(&mut self) {
        let pass = flush_cycle(&self.table, &mut self.sink);
        if pass.lines > 0 {
            tracing::debug!(lines = pass.lines, remaining = self.table.len(), "flushed records");
        }
        self.summary.lines += pass.lines;
        if let Some(e) = pass.flush_error {
            tracing::error!(error = %e, "sink flush failed");
            self.summary.last_error = Some(e.to_string());
        }

        // Every ready entry is attempted on each pass, so only this pass's
        // failures carry a count forward.
        let mut attempts = HashMap::new();
        for (key, e) in pass.failed {
            let count = self.attempts.get(&key).copied().unwrap_or(0) + 1;
            if count >= self.max_attempts {
                tracing::error!(record = %key, attempts = count, error = %e, "sink rejected record, dropping it");
                self.table.remove(&key);
                self.summary.dropped += 1;
            } else {
                tracing::warn!(record = %key, attempts = count, error = %e, "sink write failed, retrying next cycle");
                attempts.insert(key, count);
            }
            self.summary.last_error = Some(e.to_string());
        }
        self.attempts = attempts;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::TsvSink;
    use linker_core::types::{Category, Mapping, Mention};

    fn mapping(name: &str, id: Option<&str>) -> Mapping {
        Mapping { mention: Mention::new(name, Category::Gpe), resolved_id: id.map(str::to_string) }
    }

    #[test]
    fn cycle_writes_done_entries_once_and_skips_pending() {
        let table = JobTable::new(4);
        let done = RecordKey::new("rec-001");
        let pending = RecordKey::new("rec-002");
        table.insert_pending(done.clone());
        table.insert_pending(pending.clone());
        table.complete(&done, vec![mapping("Paris", Some("Q90")), mapping("Atlantis", None)]);

        let mut sink = TsvSink::new(Vec::new());
        assert_eq!(flush_cycle(&table, &mut sink).lines, 2);
        assert_eq!(flush_cycle(&table, &mut sink).lines, 0, "idempotent");
        assert!(table.get(&done).is_none());
        assert_eq!(table.get(&pending), Some(crate::JobEntry::pending()));
        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(out, "rec-001\tParis\tQ90\nrec-001\tAtlantis\t\n");
    }

    /// Rejects every record whose id is listed, accepts the rest.
    struct PickySink {
        rejected: Vec<&'static str>,
        out: TsvSink<Vec<u8>>,
    }

    impl Sink for PickySink {
        fn emit(&mut self, key: &RecordKey, mappings: &[Mapping]) -> io::Result<()> {
            if self.rejected.contains(&key.id.as_str()) {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"));
            }
            self.out.emit(key, mappings)
        }

        fn flush(&mut self) -> io::Result<()> {
            self.out.flush()
        }
    }

    #[test]
    fn failed_write_keeps_entry_and_pass_continues() {
        let table = JobTable::new(1);
        for id in ["rec-003", "rec-004"] {
            let key = RecordKey::new(id);
            table.insert_pending(key.clone());
            table.complete(&key, vec![mapping("Paris", Some("Q90"))]);
        }
        let mut sink = PickySink { rejected: vec!["rec-003"], out: TsvSink::new(Vec::new()) };
        let pass = flush_cycle(&table, &mut sink);
        assert_eq!(pass.lines, 1);
        assert_eq!(pass.failed.len(), 1);
        assert_eq!(pass.failed[0].0, RecordKey::new("rec-003"));
        assert!(table.get(&RecordKey::new("rec-003")).unwrap().is_ready());
        assert!(table.get(&RecordKey::new("rec-004")).is_none());
        assert_eq!(String::from_utf8(sink.out.into_inner()).unwrap(), "rec-004\tParis\tQ90\n");
    }

    #[tokio::test]
    async fn daemon_drains_on_completion_and_shutdown() {
        let table = Arc::new(JobTable::new(4));
        let (tx, rx) = watch::channel(false);
        let daemon = FlushDaemon::new(table.clone(), TsvSink::new(Vec::new()), Duration::from_secs(3600));
        let handle = tokio::spawn(daemon.run(rx));

        let key = RecordKey::new("rec-005");
        table.insert_pending(key.clone());
        table.complete(&key, vec![mapping("Paris", Some("Q90"))]);
        for _ in 0..100 {
            if table.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(table.is_empty());

        tx.send(true).unwrap();
        let (sink, summary) = handle.await.unwrap();
        assert_eq!(summary, FlushSummary { lines: 1, dropped: 0, last_error: None });
        assert_eq!(String::from_utf8(sink.into_inner()).unwrap(), "rec-005\tParis\tQ90\n");
    }

    #[tokio::test]
    async fn daemon_drops_records_the_sink_keeps_rejecting() {
        let table = Arc::new(JobTable::new(4));
        let (tx, rx) = watch::channel(false);
        let sink = PickySink { rejected: vec!["rec-006"], out: TsvSink::new(Vec::new()) };
        let daemon = FlushDaemon::new(table.clone(), sink, Duration::from_millis(20)).with_max_attempts(2);
        let handle = tokio::spawn(daemon.run(rx));

        for id in ["rec-006", "rec-007"] {
            let key = RecordKey::new(id);
            table.insert_pending(key.clone());
            table.complete(&key, vec![mapping("Paris", Some("Q90"))]);
        }
        for _ in 0..200 {
            if table.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(table.is_empty(), "rejected record was never dropped");
        assert!(!table.insert_pending(RecordKey::new("rec-006")));

        tx.send(true).unwrap();
        let (sink, summary) = handle.await.unwrap();
        assert_eq!(summary.lines, 1);
        assert_eq!(summary.dropped, 1);
        assert!(summary.last_error.unwrap().contains("closed"));
        assert_eq!(String::from_utf8(sink.out.into_inner()).unwrap(), "rec-007\tParis\tQ90\n");
    }
}
