use std::io::{self, Write};

use linker_core::types::{Mapping, RecordKey};

/// Destination of flushed mappings.
pub trait Sink: Send {
    /// Write every mapping of one record. Implementations write the record in
    /// one call so a failed attempt can be retried without duplicating lines.
    fn emit(&mut self, key: &RecordKey, mappings: &[Mapping]) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()>;
}

/// One `record-id \t mention \t kb-id` line per mapping; the id column is
/// empty for unresolved mentions.
pub struct TsvSink<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> TsvSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> Sink for TsvSink<W> {
    fn emit(&mut self, key: &RecordKey, mappings: &[Mapping]) -> io::Result<()> {
        if mappings.is_empty() {
            return Ok(());
        }
        let id = clean(&key.id);
        let mut block = String::new();
        for mapping in mappings {
            let resolved = mapping.resolved_id.as_deref().unwrap_or("");
            block.push_str(&format!("{}\t{}\t{}\n", id, clean(&mapping.mention.name), clean(resolved)));
        }
        self.out.write_all(block.as_bytes())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

// Tabs and newlines inside a column would break the line format.
fn clean(s: &str) -> String {
    s.replace(['\t', '\n', '\r'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use linker_core::types::{Category, Mention};

    #[test]
    fn writes_one_line_per_mapping() {
        let mut sink = TsvSink::new(Vec::new());
        let key = RecordKey::new("rec-001");
        let mappings = [
            Mapping { mention: Mention::new("Paris", Category::Gpe), resolved_id: Some("Q90".into()) },
            Mapping { mention: Mention::new("New\tYork", Category::Gpe), resolved_id: None },
        ];
        sink.emit(&key, &mappings).unwrap();
        sink.emit(&RecordKey::new("rec-002"), &[]).unwrap();
        sink.flush().unwrap();
        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(out, "rec-001\tParis\tQ90\nrec-001\tNew York\t\n");
    }

    // Accepts `budget` bytes per write_all, then fails the rest of the call.
    struct ShortWriter {
        written: Vec<u8>,
        budget: usize,
        calls: usize,
    }

    impl Write for ShortWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.calls += 1;
            if self.calls == 1 && buf.len() > self.budget {
                return Err(io::Error::new(io::ErrorKind::WriteZero, "disk full"));
            }
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn record_is_written_in_one_call() {
        let mut sink = TsvSink::new(ShortWriter { written: Vec::new(), budget: 10, calls: 0 });
        let key = RecordKey::new("rec-003");
        let mappings = [
            Mapping { mention: Mention::new("Paris", Category::Gpe), resolved_id: Some("Q90".into()) },
            Mapping { mention: Mention::new("France", Category::Gpe), resolved_id: Some("Q142".into()) },
        ];
        assert!(sink.emit(&key, &mappings).is_err());
        sink.emit(&key, &mappings).unwrap();
        let out = String::from_utf8(sink.into_inner().written).unwrap();
        assert_eq!(out, "rec-003\tParis\tQ90\nrec-003\tFrance\tQ142\n");
    }
}
