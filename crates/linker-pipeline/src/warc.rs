//! WARC 1.0 archive framing and record-header parsing.
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use linker_core::error::Error;
use linker_core::traits::MetadataParser;
use linker_core::types::RecordKey;

pub const WARC_DELIMITER: &str = "WARC/1.0";

/// Lazy, single-pass sequence of raw record blocks. Each block is the text
/// between two `WARC/1.0` lines; invalid UTF-8 is replaced, blank blocks are
/// skipped.
pub struct WarcReader<R: BufRead> {
    reader: R,
    buf: Vec<u8>,
    finished: bool,
}

impl<R: BufRead> WarcReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, buf: Vec::new(), finished: false }
    }

    fn next_block(&mut self) -> io::Result<String> {
        let mut block = String::new();
        loop {
            self.buf.clear();
            if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
                self.finished = true;
                return Ok(block);
            }
            let line = String::from_utf8_lossy(&self.buf);
            if line.trim() == WARC_DELIMITER {
                return Ok(block);
            }
            block.push_str(&line);
        }
    }
}

impl<R: BufRead> Iterator for WarcReader<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            match self.next_block() {
                Ok(block) if block.trim().is_empty() => continue,
                Ok(block) => return Some(Ok(block)),
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}

/// Open an archive for reading, gunzipping `*.gz` files.
pub fn open_archive(path: &Path) -> Result<WarcReader<Box<dyn BufRead + Send>>> {
    let file = File::open(path).with_context(|| format!("Failed to open archive {}", path.display()))?;
    let inner: Box<dyn Read + Send> = if path.extension().is_some_and(|ext| ext == "gz") {
        Box::new(MultiGzDecoder::new(file))
    } else {
        Box::new(file)
    };
    Ok(WarcReader::new(Box::new(BufReader::new(inner))))
}

/// Expand files and directories into the archive files they contain
/// (`*.warc`, `*.warc.gz`), sorted per directory.
pub fn list_archives(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut archives = Vec::new();
    for input in inputs {
        if input.is_file() {
            archives.push(input.clone());
            continue;
        }
        if !input.exists() {
            anyhow::bail!("Archive path does not exist: {}", input.display());
        }
        let mut found: Vec<PathBuf> = WalkDir::new(input)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| is_archive(p))
            .collect();
        found.sort();
        archives.extend(found);
    }
    Ok(archives)
}

fn is_archive(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    name.ends_with(".warc") || name.ends_with(".warc.gz")
}

/// Reads the WARC header block (up to the first blank line). The TREC id is
/// the primary key; every other field is optional.
#[derive(Debug, Default, Clone, Copy)]
pub struct WarcMetadataParser;

impl MetadataParser for WarcMetadataParser {
    fn parse(&self, raw: &str) -> linker_core::Result<RecordKey> {
        let mut id = None;
        let mut key = RecordKey::new(String::new());
        let mut in_header = false;
        for line in raw.lines() {
            let line = line.trim_end();
            if line.is_empty() {
                if in_header {
                    break;
                }
                continue;
            }
            in_header = true;
            let Some((name, value)) = line.split_once(": ") else { continue };
            let value = value.trim();
            match name {
                "WARC-Type" => key.kind = Some(value.to_string()),
                "WARC-Date" => match DateTime::parse_from_rfc3339(value) {
                    Ok(date) => key.date = Some(date.with_timezone(&Utc)),
                    Err(e) => tracing::warn!(date = value, error = %e, "record date format is not correct"),
                },
                "WARC-Trec-ID" | "WARC-TREC-ID" if is_trec_id(value) => id = Some(value.to_string()),
                "WARC-IP-Address" => key.ip_address = Some(value.to_string()),
                "WARC-Payload-Digest" => key.digest = Some(value.to_string()),
                "WARC-Target-URI" => key.uri = Some(value.to_string()),
                "WARC-Record-ID" => key.record_id = Some(value.to_string()),
                _ => {}
            }
        }
        key.id = id.ok_or(Error::MissingIdentifier)?;
        Ok(key)
    }
}

fn is_trec_id(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    const RECORD: &str = "WARC-Type: response\r\n\
WARC-Date: 2012-02-10T21:49:38Z\r\n\
WARC-TREC-ID: clueweb12-0000tw-00-00010\r\n\
WARC-IP-Address: 100.42.59.11\r\n\
WARC-Payload-Digest: sha1:3I42H3S6NNFQ2MSVX7XZKYAYSCX5QBYJ\r\n\
WARC-Target-URI: http://example.org/paris\r\n\
WARC-Record-ID: <urn:uuid:f638c914-658d-418a-93f8-6e89a4858359>\r\n\
Content-Length: 10\r\n\r\n\
HTTP/1.1 200 OK\r\n";

    #[test]
    fn parses_header_fields() {
        let key = WarcMetadataParser.parse(RECORD).unwrap();
        assert_eq!(key.id, "clueweb12-0000tw-00-00010");
        assert_eq!(key.kind.as_deref(), Some("response"));
        assert_eq!(key.date.unwrap().to_rfc3339(), "2012-02-10T21:49:38+00:00");
        assert_eq!(key.ip_address.as_deref(), Some("100.42.59.11"));
        assert_eq!(key.uri.as_deref(), Some("http://example.org/paris"));
        assert_eq!(key.record_id.as_deref(), Some("<urn:uuid:f638c914-658d-418a-93f8-6e89a4858359>"));
    }

    #[test]
    fn missing_trec_id_is_an_error() {
        let raw = "WARC-Type: warcinfo\r\nWARC-Date: not-a-date\r\n\r\n";
        assert!(matches!(WarcMetadataParser.parse(raw), Err(Error::MissingIdentifier)));
    }

    #[test]
    fn reader_splits_on_version_lines() {
        let archive =
            format!("{WARC_DELIMITER}\r\n{RECORD}body one\n{WARC_DELIMITER}\r\nWARC-Trec-ID: second\n\nbody two\n");
        let blocks: Vec<String> = WarcReader::new(archive.as_bytes()).collect::<io::Result<_>>().unwrap();
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].ends_with("body one\n"));
        assert_eq!(WarcMetadataParser.parse(&blocks[1]).unwrap().id, "second");
    }
}
