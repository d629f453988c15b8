//! In-memory triple store loaded from an N-Triples dump.
//!
//! Terms are kept verbatim (`<uri>`, `_:blank`, `"literal"@lang`) and
//! interned into dense [`KbId`]s. Only the subject index is built, which is
//! all the ranking reads need.
use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use linker_core::traits::KnowledgeBase;
use linker_core::types::{AttributeSet, KbId};

const PROGRESS_EVERY: usize = 10_000_000;

#[derive(Default)]
pub struct TripleStore {
    ids: HashMap<String, KbId>,
    terms: Vec<String>,
    by_subject: HashMap<KbId, AttributeSet>,
    triples: usize,
}

impl TripleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `path`, gunzipping when it ends in `.gz`.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Failed to open knowledge base {}", path.display()))?;
        let reader: Box<dyn Read> = if path.extension().is_some_and(|ext| ext == "gz") {
            Box::new(MultiGzDecoder::new(file))
        } else {
            Box::new(file)
        };
        let store = Self::from_reader(BufReader::new(reader))
            .with_context(|| format!("Failed to load knowledge base {}", path.display()))?;
        let (triples, terms) = (store.num_triples(), store.num_terms());
        tracing::info!(path = %path.display(), triples, terms, "knowledge base loaded");
        Ok(store)
    }

    /// Parse N-Triples from `reader`. Malformed lines are counted and skipped;
    /// read errors abort the load.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut store = Self::new();
        let mut malformed = 0usize;
        for line in reader.lines() {
            let line = line?;
            match parse_line(&line) {
                Some(Some((s, p, o))) => store.insert(s, p, o),
                Some(None) => {}
                None => {
                    malformed += 1;
                    tracing::debug!(line = %line, "skipping malformed triple");
                }
            }
            if store.triples > 0 && store.triples % PROGRESS_EVERY == 0 {
                tracing::info!(triples = store.triples, "loading knowledge base");
            }
        }
        if malformed > 0 {
            tracing::warn!(malformed, "skipped malformed N-Triples lines");
        }
        Ok(store)
    }

    pub fn from_triples<I, S>(triples: I) -> Self
    where
        I: IntoIterator<Item = (S, S, S)>,
        S: AsRef<str>,
    {
        let mut store = Self::new();
        for (s, p, o) in triples {
            store.insert(s.as_ref(), p.as_ref(), o.as_ref());
        }
        store
    }

    pub fn insert(&mut self, subject: &str, predicate: &str, object: &str) {
        let s = self.intern(subject);
        let p = self.intern(predicate);
        let o = self.intern(object);
        if self.by_subject.entry(s).or_default().insert((p, o)) {
            self.triples += 1;
        }
    }

    fn intern(&mut self, term: &str) -> KbId {
        if let Some(id) = self.ids.get(term) {
            return *id;
        }
        let id = KbId(self.terms.len() as u64);
        self.terms.push(term.to_string());
        self.ids.insert(term.to_string(), id);
        id
    }

    pub fn num_triples(&self) -> usize {
        self.triples
    }

    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }
}

impl KnowledgeBase for TripleStore {
    fn lookup_id(&self, uri: &str) -> Result<Option<KbId>> {
        Ok(self.ids.get(uri).copied())
    }

    fn attributes_of(&self, id: KbId) -> Result<AttributeSet> {
        Ok(self.by_subject.get(&id).cloned().unwrap_or_default())
    }

    fn exists(&self, subject: KbId, predicate: KbId, object: KbId) -> Result<bool> {
        Ok(self.by_subject.get(&subject).is_some_and(|attrs| attrs.contains(&(predicate, object))))
    }
}

/// `None` for a malformed line, `Some(None)` for blanks and comments.
fn parse_line(line: &str) -> Option<Option<(&str, &str, &str)>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Some(None);
    }
    let body = line.strip_suffix('.')?.trim_end();
    let (subject, rest) = body.split_once(char::is_whitespace)?;
    let (predicate, object) = rest.trim_start().split_once(char::is_whitespace)?;
    let object = object.trim();
    if !is_node(subject) || !predicate.starts_with('<') || object.is_empty() {
        return None;
    }
    Some(Some((subject, predicate, object)))
}

fn is_node(term: &str) -> bool {
    term.starts_with('<') || term.starts_with("_:")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_iris_blanks_and_literals() {
        assert_eq!(
            parse_line("<http://e/Q90> <http://p/P31> <http://e/Q515> ."),
            Some(Some(("<http://e/Q90>", "<http://p/P31>", "<http://e/Q515>")))
        );
        assert_eq!(
            parse_line("_:b1 <http://p/label> \"Paris, the city\"@en ."),
            Some(Some(("_:b1", "<http://p/label>", "\"Paris, the city\"@en")))
        );
        assert_eq!(parse_line("   "), Some(None));
        assert_eq!(parse_line("# comment"), Some(None));
        assert_eq!(parse_line("<a> <b> <c>"), None);
        assert_eq!(parse_line("\"lit\" <b> <c> ."), None);
    }

    #[test]
    fn duplicate_triples_count_once() {
        let store = TripleStore::from_triples([("<s>", "<p>", "<o>"), ("<s>", "<p>", "<o>"), ("<s>", "<p>", "<o2>")]);
        assert_eq!(store.num_triples(), 2);
        assert_eq!(store.num_terms(), 4);
        let s = store.lookup_id("<s>").unwrap().unwrap();
        assert_eq!(store.attributes_of(s).unwrap().len(), 2);
    }
}
