//! Dictionary-based entity recognizer over popularity dumps.
//!
//! Each dump line is `<kb id>\t<label>\t<uri>`; every label in a dump is
//! recognised with the dump's category, and the dump's id is returned as the
//! label's known resolution. Matching is greedy longest-match over word
//! tokens, and a match must start with a capitalised word.
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use linker_core::traits::EntityRecognizer;
use linker_core::types::{Category, Mention};

const MAX_PHRASE_TOKENS: usize = 8;

#[derive(Debug, Clone)]
struct Label {
    category: Category,
    id: Option<String>,
}

#[derive(Debug, Default)]
pub struct GazetteerRecognizer {
    labels: HashMap<String, Label>,
    max_tokens: usize,
}

impl GazetteerRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one label with no known id. The first entry registered for a label
    /// is kept.
    pub fn add_label(&mut self, label: &str, category: Category) {
        self.add_entry(label, category, None);
    }

    /// Add one label and the knowledge-base id it resolves to.
    pub fn add_entry(&mut self, label: &str, category: Category, id: Option<&str>) {
        let tokens = tokenize(label);
        if tokens.is_empty() || tokens.len() > MAX_PHRASE_TOKENS {
            return;
        }
        self.max_tokens = self.max_tokens.max(tokens.len());
        let id = id.map(str::trim).filter(|id| !id.is_empty()).map(str::to_string);
        self.labels.entry(tokens.join(" ")).or_insert(Label { category, id });
    }

    pub fn load_dump<R: BufRead>(&mut self, reader: R, category: Category) -> Result<usize> {
        let mut added = 0;
        for line in reader.lines() {
            let line = line?;
            let mut cols = line.split('\t');
            let (Some(id), Some(label)) = (cols.next(), cols.next()) else { continue };
            self.add_entry(label.trim(), category, Some(id));
            added += 1;
        }
        Ok(added)
    }

    pub fn load_file(&mut self, path: &Path, category: Category) -> Result<usize> {
        let file = File::open(path).with_context(|| format!("Failed to open gazetteer {}", path.display()))?;
        let added = self.load_dump(BufReader::new(file), category)?;
        tracing::info!(path = %path.display(), %category, labels = added, "gazetteer loaded");
        Ok(added)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl EntityRecognizer for GazetteerRecognizer {
    fn recognize(&self, text: &str) -> Vec<Mention> {
        let mut mentions = Vec::new();
        for line in text.lines() {
            let tokens = tokenize(line);
            let mut i = 0;
            while i < tokens.len() {
                let found = starts_capitalised(tokens[i])
                    .then(|| {
                        let longest = self.max_tokens.min(tokens.len() - i);
                        (1..=longest).rev().find_map(|n| {
                            let phrase = tokens[i..i + n].join(" ");
                            self.labels.get(&phrase).map(|label| (n, Mention::new(phrase, label.category)))
                        })
                    })
                    .flatten();
                match found {
                    Some((n, mention)) => {
                        mentions.push(mention);
                        i += n;
                    }
                    None => i += 1,
                }
            }
        }
        mentions
    }

    fn known_id(&self, mention: &Mention) -> Option<String> {
        self.labels.get(&mention.name).filter(|label| label.category == mention.category)?.id.clone()
    }
}

fn tokenize(text: &str) -> Vec<&str> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '&' && c != '\''))
        .map(|w| w.trim_end_matches("'s"))
        .filter(|w| !w.is_empty())
        .collect()
}

fn starts_capitalised(token: &str) -> bool {
    token.chars().next().is_some_and(|c| c.is_uppercase() || c.is_ascii_digit())
}
