//! Domain types shared by the search, knowledge-base and pipeline crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identity of one archive record.
///
/// - `id`: primary identifier (the TREC id of the record); the only field
///   taking part in equality and hashing
/// - `kind`/`date`/`ip_address`/`digest`/`uri`/`record_id`: optional header
///   metadata, informational only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordKey {
    pub id: String,
    pub kind: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub ip_address: Option<String>,
    pub digest: Option<String>,
    pub uri: Option<String>,
    pub record_id: Option<String>,
}

impl RecordKey {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), kind: None, date: None, ip_address: None, digest: None, uri: None, record_id: None }
    }
}

impl PartialEq for RecordKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for RecordKey {}

impl Hash for RecordKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Entity category assigned by the recognizer.
///
/// The set is closed. Numeric labels (`CARDINAL`, `ORDINAL`, `QUANTITY`,
/// `MONEY`, `PERCENT`) are never linked and have no variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Person,
    Norp,
    Fac,
    Org,
    Gpe,
    Loc,
    Product,
    Event,
    WorkOfArt,
    Law,
    Language,
    Date,
    Time,
}

impl Category {
    pub const ALL: [Category; 13] = [
        Category::Person,
        Category::Norp,
        Category::Fac,
        Category::Org,
        Category::Gpe,
        Category::Loc,
        Category::Product,
        Category::Event,
        Category::WorkOfArt,
        Category::Law,
        Category::Language,
        Category::Date,
        Category::Time,
    ];

    /// Parse a recognizer label. Returns `None` for numeric and unknown labels.
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim().to_ascii_uppercase();
        Self::ALL.into_iter().find(|c| c.label() == label)
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Person => "PERSON",
            Category::Norp => "NORP",
            Category::Fac => "FAC",
            Category::Org => "ORG",
            Category::Gpe => "GPE",
            Category::Loc => "LOC",
            Category::Product => "PRODUCT",
            Category::Event => "EVENT",
            Category::WorkOfArt => "WORK_OF_ART",
            Category::Law => "LAW",
            Category::Language => "LANGUAGE",
            Category::Date => "DATE",
            Category::Time => "TIME",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A recognised span of text naming an entity. Used as a cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mention {
    pub name: String,
    pub category: Category,
}

impl Mention {
    pub fn new(name: impl Into<String>, category: Category) -> Self {
        Self { name: name.into(), category }
    }
}

/// A knowledge-base entry proposed by lexical search for a mention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub relevance: f32,
    pub label: String,
    pub description: String,
}

/// Final decision for one mention of a record. `resolved_id` is `None` when
/// no candidate was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    pub mention: Mention,
    pub resolved_id: Option<String>,
}

/// A raw hit returned by a search index: document id, relevance and the
/// stored fields that were present on the document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
    pub fields: HashMap<String, String>,
}

/// Internal identifier of a term in the knowledge base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KbId(pub u64);

impl fmt::Display for KbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `(predicate, object)` pair attached to a subject.
pub type Attribute = (KbId, KbId);
pub type AttributeSet = HashSet<Attribute>;
