use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use std::path::PathBuf;
use tantivy::schema::Field;
use tantivy::{Index, IndexWriter, TantivyDocument};

use crate::search::LabelSearcher;
use crate::tantivy_utils::{build_schema, register_tokenizer, DESCRIPTION_FIELD, ID_FIELD, LABEL_FIELDS};

const WRITER_HEAP_BYTES: usize = 50_000_000;
const COMMIT_EVERY: usize = 100_000;

/// One knowledge-base entity as exported for the label index (JSON lines).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityDoc {
    pub id: String,
    pub schema_name: Option<String>,
    pub rdfs_label: Option<String>,
    #[serde(rename = "skos_prefLabel")]
    pub skos_pref_label: Option<String>,
    #[serde(rename = "skos_altLabel")]
    pub skos_alt_label: Option<String>,
    #[serde(rename = "wikidata_P1476")]
    pub wikidata_p1476: Option<String>,
    pub schema_description: Option<String>,
}

impl EntityDoc {
    /// Label values aligned with [`LABEL_FIELDS`].
    fn labels(&self) -> [Option<&str>; 5] {
        [
            self.schema_name.as_deref(),
            self.rdfs_label.as_deref(),
            self.skos_pref_label.as_deref(),
            self.skos_alt_label.as_deref(),
            self.wikidata_p1476.as_deref(),
        ]
    }
}

pub struct LabelIndexer {
    index: Index,
    id_field: Field,
    label_fields: Vec<Field>,
    description_field: Field,
}

impl LabelIndexer {
    /// Create a fresh on-disk index, replacing whatever was in `index_dir`.
    pub fn create(index_dir: PathBuf) -> Result<Self, anyhow::Error> {
        if index_dir.exists() {
            std::fs::remove_dir_all(&index_dir)?;
        }
        std::fs::create_dir_all(&index_dir)?;
        let index = Index::create_in_dir(&index_dir, build_schema())?;
        Self::from_index(index)
    }

    pub fn create_in_ram() -> Result<Self, anyhow::Error> {
        Self::from_index(Index::create_in_ram(build_schema()))
    }

    fn from_index(index: Index) -> Result<Self, anyhow::Error> {
        register_tokenizer(&index);
        let schema = index.schema();
        let id_field = schema.get_field(ID_FIELD)?;
        let label_fields = LABEL_FIELDS.iter().map(|name| schema.get_field(name)).collect::<Result<Vec<_>, _>>()?;
        let description_field = schema.get_field(DESCRIPTION_FIELD)?;
        Ok(Self { index, id_field, label_fields, description_field })
    }

    fn to_document(&self, entity: &EntityDoc) -> TantivyDocument {
        let mut doc = TantivyDocument::default();
        doc.add_text(self.id_field, &entity.id);
        for (field, value) in self.label_fields.iter().zip(entity.labels()) {
            if let Some(value) = value {
                doc.add_text(*field, value);
            }
        }
        if let Some(description) = &entity.schema_description {
            doc.add_text(self.description_field, description);
        }
        doc
    }

    pub fn index_entities(&self, entities: &[EntityDoc]) -> Result<usize> {
        let mut index_writer: IndexWriter = self.index.writer(WRITER_HEAP_BYTES)?;
        for entity in entities {
            index_writer.add_document(self.to_document(entity))?;
        }
        index_writer.commit()?;
        Ok(entities.len())
    }

    /// Index a JSON-lines export. Lines that fail to parse are logged and
    /// skipped; `on_progress` receives the running count of indexed entities.
    pub fn index_jsonl<R, F>(&self, reader: R, mut on_progress: F) -> Result<usize>
    where
        R: BufRead,
        F: FnMut(usize),
    {
        let mut index_writer: IndexWriter = self.index.writer(WRITER_HEAP_BYTES)?;
        let mut indexed = 0usize;
        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entity: EntityDoc = match serde_json::from_str(&line) {
                Ok(entity) => entity,
                Err(e) => {
                    tracing::warn!(line = line_no + 1, error = %e, "skipping malformed entity line");
                    continue;
                }
            };
            index_writer.add_document(self.to_document(&entity))?;
            indexed += 1;
            if indexed % COMMIT_EVERY == 0 {
                index_writer.commit()?;
            }
            on_progress(indexed);
        }
        index_writer.commit()?;
        Ok(indexed)
    }

    /// Read side over everything committed so far.
    pub fn searcher(&self) -> Result<LabelSearcher> {
        LabelSearcher::from_index(self.index.clone())
    }
}
