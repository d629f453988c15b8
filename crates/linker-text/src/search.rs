use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::PathBuf;
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::{Field, Value};
use tantivy::{Index, IndexReader, ReloadPolicy, TantivyDocument};

use linker_core::traits::SearchIndex;
use linker_core::types::SearchHit;

use crate::tantivy_utils::{register_tokenizer, DESCRIPTION_FIELD, ID_FIELD, LABEL_FIELDS};

pub struct LabelSearcher {
    index: Index,
    reader: IndexReader,
    id_field: Field,
    stored_fields: HashMap<&'static str, Field>,
}

impl LabelSearcher {
    pub fn open(index_dir: PathBuf) -> Result<Self, anyhow::Error> {
        let index = Index::open_in_dir(&index_dir)
            .map_err(|e| anyhow!("Failed to open label index at {}: {}", index_dir.display(), e))?;
        Self::from_index(index)
    }

    pub(crate) fn from_index(index: Index) -> Result<Self, anyhow::Error> {
        register_tokenizer(&index);
        let reader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into()?;
        let schema = index.schema();
        let id_field = schema.get_field(ID_FIELD)?;
        let mut stored_fields = HashMap::new();
        for name in LABEL_FIELDS.into_iter().chain([DESCRIPTION_FIELD]) {
            stored_fields.insert(name, schema.get_field(name)?);
        }
        Ok(Self { index, reader, id_field, stored_fields })
    }

    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }
}

impl SearchIndex for LabelSearcher {
    fn search(&self, query: &str, fields: &[&str], limit: usize) -> Result<Vec<SearchHit>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let default_fields = fields
            .iter()
            .map(|name| self.stored_fields.get(name).copied().ok_or_else(|| anyhow!("unknown search field '{}'", name)))
            .collect::<Result<Vec<_>>>()?;
        let qp = QueryParser::for_index(&self.index, default_fields);
        // Mention text is free text, not query syntax: keep whatever parses.
        let (q, errors) = qp.parse_query_lenient(query);
        if !errors.is_empty() {
            tracing::debug!(query, errors = errors.len(), "lenient query parse dropped parts of the query");
        }
        let searcher = self.reader.searcher();
        let top_docs = searcher.search(&q, &TopDocs::with_limit(limit))?;
        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, addr) in top_docs {
            let doc: TantivyDocument = searcher.doc(addr)?;
            let Some(id) = doc.get_first(self.id_field).and_then(|v| v.as_str()).map(str::to_string) else { continue };
            let mut stored = HashMap::new();
            for (name, field) in &self.stored_fields {
                if let Some(value) = doc.get_first(*field).and_then(|v| v.as_str()) {
                    stored.insert((*name).to_string(), value.to_string());
                }
            }
            hits.push(SearchHit { id, score, fields: stored });
        }
        Ok(hits)
    }
}
