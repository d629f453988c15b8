use tantivy::schema::{IndexRecordOption, Schema, TextFieldIndexing, TextOptions, STORED, STRING};
use tantivy::tokenizer::{AsciiFoldingFilter, LowerCaser, SimpleTokenizer, TextAnalyzer};
use tantivy::Index;

pub const ID_FIELD: &str = "id";
pub const DESCRIPTION_FIELD: &str = "schema_description";

/// Label fields in preference order: the first one present on a document is
/// its display label.
pub const LABEL_FIELDS: [&str; 5] = ["schema_name", "rdfs_label", "skos_prefLabel", "skos_altLabel", "wikidata_P1476"];

pub const LABEL_TOKENIZER: &str = "label";

pub fn build_schema() -> Schema {
    let mut schema_builder = Schema::builder();
    let _id_field = schema_builder.add_text_field(ID_FIELD, STRING | STORED);
    let label_indexing = TextFieldIndexing::default()
        .set_tokenizer(LABEL_TOKENIZER)
        .set_index_option(IndexRecordOption::WithFreqsAndPositions);
    let label_options = TextOptions::default().set_indexing_options(label_indexing).set_stored();
    for name in LABEL_FIELDS {
        let _label_field = schema_builder.add_text_field(name, label_options.clone());
    }
    let _description_field = schema_builder.add_text_field(DESCRIPTION_FIELD, STORED);
    schema_builder.build()
}

/// Labels keep stop words ("The Who", "It"): only lowercase and fold accents.
pub fn register_tokenizer(index: &Index) {
    let tokenizer = TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(LowerCaser)
        .filter(AsciiFoldingFilter)
        .build();
    index.tokenizers().register(LABEL_TOKENIZER, tokenizer);
}
