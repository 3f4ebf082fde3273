use tantivy::schema::{
    Field, FieldType as EngineFieldType, IndexRecordOption, Schema, TextFieldIndexing, TextOptions,
    STORED, STRING,
};
use tracing::debug;
use crate::analysis::analyzer::AnalyzerRegistry;
use crate::core::error::{Error, Result};
use crate::schema::model::ModelDescriptor;

/// Text field of the search schema and the analyzer it was indexed with
#[derive(Debug, Clone, PartialEq)]
pub struct TextFieldDefinition {
    pub name: String,
    pub analyzer: String,
}

/// Index schema derived from a model descriptor
#[derive(Debug, Clone)]
pub struct SearchSchema {
    pub schema: Schema,
    pub key_field: String,
    pub text_fields: Vec<TextFieldDefinition>,
}

impl SearchSchema {
    /// One stored unique key field plus one text field per searchable textual attribute.
    pub fn derive(
        descriptor: &ModelDescriptor,
        analyzers: &AnalyzerRegistry,
        analyzer: &str,
    ) -> Result<Self> {
        descriptor.validate()?;
        if !analyzers.contains(analyzer) {
            return Err(Error::config(format!(
                "Model '{}' uses unknown analyzer '{}'",
                descriptor.name, analyzer
            )));
        }

        let key = descriptor.primary_key_attribute()?;
        let mut builder = Schema::builder();
        builder.add_text_field(&key.name, STRING | STORED);

        let mut text_fields = Vec::new();
        for name in descriptor.searchable_names() {
            let Some(attribute) = descriptor.attribute(name) else {
                continue;
            };
            if attribute.primary_key {
                continue;
            }
            if !attribute.storage_type.is_textual() {
                debug!(
                    model = %descriptor.name,
                    attribute = %attribute.name,
                    storage_type = ?attribute.storage_type,
                    "skipping non-textual searchable attribute"
                );
                continue;
            }

            let indexing = TextFieldIndexing::default()
                .set_tokenizer(analyzer)
                .set_index_option(IndexRecordOption::WithFreqsAndPositions);
            builder.add_text_field(name, TextOptions::default().set_indexing_options(indexing));
            text_fields.push(TextFieldDefinition {
                name: name.to_string(),
                analyzer: analyzer.to_string(),
            });
        }

        Ok(SearchSchema {
            schema: builder.build(),
            key_field: key.name.clone(),
            text_fields,
        })
    }

    /// Recover the layout of an index that already exists on disk.
    ///
    /// The stored schema governs: text fields are whatever the index holds,
    /// not what the descriptor declares today.
    pub fn from_existing(schema: Schema, key_field: &str) -> Result<Self> {
        let key = schema.get_field(key_field).map_err(|_| {
            Error::config(format!(
                "Existing index has no key field '{}'; rebuild it",
                key_field
            ))
        })?;

        let mut text_fields = Vec::new();
        for (field, entry) in schema.fields() {
            if field == key {
                continue;
            }
            if let EngineFieldType::Str(options) = entry.field_type() {
                if let Some(indexing) = options.get_indexing_options() {
                    text_fields.push(TextFieldDefinition {
                        name: entry.name().to_string(),
                        analyzer: indexing.tokenizer().to_string(),
                    });
                }
            }
        }

        Ok(SearchSchema {
            schema,
            key_field: key_field.to_string(),
            text_fields,
        })
    }

    pub fn key(&self) -> Result<Field> {
        Ok(self.schema.get_field(&self.key_field)?)
    }

    pub fn text_field_names(&self) -> Vec<&str> {
        self.text_fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn has_text_field(&self, name: &str) -> bool {
        self.text_fields.iter().any(|f| f.name == name)
    }
}
