// LanceDB vector database module
// Arrow schema and record conversion for chunk embeddings

#[cfg(test)]
mod tests;

pub mod vector_store;

use std::sync::Arc;

use arrow::array::{Array, FixedSizeListArray, Float32Array, StringArray, UInt32Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;

use super::{SearchHit, VectorRecord};
use crate::parsing::{Document, DocumentMetadata};
use crate::{QaError, Result};

pub use vector_store::LanceVectorStore;

/// Column holding the embedding
pub const VECTOR_COLUMN: &str = "vector";
/// Column LanceDB adds to search results
pub const DISTANCE_COLUMN: &str = "_distance";

/// Table schema for vectors of `vector_dim` dimensions
#[inline]
pub fn chunk_schema(vector_dim: usize) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new(
            VECTOR_COLUMN,
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, false)),
                vector_dim as i32,
            ),
            false,
        ),
        Field::new("file_id", DataType::Utf8, false),
        Field::new("file_name", DataType::Utf8, true),
        Field::new("page", DataType::UInt32, false),
        Field::new("chunk", DataType::UInt32, true),
        Field::new("source", DataType::Utf8, false),
        Field::new("content", DataType::Utf8, false),
    ]))
}

/// Vector dimension declared by a table schema
#[inline]
pub fn schema_dimension(schema: &Schema) -> Option<usize> {
    schema
        .fields()
        .iter()
        .find(|f| f.name() == VECTOR_COLUMN)
        .and_then(|f| match f.data_type() {
            DataType::FixedSizeList(_, size) => usize::try_from(*size).ok(),
            _ => None,
        })
}

/// Build a record batch from records that all have `vector_dim` dimensions
#[inline]
pub fn records_to_batch(records: &[VectorRecord], vector_dim: usize) -> Result<RecordBatch> {
    let len = records.len();

    let mut ids = Vec::with_capacity(len);
    let mut file_ids = Vec::with_capacity(len);
    let mut file_names = Vec::with_capacity(len);
    let mut pages = Vec::with_capacity(len);
    let mut chunks = Vec::with_capacity(len);
    let mut sources = Vec::with_capacity(len);
    let mut contents = Vec::with_capacity(len);
    let mut flat_values = Vec::with_capacity(len * vector_dim);

    for record in records {
        if record.vector.len() != vector_dim {
            return Err(QaError::Database(format!(
                "Vector dimension mismatch: table has {} but record {} has {}",
                vector_dim,
                record.id,
                record.vector.len()
            )));
        }

        let metadata = &record.document.metadata;
        let file_id = metadata.file_id.as_deref().ok_or_else(|| {
            QaError::Database(format!("Record {} has no file id", record.id))
        })?;

        ids.push(record.id.as_str());
        flat_values.extend_from_slice(&record.vector);
        file_ids.push(file_id);
        file_names.push(metadata.file_name.as_deref());
        pages.push(metadata.page);
        chunks.push(metadata.chunk);
        sources.push(metadata.source.as_str());
        contents.push(record.document.page_content.as_str());
    }

    let values_array = Float32Array::from(flat_values);
    let field = Arc::new(Field::new("item", DataType::Float32, false));
    let vector_array =
        FixedSizeListArray::try_new(field, vector_dim as i32, Arc::new(values_array), None)
            .map_err(|e| QaError::Database(format!("Failed to create vector array: {}", e)))?;

    let arrays: Vec<Arc<dyn Array>> = vec![
        Arc::new(StringArray::from(ids)),
        Arc::new(vector_array),
        Arc::new(StringArray::from(file_ids)),
        Arc::new(StringArray::from(file_names)),
        Arc::new(UInt32Array::from(pages)),
        Arc::new(UInt32Array::from(chunks)),
        Arc::new(StringArray::from(sources)),
        Arc::new(StringArray::from(contents)),
    ];

    RecordBatch::try_new(chunk_schema(vector_dim), arrays)
        .map_err(|e| QaError::Database(format!("Failed to create record batch: {}", e)))
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| QaError::Database(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| QaError::Database(format!("Invalid {} column type", name)))
}

fn u32_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a UInt32Array> {
    batch
        .column_by_name(name)
        .ok_or_else(|| QaError::Database(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<UInt32Array>()
        .ok_or_else(|| QaError::Database(format!("Invalid {} column type", name)))
}

/// Parse a search result batch. Rows without a distance get `0.0`.
#[inline]
pub fn batch_to_hits(batch: &RecordBatch) -> Result<Vec<SearchHit>> {
    let file_ids = string_column(batch, "file_id")?;
    let file_names = string_column(batch, "file_name")?;
    let pages = u32_column(batch, "page")?;
    let chunks = u32_column(batch, "chunk")?;
    let sources = string_column(batch, "source")?;
    let contents = string_column(batch, "content")?;

    let distances = batch
        .column_by_name(DISTANCE_COLUMN)
        .and_then(|col| col.as_any().downcast_ref::<Float32Array>());

    let hits = (0..batch.num_rows())
        .map(|row| {
            let document = Document {
                page_content: contents.value(row).to_string(),
                metadata: DocumentMetadata {
                    page: pages.value(row),
                    chunk: (!chunks.is_null(row)).then(|| chunks.value(row)),
                    source: sources.value(row).to_string(),
                    file_id: Some(file_ids.value(row).to_string()),
                    file_name: (!file_names.is_null(row))
                        .then(|| file_names.value(row).to_string()),
                },
            };

            let distance =
                distances.map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

            SearchHit { document, distance }
        })
        .collect();

    Ok(hits)
}

/// SQL string literal with quotes escaped
#[inline]
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Table name derived from an embedder signature.
///
/// LanceDB table names may only contain alphanumerics, `_`, `-` and `.`.
#[inline]
pub fn table_name_for(signature: &str) -> String {
    let sanitized: String = signature
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("chunks_{}", sanitized)
}
