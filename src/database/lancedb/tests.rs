use super::*;

fn record(id: &str, vector: Vec<f32>, chunk: Option<u32>) -> VectorRecord {
    VectorRecord {
        id: id.to_string(),
        vector,
        document: Document {
            page_content: format!("content {}", id),
            metadata: DocumentMetadata {
                page: 2,
                chunk,
                source: chunk.map_or_else(|| "2".to_string(), |c| format!("2-{}", c)),
                file_id: Some("abc123".to_string()),
                file_name: Some("report.pdf".to_string()),
            },
        },
    }
}

#[test]
fn schema_declares_dimension() {
    let schema = chunk_schema(5);
    assert_eq!(schema_dimension(&schema), Some(5));
    assert!(schema.field_with_name("file_id").is_ok());
    assert!(schema.field_with_name("source").is_ok());
}

#[test]
fn batch_roundtrip_keeps_metadata() {
    let records = vec![
        record("1", vec![0.1, 0.2, 0.3], Some(1)),
        record("2", vec![0.4, 0.5, 0.6], None),
    ];

    let batch = records_to_batch(&records, 3).expect("should build batch");
    assert_eq!(batch.num_rows(), 2);

    let hits = batch_to_hits(&batch).expect("should parse batch");
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].document, records[0].document);
    assert_eq!(hits[1].document.metadata.chunk, None);
    assert_eq!(hits[1].document.metadata.source, "2");
    assert!(hits[0].distance.abs() < f32::EPSILON);
}

#[test]
fn batch_rejects_wrong_dimension() {
    let records = vec![record("1", vec![0.1, 0.2], Some(1))];
    assert!(records_to_batch(&records, 3).is_err());
}

#[test]
fn batch_requires_file_id() {
    let mut bad = record("1", vec![0.1], Some(1));
    bad.document.metadata.file_id = None;
    assert!(records_to_batch(&[bad], 1).is_err());
}

#[test]
fn table_names_are_sanitized() {
    assert_eq!(
        table_name_for("openai:text-embedding-ada-002"),
        "chunks_openai_text-embedding-ada-002"
    );
    assert_eq!(
        table_name_for("ollama:nomic-embed-text:latest"),
        "chunks_ollama_nomic-embed-text_latest"
    );
}

#[test]
fn literals_are_escaped() {
    assert_eq!(quote_literal("abc"), "'abc'");
    assert_eq!(quote_literal("it's"), "'it''s'");
}
