use std::sync::Arc;

use serial_test::serial;
use superpumped_server::{
    ingest::NoteIngestor,
    models::{ingestions::IngestStep, vectors::VectorRecord},
    stores::{IngestionStore, NoteStore, PgStore, VectorIndex},
};

mod utils;

async fn pg_store() -> Result<PgStore, Box<dyn std::error::Error>> {
    // Make sure there's a database URL and it points to a test database so
    // prod isn't goofed during testing.
    let db_connection_url = dotenvy::var("DATABASE_URL")?;
    utils::reset_database(&db_connection_url)?;
    let pool = superpumped_server::connect(db_connection_url).await?;
    Ok(PgStore::new(pool))
}

#[tokio::test]
#[serial]
#[ignore = "requires a Postgres database with pgvector at DATABASE_URL"]
async fn vectors_upsert_and_rank() -> Result<(), Box<dyn std::error::Error>> {
    let store = pg_store().await?;
    let near = VectorRecord {
        id: "1".to_string(),
        values: vec![1.0, 0.0, 0.0],
    };
    let far = VectorRecord {
        id: "2".to_string(),
        values: vec![0.0, 0.0, 1.0],
    };
    store.upsert(vec![near.clone(), far]).await?;
    store.upsert(vec![near]).await?;

    let matches = store.query(&[0.9, 0.1, 0.0], 5).await?;
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].id, "1");
    assert!(matches[0].score > matches[1].score);
    Ok(())
}

#[tokio::test]
#[serial]
#[ignore = "requires a Postgres database with pgvector at DATABASE_URL"]
async fn ingestion_is_persisted() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(pg_store().await?);
    let base_url = utils::spawn_model_api().await?;
    let embedder = Arc::new(utils::model_client(&base_url)?);
    let ingestor = NoteIngestor::new(embedder, store.clone(), store.clone(), store.clone());

    let ingestion = ingestor.ingest("my car takes 0W-20 oil").await?;
    assert_eq!(ingestion.step, IngestStep::Completed);

    let stored = store
        .get_ingestion(ingestion.id)
        .await?
        .expect("ingestion should exist");
    assert_eq!(stored.step, IngestStep::Completed);
    assert_eq!(stored.embedding.map(|e| e.len()), Some(utils::EMBEDDING_DIMS));

    let note_id = stored.note_id.expect("note should exist");
    let note = store.get_note(note_id).await?.expect("note should exist");
    assert_eq!(note.text, "my car takes 0W-20 oil");

    let query = utils::embed_words("what oil does my car take");
    let matches = store.query(&query, 1).await?;
    assert_eq!(matches[0].id, note_id.to_string());
    Ok(())
}
