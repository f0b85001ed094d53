//! Resumable note ingestion.
//!
//! A note becomes searchable in three steps: the note row is created, its
//! text is embedded, and the embedding is upserted into the vector index.
//! The position is persisted after every step so a failed ingestion can be
//! resumed without repeating finished work.

use std::sync::Arc;

use chrono::Utc;

use crate::{
    client::Embedder,
    models::{
        client::ModelClientError,
        ingestions::{IngestStep, Ingestion},
        vectors::VectorRecord,
    },
    stores::{IngestionStore, NoteStore, StoreError, VectorIndex},
};

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to embed note text: {0}")]
    Embedding(#[from] ModelClientError),
    #[error("embedding service returned an empty vector")]
    EmptyEmbedding,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("ingestion {id} is at {step} without {missing}")]
    MissingState {
        id: i32,
        step: IngestStep,
        missing: &'static str,
    },
}

#[derive(Clone)]
pub struct NoteIngestor {
    embedder: Arc<dyn Embedder>,
    notes: Arc<dyn NoteStore>,
    vectors: Arc<dyn VectorIndex>,
    ingestions: Arc<dyn IngestionStore>,
}

impl NoteIngestor {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        notes: Arc<dyn NoteStore>,
        vectors: Arc<dyn VectorIndex>,
        ingestions: Arc<dyn IngestionStore>,
    ) -> Self {
        Self {
            embedder,
            notes,
            vectors,
            ingestions,
        }
    }

    /// Start a new ingestion for `text` and run it to completion.
    ///
    /// On failure the ingestion record keeps the failed step and its error
    /// so it can be passed to [`Self::resume`].
    pub async fn ingest(&self, text: &str) -> Result<Ingestion, IngestError> {
        let ingestion = self.ingestions.create_ingestion(text).await?;
        tracing::info!(id = ingestion.id, "ingesting note");
        self.run(ingestion).await
    }

    /// Continue a stored ingestion from its persisted step. Returns `None`
    /// when no ingestion has that ID.
    pub async fn resume(&self, id: i32) -> Result<Option<Ingestion>, IngestError> {
        match self.ingestions.get_ingestion(id).await? {
            Some(ingestion) => self.run(ingestion).await.map(Some),
            None => Ok(None),
        }
    }

    async fn run(&self, mut ingestion: Ingestion) -> Result<Ingestion, IngestError> {
        while !ingestion.is_completed() {
            let step = ingestion.step;
            match self.advance(&mut ingestion).await {
                Ok(()) => {
                    ingestion.last_error = None;
                    ingestion.updated_at = Utc::now();
                    self.ingestions.save_ingestion(&ingestion).await?;
                    tracing::debug!(id = ingestion.id, %step, "ingestion step finished");
                }
                Err(err) => {
                    tracing::error!(id = ingestion.id, %step, %err, "ingestion step failed");
                    ingestion.last_error = Some(step.failure().to_string());
                    ingestion.updated_at = Utc::now();
                    if let Err(save_err) = self.ingestions.save_ingestion(&ingestion).await {
                        tracing::error!(id = ingestion.id, %save_err, "failed to save ingestion");
                    }
                    return Err(err);
                }
            }
        }
        Ok(ingestion)
    }

    /// Run the current step and move the marker to the next one.
    async fn advance(&self, ingestion: &mut Ingestion) -> Result<(), IngestError> {
        match ingestion.step {
            IngestStep::CreateRecord => {
                let note = self.notes.insert_note(&ingestion.text).await?;
                ingestion.note_id = Some(note.id);
                ingestion.step = IngestStep::GenerateEmbedding;
            }
            IngestStep::GenerateEmbedding => {
                let embedding = self.embedder.embed(&ingestion.text).await?;
                if embedding.is_empty() {
                    return Err(IngestError::EmptyEmbedding);
                }
                ingestion.embedding = Some(embedding);
                ingestion.step = IngestStep::UpsertVector;
            }
            IngestStep::UpsertVector => {
                let missing = |missing| IngestError::MissingState {
                    id: ingestion.id,
                    step: ingestion.step,
                    missing,
                };
                let note_id = ingestion.note_id.ok_or_else(|| missing("a note"))?;
                let values = ingestion
                    .embedding
                    .clone()
                    .ok_or_else(|| missing("an embedding"))?;
                self.vectors
                    .upsert(vec![VectorRecord {
                        id: note_id.to_string(),
                        values,
                    }])
                    .await?;
                ingestion.step = IngestStep::Completed;
            }
            IngestStep::Completed => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::stores::MemoryStore;

    /// Fails until switched on.
    #[derive(Default)]
    struct FlakyEmbedder {
        healthy: AtomicBool,
    }

    #[async_trait]
    impl Embedder for FlakyEmbedder {
        async fn embed(&self, _: &str) -> Result<Vec<f32>, ModelClientError> {
            if self.healthy.load(Ordering::SeqCst) {
                Ok(vec![0.5, 0.5])
            } else {
                Err(ModelClientError::ApiConnection {
                    url: "http://localhost/embeddings".to_string(),
                    message: "connection refused".to_string(),
                })
            }
        }
    }

    struct EmptyEmbedder;

    /// Delegates to a memory store but fails every save while switched on.
    #[derive(Default)]
    struct BrokenSaves {
        inner: MemoryStore,
        broken: AtomicBool,
    }

    #[async_trait]
    impl IngestionStore for BrokenSaves {
        async fn create_ingestion(&self, text: &str) -> Result<Ingestion, StoreError> {
            self.inner.create_ingestion(text).await
        }

        async fn get_ingestion(&self, id: i32) -> Result<Option<Ingestion>, StoreError> {
            self.inner.get_ingestion(id).await
        }

        async fn save_ingestion(&self, ingestion: &Ingestion) -> Result<(), StoreError> {
            if self.broken.load(Ordering::SeqCst) {
                return Err(StoreError::Pool("connection reset".to_string()));
            }
            self.inner.save_ingestion(ingestion).await
        }
    }

    #[async_trait]
    impl Embedder for EmptyEmbedder {
        async fn embed(&self, _: &str) -> Result<Vec<f32>, ModelClientError> {
            Ok(vec![])
        }
    }

    fn ingestor(embedder: Arc<dyn Embedder>, store: &MemoryStore) -> NoteIngestor {
        let store = Arc::new(store.clone());
        NoteIngestor::new(embedder, store.clone(), store.clone(), store)
    }

    #[tokio::test]
    async fn ingest_runs_every_step() {
        let store = MemoryStore::new();
        let embedder = Arc::new(FlakyEmbedder::default());
        embedder.healthy.store(true, Ordering::SeqCst);
        let ingestion = ingestor(embedder, &store)
            .ingest("sqrt of 9 is 3")
            .await
            .unwrap();

        assert!(ingestion.is_completed());
        assert_eq!(ingestion.last_error, None);
        let note_id = ingestion.note_id.unwrap();
        let note = store.get_note(note_id).await.unwrap().unwrap();
        assert_eq!(note.text, "sqrt of 9 is 3");
        let matches = store.query(&[0.5, 0.5], 1).await.unwrap();
        assert_eq!(matches[0].id, note_id.to_string());
    }

    #[tokio::test]
    async fn failed_embedding_is_resumable() {
        let store = MemoryStore::new();
        let embedder = Arc::new(FlakyEmbedder::default());
        let ingestor = ingestor(embedder.clone(), &store);

        let err = ingestor.ingest("remember me").await.unwrap_err();
        assert!(matches!(err, IngestError::Embedding(_)));
        let id = 1;
        let stored = store.get_ingestion(id).await.unwrap().unwrap();
        assert_eq!(stored.step, IngestStep::GenerateEmbedding);
        assert_eq!(stored.last_error.as_deref(), Some("embedding failed"));
        let note_id = stored.note_id.unwrap();
        assert!(store.query(&[0.5, 0.5], 1).await.unwrap().is_empty());

        embedder.healthy.store(true, Ordering::SeqCst);
        let resumed = ingestor.resume(id).await.unwrap().unwrap();
        assert!(resumed.is_completed());
        assert_eq!(resumed.last_error, None);
        // The note row from the first attempt is reused.
        assert_eq!(resumed.note_id, Some(note_id));
        assert_eq!(store.get_note(note_id + 1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn unsaved_steps_run_again_on_resume() {
        let notes = MemoryStore::new();
        let ingestions = Arc::new(BrokenSaves::default());
        let embedder = Arc::new(FlakyEmbedder::default());
        embedder.healthy.store(true, Ordering::SeqCst);
        let ingestor = NoteIngestor::new(
            embedder,
            Arc::new(notes.clone()),
            Arc::new(notes.clone()),
            ingestions.clone(),
        );

        ingestions.broken.store(true, Ordering::SeqCst);
        let err = ingestor.ingest("twice").await.unwrap_err();
        assert!(matches!(err, IngestError::Store(_)));
        let stored = ingestions.get_ingestion(1).await.unwrap().unwrap();
        assert_eq!(stored.step, IngestStep::CreateRecord);
        assert_eq!(stored.note_id, None);

        // The step marker was never advanced, so the note is created again.
        ingestions.broken.store(false, Ordering::SeqCst);
        let resumed = ingestor.resume(1).await.unwrap().unwrap();
        assert!(resumed.is_completed());
        assert_eq!(resumed.note_id, Some(2));
        assert!(notes.get_note(1).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn resuming_a_completed_ingestion_changes_nothing() {
        let store = MemoryStore::new();
        let embedder = Arc::new(FlakyEmbedder::default());
        embedder.healthy.store(true, Ordering::SeqCst);
        let ingestor = ingestor(embedder, &store);
        let first = ingestor.ingest("once").await.unwrap();
        let again = ingestor.resume(first.id).await.unwrap().unwrap();
        assert_eq!(again, first);
        assert_eq!(store.query(&[0.5, 0.5], 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_embedding_is_an_error() {
        let store = MemoryStore::new();
        let err = ingestor(Arc::new(EmptyEmbedder), &store)
            .ingest("text")
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::EmptyEmbedding));
    }

    #[tokio::test]
    async fn unknown_ingestion_resumes_to_none() {
        let store = MemoryStore::new();
        let resumed = ingestor(Arc::new(EmptyEmbedder), &store)
            .resume(7)
            .await
            .unwrap();
        assert!(resumed.is_none());
    }
}
