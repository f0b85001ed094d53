//! Narrow interfaces to the relational store and vector index, with a
//! Postgres backend and an in-process backend for development and tests.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::Utc;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper, upsert::excluded};
use diesel_async::RunQueryDsl;
use pgvector::{Vector, VectorExpressionMethods};
use tokio::sync::RwLock;

use crate::{
    models::{
        ingestions::{
            IngestStep, Ingestion, IngestionChangeset, IngestionRow, NewIngestion, UnknownStep,
        },
        notes::{NewNote, Note},
        vectors::{NewVector, StoredVector, VectorMatch, VectorRecord},
    },
    schema,
    utils::{self, Conn, Pool},
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to get a database connection: {0}")]
    Pool(String),
    #[error(transparent)]
    Diesel(#[from] diesel::result::Error),
    #[error("stored data is corrupt: {0}")]
    Corrupt(String),
    #[error("{0} not found")]
    NotFound(String),
}

impl From<UnknownStep> for StoreError {
    fn from(err: UnknownStep) -> Self {
        Self::Corrupt(err.to_string())
    }
}

#[async_trait]
pub trait NoteStore: Send + Sync {
    async fn insert_note(&self, text: &str) -> Result<Note, StoreError>;
    async fn get_note(&self, id: i32) -> Result<Option<Note>, StoreError>;
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace vectors by ID.
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<(), StoreError>;
    /// The `top_k` stored vectors most similar to `values`, best first.
    async fn query(&self, values: &[f32], top_k: usize) -> Result<Vec<VectorMatch>, StoreError>;
}

#[async_trait]
pub trait IngestionStore: Send + Sync {
    async fn create_ingestion(&self, text: &str) -> Result<Ingestion, StoreError>;
    async fn get_ingestion(&self, id: i32) -> Result<Option<Ingestion>, StoreError>;
    async fn save_ingestion(&self, ingestion: &Ingestion) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct PgStore {
    pool: Pool,
}

impl PgStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    async fn conn(&self) -> Result<Conn<'_>, StoreError> {
        self.pool
            .get()
            .await
            .map_err(|err| StoreError::Pool(err.to_string()))
    }
}

#[async_trait]
impl NoteStore for PgStore {
    async fn insert_note(&self, text: &str) -> Result<Note, StoreError> {
        let mut conn = self.conn().await?;
        let note: Note = diesel::insert_into(schema::notes::table)
            .values(NewNote { text })
            .returning(Note::as_returning())
            .get_result(&mut conn)
            .await?;
        Ok(note)
    }

    async fn get_note(&self, id: i32) -> Result<Option<Note>, StoreError> {
        let mut conn = self.conn().await?;
        let note: Option<Note> = schema::notes::table
            .select(Note::as_select())
            .filter(schema::notes::id.eq(id))
            .first(&mut conn)
            .await
            .optional()?;
        Ok(note)
    }
}

#[async_trait]
impl VectorIndex for PgStore {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<(), StoreError> {
        if records.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn().await?;
        let rows: Vec<NewVector> = records.into_iter().map(NewVector::from).collect();
        diesel::insert_into(schema::vectors::table)
            .values(&rows)
            .on_conflict(schema::vectors::id)
            .do_update()
            .set(schema::vectors::embedding.eq(excluded(schema::vectors::embedding)))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    async fn query(&self, values: &[f32], top_k: usize) -> Result<Vec<VectorMatch>, StoreError> {
        let mut conn = self.conn().await?;
        let limit = i64::try_from(top_k).unwrap_or(i64::MAX);
        let stored: Vec<StoredVector> = schema::vectors::table
            .select(StoredVector::as_select())
            .order(schema::vectors::embedding.cosine_distance(Vector::from(values.to_vec())))
            .limit(limit)
            .load(&mut conn)
            .await?;
        let matches = stored
            .into_iter()
            .map(|row| VectorMatch {
                score: utils::cosine_similarity(values, row.embedding.as_slice()),
                id: row.id,
            })
            .collect();
        Ok(matches)
    }
}

#[async_trait]
impl IngestionStore for PgStore {
    async fn create_ingestion(&self, text: &str) -> Result<Ingestion, StoreError> {
        let mut conn = self.conn().await?;
        let row: IngestionRow = diesel::insert_into(schema::ingestions::table)
            .values(NewIngestion {
                text,
                step: IngestStep::CreateRecord.as_str(),
            })
            .returning(IngestionRow::as_returning())
            .get_result(&mut conn)
            .await?;
        Ok(Ingestion::try_from(row)?)
    }

    async fn get_ingestion(&self, id: i32) -> Result<Option<Ingestion>, StoreError> {
        let mut conn = self.conn().await?;
        let row: Option<IngestionRow> = schema::ingestions::table
            .select(IngestionRow::as_select())
            .filter(schema::ingestions::id.eq(id))
            .first(&mut conn)
            .await
            .optional()?;
        Ok(row.map(Ingestion::try_from).transpose()?)
    }

    async fn save_ingestion(&self, ingestion: &Ingestion) -> Result<(), StoreError> {
        let mut conn = self.conn().await?;
        let updated = diesel::update(schema::ingestions::table.find(ingestion.id))
            .set(IngestionChangeset::from(ingestion))
            .execute(&mut conn)
            .await?;
        if updated == 0 {
            return Err(StoreError::NotFound(format!("ingestion {}", ingestion.id)));
        }
        Ok(())
    }
}

#[derive(Default)]
struct MemoryTables {
    notes: BTreeMap<i32, Note>,
    vectors: HashMap<String, Vec<f32>>,
    ingestions: BTreeMap<i32, Ingestion>,
    next_note_id: i32,
    next_ingestion_id: i32,
}

/// Process-local tables. Contents are lost on restart.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<MemoryTables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NoteStore for MemoryStore {
    async fn insert_note(&self, text: &str) -> Result<Note, StoreError> {
        let mut tables = self.tables.write().await;
        tables.next_note_id += 1;
        let note = Note {
            id: tables.next_note_id,
            text: text.to_string(),
            created_at: Utc::now(),
        };
        tables.notes.insert(note.id, note.clone());
        Ok(note)
    }

    async fn get_note(&self, id: i32) -> Result<Option<Note>, StoreError> {
        Ok(self.tables.read().await.notes.get(&id).cloned())
    }
}

#[async_trait]
impl VectorIndex for MemoryStore {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        for record in records {
            tables.vectors.insert(record.id, record.values);
        }
        Ok(())
    }

    async fn query(&self, values: &[f32], top_k: usize) -> Result<Vec<VectorMatch>, StoreError> {
        let tables = self.tables.read().await;
        let mut matches: Vec<VectorMatch> = tables
            .vectors
            .iter()
            .map(|(id, stored)| VectorMatch {
                id: id.clone(),
                score: utils::cosine_similarity(values, stored),
            })
            .collect();
        matches.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        matches.truncate(top_k);
        Ok(matches)
    }
}

#[async_trait]
impl IngestionStore for MemoryStore {
    async fn create_ingestion(&self, text: &str) -> Result<Ingestion, StoreError> {
        let mut tables = self.tables.write().await;
        tables.next_ingestion_id += 1;
        let now = Utc::now();
        let ingestion = Ingestion {
            id: tables.next_ingestion_id,
            text: text.to_string(),
            step: IngestStep::CreateRecord,
            note_id: None,
            embedding: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        };
        tables.ingestions.insert(ingestion.id, ingestion.clone());
        Ok(ingestion)
    }

    async fn get_ingestion(&self, id: i32) -> Result<Option<Ingestion>, StoreError> {
        Ok(self.tables.read().await.ingestions.get(&id).cloned())
    }

    async fn save_ingestion(&self, ingestion: &Ingestion) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        match tables.ingestions.get_mut(&ingestion.id) {
            Some(stored) => {
                *stored = ingestion.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("ingestion {}", ingestion.id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upserting_the_same_id_twice_keeps_one_vector() {
        let store = MemoryStore::new();
        let record = VectorRecord {
            id: "1".to_string(),
            values: vec![0.1, 0.2, 0.3],
        };
        store.upsert(vec![record.clone()]).await.unwrap();
        store.upsert(vec![record.clone()]).await.unwrap();
        let matches = store.query(&record.values, 10).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, "1");
    }

    #[tokio::test]
    async fn upsert_replaces_values() {
        let store = MemoryStore::new();
        store
            .upsert(vec![VectorRecord {
                id: "1".to_string(),
                values: vec![1.0, 0.0],
            }])
            .await
            .unwrap();
        store
            .upsert(vec![VectorRecord {
                id: "1".to_string(),
                values: vec![0.0, 1.0],
            }])
            .await
            .unwrap();
        let matches = store.query(&[0.0, 1.0], 1).await.unwrap();
        assert!((matches[0].score - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn query_ranks_by_similarity_and_honors_top_k() {
        let store = MemoryStore::new();
        store
            .upsert(vec![
                VectorRecord {
                    id: "far".to_string(),
                    values: vec![0.0, 1.0],
                },
                VectorRecord {
                    id: "near".to_string(),
                    values: vec![1.0, 0.1],
                },
            ])
            .await
            .unwrap();
        let matches = store.query(&[1.0, 0.0], 1).await.unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].id, "near");
        assert!(store.query(&[1.0, 0.0], 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_index_has_no_matches() {
        let store = MemoryStore::new();
        assert!(store.query(&[1.0, 2.0], 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn notes_get_sequential_ids() {
        let store = MemoryStore::new();
        let first = store.insert_note("a").await.unwrap();
        let second = store.insert_note("b").await.unwrap();
        assert_eq!((first.id, second.id), (1, 2));
        assert_eq!(store.get_note(2).await.unwrap(), Some(second));
        assert_eq!(store.get_note(3).await.unwrap(), None);
    }
}
