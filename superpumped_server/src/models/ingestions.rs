use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use diesel::{AsChangeset, Queryable, Selectable, prelude::Insertable};
use pgvector::Vector;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Position of a note ingestion in its workflow. Each variant names the
/// next step to run.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IngestStep {
    CreateRecord,
    GenerateEmbedding,
    UpsertVector,
    Completed,
}

impl IngestStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateRecord => "create_record",
            Self::GenerateEmbedding => "generate_embedding",
            Self::UpsertVector => "upsert_vector",
            Self::Completed => "completed",
        }
    }

    /// Caller-facing label for a failure of this step. Error details stay
    /// in the server logs.
    pub fn failure(&self) -> &'static str {
        match self {
            Self::CreateRecord => "note creation failed",
            Self::GenerateEmbedding => "embedding failed",
            Self::UpsertVector => "vector upsert failed",
            Self::Completed => "ingestion failed",
        }
    }
}

impl fmt::Display for IngestStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown ingestion step {0:?}")]
pub struct UnknownStep(pub String);

impl FromStr for IngestStep {
    type Err = UnknownStep;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create_record" => Ok(Self::CreateRecord),
            "generate_embedding" => Ok(Self::GenerateEmbedding),
            "upsert_vector" => Ok(Self::UpsertVector),
            "completed" => Ok(Self::Completed),
            other => Err(UnknownStep(other.to_string())),
        }
    }
}

/// Persisted state of one note ingestion.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct Ingestion {
    /// Unique ingestion ID.
    pub id: i32,
    /// Note text being ingested.
    pub text: String,
    /// Next step to run.
    pub step: IngestStep,
    /// ID of the created note once the first step has finished.
    pub note_id: Option<i32>,
    /// Embedding computed by the second step.
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
    /// Which step failed most recently, if any.
    pub last_error: Option<String>,
    /// Datetime the ingestion started in ISO format.
    pub created_at: DateTime<Utc>,
    /// Datetime the ingestion last changed in ISO format.
    pub updated_at: DateTime<Utc>,
}

impl Ingestion {
    pub fn is_completed(&self) -> bool {
        self.step == IngestStep::Completed
    }
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = crate::schema::ingestions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct IngestionRow {
    pub id: i32,
    pub text: String,
    pub step: String,
    pub note_id: Option<i32>,
    pub embedding: Option<Vector>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<IngestionRow> for Ingestion {
    type Error = UnknownStep;

    fn try_from(row: IngestionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            text: row.text,
            step: row.step.parse()?,
            note_id: row.note_id,
            embedding: row.embedding.map(|embedding| embedding.to_vec()),
            last_error: row.last_error,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::ingestions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewIngestion<'a> {
    pub text: &'a str,
    pub step: &'static str,
}

/// Everything a step may change. `None` fields are written as NULL.
#[derive(AsChangeset)]
#[diesel(table_name = crate::schema::ingestions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct IngestionChangeset {
    pub step: &'static str,
    pub note_id: Option<i32>,
    pub embedding: Option<Vector>,
    pub last_error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Ingestion> for IngestionChangeset {
    fn from(ingestion: &Ingestion) -> Self {
        Self {
            step: ingestion.step.as_str(),
            note_id: ingestion.note_id,
            embedding: ingestion.embedding.clone().map(Vector::from),
            last_error: ingestion.last_error.clone(),
            updated_at: ingestion.updated_at,
        }
    }
}

