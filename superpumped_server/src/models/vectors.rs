use diesel::{Queryable, Selectable, prelude::Insertable};
use pgvector::Vector;
use serde::{Deserialize, Serialize};

/// An embedding keyed by the stringified ID of the record it belongs to.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
}

/// Nearest-neighbor hit. `score` is cosine similarity.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct VectorMatch {
    pub id: String,
    pub score: f64,
}

#[derive(Queryable, Selectable)]
#[diesel(table_name = crate::schema::vectors)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StoredVector {
    pub id: String,
    pub embedding: Vector,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::vectors)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewVector {
    pub id: String,
    pub embedding: Vector,
}

impl From<VectorRecord> for NewVector {
    fn from(record: VectorRecord) -> Self {
        Self {
            id: record.id,
            embedding: Vector::from(record.values),
        }
    }
}
