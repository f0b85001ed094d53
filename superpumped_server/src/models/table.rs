use bon::Builder;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::validate::{ConfigShape, ShapeKind};

/// Grid configuration: rows keyed by column accessor plus column
/// definitions. Grouping, pagination and sorting flags ride along in
/// `extra`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TableConfig {
    pub data: Value,
    pub columns: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConfigShape for TableConfig {
    const SHAPE: ShapeKind = ShapeKind::Table;
    const REQUIRED_KEYS: &'static [&'static str] = &["data", "columns"];
}

#[derive(Builder, Debug, Deserialize, Serialize, ToSchema)]
pub struct UpdateTableRequest {
    /// What to change about the table.
    #[serde(default)]
    pub prompt: String,
    /// Current table configuration.
    #[schema(value_type = Option<Object>)]
    pub config: Option<Value>,
    /// Raw rows, used when no configuration exists yet.
    #[schema(value_type = Option<Object>)]
    pub data: Option<Value>,
}

impl UpdateTableRequest {
    /// The table the prompt refers to, preferring the full configuration.
    pub fn table(&self) -> Option<&Value> {
        self.config.as_ref().or(self.data.as_ref())
    }
}

#[derive(Serialize)]
pub struct UpdatedTableResponse {
    #[serde(rename = "updatedConfig")]
    pub updated_config: TableConfig,
}
