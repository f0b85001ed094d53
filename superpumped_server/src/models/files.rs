use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Multipart form accepted by the file processing route.
#[allow(dead_code)]
#[derive(ToSchema)]
pub struct ProcessFileForm {
    /// CSV, TSV, JSON, or spreadsheet file with one row per record.
    #[schema(format = Binary)]
    pub file: String,
    /// Optional instruction for transforming the rows.
    pub prompt: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ProcessedFile {
    pub data: Vec<Value>,
}
