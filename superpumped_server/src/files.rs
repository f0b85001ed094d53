//! Conversion of uploaded tabular files into JSON rows.

use std::{io::Cursor, path::Path};

use calamine::{Data, Reader};
use csv::ReaderBuilder;
use serde_json::{Map, Number, Value};

#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("unsupported file type {0:?}; upload a CSV, TSV, JSON, or spreadsheet file")]
    Unsupported(String),
    #[error("failed to read delimited file: {0}")]
    Delimited(#[from] csv::Error),
    #[error("failed to read spreadsheet: {0}")]
    Spreadsheet(#[from] calamine::Error),
    #[error("spreadsheet has no sheets")]
    NoSheets,
    #[error("failed to read JSON file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("JSON file must be an array of row objects or an object with a \"data\" array")]
    NotRows,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum UploadKind {
    Delimited(u8),
    Json,
    Spreadsheet,
}

fn upload_kind(filename: &str, content_type: Option<&str>) -> Result<UploadKind, FileError> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("csv") => return Ok(UploadKind::Delimited(b',')),
        Some("tsv") | Some("tab") => return Ok(UploadKind::Delimited(b'\t')),
        Some("json") => return Ok(UploadKind::Json),
        Some("xlsx" | "xlsm" | "xlsb" | "xls" | "ods") => return Ok(UploadKind::Spreadsheet),
        _ => {}
    }
    match content_type.map(|mime| mime.split(';').next().unwrap_or(mime).trim()) {
        Some("text/csv") => Ok(UploadKind::Delimited(b',')),
        Some("text/tab-separated-values") => Ok(UploadKind::Delimited(b'\t')),
        Some("application/json") => Ok(UploadKind::Json),
        Some(
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            | "application/vnd.ms-excel"
            | "application/vnd.oasis.opendocument.spreadsheet",
        ) => Ok(UploadKind::Spreadsheet),
        _ => Err(FileError::Unsupported(
            extension.unwrap_or_else(|| filename.to_string()),
        )),
    }
}

/// Decode an uploaded file into row objects.
pub fn decode_upload(
    filename: &str,
    content_type: Option<&str>,
    bytes: &[u8],
) -> Result<Vec<Value>, FileError> {
    match upload_kind(filename, content_type)? {
        UploadKind::Delimited(delimiter) => decode_delimited(bytes, delimiter),
        UploadKind::Json => decode_json(bytes),
        UploadKind::Spreadsheet => decode_spreadsheet(bytes),
    }
}

fn decode_delimited(bytes: &[u8], delimiter: u8) -> Result<Vec<Value>, FileError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|header| header.trim().to_string())
        .collect();
    let mut rows = vec![];
    for record in reader.records() {
        let record = record?;
        let row: Map<String, Value> = headers
            .iter()
            .enumerate()
            .map(|(i, header)| (header.clone(), record.get(i).map_or(Value::Null, coerce_cell)))
            .collect();
        rows.push(Value::Object(row));
    }
    Ok(rows)
}

/// Rows of the first sheet, keyed by its first row.
fn decode_spreadsheet(bytes: &[u8]) -> Result<Vec<Value>, FileError> {
    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(FileError::NoSheets)??;
    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(vec![]);
    };
    let headers: Vec<String> = header_row
        .iter()
        .map(|cell| cell.to_string().trim().to_string())
        .collect();
    Ok(rows
        .map(|row| {
            let row: Map<String, Value> = headers
                .iter()
                .enumerate()
                .map(|(i, header)| (header.clone(), row.get(i).map_or(Value::Null, sheet_cell)))
                .collect();
            Value::Object(row)
        })
        .collect())
}

/// Spreadsheets store every number as a float, so whole numbers go back
/// through the text rules to come out as integers.
fn sheet_cell(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::Bool(b) => Value::Bool(*b),
        Data::Int(i) => Value::Number((*i).into()),
        Data::String(s) => coerce_cell(s),
        other => coerce_cell(&other.to_string()),
    }
}

fn decode_json(bytes: &[u8]) -> Result<Vec<Value>, FileError> {
    let rows = match serde_json::from_slice::<Value>(bytes)? {
        Value::Array(rows) => rows,
        Value::Object(mut object) => match object.remove("data") {
            Some(Value::Array(rows)) => rows,
            _ => return Err(FileError::NotRows),
        },
        _ => return Err(FileError::NotRows),
    };
    if rows.iter().all(Value::is_object) {
        Ok(rows)
    } else {
        Err(FileError::NotRows)
    }
}

fn coerce_cell(cell: &str) -> Value {
    let cell = cell.trim();
    if cell.is_empty() {
        return Value::Null;
    }
    if cell.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if cell.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if let Ok(i) = cell.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Some(n) = cell.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(n);
    }
    Value::String(cell.to_string())
}
