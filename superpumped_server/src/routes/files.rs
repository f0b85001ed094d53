use axum::{
    extract::{Multipart, State},
    response::Json,
};
use serde_json::Value;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::{
    error::AppError,
    files,
    models::{
        files::{ProcessFileForm, ProcessedFile},
        prompts::Prompt,
        state::SuperpumpedState,
    },
    normalize,
    validate::ShapeKind,
};

pub fn router(state: SuperpumpedState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(process_file))
        .with_state(state)
}

struct Upload {
    filename: String,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

async fn read_form(mut multipart: Multipart) -> Result<(Upload, Option<String>), AppError> {
    let mut upload = None;
    let mut prompt = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::input(err.body_text()))?
    {
        match field.name() {
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| AppError::input(err.body_text()))?;
                upload = Some(Upload {
                    filename,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            Some("prompt") => {
                let text = field
                    .text()
                    .await
                    .map_err(|err| AppError::input(err.body_text()))?;
                prompt = Some(text).filter(|text| !text.trim().is_empty());
            }
            _ => {}
        }
    }
    let upload = upload.ok_or_else(|| AppError::input("missing file"))?;
    Ok((upload, prompt))
}

#[utoipa::path(
    post,
    path = "/process-file",
    request_body(content = ProcessFileForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Rows of the uploaded file as {data}, transformed when a prompt is given"),
        (status = 400, description = "File is missing or not a CSV, TSV, JSON, or spreadsheet file"),
        (status = 500, description = "The model did not return transformed rows")
    )
)]
#[axum::debug_handler]
pub async fn process_file(
    State(state): State<SuperpumpedState>,
    multipart: Multipart,
) -> Result<Json<ProcessedFile>, AppError> {
    let (upload, prompt) = read_form(multipart).await?;
    let Upload {
        filename,
        content_type,
        bytes,
    } = upload;
    let rows = files::decode_upload(&filename, content_type.as_deref(), &bytes)
        .map_err(|err| AppError::input(err.to_string()))?;
    tracing::debug!(%filename, rows = rows.len(), "decoded upload");

    let Some(prompt) = prompt else {
        return Ok(Json(ProcessedFile { data: rows }));
    };
    let content = format!("Rows:\n{:#}\n\nInstruction: {prompt}", Value::Array(rows));
    let raw = state
        .model_client
        .generate(Prompt::FileTransform.to_generation_request(content))
        .await?;
    // Transformed rows are table data, so bad output is reported as such.
    let value =
        normalize::parse_generated_json(&raw).map_err(AppError::parse(ShapeKind::Table))?;
    let processed = serde_json::from_value::<ProcessedFile>(value).map_err(|_| {
        AppError::parse(ShapeKind::Table)(normalize::ParseError { raw: raw.clone() })
    })?;
    Ok(Json(processed))
}
