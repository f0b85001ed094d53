use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use superpumped::NewNoteRequest;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::{
    error::AppError,
    models::{ingestions::Ingestion, notes::Note, state::SuperpumpedState},
};

pub fn router(state: SuperpumpedState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(add_note))
        .routes(routes!(get_note))
        .routes(routes!(get_ingestion))
        .routes(routes!(resume_ingestion))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/notes",
    request_body = NewNoteRequest,
    responses(
        (status = 201, description = "Note stored and indexed for retrieval", body = String, content_type = "text/plain"),
        (status = 400, description = "Note text is missing"),
        (status = 500, description = "A step of the ingestion failed; it can be resumed")
    )
)]
#[axum::debug_handler]
pub async fn add_note(
    State(state): State<SuperpumpedState>,
    Json(request): Json<NewNoteRequest>,
) -> Result<(StatusCode, &'static str), AppError> {
    if request.text.is_empty() {
        return Err(AppError::input("missing text"));
    }
    let ingestion = state.ingestor().ingest(&request.text).await?;
    tracing::info!(
        ingestion_id = ingestion.id,
        note_id = ingestion.note_id,
        "created note"
    );
    Ok((StatusCode::CREATED, "Created note"))
}

#[utoipa::path(
    get,
    path = "/notes/{id}",
    params(
        ("id" = i32, Path, description = "Database ID of note to get"),
    ),
    responses(
        (status = 200, description = "Successfully got note", body = Note),
        (status = 404, description = "Note not found")
    )
)]
#[axum::debug_handler]
pub async fn get_note(
    State(state): State<SuperpumpedState>,
    Path(id): Path<i32>,
) -> Result<Json<Note>, AppError> {
    state
        .notes
        .get_note(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("note {id}")))
}

#[utoipa::path(
    get,
    path = "/notes/ingestions/{id}",
    params(
        ("id" = i32, Path, description = "Database ID of the ingestion to get"),
    ),
    responses(
        (status = 200, description = "Current step and last error of a note ingestion", body = Ingestion),
        (status = 404, description = "Ingestion not found")
    )
)]
#[axum::debug_handler]
pub async fn get_ingestion(
    State(state): State<SuperpumpedState>,
    Path(id): Path<i32>,
) -> Result<Json<Ingestion>, AppError> {
    state
        .ingestions
        .get_ingestion(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("ingestion {id}")))
}

#[utoipa::path(
    post,
    path = "/notes/ingestions/{id}/resume",
    params(
        ("id" = i32, Path, description = "Database ID of the ingestion to resume"),
    ),
    responses(
        (status = 201, description = "Ingestion finished from its last completed step", body = Ingestion),
        (status = 404, description = "Ingestion not found"),
        (status = 500, description = "The ingestion failed again")
    )
)]
#[axum::debug_handler]
pub async fn resume_ingestion(
    State(state): State<SuperpumpedState>,
    Path(id): Path<i32>,
) -> Result<(StatusCode, Json<Ingestion>), AppError> {
    match state.ingestor().resume(id).await? {
        Some(ingestion) => Ok((StatusCode::CREATED, Json(ingestion))),
        None => Err(AppError::NotFound(format!("ingestion {id}"))),
    }
}
