use axum::{
    extract::State,
    response::{Json, Response},
};
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::{
    error::AppError,
    models::{
        prompts::{self, Prompt},
        state::SuperpumpedState,
        table::{TableConfig, UpdateTableRequest, UpdatedTableResponse},
    },
    routes::{generate_config, require, text_stream},
};

pub fn router(state: SuperpumpedState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(update_table))
        .routes(routes!(table_chat))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/mrt",
    request_body = UpdateTableRequest,
    responses(
        (status = 200, description = "Table configuration with the requested change applied as {updatedConfig}"),
        (status = 400, description = "Prompt or table is missing, or the result lacks data or columns"),
        (status = 500, description = "The model did not return a table configuration")
    )
)]
#[axum::debug_handler]
pub async fn update_table(
    State(state): State<SuperpumpedState>,
    Json(request): Json<UpdateTableRequest>,
) -> Result<Json<UpdatedTableResponse>, AppError> {
    let prompt = require(&request.prompt, "prompt")?;
    let table = request
        .table()
        .ok_or_else(|| AppError::input("missing table configuration"))?;
    let generation_request =
        Prompt::TableUpdate.to_generation_request(prompts::table_message(table, prompt));
    let updated_config =
        generate_config::<TableConfig>(&state.model_client, generation_request).await?;
    Ok(Json(UpdatedTableResponse { updated_config }))
}

#[utoipa::path(
    post,
    path = "/mrt-chat",
    request_body = UpdateTableRequest,
    responses(
        (status = 200, description = "Streamed answer about the table", body = String, content_type = "text/plain"),
        (status = 400, description = "Prompt or table is missing"),
        (status = 500, description = "Failed to process the request")
    )
)]
#[axum::debug_handler]
pub async fn table_chat(
    State(state): State<SuperpumpedState>,
    Json(request): Json<UpdateTableRequest>,
) -> Result<Response, AppError> {
    let prompt = require(&request.prompt, "prompt")?;
    let table = request
        .table()
        .ok_or_else(|| AppError::input("missing table configuration"))?;
    let generation_request =
        Prompt::TableChat.to_generation_request(prompts::table_message(table, prompt));
    let stream = state.model_client.generate_stream(generation_request).await?;
    Ok(text_stream(stream))
}
