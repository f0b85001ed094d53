use axum::{
    extract::State,
    response::{Json, Response},
};
use superpumped::GenerationRequest;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::{
    error::AppError,
    models::{
        chart::{ChartConfig, ChartConfigSchema, ChartRequest, UpdatedChartResponse},
        prompts::{self, Prompt},
        state::SuperpumpedState,
    },
    routes::{generate_config, require, text_stream},
};

pub fn router(state: SuperpumpedState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(chart_config))
        .routes(routes!(structured_chart_config))
        .routes(routes!(chart_chat))
        .with_state(state)
}

fn chart_generation_request(
    prompt: Prompt,
    request: &ChartRequest,
) -> Result<GenerationRequest, AppError> {
    let instruction = require(&request.prompt, "prompt")?;
    let content = prompts::chart_message(&request.data, request.config.as_ref(), instruction);
    Ok(prompt.to_generation_request(content))
}

#[utoipa::path(
    post,
    path = "/chart-config",
    request_body = ChartRequest,
    responses(
        (status = 200, description = "New or updated chart configuration as {updatedChartConfig}"),
        (status = 400, description = "Prompt is missing, or the result lacks options or series"),
        (status = 500, description = "The model did not return a chart configuration")
    )
)]
#[axum::debug_handler]
pub async fn chart_config(
    State(state): State<SuperpumpedState>,
    Json(request): Json<ChartRequest>,
) -> Result<Json<UpdatedChartResponse>, AppError> {
    let generation_request = chart_generation_request(Prompt::ChartConfig, &request)?;
    let updated_chart_config =
        generate_config::<ChartConfig>(&state.model_client, generation_request).await?;
    Ok(Json(UpdatedChartResponse {
        updated_chart_config,
    }))
}

#[utoipa::path(
    post,
    path = "/chart-config-2",
    request_body = ChartRequest,
    responses(
        (status = 200, description = "Chart configuration generated with structured output as {updatedChartConfig}"),
        (status = 400, description = "Prompt is missing, or the result lacks options or series"),
        (status = 500, description = "The model did not return a chart configuration")
    )
)]
#[axum::debug_handler]
pub async fn structured_chart_config(
    State(state): State<SuperpumpedState>,
    Json(request): Json<ChartRequest>,
) -> Result<Json<UpdatedChartResponse>, AppError> {
    let mut generation_request = chart_generation_request(Prompt::ChartConfig, &request)?;
    generation_request.response_format = Some(ChartConfigSchema::response_format());
    let updated_chart_config =
        generate_config::<ChartConfig>(&state.model_client, generation_request).await?;
    Ok(Json(UpdatedChartResponse {
        updated_chart_config,
    }))
}

#[utoipa::path(
    post,
    path = "/chart-chat",
    request_body = ChartRequest,
    responses(
        (status = 200, description = "Streamed answer about the chart", body = String, content_type = "text/plain"),
        (status = 400, description = "Prompt is missing"),
        (status = 500, description = "Failed to process the request")
    )
)]
#[axum::debug_handler]
pub async fn chart_chat(
    State(state): State<SuperpumpedState>,
    Json(request): Json<ChartRequest>,
) -> Result<Response, AppError> {
    let generation_request = chart_generation_request(Prompt::ChartChat, &request)?;
    let stream = state.model_client.generate_stream(generation_request).await?;
    Ok(text_stream(stream))
}
