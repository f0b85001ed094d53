use axum::{extract::State, response::Json};
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::{
    error::AppError,
    models::{
        dashboard::{DashboardConfig, DashboardRequest, DashboardResponse},
        prompts::{self, Prompt},
        state::SuperpumpedState,
    },
    routes::{generate_config, require},
};

pub fn router(state: SuperpumpedState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(generate_dashboard))
        .with_state(state)
}

#[utoipa::path(
    post,
    path = "/generate-dashboard",
    request_body = DashboardRequest,
    responses(
        (status = 200, description = "Dashboard layout as {success, data, dashboardConfig, prompt}"),
        (status = 400, description = "Prompt is missing, or the result has no valid components"),
        (status = 500, description = "The model did not return a dashboard configuration")
    )
)]
#[axum::debug_handler]
pub async fn generate_dashboard(
    State(state): State<SuperpumpedState>,
    Json(request): Json<DashboardRequest>,
) -> Result<Json<DashboardResponse>, AppError> {
    let prompt = require(&request.prompt, "prompt")?;
    let content = prompts::dashboard_message(request.data.as_ref(), prompt);
    let generation_request = Prompt::Dashboard.to_generation_request(content);
    let dashboard_config =
        generate_config::<DashboardConfig>(&state.model_client, generation_request).await?;
    tracing::info!(
        components = dashboard_config.components.len(),
        "generated dashboard"
    );
    let prompt = prompt.to_string();
    Ok(Json(DashboardResponse {
        success: true,
        data: request.data,
        dashboard_config,
        prompt,
    }))
}
