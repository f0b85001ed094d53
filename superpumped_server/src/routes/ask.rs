use axum::extract::{Query, State};
use superpumped::GenerationRequest;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::{
    error::AppError,
    models::{chat::AskParams, state::SuperpumpedState},
};

pub fn router(state: SuperpumpedState) -> OpenApiRouter {
    OpenApiRouter::new().routes(routes!(ask)).with_state(state)
}

#[utoipa::path(
    get,
    path = "/",
    params(AskParams),
    responses(
        (status = 200, description = "Answer informed by the most relevant stored notes", body = String, content_type = "text/plain"),
        (status = 500, description = "Failed to generate an answer")
    )
)]
#[axum::debug_handler]
pub async fn ask(
    State(state): State<SuperpumpedState>,
    Query(params): Query<AskParams>,
) -> Result<String, AppError> {
    let question = params.question();
    tracing::debug!(">> {question}");
    let messages = state.retrieval().compose(question).await;
    let answer = state
        .model_client
        .generate(GenerationRequest::new(messages))
        .await?;
    Ok(answer)
}
