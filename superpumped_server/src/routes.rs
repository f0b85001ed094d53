use axum::{
    body::Body,
    http::header,
    response::{IntoResponse, Response},
};
use superpumped::GenerationRequest;

use crate::{
    client::{ModelClient, TextStream},
    error::AppError,
    normalize,
    validate::{self, ConfigShape},
};

pub mod ask;
pub mod chart;
pub mod chat;
pub mod dashboard;
pub mod files;
pub mod notes;
pub mod table;

/// Forward generated text to the caller as it arrives. Dropping the body
/// drops the upstream request.
pub fn text_stream(stream: TextStream) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(stream),
    )
        .into_response()
}

/// Ask the model for a configuration object and check it has the shape the
/// front end expects.
pub async fn generate_config<T: ConfigShape>(
    model_client: &ModelClient,
    request: GenerationRequest,
) -> Result<T, AppError> {
    let raw = model_client.generate(request).await?;
    let value = normalize::parse_generated_json(&raw).map_err(AppError::parse(T::SHAPE))?;
    Ok(validate::validate_as::<T>(value)?)
}

pub fn require<'a>(value: &'a str, what: &str) -> Result<&'a str, AppError> {
    let value = value.trim();
    if value.is_empty() {
        Err(AppError::input(format!("missing {what}")))
    } else {
        Ok(value)
    }
}
