use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    ingest::IngestError,
    models::client::ModelClientError,
    normalize::ParseError,
    stores::StoreError,
    validate::{ShapeKind, ValidationError},
};

const GENERIC_FAILURE: &str = "Failed to process the request";

/// Every way a route can fail. Details are logged; response bodies stay
/// short and never echo model output.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Input(String),
    #[error(transparent)]
    Upstream(#[from] ModelClientError),
    #[error("invalid {shape} configuration from the model: {source}")]
    Parse {
        shape: ShapeKind,
        #[source]
        source: ParseError,
    },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Ingest(#[from] IngestError),
    #[error("{0} not found")]
    NotFound(String),
}

impl AppError {
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input(message.into())
    }

    pub fn parse(shape: ShapeKind) -> impl FnOnce(ParseError) -> Self {
        move |source| Self::Parse { shape, source }
    }

    fn status_and_body(&self) -> (StatusCode, String) {
        match self {
            Self::Input(message) => (StatusCode::BAD_REQUEST, message.clone()),
            Self::Upstream(_) | Self::Store(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_FAILURE.to_string())
            }
            Self::Parse { shape, .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Invalid {shape} configuration from AI"),
            ),
            Self::Validation(err) => (
                StatusCode::BAD_REQUEST,
                format!("Invalid {} configuration: {}", err.shape(), err.reason()),
            ),
            Self::Ingest(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error creating note".to_string(),
            ),
            Self::NotFound(what) => (StatusCode::NOT_FOUND, format!("{what} not found")),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            Self::Parse { shape, source } => {
                tracing::error!(%shape, raw = %source.raw, "unparseable model output");
            }
            Self::Input(_) | Self::NotFound(_) => tracing::warn!("{self}"),
            _ => tracing::error!("{self}"),
        }
        self.status_and_body().into_response()
    }
}
