use std::fs::File;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
};
use ctrlc::set_handler;
use diesel::{Connection, PgConnection};
use diesel_async::{AsyncPgConnection, pooled_connection::AsyncDieselConnectionManager};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

pub mod client;
pub mod error;
pub mod files;
pub mod ingest;
pub mod models;
pub mod normalize;
pub mod retrieval;
pub mod routes;
pub mod schema;
pub mod stores;
mod utils;
pub mod validate;

use models::{
    config::{StorageBackend, SuperpumpedConfig},
    state::SuperpumpedState,
};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

#[derive(OpenApi)]
#[openapi(info(
    title = "superpumped",
    description = "Second-brain notes with retrieval-augmented answers, plus model-generated table, chart, and dashboard configurations"
))]
struct ApiDoc;

pub async fn init() -> Result<SuperpumpedState, Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    // Catching signals for exit.
    set_handler(|| std::process::exit(0))?;

    // Environment variables point at the config file and, for Postgres
    // storage, the database.
    let config_path = dotenvy::var("SUPERPUMPED_CONFIG_PATH")?;
    let config_file = File::open(config_path)?;
    let SuperpumpedConfig {
        server,
        embedding,
        generation,
    } = serde_json::from_reader(config_file)?;

    let model_client = client::ModelClient::new(embedding, generation)?;
    let state = match server.storage {
        StorageBackend::Postgres => {
            let db_connection_url = dotenvy::var("DATABASE_URL")?;
            let pool = connect(db_connection_url).await?;
            SuperpumpedState::with_postgres(server, model_client, stores::PgStore::new(pool))
        }
        StorageBackend::Memory => {
            tracing::warn!("using in-memory storage, notes are lost on restart");
            SuperpumpedState::with_memory(server, model_client)
        }
    };
    Ok(state)
}

/// Run pending migrations and open a connection pool.
pub async fn connect(db_connection_url: String) -> Result<utils::Pool, Box<dyn std::error::Error>> {
    let mut conn = PgConnection::establish(&db_connection_url)?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|err| format!("failed to run migrations: {err}"))?;
    tracing::info!(count = applied.len(), "applied pending migrations");

    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(db_connection_url);
    let pool = bb8::Pool::builder().build(manager).await?;
    Ok(pool)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
    if allowed_origins.is_empty() {
        return cors.allow_origin(Any);
    }
    let mut origins = vec![];
    for origin in allowed_origins {
        match HeaderValue::from_str(origin) {
            Ok(value) => origins.push(value),
            Err(err) => tracing::warn!("ignoring invalid CORS origin '{origin}': {err}"),
        }
    }
    cors.allow_origin(origins)
}

pub fn openapi_router(state: SuperpumpedState) -> OpenApiRouter {
    OpenApiRouter::with_openapi(ApiDoc::openapi())
        .merge(routes::ask::router(state.clone()))
        .merge(routes::notes::router(state.clone()))
        .merge(routes::chat::router(state.clone()))
        .merge(routes::table::router(state.clone()))
        .merge(routes::chart::router(state.clone()))
        .merge(routes::dashboard::router(state.clone()))
        .merge(routes::files::router(state))
}

pub fn app(state: SuperpumpedState) -> Router {
    let cors = cors_layer(&state.server_config.allowed_origins);
    let (router, api) = openapi_router(state).split_for_parts();
    router
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new())
                .on_response(DefaultOnResponse::new()),
        )
}
