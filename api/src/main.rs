use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod auth;
mod db;
mod error;
mod extract;
mod generation;
mod memory;
mod middleware;
mod pipeline;
mod routes;
mod state;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Moodlog API",
        version = "0.1.0",
        description = "Journal entries with emotion, energy and insight analysis."
    ),
    paths(
        routes::health::health_check,
        routes::journal::create_journal_entry,
        routes::journal::list_journal_entries,
        routes::journal::get_journal_entry,
        routes::journal::delete_journal_entry,
        routes::journal::journal_stats,
        routes::analysis::preview_analysis,
        routes::insights::mood_insight,
    ),
    components(schemas(
        HealthResponse,
        moodlog_core::error::ApiError,
        moodlog_core::journal::JournalEntryDraft,
        moodlog_core::journal::JournalEntry,
        moodlog_core::journal::PaginatedResponse<moodlog_core::journal::JournalEntry>,
        moodlog_core::analysis::AnalysisResult,
        moodlog_core::analysis::AnalysisSource,
        moodlog_core::analysis::AnalysisOutcome,
        moodlog_core::insight::MoodInsightRequest,
        moodlog_core::insight::MoodInsightResponse,
        moodlog_core::stats::MoodStats,
        routes::journal::JournalStatsResponse,
    )),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "user_id_header",
            utoipa::openapi::security::SecurityScheme::ApiKey(
                utoipa::openapi::security::ApiKey::Header(
                    utoipa::openapi::security::ApiKeyValue::new(auth::USER_ID_HEADER),
                ),
            ),
        );
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Name of the configured text generator, `unavailable` when none is configured.
    pub generator: String,
}

#[tokio::main]
async fn main() {
    // Load .env if present (dev only)
    let _ = dotenvy::dotenv();

    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "moodlog_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&database_url)
        .await
        .expect("Failed to connect to database");

    sqlx::migrate!("../migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let generator = generation::build_generator(generation::GenerationConfig::from_env());
    let app_state = state::AppState {
        memory: Arc::new(memory::PgInsightMemory::new(pool.clone())),
        db: pool,
        generator,
    };

    let cors_layer = middleware::cors::build_cors_layer();

    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(routes::health::router())
        .merge(routes::journal::write_router().layer(middleware::rate_limit::analysis_layer()))
        .merge(routes::journal::read_router().layer(middleware::rate_limit::journal_read_layer()))
        .merge(routes::analysis::router().layer(middleware::rate_limit::analysis_layer()))
        .merge(routes::insights::router().layer(middleware::rate_limit::analysis_layer()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn(middleware::security_headers::apply))
                .layer(cors_layer),
        )
        .with_state(app_state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Moodlog API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server error");
}
