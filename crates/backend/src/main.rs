use std::sync::Arc;

use axum::{
    http::{header, Method},
    routing::{get, post, put},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};

mod clients;
mod config;
pub mod error;
mod handlers;
mod poller;
mod services;
mod utils;

use clients::calendar::CalendarClient;
use clients::supabase::SupabaseClient;
use config::{AppConfig, PollerConfig};
use handlers::AppState;
use poller::dispatch::FileSuggestionSink;
use poller::source::HttpEventSource;
use poller::EventPoller;
use services::suggestions::GeminiSuggestionGenerator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    dotenvy::dotenv().ok();

    let config = AppConfig::from_env();

    let calendar = match CalendarClient::from_config(&config) {
        Ok(client) => Some(client),
        Err(e) => {
            tracing::warn!("Calendar provider not configured, calendar routes disabled: {e}");
            None
        }
    };
    let supabase = SupabaseClient::from_config(&config);
    let generator = GeminiSuggestionGenerator::from_config(&config);

    let poller = EventPoller::new(
        PollerConfig::default(),
        config.poller_enabled,
        Arc::new(HttpEventSource::new(config.api_base_url.clone())),
        Arc::new(generator.clone()),
        Arc::new(FileSuggestionSink::new(
            config.suggestion_file.clone(),
            Some(supabase.clone()),
        )),
        Arc::new(supabase.clone()),
    );
    poller.start().await;

    let state = AppState {
        calendar,
        supabase,
        generator,
    };

    let app = Router::new()
        .route("/", get(handlers::root))
        // Calendar routes
        .route("/calendar/events", get(handlers::list_events))
        .route("/calendar/events", post(handlers::create_event))
        .route("/calendar/events/today", get(handlers::today_events))
        // Health routes
        .route("/health/overview", get(handlers::health_overview))
        .route("/health/insights", get(handlers::health_insights))
        // Suggestion routes
        .route(
            "/event-day-suggestion",
            get(handlers::event_day_suggestion),
        )
        // User profile routes
        .route("/users", post(handlers::create_profile))
        .route("/users/me", get(handlers::get_current_profile))
        .route("/users/me", put(handlers::update_current_profile))
        .layer(build_cors_layer())
        .with_state(state);

    tracing::info!("Server listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    poller.stop().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
}

/// Build CORS layer based on environment configuration.
///
/// If CORS_ALLOWED_ORIGINS is set, only those origins are allowed.
/// If not set, defaults to permissive CORS (for development only).
fn build_cors_layer() -> CorsLayer {
    let allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS").ok();

    match allowed_origins {
        Some(origins) => {
            let origins: Vec<_> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();

            if origins.is_empty() {
                tracing::warn!(
                    "CORS_ALLOWED_ORIGINS is set but empty, using permissive CORS (not recommended for production)"
                );
                CorsLayer::permissive()
            } else {
                tracing::info!("CORS configured for origins: {:?}", origins);
                CorsLayer::new()
                    .allow_origin(AllowOrigin::list(origins))
                    .allow_methods([
                        Method::GET,
                        Method::POST,
                        Method::PUT,
                        Method::DELETE,
                        Method::OPTIONS,
                    ])
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
                    .allow_credentials(true)
            }
        }
        None => {
            tracing::warn!(
                "CORS_ALLOWED_ORIGINS not set, using permissive CORS (not recommended for production)"
            );
            CorsLayer::permissive()
        }
    }
}
