//! Threat Intelligence Dashboard
//!
//! Server-rendered dashboard over the dark web analytics API: topic
//! overviews, grouped titles, mirrors, actor intel, keyword and source
//! trends, with search, sorting and CSV/JSON export.

mod api;
mod auth;
mod client;
mod config;
mod daterange;
mod errors;
mod export;
mod models;
mod pages;
mod render;
mod resource;
mod view;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use client::ApiClient;
use config::Config;
use pages::PageStore;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub client: Arc<ApiClient>,
    pub pages: Arc<PageStore>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Threat Intelligence Dashboard");
    tracing::info!("Upstream API: {}", config.api_base_url);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.admin_psk.is_none() {
        tracing::warn!("No admin PSK configured (DASH_ADMIN_PSK). Pipeline triggers are open!");
    }

    let state = AppState {
        client: Arc::new(ApiClient::new(&config)?),
        pages: Arc::new(PageStore::new()),
        config: Arc::new(config.clone()),
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let psk = state.config.admin_psk.clone();

    // Pipeline triggers
    let admin_actions = Router::new()
        .route("/admin/run", post(api::run_pipeline))
        .route("/admin/clear", post(api::clear_logs))
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    let page_routes = Router::new()
        // Topics
        .route("/", get(api::topic_selector))
        .route("/refresh", post(api::refresh_topics))
        .route("/topic/{id}", get(api::topic_dashboard))
        .route("/topic/{id}/range", post(api::select_range))
        .route("/topic/{id}/toggle", post(api::toggle_topic_item))
        .route("/topic/{id}/refresh", post(api::refresh_topic))
        .route("/topic/{id}/export", get(api::export_topic_groups))
        // Daily domains
        .route("/domains", get(api::daily_domains))
        .route("/domains/toggle", post(api::toggle_domain))
        .route("/domains/refresh", post(api::refresh_domains))
        .route("/domains/export", get(api::export_domains))
        // Grouped titles
        .route("/titles", get(api::grouped_titles))
        .route("/titles/toggle", post(api::toggle_title))
        .route("/titles/refresh", post(api::refresh_titles))
        .route("/titles/export", get(api::export_titles))
        // Keyword trends
        .route("/keywords", get(api::keyword_trends))
        .route("/keywords/refresh", post(api::refresh_keywords))
        .route("/keywords/export", get(api::export_keywords))
        // Source summary
        .route("/sources", get(api::source_summary))
        .route("/sources/refresh", post(api::refresh_sources))
        .route("/sources/export", get(api::export_sources))
        // Time trends
        .route("/trends", get(api::time_trends))
        .route("/trends/refresh", post(api::refresh_trends))
        .route("/trends/export", get(api::export_trends))
        // Admin
        .route("/admin", get(api::admin_page));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .merge(page_routes)
        .merge(admin_actions)
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
