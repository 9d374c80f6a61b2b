use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use petcare_scheduler::config::AppConfig;
use petcare_scheduler::db;
use petcare_scheduler::handlers;
use petcare_scheduler::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!(
        hours = %config.hours.to_human_readable(),
        conflict_policy = config.conflict_policy.as_str(),
        "schedule configured"
    );

    let conn = db::init_db(&config.database_url)?;
    let state = Arc::new(AppState::new(config.clone(), conn));

    let app = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/pets", get(handlers::pets::list_pets))
        .route("/api/services", get(handlers::services::list_services))
        .route(
            "/api/services/:id/availability",
            get(handlers::services::get_availability),
        )
        .route(
            "/api/bookings",
            get(handlers::bookings::list_bookings).post(handlers::bookings::create_booking),
        )
        .route(
            "/api/bookings/:id/status",
            post(handlers::bookings::update_status),
        )
        .route("/api/calendar/month", get(handlers::calendar::month_summary))
        .route("/api/calendar/day", get(handlers::calendar::day_bookings))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
