use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sensorhub::{
    bridge::BrokerBridge, config::HubConfig, state::AppState, transport::MqttSource, ws,
};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sensorhub=debug,tower_http=debug,axum=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting sensorhub...");

    let config = HubConfig::from_env();
    let state = Arc::new(AppState::new(config.clone()));

    // One broker subscription per process, alive for the process lifetime
    // and independent of any WebSocket connection.
    let bridge = BrokerBridge::new(state.registry.clone(), config.bridge_routes());
    match MqttSource::new(&config.mqtt, config.topics()).await {
        Ok(source) => {
            tracing::info!(
                "Subscribed to {:?} on {}:{}",
                config.topics(),
                config.mqtt.host,
                config.mqtt.port
            );
            tokio::spawn(bridge.run(source));
        }
        Err(e) => {
            tracing::error!("MQTT subscription failed: {}. Live updates will not flow.", e);
        }
    }

    let app = Router::new()
        .route("/ws/{group}", get(ws::ws_handler))
        .route("/ws/{group}/", get(ws::ws_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.bind;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
