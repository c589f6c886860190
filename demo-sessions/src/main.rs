use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use session_registry::{RegistryConfig, SessionRegistry, spawn_expiry_sweeper};
use session_registry_axum::require_session;

mod handlers;

use crate::handlers::{health, index, login, logout, protected};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "{}=debug,session_registry=debug,session_registry_axum=debug",
                    env!("CARGO_CRATE_NAME")
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let registry = Arc::new(SessionRegistry::new(RegistryConfig::from_env()?)?);
    let _sweeper = spawn_expiry_sweeper(&registry, Duration::from_secs(60))?;

    let protected_routes = Router::new()
        .route("/protected", get(protected))
        .layer(from_fn_with_state(registry.clone(), require_session));

    let app = Router::new()
        .route("/", get(index))
        .route("/login/{user_id}", post(login))
        .route("/logout", get(logout))
        .route("/health", get(health))
        .merge(protected_routes)
        .with_state(registry);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3001);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}
