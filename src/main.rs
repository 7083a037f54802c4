use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use festquest::{api, auth, broadcast, config::AppConfig, state::AppState};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "festquest=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting FestQuest...");

    let config = AppConfig::from_env();
    let auth_config = Arc::new(auth::AuthConfig::from_env());
    let state = Arc::new(AppState::new(config.clone()));
    tracing::info!(store = state.store.name(), "Document store ready");

    if let Some(path) = config.snapshot_path.clone() {
        match state.load_snapshot(&path).await {
            Ok(true) => tracing::info!("Restored state from {}", path.display()),
            Ok(false) => tracing::info!("No snapshot at {}, starting empty", path.display()),
            Err(e) => {
                tracing::error!("Failed to restore snapshot {}: {}", path.display(), e);
                std::process::exit(1);
            }
        }
        broadcast::spawn_snapshot_writer(state.clone(), path);
    }

    broadcast::spawn_session_sweeper(state.clone());

    let app = api::router(state, auth_config)
        .fallback_service(ServeDir::new(&config.static_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on http://{}", addr);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
    }
}
