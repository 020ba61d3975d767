mod app;
mod auth;
mod config;
mod error;
mod photos;
mod state;
mod storage;
mod users;
mod views;


use tower_sessions::MemoryStore;

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "photoprofile=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    // No traffic is accepted until the database and uploads dir are usable.
    let app_state = match AppState::init().await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "startup failed");
            return Err(e);
        }
    };

    let config = app_state.config.clone();
    let app = app::build_app(app_state, MemoryStore::default());
    app::serve(app, &config).await
}
