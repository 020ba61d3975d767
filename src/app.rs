use std::net::SocketAddr;

use axum::{response::Html, routing::get, Router};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tower_sessions::SessionStore;

use crate::config::AppConfig;
use crate::state::AppState;
use crate::storage::UPLOADS_URL_PREFIX;
use crate::auth::session::session_layer;
use crate::{auth, photos, views};

pub fn build_app<Store: SessionStore + Clone>(state: AppState, sessions: Store) -> Router {
    let uploads = ServeDir::new(&state.config.uploads_dir);
    let sessions = session_layer(sessions, &state.config.session);

    Router::new()
        .route("/", get(|| async { Html(views::home()) }))
        .route("/contact", get(|| async { Html(views::contact()) }))
        .route("/health", get(|| async { "ok" }))
        .merge(auth::router())
        .merge(photos::router(state.config.max_upload_bytes))
        .nest_service(UPLOADS_URL_PREFIX, uploads)
        .layer(sessions)
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
