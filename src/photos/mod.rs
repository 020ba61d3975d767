pub mod handlers;
pub mod services;
pub mod upload;

use crate::state::AppState;
use axum::Router;

pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .merge(handlers::profile_routes())
        .merge(handlers::photo_routes(max_upload_bytes))
}
