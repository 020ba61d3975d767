use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::{debug, error};
use uuid::Uuid;

use crate::auth::session::UserSession;
use crate::error::AppError;
use crate::state::AppState;

pub const LOGIN_PATH: &str = "/login";

/// Resolves the session to a user ID; anything else redirects to the login page
/// before the handler body runs.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = UserSession::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| {
                error!(reason = msg, "session layer unavailable");
                AppError::Unauthenticated
            })?;
        match session.authenticated_user_id().await {
            Ok(Some(user_id)) => Ok(AuthUser(user_id)),
            Ok(None) => {
                debug!(path = %parts.uri.path(), "no authenticated session");
                Err(AppError::Unauthenticated)
            }
            Err(e) => {
                error!(error = %e, "session lookup failed");
                Err(AppError::Unauthenticated)
            }
        }
    }
}
