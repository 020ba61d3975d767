use axum::{
    extract::{
        multipart::{Multipart, MultipartRejection},
        DefaultBodyLimit, State,
    },
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use tracing::{error, instrument, warn};

use super::services;
use super::upload::read_photo_field;
use crate::{
    auth::{
        extractors::{AuthUser, LOGIN_PATH},
        handlers::{flash, PROFILE_PATH},
        session::{FlashKind, UserSession},
    },
    error::{AppError, ErrorKind},
    state::AppState,
    views,
};

const UPLOAD_FAILED: &str = "Failed to upload photo. Please try again.";
const DELETE_FAILED: &str = "Failed to delete photo. Please try again.";
const PROFILE_FAILED: &str = "Failed to load profile. Please try again.";

pub fn profile_routes() -> Router<AppState> {
    Router::new().route(PROFILE_PATH, get(profile))
}

pub fn photo_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload_photo))
        .route("/delete-photo", post(delete_photo))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

#[instrument(skip(state, session))]
pub async fn profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    session: UserSession,
) -> Response {
    match state.users.find_by_id(user_id).await {
        Ok(Some(user)) => {
            let pending = session
                .take_flash(&[FlashKind::Success, FlashKind::Error])
                .await
                .unwrap_or_else(|e| {
                    error!(error = %e, "failed to read flash messages");
                    Vec::new()
                });
            Html(views::profile(&user, &pending)).into_response()
        }
        Ok(None) => {
            warn!(%user_id, "session points at a missing user");
            Redirect::to(LOGIN_PATH).into_response()
        }
        Err(e) => {
            error!(error = %e, %user_id, "load profile failed");
            flash(&session, FlashKind::LoginError, PROFILE_FAILED).await;
            Redirect::to(LOGIN_PATH).into_response()
        }
    }
}

/// Converts a photo lifecycle error into a flash message and redirect.
async fn photo_failure(session: &UserSession, e: AppError, fallback: &'static str) -> Redirect {
    if e.kind() == ErrorKind::NotFound {
        warn!(error = %e, "stale session during photo change");
        return Redirect::to(LOGIN_PATH);
    }
    let message = e.user_message().unwrap_or_else(|| {
        error!(error = %e, "photo change failed");
        fallback
    });
    flash(session, FlashKind::Error, message).await;
    Redirect::to(PROFILE_PATH)
}

#[instrument(skip(state, session, mp))]
pub async fn upload_photo(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    session: UserSession,
    mp: Result<Multipart, MultipartRejection>,
) -> Redirect {
    // A form posted without a multipart body simply carries no file.
    let upload = match mp {
        Ok(mut mp) => match read_photo_field(&mut mp).await {
            Ok(upload) => upload,
            Err(e) => {
                warn!(error = %e, %user_id, "unreadable multipart body");
                flash(&session, FlashKind::Error, UPLOAD_FAILED).await;
                return Redirect::to(PROFILE_PATH);
            }
        },
        Err(rejection) => {
            warn!(error = %rejection, %user_id, "upload without multipart body");
            None
        }
    };

    match services::replace_photo(&state, user_id, upload).await {
        Ok(_) => {
            flash(&session, FlashKind::Success, "Profile photo updated successfully!").await;
            Redirect::to(PROFILE_PATH)
        }
        Err(e) => photo_failure(&session, e, UPLOAD_FAILED).await,
    }
}

#[instrument(skip(state, session))]
pub async fn delete_photo(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    session: UserSession,
) -> Redirect {
    match services::delete_photo(&state, user_id).await {
        Ok(_) => {
            flash(&session, FlashKind::Success, "Profile photo deleted successfully!").await;
            Redirect::to(PROFILE_PATH)
        }
        Err(e) => photo_failure(&session, e, DELETE_FAILED).await,
    }
}
