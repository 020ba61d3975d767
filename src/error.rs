use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::extractors::LOGIN_PATH;
use crate::users::StoreError;

/// Coarse classification used at the route boundary to pick a redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Auth,
    NotFound,
    StorageIo,
    Upstream,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("username or email already exists")]
    DuplicateCredential,
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("invalid email")]
    InvalidEmail,
    #[error("no file provided")]
    NoFileProvided,
    #[error("not authenticated")]
    Unauthenticated,
    #[error("user {0} not found")]
    UserNotFound(Uuid),
    #[error("photo storage failed: {0:#}")]
    Storage(#[source] anyhow::Error),
    #[error(transparent)]
    Store(StoreError),
    #[error("internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate => AppError::DuplicateCredential,
            StoreError::NotFound(id) => AppError::UserNotFound(id),
            other => AppError::Store(other),
        }
    }
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::DuplicateCredential
            | AppError::InvalidCredentials
            | AppError::MissingField(_)
            | AppError::InvalidEmail
            | AppError::NoFileProvided => ErrorKind::Validation,
            AppError::Unauthenticated => ErrorKind::Auth,
            AppError::UserNotFound(_) => ErrorKind::NotFound,
            AppError::Storage(_) => ErrorKind::StorageIo,
            AppError::Store(_) | AppError::Internal(_) => ErrorKind::Upstream,
        }
    }

    /// One-line text safe to show to the user, if this error has a specific one.
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            AppError::DuplicateCredential => Some("Username or email already exists"),
            AppError::InvalidCredentials => Some("Invalid username or password"),
            AppError::MissingField(_) => Some("All fields are required"),
            AppError::InvalidEmail => Some("Invalid email"),
            AppError::NoFileProvided => Some("No file uploaded. Please try again."),
            _ => None,
        }
    }
}

/// Response for errors that escape a handler without being turned into a flash message.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self.kind() {
            ErrorKind::Auth | ErrorKind::NotFound => Redirect::to(LOGIN_PATH).into_response(),
            _ => {
                tracing::error!(error = %self, "unhandled request error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong").into_response()
            }
        }
    }
}
