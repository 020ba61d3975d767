use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use super::upload::{storage_file_name, UploadedPhoto};
use crate::error::AppError;
use crate::state::AppState;
use crate::storage::{is_default_photo, PhotoStorage, DEFAULT_PHOTO};
use crate::users::User;

/// Outcome of a best-effort photo removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cleanup {
    /// The path was the shared default and was left alone.
    Skipped,
    Removed,
    /// Deletion failed; the error was logged and dropped.
    Failed,
}

/// Removes a photo that no record points at any more. Never fails its caller.
pub async fn cleanup_photo(storage: &dyn PhotoStorage, public_path: &str) -> Cleanup {
    if is_default_photo(public_path) {
        return Cleanup::Skipped;
    }
    match storage.delete(public_path).await {
        Ok(()) => {
            info!(path = %public_path, "stale photo removed");
            Cleanup::Removed
        }
        Err(e) => {
            warn!(error = %e, path = %public_path, "failed to delete stale photo");
            Cleanup::Failed
        }
    }
}

/// Stores `upload` as the user's photo.
///
/// Order is write new file, save record, delete old file, so a failure at any step
/// leaves the record pointing at a file that exists.
pub async fn replace_photo(
    st: &AppState,
    user_id: Uuid,
    upload: Option<UploadedPhoto>,
) -> Result<User, AppError> {
    let upload = upload.ok_or(AppError::NoFileProvided)?;

    let mut user = st
        .users
        .find_by_id(user_id)
        .await?
        .ok_or(AppError::UserNotFound(user_id))?;

    let file_name = storage_file_name(user.id, OffsetDateTime::now_utc(), &upload.original_name);
    let new_path = st
        .photos
        .put(&file_name, upload.body)
        .await
        .map_err(AppError::Storage)?;

    let previous = std::mem::replace(&mut user.profile_photo, new_path.clone());
    if let Err(e) = st.users.save(&user).await {
        cleanup_photo(st.photos.as_ref(), &new_path).await;
        return Err(e.into());
    }

    cleanup_photo(st.photos.as_ref(), &previous).await;
    info!(user_id = %user.id, path = %new_path, "profile photo replaced");
    Ok(user)
}

/// Resets the user's photo to the default placeholder.
pub async fn delete_photo(st: &AppState, user_id: Uuid) -> Result<User, AppError> {
    let mut user = st
        .users
        .find_by_id(user_id)
        .await?
        .ok_or(AppError::UserNotFound(user_id))?;

    if is_default_photo(&user.profile_photo) {
        return Ok(user);
    }

    let previous = std::mem::replace(&mut user.profile_photo, DEFAULT_PHOTO.to_string());
    st.users.save(&user).await?;
    cleanup_photo(st.photos.as_ref(), &previous).await;
    info!(user_id = %user.id, "profile photo reset to default");
    Ok(user)
}
