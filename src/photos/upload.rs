use axum::extract::multipart::{Multipart, MultipartError};
use bytes::Bytes;
use time::OffsetDateTime;
use uuid::Uuid;

/// Multipart field carrying the photo. Any other field is ignored.
pub const PHOTO_FIELD: &str = "profilePhoto";

/// Longest file name common filesystems accept.
pub const MAX_FILE_NAME_BYTES: usize = 255;

#[derive(Debug)]
pub struct UploadedPhoto {
    pub original_name: String,
    pub body: Bytes,
}

/// Reads the first file sent under [`PHOTO_FIELD`].
///
/// Browsers submit an empty part with an empty filename when no file was chosen;
/// that counts as no file.
pub async fn read_photo_field(mp: &mut Multipart) -> Result<Option<UploadedPhoto>, MultipartError> {
    while let Some(field) = mp.next_field().await? {
        if field.name() != Some(PHOTO_FIELD) {
            continue;
        }
        let original_name = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => continue,
        };
        let body = field.bytes().await?;
        return Ok(Some(UploadedPhoto {
            original_name,
            body,
        }));
    }
    Ok(None)
}

/// Last path component of a client-supplied filename, restricted to `[A-Za-z0-9._-]`.
pub fn sanitize_file_name(original: &str) -> String {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "photo".to_string()
    } else {
        cleaned
    }
}

/// Cuts `name` to at most `max` bytes, keeping its extension when there is room for one.
/// `name` must be ASCII, as [`sanitize_file_name`] output is.
fn shorten(name: String, max: usize) -> String {
    if name.len() <= max {
        return name;
    }
    match name.rfind('.') {
        Some(dot) if dot > 0 && name.len() - dot < max => {
            let ext = &name[dot..];
            format!("{}{}", &name[..max - ext.len()], ext)
        }
        _ => name[..max].to_string(),
    }
}

/// `<userId>-<unixTimeMillis>-<originalFilename>`, at most [`MAX_FILE_NAME_BYTES`] long.
pub fn storage_file_name(user_id: Uuid, at: OffsetDateTime, original: &str) -> String {
    let millis = at.unix_timestamp_nanos() / 1_000_000;
    let prefix = format!("{}-{}-", user_id, millis);
    let budget = MAX_FILE_NAME_BYTES.saturating_sub(prefix.len());
    format!("{prefix}{}", shorten(sanitize_file_name(original), budget))
}

#[cfg(test)]
mod upload_tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn storage_name_has_user_time_and_original_name() {
        let user_id = Uuid::parse_str("6f9619ff-8b86-d011-b42d-00cf4fc964ff").unwrap();
        let at = datetime!(2024-01-02 03:04:05.678 UTC);
        assert_eq!(
            storage_file_name(user_id, at, "me.jpg"),
            "6f9619ff-8b86-d011-b42d-00cf4fc964ff-1704164645678-me.jpg"
        );
    }

    #[test]
    fn sanitize_strips_directories_and_odd_characters() {
        assert_eq!(sanitize_file_name("C:\\Users\\bob\\me.png"), "me.png");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("my photo (1).jpg"), "my_photo__1_.jpg");
        assert_eq!(sanitize_file_name("fête.jpg"), "f_te.jpg");
        assert_eq!(sanitize_file_name(".."), "photo");
        assert_eq!(sanitize_file_name("dir/"), "photo");
    }

    #[test]
    fn long_names_are_cut_to_fit_and_keep_extension() {
        let user_id = Uuid::new_v4();
        let at = OffsetDateTime::now_utc();

        let long = format!("{}.jpg", "a".repeat(220));
        let name = storage_file_name(user_id, at, &long);
        assert_eq!(name.len(), MAX_FILE_NAME_BYTES);
        assert!(name.starts_with(&user_id.to_string()));
        assert!(name.ends_with("aaa.jpg"));

        let no_ext = "b".repeat(400);
        assert_eq!(storage_file_name(user_id, at, &no_ext).len(), MAX_FILE_NAME_BYTES);

        let huge_ext = format!("x.{}", "c".repeat(300));
        assert_eq!(storage_file_name(user_id, at, &huge_ext).len(), MAX_FILE_NAME_BYTES);

        assert!(storage_file_name(user_id, at, "me.jpg").ends_with("-me.jpg"));
    }

    #[test]
    fn distinct_users_or_instants_never_collide() {
        let at = OffsetDateTime::now_utc();
        let a = storage_file_name(Uuid::new_v4(), at, "x.jpg");
        let b = storage_file_name(Uuid::new_v4(), at, "x.jpg");
        assert_ne!(a, b);

        let user = Uuid::new_v4();
        let later = at + time::Duration::milliseconds(1);
        assert_ne!(
            storage_file_name(user, at, "x.jpg"),
            storage_file_name(user, later, "x.jpg")
        );
    }
}
