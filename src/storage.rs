use std::path::{Component, Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncWriteExt;

/// URL prefix under which the uploads directory is served.
pub const UPLOADS_URL_PREFIX: &str = "/uploads";
/// Shared placeholder assigned to users without a photo. Never deleted.
pub const DEFAULT_PHOTO: &str = "/uploads/default.jpg";

const DEFAULT_PHOTO_FILE: &str = "default.jpg";
static PLACEHOLDER_JPEG: &[u8] = include_bytes!("../assets/default.jpg");

pub fn is_default_photo(public_path: &str) -> bool {
    public_path == DEFAULT_PHOTO
}

#[async_trait]
pub trait PhotoStorage: Send + Sync {
    /// Writes a new file and returns its public path. Never overwrites an existing file.
    async fn put(&self, file_name: &str, body: Bytes) -> anyhow::Result<String>;
    async fn delete(&self, public_path: &str) -> anyhow::Result<()>;
}

#[derive(Clone, Debug)]
pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the uploads directory and the placeholder photo if either is missing.
    pub async fn ensure_layout(&self) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("create uploads dir {}", self.root.display()))?;

        let placeholder = self.root.join(DEFAULT_PHOTO_FILE);
        if !tokio::fs::try_exists(&placeholder).await.unwrap_or(false) {
            tokio::fs::write(&placeholder, PLACEHOLDER_JPEG)
                .await
                .with_context(|| format!("write placeholder {}", placeholder.display()))?;
            tracing::info!(path = %placeholder.display(), "default photo placeholder created");
        }
        Ok(())
    }

    /// Maps a public `/uploads/<file>` path to a file directly inside the root.
    pub fn resolve(&self, public_path: &str) -> Option<PathBuf> {
        let name = public_path
            .strip_prefix(UPLOADS_URL_PREFIX)?
            .strip_prefix('/')?;
        is_plain_file_name(name).then(|| self.root.join(name))
    }
}

fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[async_trait]
impl PhotoStorage for DiskStorage {
    async fn put(&self, file_name: &str, body: Bytes) -> anyhow::Result<String> {
        anyhow::ensure!(
            is_plain_file_name(file_name),
            "invalid upload file name {file_name:?}"
        );
        let path = self.root.join(file_name);

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .with_context(|| format!("create {}", path.display()))?;

        let written = async {
            file.write_all(&body).await?;
            file.flush().await
        }
        .await;

        if let Err(e) = written {
            drop(file);
            if let Err(rm) = tokio::fs::remove_file(&path).await {
                tracing::warn!(error = %rm, path = %path.display(), "failed to remove partial upload");
            }
            return Err(e).with_context(|| format!("write {}", path.display()));
        }

        Ok(format!("{UPLOADS_URL_PREFIX}/{file_name}"))
    }

    async fn delete(&self, public_path: &str) -> anyhow::Result<()> {
        anyhow::ensure!(
            !is_default_photo(public_path),
            "refusing to delete the default photo"
        );
        let path = self
            .resolve(public_path)
            .with_context(|| format!("photo path {public_path:?} is outside the uploads dir"))?;
        tokio::fs::remove_file(&path)
            .await
            .with_context(|| format!("remove {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod storage_tests {
    use super::*;

    async fn storage() -> (tempfile::TempDir, DiskStorage) {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = DiskStorage::new(dir.path().join("uploads"));
        storage.ensure_layout().await.expect("layout");
        (dir, storage)
    }

    #[tokio::test]
    async fn ensure_layout_writes_placeholder_once() {
        let (_dir, storage) = storage().await;
        let placeholder = storage.root().join("default.jpg");
        assert_eq!(std::fs::read(&placeholder).unwrap(), PLACEHOLDER_JPEG);

        std::fs::write(&placeholder, b"custom").unwrap();
        storage.ensure_layout().await.unwrap();
        assert_eq!(std::fs::read(&placeholder).unwrap(), b"custom");
    }

    #[tokio::test]
    async fn put_returns_public_path_and_never_overwrites() {
        let (_dir, storage) = storage().await;
        let path = storage
            .put("abc-1-me.png", Bytes::from_static(b"png"))
            .await
            .unwrap();
        assert_eq!(path, "/uploads/abc-1-me.png");
        assert_eq!(std::fs::read(storage.root().join("abc-1-me.png")).unwrap(), b"png");

        let again = storage.put("abc-1-me.png", Bytes::from_static(b"other")).await;
        assert!(again.is_err());
        assert_eq!(std::fs::read(storage.root().join("abc-1-me.png")).unwrap(), b"png");
    }

    #[tokio::test]
    async fn put_rejects_names_with_path_components() {
        let (_dir, storage) = storage().await;
        assert!(storage.put("../escape.jpg", Bytes::new()).await.is_err());
        assert!(storage.put("a/b.jpg", Bytes::new()).await.is_err());
    }

    #[tokio::test]
    async fn delete_removes_owned_file() {
        let (_dir, storage) = storage().await;
        let path = storage.put("x.jpg", Bytes::from_static(b"1")).await.unwrap();
        storage.delete(&path).await.unwrap();
        assert!(!storage.root().join("x.jpg").exists());
        assert!(storage.delete(&path).await.is_err());
    }

    #[tokio::test]
    async fn delete_refuses_default_and_foreign_paths() {
        let (_dir, storage) = storage().await;
        assert!(storage.delete(DEFAULT_PHOTO).await.is_err());
        assert!(storage.root().join("default.jpg").exists());

        assert!(storage.delete("/etc/passwd").await.is_err());
        assert!(storage.delete("/uploads/../secret").await.is_err());
        assert!(storage.resolve("/uploadsx/a.jpg").is_none());
    }
}
