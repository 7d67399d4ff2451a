use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

/// Upper bound on an uploaded avatar image.
pub const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("unsupported image type")]
    InvalidFileType,
    #[error("image exceeds the size limit")]
    SizeExceeded,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Where avatar images go. The core only keeps the returned public path;
/// everything else about file handling stays behind this seam.
#[async_trait]
pub trait AvatarStorage: Send + Sync {
    async fn store(&self, body: Bytes, content_type: &str) -> Result<String, UploadError>;
}

pub fn ext_from_mime(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

/// Shared gate for every implementation: whitelist the type, cap the size.
pub fn validate_image(body: &Bytes, content_type: &str) -> Result<&'static str, UploadError> {
    let ext = ext_from_mime(content_type).ok_or(UploadError::InvalidFileType)?;
    if body.len() > MAX_AVATAR_BYTES {
        return Err(UploadError::SizeExceeded);
    }
    Ok(ext)
}

/// Local-filesystem storage; files land under the uploads dir and are served
/// as static assets at `/uploads/avatars/...`.
pub struct FsAvatarStorage {
    dir: PathBuf,
}

impl FsAvatarStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl AvatarStorage for FsAvatarStorage {
    async fn store(&self, body: Bytes, content_type: &str) -> Result<String, UploadError> {
        let ext = validate_image(&body, content_type)?;
        let filename = format!("{}.{}", Uuid::new_v4(), ext);
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(&filename);
        tokio::fs::write(&path, &body).await?;
        info!(path = %path.display(), bytes = body.len(), "avatar stored");
        Ok(format!("/uploads/avatars/{filename}"))
    }
}
