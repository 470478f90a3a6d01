//! Image upload storage on the local filesystem

use std::path::{Path, PathBuf};

use axum::body::Bytes;
use chrono::Utc;
use uuid::Uuid;

use crate::error::AppError;

/// Maximum number of images accepted in one upload request.
pub const MAX_IMAGES: usize = 5;

/// Maximum size of a single image.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Public URL prefix under which stored files are served.
pub const PUBLIC_PREFIX: &str = "/uploads";

/// One file received from a multipart form
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

pub struct UploadService {
    dir: PathBuf,
}

impl UploadService {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the upload directory if it does not exist yet
    pub async fn ensure_dir(&self) -> Result<(), AppError> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            AppError::Internal(format!("cannot create {}: {e}", self.dir.display()))
        })
    }

    /// Validate and persist a batch of images, returning their public URLs.
    /// Nothing is written unless every file passes validation.
    pub async fn store_images(&self, files: Vec<UploadedFile>) -> Result<Vec<String>, AppError> {
        if files.is_empty() {
            return Err(AppError::invalid_request("No files were uploaded."));
        }
        if files.len() > MAX_IMAGES {
            return Err(AppError::invalid_request(format!(
                "You can upload at most {MAX_IMAGES} images."
            )));
        }
        if let Some(bad) = files.iter().find(|f| !is_image(f.content_type.as_deref())) {
            return Err(AppError::invalid_request(format!(
                "Only image files are allowed ({}).",
                bad.file_name.as_deref().unwrap_or("unnamed")
            )));
        }

        if let Some(big) = files.iter().find(|f| f.bytes.len() > MAX_IMAGE_BYTES) {
            return Err(AppError::invalid_request(format!(
                "Each image must be at most {} MB ({} is too large).",
                MAX_IMAGE_BYTES / (1024 * 1024),
                big.file_name.as_deref().unwrap_or("unnamed")
            )));
        }

        self.ensure_dir().await?;

        let mut urls = Vec::with_capacity(files.len());
        for file in files {
            let name = stored_name(file.file_name.as_deref());
            let path = self.dir.join(&name);
            tokio::fs::write(&path, &file.bytes).await.map_err(|e| {
                AppError::Internal(format!("cannot write {}: {e}", path.display()))
            })?;
            tracing::debug!(file = %name, bytes = file.bytes.len(), "image stored");
            urls.push(format!("{PUBLIC_PREFIX}/{name}"));
        }
        Ok(urls)
    }
}

fn is_image(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.starts_with("image/"))
}

/// `<millis>-<random>-<sanitised original name>`
fn stored_name(original: Option<&str>) -> String {
    let token = Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}-{}",
        Utc::now().timestamp_millis(),
        &token[..8],
        sanitize(original.unwrap_or("image"))
    )
}

/// Keep only the final path component and replace anything outside
/// `[A-Za-z0-9._-]`.
fn sanitize(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
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
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "image".to_owned()
    } else {
        cleaned.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn png(name: &str) -> UploadedFile {
        UploadedFile {
            file_name: Some(name.to_owned()),
            content_type: Some("image/png".to_owned()),
            bytes: Bytes::from_static(b"\x89PNG"),
        }
    }

    #[rstest]
    #[case("photo.jpg", "photo.jpg")]
    #[case("../../etc/passwd", "passwd")]
    #[case("C:\\Users\\me\\my shirt.png", "my_shirt.png")]
    #[case("..", "image")]
    #[case(".hidden.png", "hidden.png")]
    fn sanitizes_file_names(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(sanitize(input), expected);
    }

    #[tokio::test]
    async fn stores_files_and_returns_public_urls() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = UploadService::new(dir.path().join("uploads"));

        let urls = uploads
            .store_images(vec![png("front.png"), png("back.png")])
            .await
            .unwrap();

        assert_eq!(urls.len(), 2);
        for url in &urls {
            let name = url.strip_prefix("/uploads/").unwrap();
            let written = std::fs::read(uploads.dir().join(name)).unwrap();
            assert_eq!(written, b"\x89PNG");
        }
        assert!(urls[0].ends_with("-front.png"));
    }

    #[tokio::test]
    async fn empty_batch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = UploadService::new(dir.path())
            .store_images(vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(ref m) if m == "No files were uploaded."));
    }

    #[tokio::test]
    async fn too_many_files_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let files = (0..=MAX_IMAGES).map(|i| png(&format!("{i}.png"))).collect();
        let err = UploadService::new(dir.path())
            .store_images(files)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn non_images_abort_the_whole_batch() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = UploadService::new(dir.path().join("uploads"));
        let script = UploadedFile {
            file_name: Some("run.sh".into()),
            content_type: Some("text/x-shellscript".into()),
            bytes: Bytes::from_static(b"#!/bin/sh"),
        };

        let err = uploads
            .store_images(vec![png("ok.png"), script])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
        assert!(!uploads.dir().exists());
    }

    #[tokio::test]
    async fn oversized_images_are_rejected_before_anything_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = UploadService::new(dir.path().join("uploads"));
        let huge = UploadedFile {
            file_name: Some("huge.png".into()),
            content_type: Some("image/png".into()),
            bytes: Bytes::from(vec![0u8; MAX_IMAGE_BYTES + 1]),
        };

        let err = uploads
            .store_images(vec![png("small.png"), huge])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));
        assert!(!uploads.dir().exists());
    }

    #[tokio::test]
    async fn image_at_the_size_limit_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let exact = UploadedFile {
            file_name: Some("exact.png".into()),
            content_type: Some("image/png".into()),
            bytes: Bytes::from(vec![0u8; MAX_IMAGE_BYTES]),
        };

        let urls = UploadService::new(dir.path())
            .store_images(vec![exact])
            .await
            .unwrap();
        assert_eq!(urls.len(), 1);
    }
}
