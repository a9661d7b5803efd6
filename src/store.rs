//! # Storage Collaborators
//!
//! The engine only ever keeps image URLs. Raw bytes pass through here on
//! upload, and transiently when an export needs the pixels. Snapshots are
//! handed to a host-owned store as plain JSON.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::FetchConfig;
use crate::snapshot::Snapshot;

/// Errors from image or snapshot storage.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Failed to download {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("Invalid identifier: {0}")]
    InvalidId(String),

    #[error("HTTP client error: {0}")]
    Client(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A file handed to the engine by upload, paste or drop.
#[derive(Debug, Clone, Default)]
pub struct UploadedImage {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedImage {
    /// File extension to store the upload under.
    fn extension(&self) -> &'static str {
        let from_type = self.content_type.as_deref().and_then(|t| match t {
            "image/png" => Some("png"),
            "image/jpeg" | "image/jpg" => Some("jpg"),
            "image/gif" => Some("gif"),
            "image/webp" => Some("webp"),
            "image/bmp" => Some("bmp"),
            _ => None,
        });
        from_type
            .or_else(|| match image::guess_format(&self.bytes) {
                Ok(image::ImageFormat::Png) => Some("png"),
                Ok(image::ImageFormat::Jpeg) => Some("jpg"),
                Ok(image::ImageFormat::Gif) => Some("gif"),
                Ok(image::ImageFormat::WebP) => Some("webp"),
                Ok(image::ImageFormat::Bmp) => Some("bmp"),
                _ => None,
            })
            .unwrap_or("bin")
    }
}

/// Image storage: `upload(file) -> url` and `fetch(url) -> bytes`.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn upload(&self, image: UploadedImage) -> Result<String, StoreError>;
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, StoreError>;
}

/// In-process store, used by tests and the CLI.
#[derive(Default)]
pub struct MemoryImageStore {
    images: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a URL with bytes, as if it had been uploaded elsewhere.
    pub async fn insert(&self, url: impl Into<String>, bytes: Vec<u8>) {
        self.images.write().await.insert(url.into(), bytes);
    }

    pub async fn len(&self) -> usize {
        self.images.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.images.read().await.is_empty()
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn upload(&self, image: UploadedImage) -> Result<String, StoreError> {
        let url = format!("memory://images/{}.{}", Uuid::new_v4(), image.extension());
        self.images.write().await.insert(url.clone(), image.bytes);
        Ok(url)
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, StoreError> {
        self.images
            .read()
            .await
            .get(url)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(url.to_string()))
    }
}

/// Stores uploads on disk and downloads anything else over HTTP.
///
/// Uploaded files are served back by the HTTP surface under
/// `<public_base>/images/<name>`; fetching such a URL reads the file
/// directly instead of looping through the network.
pub struct HttpImageStore {
    client: reqwest::Client,
    upload_dir: PathBuf,
    public_base: String,
}

impl HttpImageStore {
    pub fn new(
        config: &FetchConfig,
        upload_dir: impl Into<PathBuf>,
        public_base: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StoreError::Client(e.to_string()))?;
        Ok(Self {
            client,
            upload_dir: upload_dir.into(),
            public_base: public_base.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Local file backing `url`, if it points at our own uploads.
    fn local_path(&self, url: &str) -> Option<PathBuf> {
        let name = url
            .strip_prefix(&self.public_base)?
            .strip_prefix("/images/")?;
        is_safe_name(name).then(|| self.upload_dir.join(name))
    }
}

#[async_trait]
impl ImageStore for HttpImageStore {
    async fn upload(&self, image: UploadedImage) -> Result<String, StoreError> {
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        let name = format!("{}.{}", Uuid::new_v4(), image.extension());
        tokio::fs::write(self.upload_dir.join(&name), &image.bytes).await?;
        tracing::info!(file = %name, bytes = image.bytes.len(), "stored upload");
        Ok(format!("{}/images/{}", self.public_base, name))
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, StoreError> {
        if let Some(path) = self.local_path(url) {
            return tokio::fs::read(&path).await.map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => StoreError::NotFound(url.to_string()),
                _ => StoreError::Io(e),
            });
        }

        let download_error = |reason: String| StoreError::Download {
            url: url.to_string(),
            reason,
        };
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| download_error(e.to_string()))?;
        if !response.status().is_success() {
            return Err(download_error(format!("HTTP {}", response.status())));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| download_error(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

/// Host-owned snapshot persistence.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn save(&self, id: &str, snapshot: &Snapshot) -> Result<(), StoreError>;
    /// `Ok(None)` when nothing was saved under `id`.
    async fn load(&self, id: &str) -> Result<Option<Snapshot>, StoreError>;
}

/// One pretty-printed JSON file per snapshot id.
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, StoreError> {
        if !is_safe_name(id) {
            return Err(StoreError::InvalidId(id.to_string()));
        }
        Ok(self.dir.join(format!("{id}.json")))
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn save(&self, id: &str, snapshot: &Snapshot) -> Result<(), StoreError> {
        let path = self.path_for(id)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(&path, snapshot.to_json()?).await?;
        tracing::debug!(id, path = %path.display(), "saved snapshot");
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Option<Snapshot>, StoreError> {
        let path = self.path_for(id)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(Some(Snapshot::parse_lenient(&text))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

/// Identifiers used as file names: letters, digits, `-`, `_`, `.`, no
/// leading dot.
fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("vitrine-{tag}-{}", Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryImageStore::new();
        let url = store
            .upload(UploadedImage {
                file_name: Some("a.png".into()),
                content_type: Some("image/png".into()),
                bytes: vec![1, 2, 3],
            })
            .await
            .unwrap();
        assert!(url.starts_with("memory://images/"));
        assert!(url.ends_with(".png"));
        assert_eq!(store.fetch(&url).await.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_memory_store_missing() {
        let store = MemoryImageStore::new();
        let err = store.fetch("memory://images/none.png").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_http_store_serves_own_uploads_from_disk() {
        let dir = temp_dir("uploads");
        let store =
            HttpImageStore::new(&FetchConfig::default(), &dir, "http://localhost:8080/").unwrap();
        let url = store
            .upload(UploadedImage {
                content_type: Some("image/jpeg".into()),
                bytes: vec![9, 9],
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(url.starts_with("http://localhost:8080/images/"));
        assert_eq!(store.fetch(&url).await.unwrap(), vec![9, 9]);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_file_snapshot_store() {
        let dir = temp_dir("snapshots");
        let store = FileSnapshotStore::new(&dir);
        assert!(store.load("product-1").await.unwrap().is_none());

        let mut snapshot = Snapshot::empty("minimal-card");
        snapshot.fields.insert("title".into(), "Stool".into());
        store.save("product-1", &snapshot).await.unwrap();
        assert_eq!(store.load("product-1").await.unwrap(), Some(snapshot));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_snapshot_ids_cannot_escape_dir() {
        let store = FileSnapshotStore::new(temp_dir("escape"));
        let err = store.load("../etc/passwd").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidId(_)));
    }

    #[test]
    fn test_upload_extension_sniffing() {
        let png_header = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        let upload = UploadedImage {
            bytes: png_header,
            ..Default::default()
        };
        assert_eq!(upload.extension(), "png");
        assert_eq!(UploadedImage::default().extension(), "bin");
    }
}
