use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::media::MediaKind;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid object id: {0}")]
    InvalidId(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

/// An object held by the store, independent of whether anything references it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    pub public_id: String,
    pub url: String,
    pub kind: MediaKind,
}

/// Blob service holding uploaded media.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store one asset and return where it can be fetched.
    async fn upload(
        &self,
        data: Bytes,
        extension: Option<&str>,
        kind: MediaKind,
    ) -> Result<RemoteObject, StoreError>;

    /// List stored objects, optionally restricted to one kind.
    async fn list(&self, kind: Option<MediaKind>) -> Result<Vec<RemoteObject>, StoreError>;

    /// Delete objects of one kind. Ids that are already gone are skipped.
    /// Returns how many objects were actually removed.
    async fn bulk_delete(&self, public_ids: &[String], kind: MediaKind)
        -> Result<usize, StoreError>;
}

pub type DynObjectStore = Arc<dyn ObjectStore>;

/// Object store backed by a directory, one subdirectory per media kind.
/// Objects are served back by the `/media/{kind}/{id}` route.
pub struct LocalObjectStore {
    root: PathBuf,
    base_url: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> std::io::Result<Self> {
        let root = root.into();
        for kind in MediaKind::ALL {
            std::fs::create_dir_all(root.join(kind.dir()))?;
        }
        Ok(Self {
            root,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn path_for(&self, kind: MediaKind, public_id: &str) -> Option<PathBuf> {
        object_path(&self.root, kind, public_id)
    }

    fn object(&self, kind: MediaKind, public_id: String) -> RemoteObject {
        RemoteObject {
            url: format!("{}/media/{}/{}", self.base_url, kind.dir(), public_id),
            public_id,
            kind,
        }
    }

    async fn list_kind(&self, kind: MediaKind) -> Result<Vec<RemoteObject>, StoreError> {
        let dir = self.root.join(kind.dir());
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut objects = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if is_valid_public_id(&name) {
                objects.push(self.object(kind, name));
            }
        }
        objects.sort_by(|a, b| a.public_id.cmp(&b.public_id));
        Ok(objects)
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn upload(
        &self,
        data: Bytes,
        extension: Option<&str>,
        kind: MediaKind,
    ) -> Result<RemoteObject, StoreError> {
        let id = uuid::Uuid::now_v7().to_string();
        let public_id = match extension.filter(|ext| is_valid_extension(ext)) {
            Some(ext) => format!("{}.{}", id, ext.to_ascii_lowercase()),
            None => id,
        };

        let path = self.root.join(kind.dir()).join(&public_id);
        tokio::fs::write(&path, &data).await?;

        tracing::debug!("Stored {} {} ({} bytes)", kind, public_id, data.len());
        Ok(self.object(kind, public_id))
    }

    async fn list(&self, kind: Option<MediaKind>) -> Result<Vec<RemoteObject>, StoreError> {
        match kind {
            Some(kind) => self.list_kind(kind).await,
            None => {
                let mut objects = Vec::new();
                for kind in MediaKind::ALL {
                    objects.extend(self.list_kind(kind).await?);
                }
                Ok(objects)
            }
        }
    }

    async fn bulk_delete(
        &self,
        public_ids: &[String],
        kind: MediaKind,
    ) -> Result<usize, StoreError> {
        let mut removed = 0;
        for public_id in public_ids {
            let path = self
                .path_for(kind, public_id)
                .ok_or_else(|| StoreError::InvalidId(public_id.clone()))?;
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(removed)
    }
}

/// Where a [`LocalObjectStore`] rooted at `root` keeps an object, or `None`
/// if the id could escape the kind directory.
pub fn object_path(root: &Path, kind: MediaKind, public_id: &str) -> Option<PathBuf> {
    is_valid_public_id(public_id).then(|| root.join(kind.dir()).join(public_id))
}

fn is_valid_public_id(id: &str) -> bool {
    !id.is_empty()
        && !id.starts_with('.')
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

fn is_valid_extension(ext: &str) -> bool {
    !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, LocalObjectStore) {
        let tmp = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(tmp.path(), "http://media.test/").unwrap();
        (tmp, store)
    }

    #[tokio::test]
    async fn upload_writes_file_and_builds_url() {
        let (_tmp, store) = store();
        let object = store
            .upload(Bytes::from_static(b"png"), Some("PNG"), MediaKind::Image)
            .await
            .unwrap();

        assert!(object.public_id.ends_with(".png"));
        assert_eq!(
            object.url,
            format!("http://media.test/media/images/{}", object.public_id)
        );
        let path = store.path_for(MediaKind::Image, &object.public_id).unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"png");
    }

    #[tokio::test]
    async fn list_is_scoped_by_kind() {
        let (_tmp, store) = store();
        let image = store
            .upload(Bytes::from_static(b"i"), Some("jpg"), MediaKind::Image)
            .await
            .unwrap();
        let video = store
            .upload(Bytes::from_static(b"v"), Some("mp4"), MediaKind::Video)
            .await
            .unwrap();

        assert_eq!(store.list(Some(MediaKind::Image)).await.unwrap(), vec![image.clone()]);
        assert_eq!(store.list(Some(MediaKind::Video)).await.unwrap(), vec![video.clone()]);
        assert_eq!(store.list(None).await.unwrap(), vec![image, video]);
    }

    #[tokio::test]
    async fn bulk_delete_ignores_missing_ids() {
        let (_tmp, store) = store();
        let object = store
            .upload(Bytes::from_static(b"i"), None, MediaKind::Image)
            .await
            .unwrap();

        let removed = store
            .bulk_delete(
                &[object.public_id.clone(), "already-gone".to_string()],
                MediaKind::Image,
            )
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(store.list(None).await.unwrap().is_empty());

        // Deleting again is not an error.
        let removed = store
            .bulk_delete(&[object.public_id], MediaKind::Image)
            .await
            .unwrap();
        assert_eq!(removed, 0);
    }

    #[tokio::test]
    async fn bulk_delete_rejects_path_traversal() {
        let (_tmp, store) = store();
        let result = store
            .bulk_delete(&["../secrets".to_string()], MediaKind::Image)
            .await;
        assert!(matches!(result, Err(StoreError::InvalidId(_))));
    }

    #[test]
    fn path_for_rejects_unsafe_ids() {
        let (_tmp, store) = store();
        assert!(store.path_for(MediaKind::Video, "abc.mp4").is_some());
        assert!(store.path_for(MediaKind::Video, "../abc").is_none());
        assert!(store.path_for(MediaKind::Video, ".hidden").is_none());
        assert!(store.path_for(MediaKind::Video, "").is_none());
    }
}
