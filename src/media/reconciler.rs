use serde::Serialize;
use std::collections::HashSet;

use crate::auth::identity;
use crate::db;
use crate::db::models::User;
use crate::error::AppResult;
use crate::media::store::{DynObjectStore, RemoteObject};
use crate::media::MediaKind;
use crate::state::DbPool;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    pub images_deleted: usize,
    pub videos_deleted: usize,
}

/// Remote objects whose URL does not appear in `referenced`.
pub fn find_orphans(referenced: &HashSet<String>, remote: Vec<RemoteObject>) -> Vec<RemoteObject> {
    remote
        .into_iter()
        .filter(|object| !referenced.contains(&object.url))
        .collect()
}

/// Garbage-collects stored media that no user or tuit points at anymore.
///
/// Each run recomputes the full set of references from the database. The
/// comparison is a snapshot: a reference written after the scan but before
/// the delete is not seen.
pub struct MediaReconciler {
    db: DbPool,
    store: DynObjectStore,
}

impl MediaReconciler {
    pub fn new(db: DbPool, store: DynObjectStore) -> Self {
        Self { db, store }
    }

    /// Every media URL held by any tuit attachment or user profile image.
    pub fn compute_local_reference_set(&self) -> AppResult<HashSet<String>> {
        let conn = self.db.get()?;
        let mut referenced: HashSet<String> = db::tuits::media_references(&conn)?
            .into_iter()
            .collect();
        referenced.extend(db::users::image_references(&conn)?);
        Ok(referenced)
    }

    /// Stored objects, split into (images, videos).
    pub async fn list_remote_objects(&self) -> AppResult<(Vec<RemoteObject>, Vec<RemoteObject>)> {
        let images = self.store.list(Some(MediaKind::Image)).await?;
        let videos = self.store.list(Some(MediaKind::Video)).await?;
        Ok((images, videos))
    }

    /// Delete every stored object nothing references. Admin only; the check
    /// runs before the scan.
    pub async fn reconcile(&self, actor: &User) -> AppResult<ReconciliationReport> {
        identity::require_admin(actor)?;

        let referenced = self.compute_local_reference_set()?;
        let (images, videos) = self.list_remote_objects().await?;

        let mut report = ReconciliationReport::default();
        for (kind, objects) in [(MediaKind::Image, images), (MediaKind::Video, videos)] {
            let orphans: Vec<String> = find_orphans(&referenced, objects)
                .into_iter()
                .map(|object| object.public_id)
                .collect();
            if orphans.is_empty() {
                continue;
            }

            let deleted = self.store.bulk_delete(&orphans, kind).await?;
            match kind {
                MediaKind::Image => report.images_deleted = deleted,
                MediaKind::Video => report.videos_deleted = deleted,
            }
        }

        tracing::info!(
            "Media reconciliation by {}: {} reference(s), deleted {} image(s) and {} video(s)",
            actor.username,
            referenced.len(),
            report.images_deleted,
            report.videos_deleted
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{Attachments, Role};
    use crate::error::AppError;
    use crate::media::{LocalObjectStore, ObjectStore};
    use bytes::Bytes;
    use std::sync::Arc;

    fn object(url: &str) -> RemoteObject {
        RemoteObject {
            public_id: url.to_string(),
            url: url.to_string(),
            kind: MediaKind::Image,
        }
    }

    #[test]
    fn find_orphans_is_a_set_difference() {
        let referenced: HashSet<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
        let orphans = find_orphans(&referenced, vec![object("a"), object("b"), object("c")]);
        assert_eq!(orphans, vec![object("c")]);
    }

    struct Fixture {
        _tmp: tempfile::TempDir,
        pool: DbPool,
        store: Arc<LocalObjectStore>,
        reconciler: MediaReconciler,
    }

    fn fixture() -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let pool = db::memory_pool().unwrap();
        db::run_migrations(&pool).unwrap();
        let store = Arc::new(LocalObjectStore::new(tmp.path(), "http://m").unwrap());
        let reconciler = MediaReconciler::new(pool.clone(), store.clone());
        Fixture {
            _tmp: tmp,
            pool,
            store,
            reconciler,
        }
    }

    #[tokio::test]
    async fn reconcile_deletes_only_unreferenced_objects() {
        let fx = fixture();
        let a = fx
            .store
            .upload(Bytes::from_static(b"a"), Some("png"), MediaKind::Image)
            .await
            .unwrap();
        let b = fx
            .store
            .upload(Bytes::from_static(b"b"), Some("png"), MediaKind::Image)
            .await
            .unwrap();
        let c = fx
            .store
            .upload(Bytes::from_static(b"c"), Some("png"), MediaKind::Image)
            .await
            .unwrap();
        let stray_video = fx
            .store
            .upload(Bytes::from_static(b"v"), Some("mp4"), MediaKind::Video)
            .await
            .unwrap();

        let admin = {
            let conn = fx.pool.get().unwrap();
            let admin = db::users::insert(&conn, "root", "d", Role::Admin, None).unwrap();
            db::tuits::insert(
                &conn,
                &admin.id,
                "pics",
                &Attachments {
                    images: vec![a.url.clone()],
                    video: vec![],
                },
            )
            .unwrap();
            db::users::set_images(&conn, &admin.id, Some(&b.url), None).unwrap();
            admin
        };

        let report = fx.reconciler.reconcile(&admin).await.unwrap();
        assert_eq!(
            report,
            ReconciliationReport {
                images_deleted: 1,
                videos_deleted: 1
            }
        );

        let remaining: Vec<String> = fx
            .store
            .list(None)
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.url)
            .collect();
        assert!(remaining.contains(&a.url));
        assert!(remaining.contains(&b.url));
        assert!(!remaining.contains(&c.url));
        assert!(!remaining.contains(&stray_video.url));
    }

    #[tokio::test]
    async fn reconcile_requires_admin() {
        let fx = fixture();
        let orphan = fx
            .store
            .upload(Bytes::from_static(b"x"), None, MediaKind::Image)
            .await
            .unwrap();
        let regular = {
            let conn = fx.pool.get().unwrap();
            db::users::insert(&conn, "alice", "d", Role::Regular, None).unwrap()
        };

        let result = fx.reconciler.reconcile(&regular).await;
        assert!(matches!(result, Err(AppError::NoPermission)));
        assert_eq!(fx.store.list(None).await.unwrap(), vec![orphan]);
    }

    #[tokio::test]
    async fn reconcile_with_nothing_stored_is_a_no_op() {
        let fx = fixture();
        let admin = {
            let conn = fx.pool.get().unwrap();
            db::users::insert(&conn, "root", "d", Role::Admin, None).unwrap()
        };
        let report = fx.reconciler.reconcile(&admin).await.unwrap();
        assert_eq!(report, ReconciliationReport::default());
    }
}
