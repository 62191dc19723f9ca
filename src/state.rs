use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::auth::{PasswordHasher, SessionStore};
use crate::config::Config;
use crate::media::{DynObjectStore, LocalObjectStore, MediaIntake, MediaLimits, MediaReconciler};

pub type DbPool = Pool<SqliteConnectionManager>;

/// Built once at startup and handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub sessions: SessionStore,
    pub hasher: PasswordHasher,
    pub media: MediaIntake,
    pub reconciler: Arc<MediaReconciler>,
}

impl AppState {
    /// Wire up the app against the bundled directory-backed object store.
    pub fn new(db: DbPool, config: Config) -> anyhow::Result<Self> {
        let store: DynObjectStore = Arc::new(LocalObjectStore::new(
            config.media_path(),
            config.public_url(),
        )?);
        Ok(Self::with_store(db, config, store))
    }

    pub fn with_store(db: DbPool, config: Config, store: DynObjectStore) -> Self {
        let limits = MediaLimits::from(&config.media);
        Self {
            sessions: SessionStore::new(db.clone(), config.auth.session_hours),
            hasher: PasswordHasher::new(config.auth.bcrypt_cost),
            media: MediaIntake::new(store.clone(), limits),
            reconciler: Arc::new(MediaReconciler::new(db.clone(), store)),
            db,
            config,
        }
    }
}
