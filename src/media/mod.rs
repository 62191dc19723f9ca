mod intake;
mod reconciler;
pub mod store;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::MediaConfig;

pub use self::intake::{classify, upload, ClassifiedMedia, MediaIntake, UploadedFile};
pub use self::reconciler::{find_orphans, MediaReconciler, ReconciliationReport};
pub use self::store::{
    object_path, DynObjectStore, LocalObjectStore, ObjectStore, RemoteObject, StoreError,
};

/// The two kinds of attachable media. Object stores scope their listing and
/// deletion by kind, so it travels with every remote object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub const ALL: [MediaKind; 2] = [MediaKind::Image, MediaKind::Video];

    /// Multipart field name carrying this kind on tuit writes.
    pub fn field_name(&self) -> &'static str {
        match self {
            MediaKind::Image => "images",
            MediaKind::Video => "video",
        }
    }

    pub fn from_field(name: &str) -> Option<Self> {
        match name {
            "images" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            _ => None,
        }
    }

    /// Path segment the object store files this kind under.
    pub fn dir(&self) -> &'static str {
        match self {
            MediaKind::Image => "images",
            MediaKind::Video => "videos",
        }
    }

    pub fn from_dir(dir: &str) -> Option<Self> {
        match dir {
            "images" => Some(MediaKind::Image),
            "videos" => Some(MediaKind::Video),
            _ => None,
        }
    }

    fn mime_type(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    /// Whether a file with extension `ext` may be stored as this kind: its
    /// guessed MIME type must be `image/*` or `video/*` to match. SVG is
    /// refused because browsers run scripts embedded in it.
    pub fn accepts_extension(&self, ext: &str) -> bool {
        mime_guess::from_ext(ext).iter().any(|mime| {
            mime.type_().as_str() == self.mime_type() && mime.subtype().as_str() != "svg"
        })
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

/// Per-kind caps on how many assets a single tuit may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaLimits {
    pub images: usize,
    pub video: usize,
}

impl MediaLimits {
    pub fn for_kind(&self, kind: MediaKind) -> usize {
        match kind {
            MediaKind::Image => self.images,
            MediaKind::Video => self.video,
        }
    }
}

impl From<&MediaConfig> for MediaLimits {
    fn from(config: &MediaConfig) -> Self {
        Self {
            images: config.image_limit,
            video: config.video_limit,
        }
    }
}

impl Default for MediaLimits {
    fn default() -> Self {
        Self::from(&MediaConfig::default())
    }
}
