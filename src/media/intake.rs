use bytes::Bytes;
use std::path::Path;

use crate::db::models::Attachments;
use crate::error::{AppError, AppResult};
use crate::media::store::DynObjectStore;
use crate::media::{MediaKind, MediaLimits, ObjectStore};

/// One file part from a multipart request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl UploadedFile {
    /// Extension for the stored object: taken from the client file name,
    /// falling back to the declared content type.
    pub fn extension(&self) -> Option<String> {
        self.file_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .or_else(|| {
                self.content_type
                    .as_deref()
                    .and_then(mime_guess::get_mime_extensions_str)
                    .and_then(|exts| exts.first())
                    .map(|ext| ext.to_string())
            })
    }
}

#[derive(Debug, Default)]
pub struct ClassifiedMedia {
    pub images: Vec<UploadedFile>,
    pub video: Vec<UploadedFile>,
}

/// Sort uploaded parts by their field name. A request may carry images or a
/// video, never both.
pub fn classify(files: Vec<UploadedFile>) -> AppResult<ClassifiedMedia> {
    let mut media = ClassifiedMedia::default();
    for file in files {
        match MediaKind::from_field(&file.field) {
            Some(MediaKind::Image) => media.images.push(file),
            Some(MediaKind::Video) => media.video.push(file),
            None => {
                return Err(AppError::InvalidInput(format!(
                    "Unexpected file field '{}'",
                    file.field
                )))
            }
        }
    }

    if !media.images.is_empty() && !media.video.is_empty() {
        return Err(AppError::MultiTypeMedia);
    }
    Ok(media)
}

/// Upload each asset in turn and collect the returned URLs.
///
/// Every asset's extension must name a MIME type of `kind`; a mismatch is
/// rejected before anything is stored. There is no rollback: if the store fails partway, the assets already
/// uploaded stay stored with nothing referencing them until the next
/// reconciliation run removes them.
pub async fn upload(
    store: &dyn ObjectStore,
    assets: Vec<UploadedFile>,
    kind: MediaKind,
    limit: usize,
) -> AppResult<Vec<String>> {
    if assets.len() > limit {
        return Err(AppError::MediaContentExceedsLimit {
            kind: kind.field_name(),
            limit,
        });
    }

    let mut extensions = Vec::with_capacity(assets.len());
    for asset in &assets {
        match asset.extension() {
            Some(ext) if kind.accepts_extension(&ext) => extensions.push(ext),
            _ => {
                return Err(AppError::InvalidInput(format!(
                    "'{}' is not an accepted {} file",
                    asset.file_name.as_deref().unwrap_or_default(),
                    kind
                )))
            }
        }
    }

    let mut urls = Vec::with_capacity(assets.len());
    for (asset, extension) in assets.into_iter().zip(extensions) {
        let object = store.upload(asset.data, Some(&extension), kind).await?;
        urls.push(object.url);
    }

    if !urls.is_empty() {
        tracing::info!("Uploaded {} {} asset(s)", urls.len(), kind);
    }
    Ok(urls)
}

/// Check an attachment set against the per-kind limits and the images XOR
/// video rule.
pub fn validate(attachments: &Attachments, limits: &MediaLimits) -> AppResult<()> {
    if !attachments.images.is_empty() && !attachments.video.is_empty() {
        return Err(AppError::MultiTypeMedia);
    }
    check_count(MediaKind::Image, attachments.images.len(), limits)?;
    check_count(MediaKind::Video, attachments.video.len(), limits)?;
    Ok(())
}

fn check_count(kind: MediaKind, count: usize, limits: &MediaLimits) -> AppResult<()> {
    let limit = limits.for_kind(kind);
    if count > limit {
        return Err(AppError::MediaContentExceedsLimit {
            kind: kind.field_name(),
            limit,
        });
    }
    Ok(())
}

/// Turns a write payload (URLs the client kept plus freshly uploaded files)
/// into the attachment set that gets persisted.
#[derive(Clone)]
pub struct MediaIntake {
    store: DynObjectStore,
    limits: MediaLimits,
}

impl MediaIntake {
    pub fn new(store: DynObjectStore, limits: MediaLimits) -> Self {
        Self { store, limits }
    }

    pub fn store(&self) -> &DynObjectStore {
        &self.store
    }

    /// Accept `files` on top of the `kept` URLs.
    ///
    /// The combined set is validated before anything is uploaded, so an
    /// over-limit or mixed-kind request stores nothing; it is validated again
    /// after upload before being returned.
    pub async fn accept(
        &self,
        kept: Attachments,
        files: Vec<UploadedFile>,
    ) -> AppResult<Attachments> {
        let media = classify(files)?;

        let projected = Attachments {
            images: vec![String::new(); kept.images.len() + media.images.len()],
            video: vec![String::new(); kept.video.len() + media.video.len()],
        };
        validate(&projected, &self.limits)?;

        let mut accepted = kept;
        let ClassifiedMedia { images, video } = media;
        accepted.images.extend(
            upload(
                self.store.as_ref(),
                images,
                MediaKind::Image,
                self.limits.images,
            )
            .await?,
        );
        accepted.video.extend(
            upload(
                self.store.as_ref(),
                video,
                MediaKind::Video,
                self.limits.video,
            )
            .await?,
        );

        validate(&accepted, &self.limits)?;
        Ok(accepted)
    }
}
