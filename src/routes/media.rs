use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::media::{object_path, MediaKind};
use crate::state::AppState;

/// GET /media/{kind}/{file}, objects written by the local object store.
///
/// Only files whose type matches the kind are rendered inline; anything else
/// goes out as an opaque download, and browsers are told not to sniff.
pub async fn serve(
    State(state): State<AppState>,
    Path((kind, file)): Path<(String, String)>,
) -> Response {
    let Some((kind, path)) = MediaKind::from_dir(&kind).and_then(|kind| {
        object_path(&state.config.media_path(), kind, &file).map(|path| (kind, path))
    }) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match tokio::fs::read(&path).await {
        Ok(data) => {
            let (content_type, disposition) = presentation(kind, &path);
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, content_type),
                    (header::CONTENT_DISPOSITION, disposition.to_string()),
                    (header::X_CONTENT_TYPE_OPTIONS, "nosniff".to_string()),
                    (header::CACHE_CONTROL, "public, max-age=86400".to_string()),
                ],
                data,
            )
                .into_response()
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            tracing::error!("Failed to read {}: {}", path.display(), e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Content type and disposition for a stored file.
fn presentation(kind: MediaKind, path: &std::path::Path) -> (String, &'static str) {
    let inline = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| kind.accepts_extension(ext));

    if inline {
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        (mime.as_ref().to_string(), "inline")
    } else {
        ("application/octet-stream".to_string(), "attachment")
    }
}
