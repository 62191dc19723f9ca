pub mod admin;
pub mod auth;
pub mod form;
pub mod likes;
pub mod media;
pub mod tuits;
pub mod users;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// The full application router.
pub fn app(state: AppState) -> Router {
    let body_limit = state.config.media.max_upload_mb * 1024 * 1024;

    let mut router = Router::new()
        .route("/media/{kind}/{file}", get(media::serve))
        .merge(auth::router())
        .merge(users::router())
        .merge(tuits::router())
        .merge(likes::router())
        .merge(admin::router())
        .layer(DefaultBodyLimit::max(body_limit));

    if let Some(cors) = cors_layer(&state.config.server.cors_origins) {
        router = router.layer(cors);
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Session cookies only travel cross-origin with credentials allowed, which
/// rules out a wildcard origin.
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();
    if origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_is_off_without_origins() {
        assert!(cors_layer(&[]).is_none());
        assert!(cors_layer(&["bad\norigin".to_string()]).is_none());
        assert!(cors_layer(&["http://localhost:3000".to_string()]).is_some());
    }
}
