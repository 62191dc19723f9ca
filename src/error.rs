use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::media::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("No permission")]
    NoPermission,

    #[error("No such user")]
    NoSuchUser,

    #[error("No such tuit")]
    NoSuchTuit,

    #[error("User already exists")]
    UserAlreadyExists,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Tuit has no content")]
    EmptyContent,

    #[error("Images and video cannot be attached together")]
    MultiTypeMedia,

    #[error("Too many {kind} attached (limit {limit})")]
    MediaContentExceedsLimit { kind: &'static str, limit: usize },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Object store error: {0}")]
    ObjectStore(#[from] StoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            AppError::NoPermission => StatusCode::FORBIDDEN,
            AppError::NoSuchUser | AppError::NoSuchTuit => StatusCode::NOT_FOUND,
            AppError::UserAlreadyExists => StatusCode::CONFLICT,
            AppError::InvalidInput(_) | AppError::EmptyContent | AppError::MultiTypeMedia => {
                StatusCode::BAD_REQUEST
            }
            AppError::MediaContentExceedsLimit { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Database(_)
            | AppError::Pool(_)
            | AppError::ObjectStore(_)
            | AppError::Json(_)
            | AppError::Internal(_) => {
                tracing::error!("{}", self);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
                    .into_response();
            }
        };

        (status, self.to_string()).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn response_status(err: AppError) -> StatusCode {
        let response = err.into_response();
        response.status()
    }

    #[test]
    fn not_authenticated_returns_401() {
        assert_eq!(
            response_status(AppError::NotAuthenticated),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn no_permission_returns_403() {
        assert_eq!(
            response_status(AppError::NoPermission),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn missing_entities_return_404() {
        assert_eq!(response_status(AppError::NoSuchUser), StatusCode::NOT_FOUND);
        assert_eq!(response_status(AppError::NoSuchTuit), StatusCode::NOT_FOUND);
    }

    #[test]
    fn user_already_exists_returns_409() {
        assert_eq!(
            response_status(AppError::UserAlreadyExists),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn media_errors_are_client_errors() {
        assert_eq!(
            response_status(AppError::MultiTypeMedia),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            response_status(AppError::MediaContentExceedsLimit {
                kind: "images",
                limit: 6
            }),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[test]
    fn internal_returns_500() {
        assert_eq!(
            response_status(AppError::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
