use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use crate::auth::identity::{self, SessionContext};
use crate::db::models::User;
use crate::error::AppError;
use crate::state::AppState;

/// Session capability for the request. Never rejects: a missing, unknown or
/// expired cookie yields an anonymous context.
impl FromRequestParts<AppState> for SessionContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = extract_session_token(parts, &state.config.auth.cookie_name) else {
            return Ok(SessionContext::anonymous());
        };

        let principal = state.sessions.get(token)?;
        Ok(SessionContext {
            token: Some(token.to_string()),
            principal,
        })
    }
}

/// Extractor that requires authentication.
/// Returns 401 if no valid session found.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = SessionContext::from_request_parts(parts, state).await?;
        let user = identity::resolve_principal(&session)?;
        Ok(CurrentUser(user.clone()))
    }
}

pub fn extract_session_token<'a>(parts: &'a Parts, cookie_name: &str) -> Option<&'a str> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == cookie_name && !val.is_empty() {
                Some(val)
            } else {
                None
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(cookie: &str) -> Parts {
        let (parts, _) = Request::builder()
            .header(header::COOKIE, cookie)
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[test]
    fn finds_named_cookie_among_others() {
        let p = parts("theme=dark; tuiter_session=abc123; lang=en");
        assert_eq!(extract_session_token(&p, "tuiter_session"), Some("abc123"));
    }

    #[test]
    fn missing_or_empty_cookie_is_none() {
        assert_eq!(extract_session_token(&parts("theme=dark"), "tuiter_session"), None);
        assert_eq!(extract_session_token(&parts("tuiter_session="), "tuiter_session"), None);
    }
}
