use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::auth::accounts::{self, Authenticated, Credentials};
use crate::auth::identity::{self, SessionContext};
use crate::db;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

// -- Cookie helpers --

fn session_cookie(name: &str, token: &str, max_age_hours: u64) -> String {
    let max_age_secs = max_age_hours * 3600;
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        name, token, max_age_secs
    )
}

fn clear_session_cookie(name: &str) -> String {
    format!("{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0", name)
}

fn with_session_cookie(state: &AppState, status: StatusCode, auth: Authenticated) -> Response {
    let cookie = session_cookie(
        &state.config.auth.cookie_name,
        &auth.token,
        state.config.auth.session_hours,
    );
    (status, [(header::SET_COOKIE, cookie)], Json(auth.user)).into_response()
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> AppResult<Response> {
    let auth = accounts::register(&state.db, &state.sessions, &state.hasher, &credentials).await?;
    Ok(with_session_cookie(&state, StatusCode::CREATED, auth))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> AppResult<Response> {
    let auth = accounts::login(&state.db, &state.sessions, &state.hasher, &credentials).await?;
    Ok(with_session_cookie(&state, StatusCode::OK, auth))
}

/// POST /api/auth/logout
pub async fn logout(State(state): State<AppState>, session: SessionContext) -> AppResult<Response> {
    if let Some(token) = session.token.as_deref() {
        state.sessions.destroy(token)?;
    }

    Ok((
        StatusCode::NO_CONTENT,
        [(
            header::SET_COOKIE,
            clear_session_cookie(&state.config.auth.cookie_name),
        )],
    )
        .into_response())
}

/// GET /api/auth/profile. Reads the account fresh so edits made since login
/// show up.
pub async fn profile(
    State(state): State<AppState>,
    session: SessionContext,
) -> AppResult<Json<db::models::User>> {
    let principal = identity::resolve_principal(&session)?;
    let conn = state.db.get()?;
    let user = db::users::find_by_id(&conn, &principal.id)?.ok_or(AppError::NotAuthenticated)?;
    Ok(Json(user.redacted()))
}
