use axum::extract::{Path, State};
use axum::routing::{get, put};
use axum::{Json, Router};

use crate::auth::identity::{self, SessionContext};
use crate::db;
use crate::db::models::{Tuit, User};
use crate::error::{AppError, AppResult};
use crate::likes::{self, ToggleOutcome};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users/{uid}/likes", get(liked_tuits))
        .route("/api/users/{uid}/likes/{tid}", put(toggle_like))
        .route("/api/tuits/{tid}/likes", get(liking_users))
}

/// PUT /api/users/{uid}/likes/{tid}
async fn toggle_like(
    State(state): State<AppState>,
    session: SessionContext,
    Path((uid, tid)): Path<(String, String)>,
) -> AppResult<Json<ToggleOutcome>> {
    let actor = identity::resolve_principal(&session)?;
    let uid = identity::resolve_valid_id(&uid, &session)?;
    identity::require_owner_or_admin(actor, &uid)?;
    if !identity::is_valid_id(&tid) {
        return Err(AppError::InvalidInput(format!("Malformed tuit id '{}'", tid)));
    }

    let conn = state.db.get()?;
    if uid != actor.id && db::users::find_by_id(&conn, &uid)?.is_none() {
        return Err(AppError::NoSuchUser);
    }

    let outcome = likes::toggle_like(&conn, &uid, &tid)?;
    Ok(Json(outcome))
}

async fn liked_tuits(
    State(state): State<AppState>,
    session: SessionContext,
    Path(uid): Path<String>,
) -> AppResult<Json<Vec<Tuit>>> {
    let uid = identity::resolve_valid_id(&uid, &session)?;
    let conn = state.db.get()?;
    Ok(Json(likes::likes_by_user(&conn, &uid)?))
}

async fn liking_users(
    State(state): State<AppState>,
    Path(tid): Path<String>,
) -> AppResult<Json<Vec<User>>> {
    if !identity::is_valid_id(&tid) {
        return Err(AppError::InvalidInput(format!("Malformed tuit id '{}'", tid)));
    }
    let conn = state.db.get()?;
    if !db::tuits::exists(&conn, &tid)? {
        return Err(AppError::NoSuchTuit);
    }
    let users = db::users::list_liking(&conn, &tid)?
        .into_iter()
        .map(User::redacted)
        .collect();
    Ok(Json(users))
}
