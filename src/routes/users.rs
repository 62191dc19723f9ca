use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Deserialize;

use crate::auth::accounts;
use crate::auth::identity::{self, SessionContext};
use crate::db;
use crate::db::models::{Role, User};
use crate::db::users::ProfileChanges;
use crate::error::{AppError, AppResult};
use crate::likes;
use crate::media::{self, MediaKind};
use crate::routes::form::MediaForm;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list_users))
        .route(
            "/api/users/{uid}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/api/users/{uid}/role", put(change_role))
        .route("/api/users/{uid}/images", put(upload_images))
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: Role,
}

fn find_user(state: &AppState, id: &str) -> AppResult<User> {
    let conn = state.db.get()?;
    db::users::find_by_id(&conn, id)?.ok_or(AppError::NoSuchUser)
}

/// Re-read a user and push the fresh snapshot into their live sessions.
fn refresh_sessions(state: &AppState, id: &str) -> AppResult<User> {
    let user = find_user(state, id)?.redacted();
    state.sessions.refresh_user(&user)?;
    Ok(user)
}

async fn list_users(State(state): State<AppState>) -> AppResult<Json<Vec<User>>> {
    let conn = state.db.get()?;
    let users = db::users::list(&conn)?
        .into_iter()
        .map(User::redacted)
        .collect();
    Ok(Json(users))
}

async fn get_user(
    State(state): State<AppState>,
    session: SessionContext,
    Path(uid): Path<String>,
) -> AppResult<Json<User>> {
    let uid = identity::resolve_valid_id(&uid, &session)?;
    Ok(Json(find_user(&state, &uid)?.redacted()))
}

async fn update_user(
    State(state): State<AppState>,
    session: SessionContext,
    Path(uid): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> AppResult<Json<User>> {
    let actor = identity::resolve_principal(&session)?;
    let uid = identity::resolve_valid_id(&uid, &session)?;
    identity::require_owner_or_admin(actor, &uid)?;

    let username = req
        .username
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let password_hash = match req.password.as_deref().filter(|p| !p.is_empty()) {
        Some(password) => Some(state.hasher.hash_blocking(password).await?),
        None => None,
    };

    accounts::update_account(
        &state.db,
        &uid,
        &ProfileChanges {
            username,
            email: req.email,
            bio: req.bio,
        },
        password_hash.as_deref(),
    )?;

    Ok(Json(refresh_sessions(&state, &uid)?))
}

/// DELETE /api/users/{uid}. Tuits and likes go with the account; like counts
/// on the tuits this user had liked are recomputed.
async fn delete_user(
    State(state): State<AppState>,
    session: SessionContext,
    Path(uid): Path<String>,
) -> AppResult<StatusCode> {
    let actor = identity::resolve_principal(&session)?;
    let uid = identity::resolve_valid_id(&uid, &session)?;
    identity::require_owner_or_admin(actor, &uid)?;

    {
        let conn = state.db.get()?;
        if db::users::find_by_id(&conn, &uid)?.is_none() {
            return Err(AppError::NoSuchUser);
        }

        let liked = db::likes::tuit_ids_liked_by(&conn, &uid)?;
        db::users::delete(&conn, &uid)?;
        for tuit_id in liked {
            likes::recount(&conn, &tuit_id)?;
        }
    }

    state.sessions.destroy_for_user(&uid)?;
    tracing::info!("{} deleted user {}", actor.username, uid);
    Ok(StatusCode::NO_CONTENT)
}

async fn change_role(
    State(state): State<AppState>,
    session: SessionContext,
    Path(uid): Path<String>,
    Json(req): Json<ChangeRoleRequest>,
) -> AppResult<Json<User>> {
    let actor = identity::resolve_principal(&session)?;
    identity::require_admin(actor)?;
    let uid = identity::resolve_valid_id(&uid, &session)?;

    {
        let conn = state.db.get()?;
        if db::users::set_role(&conn, &uid, req.role)? == 0 {
            return Err(AppError::NoSuchUser);
        }
    }

    tracing::info!("{} set role of {} to {}", actor.username, uid, req.role.as_str());
    Ok(Json(refresh_sessions(&state, &uid)?))
}

/// PUT /api/users/{uid}/images (multipart: `profile_photo`, `header_image`)
async fn upload_images(
    State(state): State<AppState>,
    session: SessionContext,
    Path(uid): Path<String>,
    multipart: Multipart,
) -> AppResult<Json<User>> {
    let actor = identity::resolve_principal(&session)?;
    let uid = identity::resolve_valid_id(&uid, &session)?;
    identity::require_owner_or_admin(actor, &uid)?;
    find_user(&state, &uid)?;

    let mut form = MediaForm::read(multipart).await?;
    let profile = form.take_files("profile_photo");
    let header = form.take_files("header_image");
    if let Some(stray) = form.files.first() {
        return Err(AppError::InvalidInput(format!(
            "Unexpected file field '{}'",
            stray.field
        )));
    }
    if profile.len() > 1 || header.len() > 1 {
        return Err(AppError::MediaContentExceedsLimit {
            kind: MediaKind::Image.field_name(),
            limit: 1,
        });
    }

    let store = state.media.store().as_ref();
    let profile_url = media::upload(store, profile, MediaKind::Image, 1)
        .await?
        .into_iter()
        .next();
    let header_url = media::upload(store, header, MediaKind::Image, 1)
        .await?
        .into_iter()
        .next();

    {
        let conn = state.db.get()?;
        db::users::set_images(&conn, &uid, profile_url.as_deref(), header_url.as_deref())?;
    }

    Ok(Json(refresh_sessions(&state, &uid)?))
}
