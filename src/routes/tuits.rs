use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::auth::identity::{self, SessionContext};
use crate::db;
use crate::db::models::{Attachments, Tuit};
use crate::error::{AppError, AppResult};
use crate::media::MediaKind;
use crate::routes::form::MediaForm;
use crate::state::AppState;

const MAX_BODY_CHARS: usize = 2000;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/tuits", get(list_tuits))
        .route(
            "/api/tuits/{tid}",
            get(get_tuit).put(update_tuit).delete(delete_tuit),
        )
        .route(
            "/api/users/{uid}/tuits",
            get(list_user_tuits).post(create_tuit),
        )
}

fn validate_body(body: &str) -> AppResult<()> {
    if body.chars().count() > MAX_BODY_CHARS {
        return Err(AppError::InvalidInput(format!(
            "Tuit must be {} characters or less",
            MAX_BODY_CHARS
        )));
    }
    Ok(())
}

/// URLs the client asks to keep, as sent in the `images` / `video` text fields.
fn kept_attachments(form: &MediaForm) -> Attachments {
    Attachments {
        images: form.text_values(MediaKind::Image.field_name()),
        video: form.text_values(MediaKind::Video.field_name()),
    }
}

fn mentions_media(form: &MediaForm) -> bool {
    !form.files.is_empty()
        || MediaKind::ALL
            .iter()
            .any(|kind| form.has_text(kind.field_name()))
}

fn tuit_id(tid: &str) -> AppResult<()> {
    if identity::is_valid_id(tid) {
        Ok(())
    } else {
        Err(AppError::InvalidInput(format!("Malformed tuit id '{}'", tid)))
    }
}

async fn list_tuits(State(state): State<AppState>) -> AppResult<Json<Vec<Tuit>>> {
    let conn = state.db.get()?;
    Ok(Json(db::tuits::list(&conn)?))
}

async fn get_tuit(State(state): State<AppState>, Path(tid): Path<String>) -> AppResult<Json<Tuit>> {
    tuit_id(&tid)?;
    let conn = state.db.get()?;
    let tuit = db::tuits::find_by_id(&conn, &tid)?.ok_or(AppError::NoSuchTuit)?;
    Ok(Json(tuit))
}

async fn list_user_tuits(
    State(state): State<AppState>,
    session: SessionContext,
    Path(uid): Path<String>,
) -> AppResult<Json<Vec<Tuit>>> {
    let uid = identity::resolve_valid_id(&uid, &session)?;
    let conn = state.db.get()?;
    Ok(Json(db::tuits::list_by_author(&conn, &uid)?))
}

/// POST /api/users/{uid}/tuits (multipart: `body`, `images`, `video`)
async fn create_tuit(
    State(state): State<AppState>,
    session: SessionContext,
    Path(uid): Path<String>,
    multipart: Multipart,
) -> AppResult<Response> {
    let actor = identity::resolve_principal(&session)?;
    let author_id = identity::resolve_valid_id(&uid, &session)?;
    identity::require_owner_or_admin(actor, &author_id)?;
    {
        let conn = state.db.get()?;
        db::users::find_by_id(&conn, &author_id)?.ok_or(AppError::NoSuchUser)?;
    }

    let mut form = MediaForm::read(multipart).await?;
    let body = form.text("body").unwrap_or_default().trim().to_string();
    validate_body(&body)?;

    let kept = kept_attachments(&form);
    if body.is_empty() && kept.is_empty() && form.files.is_empty() {
        return Err(AppError::EmptyContent);
    }

    let files = std::mem::take(&mut form.files);
    let attachments = state.media.accept(kept, files).await?;

    let conn = state.db.get()?;
    let tuit = db::tuits::insert(&conn, &author_id, &body, &attachments)?;
    tracing::info!("{} posted tuit {}", actor.username, tuit.id);

    Ok((StatusCode::CREATED, Json(tuit)).into_response())
}

/// PUT /api/tuits/{tid} (multipart)
///
/// A missing `body` keeps the current text. If the request mentions no media
/// at all the current attachments are kept; otherwise the result is exactly
/// the URLs sent back plus the new uploads.
async fn update_tuit(
    State(state): State<AppState>,
    session: SessionContext,
    Path(tid): Path<String>,
    multipart: Multipart,
) -> AppResult<Json<Tuit>> {
    let actor = identity::resolve_principal(&session)?;
    tuit_id(&tid)?;
    let current = {
        let conn = state.db.get()?;
        db::tuits::find_by_id(&conn, &tid)?.ok_or(AppError::NoSuchTuit)?
    };
    identity::require_owner_or_admin(actor, &current.author_id)?;

    let mut form = MediaForm::read(multipart).await?;
    let body = match form.text("body") {
        Some(body) => body.trim().to_string(),
        None => current.body.clone(),
    };
    validate_body(&body)?;

    let attachments = if mentions_media(&form) {
        let kept = kept_attachments(&form);
        if body.is_empty() && kept.is_empty() && form.files.is_empty() {
            return Err(AppError::EmptyContent);
        }
        let files = std::mem::take(&mut form.files);
        state.media.accept(kept, files).await?
    } else {
        if body.is_empty() && current.attachments.is_empty() {
            return Err(AppError::EmptyContent);
        }
        current.attachments.clone()
    };

    let conn = state.db.get()?;
    db::tuits::update(&conn, &tid, &body, &attachments)?;
    let tuit = db::tuits::find_by_id(&conn, &tid)?.ok_or(AppError::NoSuchTuit)?;
    tracing::info!("{} updated tuit {}", actor.username, tid);
    Ok(Json(tuit))
}

/// DELETE /api/tuits/{tid}. Attached media is left for reconciliation.
async fn delete_tuit(
    State(state): State<AppState>,
    session: SessionContext,
    Path(tid): Path<String>,
) -> AppResult<StatusCode> {
    let actor = identity::resolve_principal(&session)?;
    tuit_id(&tid)?;

    let conn = state.db.get()?;
    let owner = db::tuits::owner_of(&conn, &tid)?.ok_or(AppError::NoSuchTuit)?;
    identity::require_owner_or_admin(actor, &owner)?;

    db::tuits::delete(&conn, &tid)?;
    tracing::info!("{} deleted tuit {}", actor.username, tid);
    Ok(StatusCode::NO_CONTENT)
}
