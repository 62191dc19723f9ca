use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};

use crate::error::AppResult;
use crate::extractors::CurrentUser;
use crate::media::ReconciliationReport;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/admin/media/reconcile", post(reconcile_media))
}

/// POST /api/admin/media/reconcile
async fn reconcile_media(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
) -> AppResult<Json<ReconciliationReport>> {
    let report = state.reconciler.reconcile(&actor).await?;
    Ok(Json(report))
}
