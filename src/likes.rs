//! Like records and the derived `like_count` on tuits.
//!
//! The like table is the source of truth. `like_count` is recounted from it
//! after every change instead of being incremented, so a count that drifted
//! (say from a raced write) is corrected by the next toggle.

use rusqlite::Connection;
use serde::Serialize;

use crate::db;
use crate::db::models::Tuit;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LikeState {
    Liked,
    Unliked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToggleOutcome {
    pub state: LikeState,
    pub like_count: i64,
}

/// Flip whether `user_id` likes `tuit_id` and return the state after the flip.
pub fn toggle_like(conn: &Connection, user_id: &str, tuit_id: &str) -> AppResult<ToggleOutcome> {
    if !db::tuits::exists(conn, tuit_id)? {
        return Err(AppError::NoSuchTuit);
    }

    let state = if db::likes::exists(conn, tuit_id, user_id)? {
        db::likes::delete(conn, tuit_id, user_id)?;
        LikeState::Unliked
    } else {
        // INSERT OR IGNORE: if a concurrent toggle got here first the pair
        // still exists exactly once.
        db::likes::insert(conn, tuit_id, user_id)?;
        LikeState::Liked
    };

    let like_count = recount(conn, tuit_id)?;
    tracing::debug!(
        "User {} toggled like on {}: {:?} ({} likes)",
        user_id,
        tuit_id,
        state,
        like_count
    );
    Ok(ToggleOutcome { state, like_count })
}

/// Recompute `like_count` for a tuit from its like records and store it.
pub fn recount(conn: &Connection, tuit_id: &str) -> AppResult<i64> {
    let like_count = db::likes::count_for_tuit(conn, tuit_id)?;
    db::tuits::set_like_count(conn, tuit_id, like_count)?;
    Ok(like_count)
}

pub fn likes_by_user(conn: &Connection, user_id: &str) -> AppResult<Vec<Tuit>> {
    Ok(db::tuits::list_liked_by(conn, user_id)?)
}
