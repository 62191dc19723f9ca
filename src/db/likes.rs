use rusqlite::{params, Connection};

pub fn exists(conn: &Connection, tuit_id: &str, user_id: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM likes WHERE tuit_id = ?1 AND user_id = ?2",
        params![tuit_id, user_id],
        |row| row.get(0),
    )
}

/// Insert the (tuit, user) pair. A concurrent duplicate is swallowed by the
/// unique index, so this returns 0 rather than failing.
pub fn insert(conn: &Connection, tuit_id: &str, user_id: &str) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT OR IGNORE INTO likes (tuit_id, user_id) VALUES (?1, ?2)",
        params![tuit_id, user_id],
    )
}

pub fn delete(conn: &Connection, tuit_id: &str, user_id: &str) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM likes WHERE tuit_id = ?1 AND user_id = ?2",
        params![tuit_id, user_id],
    )
}

pub fn count_for_tuit(conn: &Connection, tuit_id: &str) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM likes WHERE tuit_id = ?1",
        params![tuit_id],
        |row| row.get(0),
    )
}

/// Ids of the tuits a user has liked.
pub fn tuit_ids_liked_by(conn: &Connection, user_id: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT tuit_id FROM likes WHERE user_id = ?1")?;
    let ids = stmt
        .query_map(params![user_id], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(ids)
}
