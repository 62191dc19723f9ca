use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::models::{Role, User};

const COLUMNS: &str =
    "id, username, role, password_hash, email, bio, profile_photo, header_image, created_at";

fn from_row(row: &Row) -> rusqlite::Result<User> {
    let role: String = row.get(2)?;
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        // The CHECK constraint on users.role keeps this total.
        role: Role::parse(&role).unwrap_or_default(),
        password_hash: row.get(3)?,
        email: row.get(4)?,
        bio: row.get(5)?,
        profile_photo: row.get(6)?,
        header_image: row.get(7)?,
        created_at: row.get(8)?,
    })
}

/// Editable profile fields. `None` leaves the stored value alone.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
}

pub fn find_by_id(conn: &Connection, id: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM users WHERE id = ?1"),
        params![id],
        from_row,
    )
    .optional()
}

pub fn find_by_username(conn: &Connection, username: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM users WHERE username = ?1"),
        params![username],
        from_row,
    )
    .optional()
}

pub fn list(conn: &Connection) -> rusqlite::Result<Vec<User>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM users ORDER BY created_at ASC, id ASC"
    ))?;
    let users = stmt
        .query_map([], from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}

pub fn list_liking(conn: &Connection, tuit_id: &str) -> rusqlite::Result<Vec<User>> {
    let mut stmt = conn.prepare(
        "SELECT u.id, u.username, u.role, u.password_hash, u.email, u.bio,
                u.profile_photo, u.header_image, u.created_at
         FROM likes l JOIN users u ON u.id = l.user_id
         WHERE l.tuit_id = ?1",
    )?;
    let users = stmt
        .query_map(params![tuit_id], from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}

pub fn insert(
    conn: &Connection,
    username: &str,
    password_hash: &str,
    role: Role,
    email: Option<&str>,
) -> rusqlite::Result<User> {
    let id = uuid::Uuid::now_v7().to_string();
    conn.execute(
        "INSERT INTO users (id, username, password_hash, role, email) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, username, password_hash, role.as_str(), email],
    )?;
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM users WHERE id = ?1"),
        params![id],
        from_row,
    )
}

pub fn update_profile(
    conn: &Connection,
    id: &str,
    changes: &ProfileChanges,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE users SET
            username = COALESCE(?2, username),
            email = COALESCE(?3, email),
            bio = COALESCE(?4, bio)
         WHERE id = ?1",
        params![id, changes.username, changes.email, changes.bio],
    )
}

pub fn set_password(conn: &Connection, id: &str, password_hash: &str) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE users SET password_hash = ?2 WHERE id = ?1",
        params![id, password_hash],
    )
}

pub fn set_role(conn: &Connection, id: &str, role: Role) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE users SET role = ?2 WHERE id = ?1",
        params![id, role.as_str()],
    )
}

pub fn set_images(
    conn: &Connection,
    id: &str,
    profile_photo: Option<&str>,
    header_image: Option<&str>,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE users SET
            profile_photo = COALESCE(?2, profile_photo),
            header_image = COALESCE(?3, header_image)
         WHERE id = ?1",
        params![id, profile_photo, header_image],
    )
}

pub fn delete(conn: &Connection, id: &str) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM users WHERE id = ?1", params![id])
}

/// Every profile and header image URL currently stored on any user.
pub fn image_references(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT profile_photo FROM users WHERE profile_photo IS NOT NULL
         UNION ALL
         SELECT header_image FROM users WHERE header_image IS NOT NULL",
    )?;
    let urls = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(urls)
}
