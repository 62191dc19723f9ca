use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::models::{Attachments, Tuit};

const COLUMNS: &str = "t.id, t.author_id, t.body, t.images, t.video, t.like_count, t.created_at, t.updated_at";

fn json_column(row: &Row, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn from_row(row: &Row) -> rusqlite::Result<Tuit> {
    Ok(Tuit {
        id: row.get(0)?,
        author_id: row.get(1)?,
        body: row.get(2)?,
        attachments: Attachments {
            images: json_column(row, 3)?,
            video: json_column(row, 4)?,
        },
        like_count: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn to_json(urls: &[String]) -> String {
    // A Vec<String> always serializes.
    serde_json::to_string(urls).unwrap_or_else(|_| "[]".to_string())
}

pub fn find_by_id(conn: &Connection, id: &str) -> rusqlite::Result<Option<Tuit>> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM tuits t WHERE t.id = ?1"),
        params![id],
        from_row,
    )
    .optional()
}

pub fn exists(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM tuits WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )
}

pub fn owner_of(conn: &Connection, id: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT author_id FROM tuits WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )
    .optional()
}

pub fn list(conn: &Connection) -> rusqlite::Result<Vec<Tuit>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM tuits t ORDER BY t.created_at DESC, t.id DESC"
    ))?;
    let tuits = stmt
        .query_map([], from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tuits)
}

pub fn list_by_author(conn: &Connection, author_id: &str) -> rusqlite::Result<Vec<Tuit>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM tuits t WHERE t.author_id = ?1 ORDER BY t.created_at DESC, t.id DESC"
    ))?;
    let tuits = stmt
        .query_map(params![author_id], from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tuits)
}

/// Tuits the user currently likes, in like-table order.
pub fn list_liked_by(conn: &Connection, user_id: &str) -> rusqlite::Result<Vec<Tuit>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM likes l JOIN tuits t ON t.id = l.tuit_id WHERE l.user_id = ?1"
    ))?;
    let tuits = stmt
        .query_map(params![user_id], from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tuits)
}

pub fn insert(
    conn: &Connection,
    author_id: &str,
    body: &str,
    attachments: &Attachments,
) -> rusqlite::Result<Tuit> {
    let id = uuid::Uuid::now_v7().to_string();
    conn.execute(
        "INSERT INTO tuits (id, author_id, body, images, video) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            id,
            author_id,
            body,
            to_json(&attachments.images),
            to_json(&attachments.video)
        ],
    )?;
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM tuits t WHERE t.id = ?1"),
        params![id],
        from_row,
    )
}

pub fn update(
    conn: &Connection,
    id: &str,
    body: &str,
    attachments: &Attachments,
) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE tuits SET body = ?2, images = ?3, video = ?4, updated_at = datetime('now')
         WHERE id = ?1",
        params![
            id,
            body,
            to_json(&attachments.images),
            to_json(&attachments.video)
        ],
    )
}

pub fn set_like_count(conn: &Connection, id: &str, like_count: i64) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE tuits SET like_count = ?2 WHERE id = ?1",
        params![id, like_count],
    )
}

pub fn delete(conn: &Connection, id: &str) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM tuits WHERE id = ?1", params![id])
}

/// Every image and video URL attached to any tuit.
pub fn media_references(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT images, video FROM tuits")?;
    let rows = stmt.query_map([], |row| {
        Ok(Attachments {
            images: json_column(row, 0)?,
            video: json_column(row, 1)?,
        })
    })?;

    let mut urls = Vec::new();
    for attachments in rows {
        urls.extend(attachments?.urls().cloned());
    }
    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::db::models::Role;

    fn conn() -> r2d2::PooledConnection<r2d2_sqlite::SqliteConnectionManager> {
        let pool = db::memory_pool().unwrap();
        db::run_migrations(&pool).unwrap();
        pool.get().unwrap()
    }

    #[test]
    fn attachments_round_trip_through_json_columns() {
        let conn = conn();
        let author = db::users::insert(&conn, "alice", "d", Role::Regular, None).unwrap();
        let attachments = Attachments {
            images: vec!["http://m/1.png".into(), "http://m/2.png".into()],
            video: vec![],
        };
        let tuit = insert(&conn, &author.id, "hello", &attachments).unwrap();

        let loaded = find_by_id(&conn, &tuit.id).unwrap().unwrap();
        assert_eq!(loaded.attachments, attachments);
        assert_eq!(loaded.like_count, 0);
        assert_eq!(owner_of(&conn, &tuit.id).unwrap().as_deref(), Some(author.id.as_str()));
    }

    #[test]
    fn list_by_author_filters() {
        let conn = conn();
        let alice = db::users::insert(&conn, "alice", "d", Role::Regular, None).unwrap();
        let bob = db::users::insert(&conn, "bob", "d", Role::Regular, None).unwrap();
        insert(&conn, &alice.id, "a1", &Attachments::default()).unwrap();
        insert(&conn, &alice.id, "a2", &Attachments::default()).unwrap();
        insert(&conn, &bob.id, "b1", &Attachments::default()).unwrap();

        assert_eq!(list(&conn).unwrap().len(), 3);
        let mine = list_by_author(&conn, &alice.id).unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|t| t.author_id == alice.id));
    }

    #[test]
    fn media_references_collects_images_and_video() {
        let conn = conn();
        let alice = db::users::insert(&conn, "alice", "d", Role::Regular, None).unwrap();
        insert(
            &conn,
            &alice.id,
            "",
            &Attachments {
                images: vec!["i1".into(), "i2".into()],
                video: vec![],
            },
        )
        .unwrap();
        insert(
            &conn,
            &alice.id,
            "",
            &Attachments {
                images: vec![],
                video: vec!["v1".into()],
            },
        )
        .unwrap();

        let mut refs = media_references(&conn).unwrap();
        refs.sort();
        assert_eq!(refs, vec!["i1", "i2", "v1"]);
    }

    #[test]
    fn deleting_author_cascades() {
        let conn = conn();
        let alice = db::users::insert(&conn, "alice", "d", Role::Regular, None).unwrap();
        let tuit = insert(&conn, &alice.id, "bye", &Attachments::default()).unwrap();
        db::users::delete(&conn, &alice.id).unwrap();
        assert!(!exists(&conn, &tuit.id).unwrap());
    }
}
