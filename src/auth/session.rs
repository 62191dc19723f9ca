use rand::Rng;
use rusqlite::{params, OptionalExtension};

use crate::db::models::User;
use crate::error::AppResult;
use crate::state::DbPool;

/// Maps session tokens to a snapshot of the principal taken at login time.
/// The snapshot never carries the password digest.
#[derive(Clone)]
pub struct SessionStore {
    db: DbPool,
    hours: u64,
}

impl SessionStore {
    pub fn new(db: DbPool, hours: u64) -> Self {
        Self { db, hours }
    }

    /// Unexpired principal bound to `token`, if any.
    pub fn get(&self, token: &str) -> AppResult<Option<User>> {
        let conn = self.db.get()?;
        let json: Option<String> = conn
            .query_row(
                "SELECT principal_json FROM sessions
                 WHERE token = ?1 AND expires_at > datetime('now')",
                params![token],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub fn set(&self, token: &str, principal: &User) -> AppResult<()> {
        let conn = self.db.get()?;
        let json = serde_json::to_string(&principal.clone().redacted())?;
        conn.execute(
            "INSERT INTO sessions (token, principal_json, expires_at)
             VALUES (?1, ?2, datetime('now', ?3))
             ON CONFLICT(token) DO UPDATE SET
               principal_json = excluded.principal_json,
               expires_at = excluded.expires_at",
            params![token, json, format!("+{} hours", self.hours)],
        )?;
        Ok(())
    }

    /// Idempotent: destroying an unknown token is not an error.
    pub fn destroy(&self, token: &str) -> AppResult<()> {
        let conn = self.db.get()?;
        conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
        Ok(())
    }

    /// Start a new session for `principal` and return its token.
    pub fn create(&self, principal: &User) -> AppResult<String> {
        let token = generate_token();
        self.set(&token, principal)?;
        Ok(token)
    }

    /// Drop every session held by a user, e.g. when the account goes away.
    pub fn destroy_for_user(&self, user_id: &str) -> AppResult<usize> {
        let conn = self.db.get()?;
        let removed = conn.execute(
            "DELETE FROM sessions WHERE json_extract(principal_json, '$.id') = ?1",
            params![user_id],
        )?;
        Ok(removed)
    }

    /// Refresh the stored snapshot of a user in all of their sessions.
    pub fn refresh_user(&self, principal: &User) -> AppResult<usize> {
        let conn = self.db.get()?;
        let json = serde_json::to_string(&principal.clone().redacted())?;
        let updated = conn.execute(
            "UPDATE sessions SET principal_json = ?2
             WHERE json_extract(principal_json, '$.id') = ?1",
            params![principal.id, json],
        )?;
        Ok(updated)
    }
}

/// Generate a cryptographically random 32-byte hex token.
fn generate_token() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::db::models::Role;

    fn store() -> (DbPool, SessionStore) {
        let pool = db::memory_pool().unwrap();
        db::run_migrations(&pool).unwrap();
        (pool.clone(), SessionStore::new(pool, 1))
    }

    fn user(pool: &DbPool, name: &str) -> User {
        let conn = pool.get().unwrap();
        db::users::insert(&conn, name, "secret-digest", Role::Regular, None).unwrap()
    }

    #[test]
    fn generate_token_is_64_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_token());
    }

    #[test]
    fn create_then_get_returns_redacted_snapshot() {
        let (pool, sessions) = store();
        let alice = user(&pool, "alice");
        assert!(alice.password_hash.is_some());

        let token = sessions.create(&alice).unwrap();
        let snapshot = sessions.get(&token).unwrap().unwrap();
        assert_eq!(snapshot, alice);
        assert!(snapshot.password_hash.is_none());

        let conn = pool.get().unwrap();
        let raw: String = conn
            .query_row(
                "SELECT principal_json FROM sessions WHERE token = ?1",
                params![token],
                |row| row.get(0),
            )
            .unwrap();
        assert!(!raw.contains("secret-digest"));
    }

    #[test]
    fn destroy_is_idempotent() {
        let (pool, sessions) = store();
        let token = sessions.create(&user(&pool, "alice")).unwrap();
        sessions.destroy(&token).unwrap();
        sessions.destroy(&token).unwrap();
        assert!(sessions.get(&token).unwrap().is_none());
    }

    #[test]
    fn expired_sessions_are_ignored() {
        let (pool, sessions) = store();
        let token = sessions.create(&user(&pool, "alice")).unwrap();
        pool.get()
            .unwrap()
            .execute(
                "UPDATE sessions SET expires_at = datetime('now', '-1 hours')",
                [],
            )
            .unwrap();
        assert!(sessions.get(&token).unwrap().is_none());
    }

    #[test]
    fn destroy_for_user_only_touches_that_user() {
        let (pool, sessions) = store();
        let alice = user(&pool, "alice");
        let bob = user(&pool, "bob");
        let a = sessions.create(&alice).unwrap();
        let b = sessions.create(&bob).unwrap();

        assert_eq!(sessions.destroy_for_user(&alice.id).unwrap(), 1);
        assert!(sessions.get(&a).unwrap().is_none());
        assert!(sessions.get(&b).unwrap().is_some());
    }

    #[test]
    fn refresh_user_rewrites_snapshot() {
        let (pool, sessions) = store();
        let mut alice = user(&pool, "alice");
        let token = sessions.create(&alice).unwrap();

        alice.role = Role::Admin;
        sessions.refresh_user(&alice).unwrap();
        assert!(sessions.get(&token).unwrap().unwrap().is_admin());
    }
}
