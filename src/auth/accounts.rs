use serde::Deserialize;

use crate::auth::credentials::PasswordHasher;
use crate::auth::session::SessionStore;
use crate::db;
use crate::db::models::{Role, User};
use crate::db::users::ProfileChanges;
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
}

impl Credentials {
    fn required(&self) -> AppResult<(&str, &str)> {
        let username = self
            .username
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let password = self.password.as_deref().filter(|s| !s.is_empty());
        match (username, password) {
            (Some(username), Some(password)) => Ok((username, password)),
            _ => Err(AppError::InvalidInput(
                "Username and password are required".into(),
            )),
        }
    }
}

/// A principal together with the session token just issued for it.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub user: User,
    pub token: String,
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// A write that lost the race to the username index is a conflict, not a
/// server fault.
fn username_conflict(e: rusqlite::Error) -> AppError {
    if is_unique_violation(&e) {
        AppError::UserAlreadyExists
    } else {
        e.into()
    }
}

/// Create a REGULAR account and log it in.
pub async fn register(
    pool: &DbPool,
    sessions: &SessionStore,
    hasher: &PasswordHasher,
    credentials: &Credentials,
) -> AppResult<Authenticated> {
    let (username, password) = credentials.required()?;

    {
        let conn = pool.get()?;
        if db::users::find_by_username(&conn, username)?.is_some() {
            return Err(AppError::UserAlreadyExists);
        }
    }

    let digest = hasher.hash_blocking(password).await?;
    let user = {
        let conn = pool.get()?;
        db::users::insert(
            &conn,
            username,
            &digest,
            Role::Regular,
            credentials.email.as_deref(),
        )
        .map_err(username_conflict)?
    };

    let token = sessions.create(&user)?;
    tracing::info!("Registered user {}", user.username);
    Ok(Authenticated {
        user: user.redacted(),
        token,
    })
}

pub async fn login(
    pool: &DbPool,
    sessions: &SessionStore,
    hasher: &PasswordHasher,
    credentials: &Credentials,
) -> AppResult<Authenticated> {
    let (username, password) = credentials.required()?;

    let user = {
        let conn = pool.get()?;
        db::users::find_by_username(&conn, username)?.ok_or(AppError::NoSuchUser)?
    };

    let digest = user.password_hash.as_deref().unwrap_or_default();
    if !hasher.verify_blocking(password, digest).await {
        return Err(AppError::NoSuchUser);
    }

    let token = sessions.create(&user)?;
    tracing::debug!("User {} logged in", user.username);
    Ok(Authenticated {
        user: user.redacted(),
        token,
    })
}

/// Apply profile edits and an optional new password digest as one unit.
/// Taking a username someone else holds fails with `UserAlreadyExists` and
/// leaves the account exactly as it was.
pub fn update_account(
    pool: &DbPool,
    id: &str,
    changes: &ProfileChanges,
    password_hash: Option<&str>,
) -> AppResult<()> {
    let mut conn = pool.get()?;
    let tx = conn.transaction()?;

    if db::users::find_by_id(&tx, id)?.is_none() {
        return Err(AppError::NoSuchUser);
    }
    if let Some(digest) = password_hash {
        db::users::set_password(&tx, id, digest)?;
    }
    db::users::update_profile(&tx, id, changes).map_err(username_conflict)?;

    tx.commit()?;
    Ok(())
}

/// Make sure the configured admin account exists with the ADMIN role.
pub async fn ensure_admin(
    pool: &DbPool,
    hasher: &PasswordHasher,
    username: &str,
    password: &str,
) -> AppResult<User> {
    let existing = {
        let conn = pool.get()?;
        db::users::find_by_username(&conn, username)?
    };

    let user = match existing {
        Some(user) if user.is_admin() => user,
        Some(user) => {
            let conn = pool.get()?;
            db::users::set_role(&conn, &user.id, Role::Admin)?;
            tracing::info!("Promoted {} to admin", username);
            User {
                role: Role::Admin,
                ..user
            }
        }
        None => {
            let digest = hasher.hash_blocking(password).await?;
            let conn = pool.get()?;
            let user = db::users::insert(&conn, username, &digest, Role::Admin, None)?;
            tracing::info!("Created admin account {}", username);
            user
        }
    };
    Ok(user.redacted())
}
