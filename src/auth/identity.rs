//! Who is acting, and on what.
//!
//! Resolution (`resolve_*`) is kept apart from enforcement (`require_*`) so
//! read endpoints can resolve ids without imposing ownership rules.

use crate::db::models::User;
use crate::error::{AppError, AppResult};

/// Path segment a client uses instead of its own user id.
pub const SELF_SENTINEL: &str = "me";

/// The session capability for one request: the cookie token, if any, and the
/// principal it is bound to.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub token: Option<String>,
    pub principal: Option<User>,
}

impl SessionContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(token: impl Into<String>, principal: User) -> Self {
        Self {
            token: Some(token.into()),
            principal: Some(principal),
        }
    }
}

pub fn resolve_principal(session: &SessionContext) -> AppResult<&User> {
    session.principal.as_ref().ok_or(AppError::NotAuthenticated)
}

/// Substitute the session principal's id for the `me` sentinel. Any other
/// id passes through untouched; ownership is not checked here.
pub fn resolve_target_id(requested: &str, session: &SessionContext) -> AppResult<String> {
    if requested == SELF_SENTINEL {
        return resolve_principal(session).map(|user| user.id.clone());
    }
    Ok(requested.to_string())
}

/// Format-only check; says nothing about whether the id exists.
pub fn is_valid_id(candidate: &str) -> bool {
    uuid::Uuid::parse_str(candidate).is_ok()
}

/// `resolve_target_id` followed by a format check.
pub fn resolve_valid_id(requested: &str, session: &SessionContext) -> AppResult<String> {
    let id = resolve_target_id(requested, session)?;
    if !is_valid_id(&id) {
        return Err(AppError::InvalidInput(format!("Malformed id '{}'", id)));
    }
    Ok(id)
}

pub fn require_owner_or_admin(actor: &User, resource_owner_id: &str) -> AppResult<()> {
    if actor.id == resource_owner_id || actor.is_admin() {
        Ok(())
    } else {
        Err(AppError::NoPermission)
    }
}

pub fn require_admin(actor: &User) -> AppResult<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(AppError::NoPermission)
    }
}
