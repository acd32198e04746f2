use crate::error::ApiError;

use super::repo::{Role, User};

/// Identity-or-admin policy for a single user resource: the actor may touch
/// the record iff it is their own or they hold the Admin role.
pub fn can_manage(actor: &User, target_username: &str) -> bool {
    actor.role == Role::Admin || actor.username == target_username
}

/// Applied before any read or mutation of the target record, so a denied
/// actor learns nothing about it (not even whether it exists).
pub fn ensure_can_manage(actor: &User, target_username: &str) -> Result<(), ApiError> {
    if can_manage(actor, target_username) {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Access denied".into()))
    }
}

/// Collection-level operations have no self exception.
pub fn ensure_admin(actor: &User) -> Result<(), ApiError> {
    if actor.role == Role::Admin {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Admin access required".into()))
    }
}
