use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use storefront_core::{DomainError, DomainResult, UserId};

use crate::{Permission, Role, RoleDefinition};

/// Who is invoking an operation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Actor {
    /// Internal callers (payment callbacks, schedulers). Never checked.
    System,
    User(UserId),
}

impl Actor {
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Actor::System => None,
            Actor::User(id) => Some(*id),
        }
    }

    pub fn is(&self, user: UserId) -> bool {
        self.user_id() == Some(user)
    }
}

impl core::fmt::Display for Actor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Actor::System => f.write_str("system"),
            Actor::User(id) => write!(f, "user:{id}"),
        }
    }
}

/// Role -> permission lookup consumed by the order workflow.
pub trait PermissionGate: Send + Sync {
    fn has_permission(&self, user: UserId, permission: &Permission) -> bool;
}

impl<G: PermissionGate + ?Sized> PermissionGate for std::sync::Arc<G> {
    fn has_permission(&self, user: UserId, permission: &Permission) -> bool {
        (**self).has_permission(user, permission)
    }
}

/// Authorize an actor for a permission.
///
/// - No IO
/// - No panics
/// - `Actor::System` always passes
pub fn authorize<G>(gate: &G, actor: Actor, required: &Permission) -> DomainResult<()>
where
    G: PermissionGate + ?Sized,
{
    match actor {
        Actor::System => Ok(()),
        Actor::User(user) if gate.has_permission(user, required) => Ok(()),
        Actor::User(user) => {
            debug!(user = %user, permission = %required, "permission denied");
            Err(DomainError::forbidden(required.as_str()))
        }
    }
}

/// Like [`authorize`], but the resource owner passes without the permission.
pub fn authorize_owner_or<G>(
    gate: &G,
    actor: Actor,
    owner: UserId,
    required: &Permission,
) -> DomainResult<()>
where
    G: PermissionGate + ?Sized,
{
    if actor.is(owner) {
        return Ok(());
    }
    authorize(gate, actor, required)
}

/// In-memory role registry: users hold one role, roles hold rights.
#[derive(Debug, Default)]
pub struct RoleRegistry {
    roles: RwLock<HashMap<Role, RoleDefinition>>,
    assignments: RwLock<HashMap<UserId, Role>>,
}

impl RoleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a role definition.
    pub fn define(&self, definition: RoleDefinition) -> DomainResult<()> {
        self.roles
            .write()
            .map_err(|_| poisoned("roles"))?
            .insert(definition.role.clone(), definition);
        Ok(())
    }

    /// Assign a role to a user; the role must already be defined.
    pub fn assign(&self, user: UserId, role: Role) -> DomainResult<()> {
        let known = self
            .roles
            .read()
            .map_err(|_| poisoned("roles"))?
            .contains_key(&role);
        if !known {
            return Err(DomainError::not_found("role", role));
        }
        self.assignments
            .write()
            .map_err(|_| poisoned("role assignments"))?
            .insert(user, role);
        Ok(())
    }

    pub fn role_of(&self, user: UserId) -> Option<Role> {
        self.assignments.read().ok()?.get(&user).cloned()
    }

    /// Rights granted to a user through their role (sorted).
    pub fn rights_of(&self, user: UserId) -> Vec<String> {
        let Some(role) = self.role_of(user) else {
            return vec![];
        };
        self.roles
            .read()
            .ok()
            .and_then(|roles| roles.get(&role).map(|d| d.rights.iter().cloned().collect()))
            .unwrap_or_default()
    }
}

impl PermissionGate for RoleRegistry {
    fn has_permission(&self, user: UserId, permission: &Permission) -> bool {
        let Some(role) = self.role_of(user) else {
            return false;
        };
        match self.roles.read() {
            Ok(roles) => roles.get(&role).is_some_and(|d| d.grants(permission)),
            Err(_) => false,
        }
    }
}

fn poisoned(what: &str) -> DomainError {
    error!(lock = what, "role registry lock poisoned");
    DomainError::inconsistency(format!("{what} lock poisoned"))
}
