use std::borrow::Cow;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::Permission;

/// Role name used for RBAC (e.g. "customer", "cashier", "admin").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A role together with the rights it grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDefinition {
    pub role: Role,
    pub description: Option<String>,
    pub rights: BTreeSet<String>,
}

impl RoleDefinition {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            description: None,
            rights: BTreeSet::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn grant(mut self, permission: Permission) -> Self {
        self.rights.insert(permission.as_str().to_string());
        self
    }

    pub fn grants(&self, permission: &Permission) -> bool {
        self.rights.contains("*") || self.rights.contains(permission.as_str())
    }
}
