//! `storefront-auth`: permission gate consumed by the order workflow.
//!
//! This crate is intentionally decoupled from HTTP and token issuance.

pub mod gate;
pub mod permissions;
pub mod roles;

pub use gate::{authorize, authorize_owner_or, Actor, PermissionGate, RoleRegistry};
pub use permissions::Permission;
pub use roles::{Role, RoleDefinition};
