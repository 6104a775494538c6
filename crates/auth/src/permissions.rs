use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission key.
///
/// Permissions are opaque dotted strings (e.g. "orders.manage"), stored per role
/// as "rights". The wildcard `"*"` grants everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    /// Drive any order through its lifecycle (staff).
    pub const ORDERS_MANAGE: Permission = Permission::from_static("orders.manage");
    /// Mark prepaid orders as paid (payment callback / cashier).
    pub const ORDERS_CONFIRM_PAYMENT: Permission =
        Permission::from_static("orders.payment.confirm");
    /// Edit catalog and stock levels.
    pub const CATALOG_MANAGE: Permission = Permission::from_static("catalog.manage");
    /// Upload product images to object storage.
    pub const IMAGES_UPLOAD: Permission = Permission::from_static("admin.s3.upload");
    pub const WILDCARD: Permission = Permission::from_static("*");

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
