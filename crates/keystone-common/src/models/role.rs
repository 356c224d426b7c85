//! Declared roles.
//!
//! Roles are identified by display name on the live server. The optional tag
//! gives a role a stable logical identity (`admin`, `mod`) that permission
//! schemes refer to, so schemes keep working when display names change.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::permissions::Permissions;

/// A role the provisioner creates. List order encodes the hierarchy: earlier = higher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct RoleSpec {
    #[validate(length(min = 1, max = 100, message = "Role name must be 1-100 characters"))]
    pub name: String,

    /// Permission bitset; none when omitted.
    #[serde(default)]
    pub capabilities: Permissions,

    /// RGB color; platform default when omitted.
    #[serde(default)]
    pub color: Option<u32>,

    /// Display separately in the member list.
    #[serde(default)]
    pub hoist: bool,

    #[serde(default)]
    pub mentionable: bool,

    /// Logical identity used by permission schemes.
    #[serde(default)]
    pub tag: Option<String>,
}

impl RoleSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capabilities: Permissions::empty(),
            color: None,
            hoist: false,
            mentionable: false,
            tag: None,
        }
    }

    pub fn with_capabilities(mut self, capabilities: Permissions) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

/// How the automation account's own integration role should look.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct IdentityRole {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default)]
    pub color: Option<u32>,
    #[serde(default = "default_hoist")]
    pub hoist: bool,
}

fn default_hoist() -> bool {
    true
}
