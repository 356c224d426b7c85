//! The provisioning blueprint: roles, permission schemes, key maps and the
//! protected channel set.
//!
//! Loaded once at startup from TOML and handed to the engine explicitly.
//!
//! ```toml
//! protected_channels = ["rules"]
//!
//! [[roles]]
//! name = "[ Admin ]"
//! capabilities = ["all"]
//! tag = "admin"
//!
//! [schemes.staff_only]
//! "@everyone" = { deny = ["VIEW_CHANNEL"] }
//! admin = { allow = ["VIEW_CHANNEL", "SEND_MESSAGES"] }
//!
//! [permission_map.categories]
//! "Staff" = "staff_only"
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{KeystoneError, KeystoneResult};
use crate::models::{ChannelPermissionScheme, IdentityRole, PermissionKeyMap, RoleSpec};
use crate::validation::validate_blueprint;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blueprint {
    /// Ordered top to bottom.
    #[serde(default)]
    pub roles: Vec<RoleSpec>,

    #[serde(default)]
    pub schemes: BTreeMap<String, ChannelPermissionScheme>,

    #[serde(default)]
    pub permission_map: PermissionKeyMap,

    /// Channels never deleted, even when absent from the structure document.
    #[serde(default)]
    pub protected_channels: BTreeSet<String>,

    /// Appearance of the automation account's own integration role.
    #[serde(default)]
    pub identity: Option<IdentityRole>,
}

impl Blueprint {
    /// Parse and validate a blueprint from TOML text.
    pub fn from_toml_str(text: &str) -> KeystoneResult<Self> {
        let blueprint: Self = toml::from_str(text).map_err(|e| KeystoneError::Validation {
            message: format!("Invalid blueprint: {e}"),
        })?;
        validate_blueprint(&blueprint)?;
        Ok(blueprint)
    }

    /// Read and validate a blueprint file.
    pub fn load(path: impl AsRef<Path>) -> KeystoneResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => KeystoneError::NotFound {
                resource: format!("Blueprint {}", path.display()),
            },
            _ => KeystoneError::Io(e),
        })?;
        let blueprint = Self::from_toml_str(&text)?;
        tracing::info!(
            path = %path.display(),
            roles = blueprint.roles.len(),
            schemes = blueprint.schemes.len(),
            protected = blueprint.protected_channels.len(),
            "Blueprint loaded"
        );
        Ok(blueprint)
    }

    pub fn scheme(&self, key: &str) -> Option<&ChannelPermissionScheme> {
        self.schemes.get(key)
    }

    pub fn is_protected(&self, channel_name: &str) -> bool {
        self.protected_channels.contains(channel_name)
    }
}
