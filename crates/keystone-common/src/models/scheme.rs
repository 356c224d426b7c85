//! Channel permission schemes and the maps that select them.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::permissions::PermissionOverwrite;

/// Who a scheme entry applies to: the server-wide everyone role or a tagged role.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RoleKey {
    Everyone,
    Tag(String),
}

impl RoleKey {
    pub fn tag(tag: impl Into<String>) -> Self {
        Self::Tag(tag.into())
    }
}

impl From<String> for RoleKey {
    fn from(s: String) -> Self {
        match s.as_str() {
            "everyone" | "@everyone" => Self::Everyone,
            _ => Self::Tag(s),
        }
    }
}

impl From<&str> for RoleKey {
    fn from(s: &str) -> Self {
        Self::from(s.to_owned())
    }
}

impl From<RoleKey> for String {
    fn from(key: RoleKey) -> Self {
        key.to_string()
    }
}

impl fmt::Display for RoleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Everyone => f.write_str("@everyone"),
            Self::Tag(tag) => f.write_str(tag),
        }
    }
}

/// Named mapping from role key to capability overwrite.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelPermissionScheme(pub BTreeMap<RoleKey, PermissionOverwrite>);

impl ChannelPermissionScheme {
    pub fn entries(&self) -> impl Iterator<Item = (&RoleKey, &PermissionOverwrite)> {
        self.0.iter()
    }

    pub fn with(mut self, key: impl Into<RoleKey>, overwrite: PermissionOverwrite) -> Self {
        self.0.insert(key.into(), overwrite);
        self
    }
}

/// Selects a scheme key for a category or channel by display name.
///
/// A channel's own entry takes precedence over the entry of its category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionKeyMap {
    #[serde(default)]
    pub categories: BTreeMap<String, String>,
    #[serde(default)]
    pub channels: BTreeMap<String, String>,
}

impl PermissionKeyMap {
    pub fn for_category(&self, name: &str) -> Option<&str> {
        self.categories.get(name).map(String::as_str)
    }

    /// Channel entry first, then the containing category's entry.
    pub fn for_channel(&self, name: &str, category: Option<&str>) -> Option<&str> {
        self.channels
            .get(name)
            .or_else(|| category.and_then(|c| self.categories.get(c)))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::Permissions;

    #[test]
    fn everyone_key_spellings() {
        assert_eq!(RoleKey::from("everyone"), RoleKey::Everyone);
        assert_eq!(RoleKey::from("@everyone"), RoleKey::Everyone);
        assert_eq!(RoleKey::from("admin"), RoleKey::tag("admin"));
        assert_eq!(RoleKey::Everyone.to_string(), "@everyone");
    }

    #[test]
    fn scheme_from_toml() {
        let scheme: ChannelPermissionScheme = toml::from_str(
            r#"
            "@everyone" = { deny = ["VIEW_CHANNEL"] }
            admin = { allow = ["VIEW_CHANNEL", "SEND_MESSAGES"] }
            "#,
        )
        .unwrap();
        assert_eq!(scheme.0[&RoleKey::Everyone].deny, Permissions::VIEW_CHANNEL);
        assert!(scheme.0[&RoleKey::tag("admin")].allow.contains(Permissions::SEND_MESSAGES));
    }

    #[test]
    fn channel_entry_beats_category_entry() {
        let mut map = PermissionKeyMap::default();
        map.categories.insert("Staff".into(), "staff_only".into());
        map.channels.insert("announcements".into(), "info_read_only".into());

        assert_eq!(map.for_channel("announcements", Some("Staff")), Some("info_read_only"));
        assert_eq!(map.for_channel("chat", Some("Staff")), Some("staff_only"));
        assert_eq!(map.for_channel("chat", None), None);
        assert_eq!(map.for_category("Staff"), Some("staff_only"));
    }
}
