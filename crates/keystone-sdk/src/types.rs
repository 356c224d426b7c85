//! Wire types matching the platform's REST and gateway payloads.

use serde::{Deserialize, Serialize};

/// Permission bitsets travel as decimal strings on the wire.
mod bits {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Str(String),
            Num(u64),
        }
        match Raw::deserialize(d)? {
            Raw::Str(s) => s.parse().map_err(serde::de::Error::custom),
            Raw::Num(n) => Ok(n),
        }
    }
}

// ── Users & members ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub bot: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    /// Only present on interaction payloads: the invoker's computed permissions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<String>,
}

// ── Roles ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: u32,
    #[serde(default)]
    pub hoist: bool,
    /// Position in the hierarchy, bottom-up: the everyone role sits at 0.
    pub position: i32,
    #[serde(with = "bits")]
    pub permissions: u64,
    /// Roles owned by an integration (bots) cannot be deleted or reassigned.
    #[serde(default)]
    pub managed: bool,
    #[serde(default)]
    pub mentionable: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateRole {
    pub name: String,
    #[serde(with = "bits")]
    pub permissions: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    pub hoist: bool,
    pub mentionable: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EditRole {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hoist: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mentionable: Option<bool>,
}

/// One entry of a bulk position update (roles or channels).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub id: String,
    pub position: i32,
}

// ── Channels ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelType(pub u8);

impl ChannelType {
    pub const TEXT: Self = Self(0);
    pub const VOICE: Self = Self(2);
    pub const CATEGORY: Self = Self(4);
    pub const ANNOUNCEMENT: Self = Self(5);
    pub const FORUM: Self = Self(15);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OverwriteType(pub u8);

impl OverwriteType {
    pub const ROLE: Self = Self(0);
}

/// A channel-level allow/deny override for a role or member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overwrite {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: OverwriteType,
    #[serde(with = "bits")]
    pub allow: u64,
    #[serde(with = "bits")]
    pub deny: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ChannelType,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub permission_overwrites: Vec<Overwrite>,
}

impl Channel {
    pub fn is_category(&self) -> bool {
        self.kind == ChannelType::CATEGORY
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateChannel {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ChannelType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub permission_overwrites: Vec<Overwrite>,
}

// ── Interactions ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InteractionType(pub u8);

impl InteractionType {
    pub const APPLICATION_COMMAND: Self = Self(2);
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub id: String,
    pub application_id: String,
    #[serde(rename = "type")]
    pub kind: InteractionType,
    pub token: String,
    pub data: Option<serde_json::Value>,
    pub guild_id: Option<String>,
    pub channel_id: Option<String>,
    /// Present when invoked inside a server.
    pub member: Option<Member>,
    /// Present when invoked from a DM.
    pub user: Option<User>,
}

impl Interaction {
    /// Name of the invoked slash command. Other interaction kinds carry a
    /// `name` too but are not commands.
    pub fn command_name(&self) -> Option<&str> {
        if self.kind != InteractionType::APPLICATION_COMMAND {
            return None;
        }
        self.data.as_ref()?.get("name")?.as_str()
    }

    /// The invoking user, whether the command came from a server or a DM.
    pub fn invoker(&self) -> Option<&User> {
        self.member
            .as_ref()
            .and_then(|m| m.user.as_ref())
            .or(self.user.as_ref())
    }

    /// The invoker's permission bits in the channel, zero outside servers.
    pub fn invoker_permissions(&self) -> u64 {
        self.member
            .as_ref()
            .and_then(|m| m.permissions.as_deref())
            .and_then(|p| p.parse().ok())
            .unwrap_or(0)
    }

    /// Look up a top-level command option by name.
    pub fn option(&self, name: &str) -> Option<&serde_json::Value> {
        self.data
            .as_ref()?
            .get("options")?
            .as_array()?
            .iter()
            .find(|o| o.get("name").and_then(|n| n.as_str()) == Some(name))?
            .get("value")
    }
}

// ── Embeds ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub fields: Vec<EmbedField>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn role_permissions_accept_string_bits() {
        let role: Role = serde_json::from_value(json!({
            "id": "1", "name": "[ Mod ]", "color": 32896, "hoist": true,
            "position": 4, "permissions": "8192", "managed": false, "mentionable": false
        }))
        .unwrap();
        assert_eq!(role.permissions, 8192);
        assert_eq!(serde_json::to_value(&role).unwrap()["permissions"], json!("8192"));
    }

    #[test]
    fn channel_defaults_for_sparse_payloads() {
        let channel: Channel = serde_json::from_value(json!({ "id": "9", "type": 4 })).unwrap();
        assert!(channel.is_category());
        assert_eq!(channel.parent_id, None);
        assert!(channel.permission_overwrites.is_empty());
    }

    #[test]
    fn interaction_helpers() {
        let interaction: Interaction = serde_json::from_value(json!({
            "id": "10", "application_id": "20", "type": 2, "token": "tok",
            "guild_id": "30", "channel_id": "40",
            "data": { "name": "save-structure", "options": [{ "name": "server_id", "type": 3, "value": "555" }] },
            "member": { "user": { "id": "7", "username": "owner" }, "roles": [], "permissions": "8" }
        }))
        .unwrap();
        assert_eq!(interaction.command_name(), Some("save-structure"));
        assert_eq!(interaction.option("server_id"), Some(&json!("555")));
        assert_eq!(interaction.invoker().map(|u| u.id.as_str()), Some("7"));
        assert_eq!(interaction.invoker_permissions(), 8);
    }

    #[test]
    fn autocomplete_is_not_a_command() {
        let interaction: Interaction = serde_json::from_value(json!({
            "id": "10", "application_id": "20", "type": 4, "token": "tok",
            "data": { "name": "save-structure" }
        }))
        .unwrap();
        assert_eq!(interaction.command_name(), None);
    }
}
