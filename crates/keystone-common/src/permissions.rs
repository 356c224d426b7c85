//! Permission bitflags and channel-level overwrites.
//!
//! Bit positions follow the platform's wire format so a [`Permissions`] value
//! can be sent as-is. Configuration refers to flags by name (`"SEND_MESSAGES"`)
//! or by preset (`"all"`, `"member"`, `"none"`).

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

bitflags! {
    /// Server-level and channel-level permissions.
    ///
    /// Roles combine permissions via OR. Channel overwrites explicitly
    /// ALLOW or DENY specific permissions; the rest inherit.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct Permissions: u64 {
        // === General ===
        const CREATE_INSTANT_INVITE   = 1 << 0;
        const KICK_MEMBERS            = 1 << 1;
        const BAN_MEMBERS             = 1 << 2;
        /// All permissions, bypasses channel overwrites
        const ADMINISTRATOR           = 1 << 3;
        const MANAGE_CHANNELS         = 1 << 4;
        const MANAGE_GUILD            = 1 << 5;
        const ADD_REACTIONS           = 1 << 6;
        const VIEW_AUDIT_LOG          = 1 << 7;
        const PRIORITY_SPEAKER        = 1 << 8;
        const STREAM                  = 1 << 9;
        const VIEW_CHANNEL            = 1 << 10;

        // === Text ===
        const SEND_MESSAGES           = 1 << 11;
        const SEND_TTS_MESSAGES       = 1 << 12;
        const MANAGE_MESSAGES         = 1 << 13;
        const EMBED_LINKS             = 1 << 14;
        const ATTACH_FILES            = 1 << 15;
        const READ_MESSAGE_HISTORY    = 1 << 16;
        const MENTION_EVERYONE        = 1 << 17;
        const USE_EXTERNAL_EMOJIS     = 1 << 18;
        const VIEW_GUILD_INSIGHTS     = 1 << 19;

        // === Voice ===
        const CONNECT                 = 1 << 20;
        const SPEAK                   = 1 << 21;
        const MUTE_MEMBERS            = 1 << 22;
        const DEAFEN_MEMBERS          = 1 << 23;
        const MOVE_MEMBERS            = 1 << 24;
        /// Voice activity detection (vs push-to-talk only)
        const USE_VAD                 = 1 << 25;

        // === Membership & management ===
        const CHANGE_NICKNAME         = 1 << 26;
        const MANAGE_NICKNAMES        = 1 << 27;
        const MANAGE_ROLES            = 1 << 28;
        const MANAGE_WEBHOOKS         = 1 << 29;
        const MANAGE_EMOJIS           = 1 << 30;
        const USE_APPLICATION_COMMANDS = 1 << 31;
        const REQUEST_TO_SPEAK        = 1 << 32;
        const MANAGE_EVENTS           = 1 << 33;
        const MANAGE_THREADS          = 1 << 34;
        const CREATE_PUBLIC_THREADS   = 1 << 35;
        const CREATE_PRIVATE_THREADS  = 1 << 36;
        const USE_EXTERNAL_STICKERS   = 1 << 37;
        const SEND_MESSAGES_IN_THREADS = 1 << 38;
        const USE_EMBEDDED_ACTIVITIES = 1 << 39;
        /// Time out members
        const MODERATE_MEMBERS        = 1 << 40;
    }
}

impl Default for Permissions {
    fn default() -> Self {
        Self::empty()
    }
}

impl Permissions {
    /// Everyday member permissions: read, chat, react, talk.
    pub fn member() -> Self {
        Self::VIEW_CHANNEL
            | Self::CREATE_INSTANT_INVITE
            | Self::CHANGE_NICKNAME
            | Self::SEND_MESSAGES
            | Self::SEND_MESSAGES_IN_THREADS
            | Self::CREATE_PUBLIC_THREADS
            | Self::EMBED_LINKS
            | Self::ATTACH_FILES
            | Self::ADD_REACTIONS
            | Self::USE_EXTERNAL_EMOJIS
            | Self::USE_EXTERNAL_STICKERS
            | Self::READ_MESSAGE_HISTORY
            | Self::USE_APPLICATION_COMMANDS
            | Self::CONNECT
            | Self::SPEAK
            | Self::STREAM
            | Self::USE_VAD
    }

    pub fn is_admin(&self) -> bool {
        self.contains(Self::ADMINISTRATOR)
    }

    /// Resolve a flag name or preset. Names are case-insensitive.
    pub fn parse_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "all" => Some(Self::all()),
            "member" => Some(Self::member()),
            "none" => Some(Self::empty()),
            _ => Self::from_name(&name.to_ascii_uppercase()),
        }
    }

    /// OR together a list of flag names and presets.
    pub fn parse_names<S: AsRef<str>>(names: &[S]) -> Result<Self, String> {
        names.iter().try_fold(Self::empty(), |acc, n| {
            Self::parse_name(n.as_ref())
                .map(|p| acc | p)
                .ok_or_else(|| format!("unknown permission '{}'", n.as_ref()))
        })
    }

    /// Flag names in bit order, for config round-trips and logs.
    pub fn names(&self) -> Vec<&'static str> {
        self.iter_names().map(|(name, _)| name).collect()
    }
}

impl Serialize for Permissions {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        self.names().serialize(s)
    }
}

impl<'de> Deserialize<'de> for Permissions {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let names = Vec::<String>::deserialize(d)?;
        Self::parse_names(&names).map_err(serde::de::Error::custom)
    }
}

/// A channel-level capability overwrite.
///
/// Flags in `allow` are granted, flags in `deny` are revoked, everything else
/// inherits from the category or server defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionOverwrite {
    #[serde(default)]
    pub allow: Permissions,
    #[serde(default)]
    pub deny: Permissions,
}

impl PermissionOverwrite {
    pub fn allow(allow: Permissions) -> Self {
        Self { allow, deny: Permissions::empty() }
    }

    pub fn deny(deny: Permissions) -> Self {
        Self { allow: Permissions::empty(), deny }
    }
}
