//! Fluent builders for slash commands and embeds.

use crate::types::{Embed, EmbedField, EmbedFooter};
use serde_json::{Value, json};

// ── Option types ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
#[repr(u8)]
pub enum OptionType {
    SubCommand = 1,
    SubCommandGroup = 2,
    String = 3,
    Integer = 4,
    Boolean = 5,
    User = 6,
    Channel = 7,
    Role = 8,
}

// ── Slash command option builder ──────────────────────────────────────────────

#[derive(Default)]
pub struct SlashCommandOptionBuilder {
    kind: u8,
    name: String,
    description: String,
    required: bool,
    min_length: Option<u32>,
    max_length: Option<u32>,
}

impl SlashCommandOptionBuilder {
    pub fn new(kind: OptionType) -> Self {
        Self { kind: kind as u8, ..Default::default() }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn min_length(mut self, v: u32) -> Self {
        self.min_length = Some(v);
        self
    }

    pub fn max_length(mut self, v: u32) -> Self {
        self.max_length = Some(v);
        self
    }

    pub fn build(self) -> Value {
        let mut d = json!({
            "type": self.kind,
            "name": self.name,
            "description": self.description,
            "required": self.required,
        });
        if let Some(v) = self.min_length { d["min_length"] = json!(v); }
        if let Some(v) = self.max_length { d["max_length"] = json!(v); }
        d
    }
}

// ── Slash command builder ─────────────────────────────────────────────────────

/// Fluent builder for a slash command definition.
///
/// ```rust
/// use keystone_sdk::builders::SlashCommandBuilder;
///
/// let cmd = SlashCommandBuilder::new()
///     .name("setup-server")
///     .description("Apply the configured roles and channels")
///     .default_member_permissions(8u64)
///     .build();
/// assert_eq!(cmd["default_member_permissions"], "8");
/// ```
#[derive(Default)]
pub struct SlashCommandBuilder {
    name: String,
    description: String,
    kind: u8,
    options: Vec<Value>,
    default_member_permissions: Option<String>,
    dm_permission: bool,
}

impl SlashCommandBuilder {
    pub fn new() -> Self {
        Self { kind: 1, dm_permission: true, ..Default::default() }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Restrict the command to members holding these permission bits.
    pub fn default_member_permissions(mut self, perms: impl ToString) -> Self {
        self.default_member_permissions = Some(perms.to_string());
        self
    }

    pub fn dm_permission(mut self, allow: bool) -> Self {
        self.dm_permission = allow;
        self
    }

    pub fn option(mut self, builder: SlashCommandOptionBuilder) -> Self {
        self.options.push(builder.build());
        self
    }

    pub fn string_option(self, f: impl FnOnce(SlashCommandOptionBuilder) -> SlashCommandOptionBuilder) -> Self {
        self.option(f(SlashCommandOptionBuilder::new(OptionType::String)))
    }

    pub fn build(self) -> Value {
        let mut d = json!({
            "name": self.name,
            "description": self.description,
            "type": self.kind,
            "dm_permission": self.dm_permission,
        });
        if !self.options.is_empty() {
            d["options"] = Value::Array(self.options);
        }
        if let Some(p) = self.default_member_permissions {
            d["default_member_permissions"] = json!(p);
        }
        d
    }
}

// ── Embed builder ─────────────────────────────────────────────────────────────

/// Fluent builder for message embeds.
///
/// ```rust
/// use keystone_sdk::builders::EmbedBuilder;
///
/// let embed = EmbedBuilder::new()
///     .title("Hello")
///     .description("World")
///     .color(0x2ecc71)
///     .build();
/// ```
#[derive(Default)]
pub struct EmbedBuilder {
    inner: Embed,
}

impl EmbedBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, v: impl Into<String>) -> Self {
        self.inner.title = Some(v.into());
        self
    }

    pub fn description(mut self, v: impl Into<String>) -> Self {
        self.inner.description = Some(v.into());
        self
    }

    pub fn color(mut self, v: u32) -> Self {
        self.inner.color = Some(v);
        self
    }

    pub fn timestamp(mut self, v: impl Into<String>) -> Self {
        self.inner.timestamp = Some(v.into());
        self
    }

    pub fn footer(mut self, text: impl Into<String>) -> Self {
        self.inner.footer = Some(EmbedFooter { text: text.into() });
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.inner.fields.push(EmbedField { name: name.into(), value: value.into(), inline });
        self
    }

    pub fn build(self) -> Embed {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_with_string_option() {
        let cmd = SlashCommandBuilder::new()
            .name("save-structure")
            .description("Snapshot a server")
            .dm_permission(false)
            .string_option(|o| o.name("server_id").description("Server ID").required().max_length(20))
            .build();

        assert_eq!(cmd["type"], 1);
        assert_eq!(cmd["dm_permission"], false);
        assert_eq!(cmd["options"][0]["type"], 3);
        assert_eq!(cmd["options"][0]["required"], true);
        assert_eq!(cmd["options"][0]["max_length"], 20);
        assert!(cmd.get("default_member_permissions").is_none());
    }

    #[test]
    fn embed_fields_keep_order() {
        let embed = EmbedBuilder::new()
            .title("t")
            .field("a", "1", false)
            .field("b", "2", true)
            .build();
        let names: Vec<_> = embed.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
        assert!(embed.fields[1].inline);
    }
}
