//! The structure document: desired categories and channels, in order.
//!
//! This is the file format exchanged with storage:
//!
//! ```json
//! { "categories": [
//!     { "name": null, "channels": { "text": [{ "name": "rules" }], "voice": [] } },
//!     { "name": "Chats", "channels": { "text": [{ "name": "general" }], "voice": [] } }
//! ] }
//! ```
//!
//! A block with `name: null` is the uncategorized bucket. Channel names are the
//! identity key, so they must be unique across the whole document.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureDocument {
    #[serde(default)]
    pub categories: Vec<CategoryBlock>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryBlock {
    /// `None` marks the uncategorized bucket.
    pub name: Option<String>,
    #[serde(default)]
    pub channels: ChannelLists,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelLists {
    #[serde(default)]
    pub text: Vec<ChannelSpec>,
    #[serde(default)]
    pub voice: Vec<ChannelSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ChannelSpec {
    #[validate(length(min = 1, max = 100, message = "Channel name must be 1-100 characters"))]
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Text,
    Voice,
}

impl ChannelSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl CategoryBlock {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()), channels: ChannelLists::default() }
    }

    pub fn uncategorized() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>) -> Self {
        self.channels.text.push(ChannelSpec::new(name));
        self
    }

    pub fn voice(mut self, name: impl Into<String>) -> Self {
        self.channels.voice.push(ChannelSpec::new(name));
        self
    }

    /// Text channels in order, then voice channels in order.
    pub fn ordered_channels(&self) -> impl Iterator<Item = (ChannelKind, &ChannelSpec)> {
        self.channels
            .text
            .iter()
            .map(|c| (ChannelKind::Text, c))
            .chain(self.channels.voice.iter().map(|c| (ChannelKind::Voice, c)))
    }
}

impl StructureDocument {
    pub fn new(categories: Vec<CategoryBlock>) -> Self {
        Self { categories }
    }

    /// Names of all named categories (the uncategorized bucket excluded).
    pub fn category_names(&self) -> BTreeSet<&str> {
        self.categories.iter().filter_map(|c| c.name.as_deref()).collect()
    }

    /// Every channel name across all blocks and both kinds.
    pub fn channel_names(&self) -> BTreeSet<&str> {
        self.categories
            .iter()
            .flat_map(|c| c.ordered_channels())
            .map(|(_, spec)| spec.name.as_str())
            .collect()
    }

    pub fn named_blocks(&self) -> impl Iterator<Item = (&str, &CategoryBlock)> {
        self.categories
            .iter()
            .filter_map(|c| c.name.as_deref().map(|n| (n, c)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_file_format() {
        let doc: StructureDocument = serde_json::from_str(
            r#"{ "categories": [
                { "name": null, "channels": { "text": [{ "name": "rules" }], "voice": [] } },
                { "name": "Voice", "channels": { "voice": [{ "name": "Lounge" }] } },
                { "name": "Empty" }
            ] }"#,
        )
        .unwrap();

        assert_eq!(doc.categories.len(), 3);
        assert_eq!(doc.categories[0].name, None);
        assert!(doc.categories[1].channels.text.is_empty());
        assert_eq!(doc.category_names().into_iter().collect::<Vec<_>>(), ["Empty", "Voice"]);
        assert_eq!(doc.channel_names().len(), 2);
    }

    #[test]
    fn serializes_null_bucket_name() {
        let doc = StructureDocument::new(vec![CategoryBlock::uncategorized().text("rules")]);
        let json = serde_json::to_value(&doc).unwrap();
        assert!(json["categories"][0]["name"].is_null());
        assert_eq!(json["categories"][0]["channels"]["text"][0]["name"], "rules");
    }

    #[test]
    fn ordered_channels_puts_text_first() {
        let block = CategoryBlock::named("A").voice("v1").text("t1").text("t2");
        let order: Vec<_> = block.ordered_channels().map(|(k, c)| (k, c.name.as_str())).collect();
        assert_eq!(
            order,
            [(ChannelKind::Text, "t1"), (ChannelKind::Text, "t2"), (ChannelKind::Voice, "v1")]
        );
    }
}
