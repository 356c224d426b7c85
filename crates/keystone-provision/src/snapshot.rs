//! Point-in-time views of a server, and capture back into a structure document.

use keystone_common::models::{CategoryBlock, ChannelKind, ChannelSpec, StructureDocument};
use keystone_sdk::{Channel, ChannelType, Result, Role};

use crate::store::RemoteStore;

/// How a live server is turned back into a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureMode {
    /// Uncategorized channels first as an unnamed block, then categories,
    /// everything in position order.
    #[default]
    Full,
    /// Named categories only, in position order.
    Legacy,
}

#[derive(Debug, Clone, Default)]
pub struct RemoteSnapshot {
    pub server_id: String,
    pub roles: Vec<Role>,
    pub channels: Vec<Channel>,
}

impl RemoteSnapshot {
    pub async fn take(store: &dyn RemoteStore) -> Result<Self> {
        let roles = store.roles().await?;
        let channels = store.channels().await?;
        Ok(Self { server_id: store.server_id().to_owned(), roles, channels })
    }

    pub async fn roles_only(store: &dyn RemoteStore) -> Result<Self> {
        let roles = store.roles().await?;
        Ok(Self { server_id: store.server_id().to_owned(), roles, channels: Vec::new() })
    }

    /// The default role. Its id equals the server id on the platform.
    pub fn everyone_role(&self) -> Option<&Role> {
        self.roles
            .iter()
            .find(|r| r.id == self.server_id)
            .or_else(|| self.roles.iter().find(|r| r.name == "@everyone"))
    }

    pub fn role_named(&self, name: &str) -> Option<&Role> {
        self.roles.iter().find(|r| r.name == name)
    }

    pub fn categories(&self) -> impl Iterator<Item = &Channel> {
        self.channels.iter().filter(|c| c.is_category())
    }

    pub fn category_named(&self, name: &str) -> Option<&Channel> {
        self.categories().find(|c| c.name == name)
    }

    /// Non-category channels under `parent`; `None` is the uncategorized bucket.
    pub fn channels_in<'a>(&'a self, parent: Option<&'a str>) -> impl Iterator<Item = &'a Channel> {
        self.channels
            .iter()
            .filter(move |c| !c.is_category() && c.parent_id.as_deref() == parent)
    }

    pub fn non_category_channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.iter().filter(|c| !c.is_category())
    }

    /// Forget a deleted channel. Children of a deleted category become uncategorized.
    pub(crate) fn remove_channel(&mut self, id: &str) {
        self.channels.retain(|c| c.id != id);
        for child in self.channels.iter_mut() {
            if child.parent_id.as_deref() == Some(id) {
                child.parent_id = None;
            }
        }
    }

    pub fn capture_document(&self, mode: CaptureMode) -> StructureDocument {
        let mut blocks = Vec::new();
        if mode == CaptureMode::Full {
            let loose = block_from(None, sorted(self.channels_in(None)));
            if !loose.channels.text.is_empty() || !loose.channels.voice.is_empty() {
                blocks.push(loose);
            }
        }
        for category in sorted(self.categories()) {
            let children = sorted(self.channels_in(Some(&category.id)));
            blocks.push(block_from(Some(&category.name), children));
        }
        StructureDocument::new(blocks)
    }
}

/// Document kind of a live channel, if it has one.
pub fn kind_of(kind: ChannelType) -> Option<ChannelKind> {
    match kind {
        ChannelType::TEXT | ChannelType::ANNOUNCEMENT => Some(ChannelKind::Text),
        ChannelType::VOICE => Some(ChannelKind::Voice),
        _ => None,
    }
}

/// Position order, ties broken by id. Ids are snowflakes and compare numerically.
fn sorted<'a>(channels: impl Iterator<Item = &'a Channel>) -> Vec<&'a Channel> {
    let mut channels: Vec<_> = channels.collect();
    channels.sort_by(|a, b| {
        a.position
            .cmp(&b.position)
            .then_with(|| (a.id.len(), &a.id).cmp(&(b.id.len(), &b.id)))
    });
    channels
}

fn block_from(name: Option<&str>, channels: Vec<&Channel>) -> CategoryBlock {
    let mut block = CategoryBlock { name: name.map(str::to_owned), ..Default::default() };
    for channel in channels {
        let spec = ChannelSpec::new(channel.name.clone());
        match kind_of(channel.kind) {
            Some(ChannelKind::Text) => block.channels.text.push(spec),
            Some(ChannelKind::Voice) => block.channels.voice.push(spec),
            None => {}
        }
    }
    block
}
