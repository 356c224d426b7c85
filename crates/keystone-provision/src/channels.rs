//! Category and channel reconciliation.
//!
//! Runs in four phases against a working copy of the server snapshot that is
//! kept current with every successful mutation:
//!
//! 1. categories absent from the document are deleted, missing ones created
//! 2. channels named nowhere in the document are deleted unless protected
//! 3. missing channels are created per block, text before voice
//! 4. after a fresh listing, categories and then the channels inside them are
//!    moved into document order
//!
//! Channels are matched by name within their category. A channel that exists
//! under a different category than the document says is left alone and a
//! second one is created where the document wants it.

use std::collections::{HashMap, HashSet};

use keystone_common::blueprint::Blueprint;
use keystone_common::models::{ChannelKind, StructureDocument};
use keystone_sdk::{Channel, ChannelType, CreateChannel, Position};

use crate::overwrites::{OverwriteResolver, Target};
use crate::pacing::{Pacing, pause};
use crate::report::{Action, ResourceKind, Tally};
use crate::snapshot::RemoteSnapshot;
use crate::store::RemoteStore;

#[derive(Debug, Clone, Default)]
pub struct StructureOutcome {
    pub categories: Tally,
    pub channels: Tally,
}

pub struct ChannelReconciler<'a> {
    store: &'a dyn RemoteStore,
    blueprint: &'a Blueprint,
    resolver: OverwriteResolver<'a>,
    pacing: Pacing,
}

impl<'a> ChannelReconciler<'a> {
    pub fn new(
        store: &'a dyn RemoteStore,
        blueprint: &'a Blueprint,
        resolver: OverwriteResolver<'a>,
        pacing: Pacing,
    ) -> Self {
        Self { store, blueprint, resolver, pacing }
    }

    pub async fn reconcile(&self, document: &StructureDocument, snapshot: RemoteSnapshot) -> StructureOutcome {
        let mut outcome = StructureOutcome::default();
        let mut working = snapshot;

        self.sync_categories(document, &mut working, &mut outcome.categories).await;
        pause(self.pacing.category_settle).await;

        self.prune_channels(document, &mut working, &mut outcome.channels).await;
        pause(self.pacing.channel_settle).await;

        self.create_channels(document, &mut working, &mut outcome.channels).await;
        pause(self.pacing.creation_settle).await;

        self.reposition(document, &mut outcome).await;

        tracing::info!(
            server_id = %self.store.server_id(),
            categories_created = outcome.categories.created,
            categories_deleted = outcome.categories.deleted,
            channels_created = outcome.channels.created,
            channels_deleted = outcome.channels.deleted,
            errors = outcome.categories.errors() + outcome.channels.errors(),
            "Channel structure reconciled"
        );
        outcome
    }

    async fn sync_categories(&self, document: &StructureDocument, working: &mut RemoteSnapshot, tally: &mut Tally) {
        let wanted = document.category_names();
        let extra: Vec<Channel> = working
            .categories()
            .filter(|c| !wanted.contains(c.name.as_str()))
            .cloned()
            .collect();

        for category in extra {
            match self.store.delete_channel(&category).await {
                Ok(()) => {
                    working.remove_channel(&category.id);
                    tally.deleted += 1;
                }
                Err(e) => tally.record_failure(Action::Delete, ResourceKind::Category, category.name, e),
            }
        }

        for (name, _) in document.named_blocks() {
            if working.category_named(name).is_some() {
                continue;
            }
            let request = CreateChannel {
                name: name.to_owned(),
                kind: ChannelType::CATEGORY,
                parent_id: None,
                permission_overwrites: self.resolver.resolve_wire(name, Target::Category),
            };
            match self.store.create_channel(&request).await {
                Ok(category) => {
                    tracing::debug!(category = %category.name, id = %category.id, "Category created");
                    working.channels.push(category);
                    tally.created += 1;
                }
                Err(e) => tally.record_failure(Action::Create, ResourceKind::Category, name, e),
            }
        }
    }

    async fn prune_channels(&self, document: &StructureDocument, working: &mut RemoteSnapshot, tally: &mut Tally) {
        let wanted = document.channel_names();
        let extra: Vec<Channel> = working
            .non_category_channels()
            .filter(|c| !wanted.contains(c.name.as_str()) && !self.blueprint.is_protected(&c.name))
            .cloned()
            .collect();

        for channel in extra {
            match self.store.delete_channel(&channel).await {
                Ok(()) => {
                    working.remove_channel(&channel.id);
                    tally.deleted += 1;
                }
                Err(e) => tally.record_failure(Action::Delete, ResourceKind::Channel, channel.name, e),
            }
        }
    }

    async fn create_channels(&self, document: &StructureDocument, working: &mut RemoteSnapshot, tally: &mut Tally) {
        for block in &document.categories {
            // A named block whose category could not be created falls back to
            // the uncategorized bucket.
            let parent = block
                .name
                .as_deref()
                .and_then(|name| working.category_named(name))
                .map(|c| c.id.clone());
            let mut existing: HashSet<String> = working
                .channels_in(parent.as_deref())
                .map(|c| c.name.clone())
                .collect();

            for (kind, spec) in block.ordered_channels() {
                if existing.contains(&spec.name) {
                    continue;
                }
                let request = CreateChannel {
                    name: spec.name.clone(),
                    kind: match kind {
                        ChannelKind::Text => ChannelType::TEXT,
                        ChannelKind::Voice => ChannelType::VOICE,
                    },
                    parent_id: parent.clone(),
                    permission_overwrites: self.resolver.resolve_wire(
                        &spec.name,
                        Target::Channel { inherited_from: block.name.as_deref() },
                    ),
                };
                match self.store.create_channel(&request).await {
                    Ok(channel) => {
                        tracing::debug!(channel = %channel.name, id = %channel.id, "Channel created");
                        existing.insert(channel.name.clone());
                        working.channels.push(channel);
                        tally.created += 1;
                        pause(self.pacing.channel_step).await;
                    }
                    Err(e) => tally.record_failure(Action::Create, ResourceKind::Channel, &spec.name, e),
                }
            }
        }
    }

    /// Creation renumbers positions on the remote side, so this works from a
    /// fresh listing. Only entries that differ are sent. The uncategorized
    /// bucket is never reordered.
    async fn reposition(&self, document: &StructureDocument, outcome: &mut StructureOutcome) {
        let live = match self.store.channels().await {
            Ok(channels) => RemoteSnapshot {
                server_id: self.store.server_id().to_owned(),
                roles: Vec::new(),
                channels,
            },
            Err(e) => {
                outcome
                    .channels
                    .record_failure(Action::Refresh, ResourceKind::Channel, "channel listing", e);
                return;
            }
        };

        let mut positions = Vec::new();
        let mut next = 0;
        for (name, _) in document.named_blocks() {
            if let Some(category) = live.category_named(name) {
                if category.position != next {
                    positions.push(Position { id: category.id.clone(), position: next });
                }
                next += 1;
            }
        }
        if !positions.is_empty() {
            match self.store.reorder_channels(&positions).await {
                Ok(()) => outcome.categories.updated += positions.len(),
                Err(e) => outcome.categories.record_failure(
                    Action::Reposition,
                    ResourceKind::Category,
                    "category order",
                    e,
                ),
            }
            pause(self.pacing.reposition_settle).await;
        }

        for (name, block) in document.named_blocks() {
            let Some(category) = live.category_named(name) else { continue };
            let children: HashMap<&str, &Channel> = live
                .channels_in(Some(&category.id))
                .map(|c| (c.name.as_str(), c))
                .collect();

            for (index, (_, spec)) in (0..).zip(block.ordered_channels()) {
                let Some(channel) = children.get(spec.name.as_str()) else { continue };
                if channel.position == index {
                    continue;
                }
                match self.store.move_channel(&channel.id, index).await {
                    Ok(()) => outcome.channels.updated += 1,
                    Err(e) => outcome.channels.record_failure(
                        Action::Reposition,
                        ResourceKind::Channel,
                        &spec.name,
                        e,
                    ),
                }
            }
        }
    }
}
