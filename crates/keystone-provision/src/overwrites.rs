//! Resolution of channel permission schemes against the live role set.

use std::collections::{BTreeMap, HashMap};

use keystone_common::blueprint::Blueprint;
use keystone_common::models::RoleKey;
use keystone_common::permissions::PermissionOverwrite;
use keystone_sdk::{Overwrite, OverwriteType, Role};

use crate::snapshot::RemoteSnapshot;

/// Role keys mapped to the ids of roles present on the server right now.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveRoleIndex {
    ids: HashMap<RoleKey, String>,
}

impl LiveRoleIndex {
    /// Tagged blueprint roles bind to the role created for them this run.
    /// A spec whose create failed falls back to a live role of the same name.
    /// The everyone role is always present.
    pub fn build(blueprint: &Blueprint, snapshot: &RemoteSnapshot, created: &[Role]) -> Self {
        let mut ids = HashMap::new();
        if let Some(everyone) = snapshot.everyone_role() {
            ids.insert(RoleKey::Everyone, everyone.id.clone());
        }
        for spec in &blueprint.roles {
            let Some(tag) = &spec.tag else { continue };
            let role = created
                .iter()
                .find(|r| r.name == spec.name)
                .or_else(|| snapshot.role_named(&spec.name));
            if let Some(role) = role {
                ids.insert(RoleKey::tag(tag.as_str()), role.id.clone());
            }
        }
        Self { ids }
    }

    pub fn get(&self, key: &RoleKey) -> Option<&str> {
        self.ids.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// What an overwrite set is being resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
    Category,
    /// A channel, with the name of the document block it belongs to.
    Channel { inherited_from: Option<&'a str> },
}

pub struct OverwriteResolver<'a> {
    blueprint: &'a Blueprint,
    index: &'a LiveRoleIndex,
}

impl<'a> OverwriteResolver<'a> {
    pub fn new(blueprint: &'a Blueprint, index: &'a LiveRoleIndex) -> Self {
        Self { blueprint, index }
    }

    /// Overwrites keyed by live role id. A channel's own entry wins over its
    /// category's.
    pub fn resolve(&self, name: &str, target: Target<'_>) -> BTreeMap<String, PermissionOverwrite> {
        let map = &self.blueprint.permission_map;
        let key = match target {
            Target::Category => map.for_category(name),
            Target::Channel { inherited_from } => map.for_channel(name, inherited_from),
        };
        let Some(key) = key else {
            return BTreeMap::new();
        };
        let Some(scheme) = self.blueprint.scheme(key) else {
            tracing::warn!(scheme = key, target = name, "Unknown permission scheme");
            return BTreeMap::new();
        };

        scheme
            .entries()
            .filter_map(|(role_key, overwrite)| {
                self.index.get(role_key).map(|id| (id.to_owned(), *overwrite))
            })
            .collect()
    }

    /// Same as [`resolve`](Self::resolve), in the platform's wire format.
    pub fn resolve_wire(&self, name: &str, target: Target<'_>) -> Vec<Overwrite> {
        to_wire(self.resolve(name, target))
    }
}

pub fn to_wire(resolved: BTreeMap<String, PermissionOverwrite>) -> Vec<Overwrite> {
    resolved
        .into_iter()
        .map(|(id, ow)| Overwrite {
            id,
            kind: OverwriteType::ROLE,
            allow: ow.allow.bits(),
            deny: ow.deny.bits(),
        })
        .collect()
}
