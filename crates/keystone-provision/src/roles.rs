//! Full-replace role reconciliation.
//!
//! Every blueprint-managed role is deleted and recreated in blueprint order,
//! then the created set is repositioned in one batch so the first spec ends up
//! highest. Member assignments to managed roles do not survive a run.

use std::collections::HashSet;

use keystone_common::blueprint::Blueprint;
use keystone_sdk::{CreateRole, EditRole, Position, Role};

use crate::pacing::{Pacing, pause};
use crate::report::{Action, ResourceKind, Tally};
use crate::snapshot::RemoteSnapshot;
use crate::store::RemoteStore;

#[derive(Debug, Clone, Default)]
pub struct RoleOutcome {
    pub tally: Tally,
    /// Created roles in blueprint order.
    pub created: Vec<Role>,
}

pub struct RoleReconciler<'a> {
    store: &'a dyn RemoteStore,
    blueprint: &'a Blueprint,
    pacing: Pacing,
}

impl<'a> RoleReconciler<'a> {
    pub fn new(store: &'a dyn RemoteStore, blueprint: &'a Blueprint, pacing: Pacing) -> Self {
        Self { store, blueprint, pacing }
    }

    pub async fn reconcile(&self, snapshot: &RemoteSnapshot) -> RoleOutcome {
        let mut outcome = RoleOutcome::default();

        self.delete_managed(snapshot, &mut outcome.tally).await;
        pause(self.pacing.role_settle).await;

        for spec in &self.blueprint.roles {
            let request = CreateRole {
                name: spec.name.clone(),
                permissions: spec.capabilities.bits(),
                color: spec.color,
                hoist: spec.hoist,
                mentionable: spec.mentionable,
            };
            match self.store.create_role(&request).await {
                Ok(role) => {
                    tracing::debug!(role = %role.name, id = %role.id, "Role created");
                    outcome.tally.created += 1;
                    outcome.created.push(role);
                    pause(self.pacing.role_step).await;
                }
                Err(e) => outcome.tally.record_failure(Action::Create, ResourceKind::Role, &spec.name, e),
            }
        }

        self.apply_hierarchy(&outcome.created, &mut outcome.tally).await;
        self.fix_identity(snapshot, &mut outcome.tally).await;

        tracing::info!(
            server_id = %self.store.server_id(),
            created = outcome.tally.created,
            deleted = outcome.tally.deleted,
            errors = outcome.tally.errors(),
            "Roles reconciled"
        );
        outcome
    }

    async fn delete_managed(&self, snapshot: &RemoteSnapshot, tally: &mut Tally) {
        let managed: HashSet<&str> = self.blueprint.roles.iter().map(|r| r.name.as_str()).collect();
        for role in snapshot.roles.iter().filter(|r| managed.contains(r.name.as_str())) {
            match self.store.delete_role(&role.id).await {
                Ok(()) => tally.deleted += 1,
                Err(e) => tally.record_failure(Action::Delete, ResourceKind::Role, &role.name, e),
            }
        }
    }

    /// Bottom of the created list goes to position 1, the top spec highest.
    async fn apply_hierarchy(&self, created: &[Role], tally: &mut Tally) {
        if created.is_empty() {
            return;
        }
        let positions: Vec<Position> = created
            .iter()
            .rev()
            .zip(1..)
            .map(|(role, position)| Position { id: role.id.clone(), position })
            .collect();

        match self.store.reorder_roles(&positions).await {
            Ok(()) => tally.updated += positions.len(),
            Err(e) => tally.record_failure(Action::Reposition, ResourceKind::Role, "hierarchy", e),
        }
    }

    async fn fix_identity(&self, snapshot: &RemoteSnapshot, tally: &mut Tally) {
        let Some(identity) = &self.blueprint.identity else {
            return;
        };
        let account = match self.store.account_name().await {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!(error = %e, "Could not resolve automation account, skipping its role");
                return;
            }
        };
        let Some(role) = snapshot.roles.iter().find(|r| r.managed && r.name == account) else {
            tracing::debug!(account = %account, "No integration role found");
            return;
        };

        let edit = EditRole {
            name: Some(identity.name.clone()),
            color: identity.color,
            hoist: Some(identity.hoist),
            mentionable: None,
        };
        match self.store.edit_role(&role.id, &edit).await {
            Ok(_) => tally.updated += 1,
            Err(e) => tally.record_failure(Action::Update, ResourceKind::Role, &role.name, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use keystone_common::models::{IdentityRole, RoleSpec};
    use keystone_common::permissions::Permissions;

    fn blueprint(names: &[&str]) -> Blueprint {
        Blueprint {
            roles: names.iter().map(|n| RoleSpec::new(*n)).collect(),
            ..Default::default()
        }
    }

    async fn run(store: &MemoryStore, bp: &Blueprint) -> RoleOutcome {
        let snapshot = RemoteSnapshot::roles_only(store).await.unwrap();
        RoleReconciler::new(store, bp, Pacing::none()).reconcile(&snapshot).await
    }

    #[tokio::test]
    async fn first_spec_ends_up_highest() {
        let store = MemoryStore::new("1");
        let bp = blueprint(&["[ Admin ]", "[ Mod ]"]);

        let outcome = run(&store, &bp).await;
        assert_eq!(outcome.tally.created, 2);
        assert_eq!(outcome.tally.errors(), 0);

        let admin = store.role_position("[ Admin ]").unwrap();
        let moderator = store.role_position("[ Mod ]").unwrap();
        let everyone = store.role_position("@everyone").unwrap();
        assert!(admin > moderator);
        assert!(moderator > everyone);
    }

    #[tokio::test]
    async fn hierarchy_follows_blueprint_order() {
        let store = MemoryStore::new("1");
        let names = ["A", "B", "C", "D", "E"];
        run(&store, &blueprint(&names)).await;

        let positions: Vec<_> = names.iter().map(|n| store.role_position(n).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] > w[1]), "{positions:?}");
    }

    #[tokio::test]
    async fn managed_roles_are_replaced_and_others_kept() {
        let store = MemoryStore::new("1");
        store.seed_role("[ Admin ]");
        let foreign = store.seed_role("Booster");

        let outcome = run(&store, &blueprint(&["[ Admin ]"])).await;
        assert_eq!(outcome.tally.deleted, 1);
        assert_eq!(outcome.tally.created, 1);

        let roles = store.role_list();
        assert_eq!(roles.iter().filter(|r| r.name == "[ Admin ]").count(), 1);
        assert!(roles.iter().any(|r| r.id == foreign));
    }

    #[tokio::test]
    async fn capabilities_and_appearance_are_applied() {
        let store = MemoryStore::new("1");
        let mut spec = RoleSpec::new("[ Mod ]").with_capabilities(Permissions::MANAGE_MESSAGES);
        spec.color = Some(0x008080);
        spec.hoist = true;
        let bp = Blueprint { roles: vec![spec], ..Default::default() };

        let outcome = run(&store, &bp).await;
        let created = &outcome.created[0];
        assert_eq!(created.permissions, Permissions::MANAGE_MESSAGES.bits());
        assert_eq!(created.color, 0x008080);
        assert!(created.hoist && !created.mentionable);
    }

    #[tokio::test]
    async fn failed_create_is_counted_and_the_rest_continue() {
        let store = MemoryStore::new("1");
        store.fail_on("[ Mod ]");

        let outcome = run(&store, &blueprint(&["[ Admin ]", "[ Mod ]", "[ Member ]"])).await;
        assert_eq!(outcome.tally.created, 2);
        assert_eq!(outcome.tally.errors(), 1);
        assert_eq!(outcome.tally.failures[0].action, Action::Create);
        assert!(store.role_position("[ Admin ]") > store.role_position("[ Member ]"));
    }

    #[tokio::test]
    async fn identity_role_is_restyled() {
        let store = MemoryStore::new("1");
        let mut bp = blueprint(&["[ Admin ]"]);
        bp.identity = Some(IdentityRole {
            name: "[ Keystone ]".into(),
            color: Some(0x7289DA),
            hoist: true,
        });

        let outcome = run(&store, &bp).await;
        assert_eq!(outcome.tally.updated, 2);
        let roles = store.role_list();
        let identity = roles.iter().find(|r| r.managed).unwrap();
        assert_eq!(identity.name, "[ Keystone ]");
        assert_eq!(identity.color, 0x7289DA);
        assert!(identity.hoist);
    }
}
