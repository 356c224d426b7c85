//! In-memory [`RemoteStore`] with the platform's position bookkeeping.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use keystone_sdk::{
    Channel, ChannelType, CreateChannel, CreateRole, EditRole, PlatformError, Position, Result,
    Role,
};

use crate::store::RemoteStore;

#[derive(Default)]
struct State {
    next_id: u64,
    roles: Vec<Role>,
    channels: Vec<Channel>,
    failing: HashSet<String>,
    undeletable: HashSet<String>,
    missing: bool,
    mutations: Vec<String>,
}

impl State {
    fn id(&mut self) -> String {
        self.next_id += 1;
        (1000 + self.next_id).to_string()
    }

    fn check(&self, name: &str) -> Result<()> {
        if self.failing.contains(name) {
            return Err(PlatformError::Api { status: 403, message: "Missing Permissions".into() });
        }
        Ok(())
    }

    fn role_name(&self, id: &str) -> Result<String> {
        self.roles
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.name.clone())
            .ok_or_else(|| PlatformError::Api { status: 404, message: "Unknown Role".into() })
    }

    fn channel_name(&self, id: &str) -> Result<String> {
        self.channels
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.clone())
            .ok_or_else(|| PlatformError::Api { status: 404, message: "Unknown Channel".into() })
    }
}

pub struct MemoryStore {
    server_id: String,
    account: String,
    state: Mutex<State>,
}

impl MemoryStore {
    /// An empty server holding only the everyone role and the account's
    /// integration role.
    pub fn new(server_id: &str) -> Self {
        let store = Self {
            server_id: server_id.to_owned(),
            account: "keystone".to_owned(),
            state: Mutex::new(State::default()),
        };
        {
            let mut state = store.lock();
            state.roles.push(role(server_id, "@everyone", 0, false));
            let id = state.id();
            state.roles.push(role(&id, "keystone", 1, true));
        }
        store
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Every mutation touching `name` fails with 403.
    pub fn fail_on(&self, name: &str) {
        self.lock().failing.insert(name.to_owned());
    }

    /// Deleting the role with `role_id` fails with 403, as for a role above
    /// the account's own.
    pub fn protect_role(&self, role_id: &str) {
        self.lock().undeletable.insert(role_id.to_owned());
    }

    /// Listing calls answer 404, as for a server the account is not in.
    pub fn set_missing(&self) {
        self.lock().missing = true;
    }

    pub fn seed_role(&self, name: &str) -> String {
        let mut state = self.lock();
        let id = state.id();
        for r in state.roles.iter_mut().filter(|r| r.position >= 1) {
            r.position += 1;
        }
        state.roles.push(role(&id, name, 1, false));
        id
    }

    pub fn seed_category(&self, name: &str) -> String {
        self.seed(name, ChannelType::CATEGORY, None)
    }

    pub fn seed_channel(&self, name: &str, kind: ChannelType, parent: Option<&str>) -> String {
        self.seed(name, kind, parent)
    }

    fn seed(&self, name: &str, kind: ChannelType, parent: Option<&str>) -> String {
        let mut state = self.lock();
        let id = state.id();
        let channel = new_channel(&state, id.clone(), name, kind, parent.map(str::to_owned));
        state.channels.push(channel);
        id
    }

    /// Names of mutations performed so far, as `op:name`.
    pub fn mutations(&self) -> Vec<String> {
        self.lock().mutations.clone()
    }

    pub fn clear_mutations(&self) {
        self.lock().mutations.clear();
    }

    pub fn role_list(&self) -> Vec<Role> {
        self.lock().roles.clone()
    }

    pub fn channel_list(&self) -> Vec<Channel> {
        self.lock().channels.clone()
    }

    pub fn role_position(&self, name: &str) -> Option<i32> {
        self.lock().roles.iter().find(|r| r.name == name).map(|r| r.position)
    }

    pub fn channel(&self, name: &str) -> Option<Channel> {
        self.lock().channels.iter().find(|c| c.name == name).cloned()
    }

    /// Category names ordered by position.
    pub fn category_order(&self) -> Vec<String> {
        let mut cats: Vec<_> =
            self.lock().channels.iter().filter(|c| c.is_category()).cloned().collect();
        cats.sort_by_key(|c| c.position);
        cats.into_iter().map(|c| c.name).collect()
    }

    /// Channel names under `parent`, ordered by position.
    pub fn children(&self, parent: &str) -> Vec<String> {
        let mut kids: Vec<_> = self
            .lock()
            .channels
            .iter()
            .filter(|c| c.parent_id.as_deref() == Some(parent))
            .cloned()
            .collect();
        kids.sort_by_key(|c| c.position);
        kids.into_iter().map(|c| c.name).collect()
    }
}

fn role(id: &str, name: &str, position: i32, managed: bool) -> Role {
    Role {
        id: id.to_owned(),
        name: name.to_owned(),
        color: 0,
        hoist: false,
        position,
        permissions: 0,
        managed,
        mentionable: false,
    }
}

/// Creation appends after the existing siblings.
fn new_channel(
    state: &State,
    id: String,
    name: &str,
    kind: ChannelType,
    parent_id: Option<String>,
) -> Channel {
    let category = kind == ChannelType::CATEGORY;
    let siblings = state
        .channels
        .iter()
        .filter(|c| c.is_category() == category && (category || c.parent_id == parent_id))
        .count();
    Channel {
        id,
        kind,
        name: name.to_owned(),
        position: siblings as i32,
        parent_id,
        permission_overwrites: Vec::new(),
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    fn server_id(&self) -> &str {
        &self.server_id
    }

    async fn account_name(&self) -> Result<String> {
        Ok(self.account.clone())
    }

    async fn roles(&self) -> Result<Vec<Role>> {
        let state = self.lock();
        if state.missing {
            return Err(PlatformError::Api { status: 404, message: "Unknown Guild".into() });
        }
        Ok(state.roles.clone())
    }

    async fn create_role(&self, spec: &CreateRole) -> Result<Role> {
        let mut state = self.lock();
        state.check(&spec.name)?;
        let id = state.id();
        for r in state.roles.iter_mut().filter(|r| r.position >= 1) {
            r.position += 1;
        }
        let mut created = role(&id, &spec.name, 1, false);
        created.permissions = spec.permissions;
        created.color = spec.color.unwrap_or(0);
        created.hoist = spec.hoist;
        created.mentionable = spec.mentionable;
        state.roles.push(created.clone());
        state.mutations.push(format!("create_role:{}", spec.name));
        Ok(created)
    }

    async fn edit_role(&self, role_id: &str, edit: &EditRole) -> Result<Role> {
        let mut state = self.lock();
        let name = state.role_name(role_id)?;
        state.check(&name)?;
        state.mutations.push(format!("edit_role:{name}"));
        let Some(target) = state.roles.iter_mut().find(|r| r.id == role_id) else {
            return Err(PlatformError::Api { status: 404, message: "Unknown Role".into() });
        };
        if let Some(name) = &edit.name {
            target.name = name.clone();
        }
        if let Some(color) = edit.color {
            target.color = color;
        }
        if let Some(hoist) = edit.hoist {
            target.hoist = hoist;
        }
        if let Some(mentionable) = edit.mentionable {
            target.mentionable = mentionable;
        }
        Ok(target.clone())
    }

    async fn delete_role(&self, role_id: &str) -> Result<()> {
        let mut state = self.lock();
        let name = state.role_name(role_id)?;
        state.check(&name)?;
        if state.undeletable.contains(role_id) {
            return Err(PlatformError::Api { status: 403, message: "Missing Permissions".into() });
        }
        let Some(idx) = state.roles.iter().position(|r| r.id == role_id) else {
            return Ok(());
        };
        let removed = state.roles.remove(idx);
        for r in state.roles.iter_mut().filter(|r| r.position > removed.position) {
            r.position -= 1;
        }
        state.mutations.push(format!("delete_role:{name}"));
        Ok(())
    }

    async fn reorder_roles(&self, positions: &[Position]) -> Result<()> {
        let mut state = self.lock();
        for p in positions {
            let name = state.role_name(&p.id)?;
            state.check(&name)?;
        }
        for p in positions {
            if let Some(r) = state.roles.iter_mut().find(|r| r.id == p.id) {
                r.position = p.position;
            }
        }
        state.mutations.push(format!("reorder_roles:{}", positions.len()));
        Ok(())
    }

    async fn channels(&self) -> Result<Vec<Channel>> {
        let state = self.lock();
        if state.missing {
            return Err(PlatformError::Api { status: 404, message: "Unknown Guild".into() });
        }
        Ok(state.channels.clone())
    }

    async fn create_channel(&self, spec: &CreateChannel) -> Result<Channel> {
        let mut state = self.lock();
        state.check(&spec.name)?;
        let id = state.id();
        let mut channel = new_channel(&state, id, &spec.name, spec.kind, spec.parent_id.clone());
        channel.permission_overwrites = spec.permission_overwrites.clone();
        state.channels.push(channel.clone());
        state.mutations.push(format!("create_channel:{}", spec.name));
        Ok(channel)
    }

    async fn delete_channel(&self, channel: &Channel) -> Result<()> {
        let channel_id = channel.id.as_str();
        let mut state = self.lock();
        let name = state.channel_name(channel_id)?;
        state.check(&name)?;
        state.channels.retain(|c| c.id != channel_id);
        for child in state.channels.iter_mut() {
            if child.parent_id.as_deref() == Some(channel_id) {
                child.parent_id = None;
            }
        }
        state.mutations.push(format!("delete_channel:{name}"));
        Ok(())
    }

    async fn reorder_channels(&self, positions: &[Position]) -> Result<()> {
        let mut state = self.lock();
        for p in positions {
            let name = state.channel_name(&p.id)?;
            state.check(&name)?;
        }
        for p in positions {
            if let Some(c) = state.channels.iter_mut().find(|c| c.id == p.id) {
                c.position = p.position;
            }
        }
        state.mutations.push(format!("reorder_channels:{}", positions.len()));
        Ok(())
    }

    async fn move_channel(&self, channel_id: &str, position: i32) -> Result<()> {
        let mut state = self.lock();
        let name = state.channel_name(channel_id)?;
        state.check(&name)?;
        if let Some(c) = state.channels.iter_mut().find(|c| c.id == channel_id) {
            c.position = position;
        }
        state.mutations.push(format!("move_channel:{name}"));
        Ok(())
    }
}
