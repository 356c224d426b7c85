//! The remote object store seam.
//!
//! The engine only sees a server as a CRUD store of roles and channels. The
//! production implementation forwards to the platform REST API; tests use an
//! in-memory store with the same position semantics.

use async_trait::async_trait;
use keystone_sdk::{
    Channel, CreateChannel, CreateRole, EditRole, Position, RestClient, Result, Role,
};
use serde_json::json;

/// CRUD access to one server's roles and channels.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    fn server_id(&self) -> &str;

    /// Display name of the automation account, as its integration role is named.
    async fn account_name(&self) -> Result<String>;

    async fn roles(&self) -> Result<Vec<Role>>;
    async fn create_role(&self, role: &CreateRole) -> Result<Role>;
    async fn edit_role(&self, role_id: &str, edit: &EditRole) -> Result<Role>;
    async fn delete_role(&self, role_id: &str) -> Result<()>;
    /// Apply all hierarchy positions in one call.
    async fn reorder_roles(&self, positions: &[Position]) -> Result<()>;

    /// All channels, categories included.
    async fn channels(&self) -> Result<Vec<Channel>>;
    async fn create_channel(&self, channel: &CreateChannel) -> Result<Channel>;
    async fn delete_channel(&self, channel: &Channel) -> Result<()>;
    /// Apply several channel positions in one call.
    async fn reorder_channels(&self, positions: &[Position]) -> Result<()>;
    /// Move a single channel within its category.
    async fn move_channel(&self, channel_id: &str, position: i32) -> Result<()>;
}

/// Audit-log reasons attached to every mutation.
pub mod reason {
    use keystone_sdk::ChannelType;

    pub const ROLE_RECREATE: &str = "Sync: full role recreation";
    pub const ROLE_CREATE: &str = "Sync: role creation";
    pub const ROLE_HIERARCHY: &str = "Sync: role hierarchy";
    pub const IDENTITY: &str = "Sync: bot role setup";
    pub const CATEGORY_CREATE: &str = "Sync: category creation";
    pub const CATEGORY_DELETE: &str = "Sync: removing extra category";
    pub const CHANNEL_DELETE: &str = "Sync: removing extra channel";
    pub const CHANNEL_CREATE: &str = "Sync: channel creation";
    pub const CHANNEL_SORT: &str = "Sync: channel ordering";

    pub fn create(kind: ChannelType) -> &'static str {
        if kind == ChannelType::CATEGORY { CATEGORY_CREATE } else { CHANNEL_CREATE }
    }

    pub fn delete(kind: ChannelType) -> &'static str {
        if kind == ChannelType::CATEGORY { CATEGORY_DELETE } else { CHANNEL_DELETE }
    }
}

/// [`RemoteStore`] backed by the platform REST API for one server.
#[derive(Clone)]
pub struct ServerStore {
    rest: RestClient,
    server_id: String,
}

impl ServerStore {
    pub fn new(rest: RestClient, server_id: impl Into<String>) -> Self {
        Self { rest, server_id: server_id.into() }
    }
}

#[async_trait]
impl RemoteStore for ServerStore {
    fn server_id(&self) -> &str {
        &self.server_id
    }

    async fn account_name(&self) -> Result<String> {
        Ok(self.rest.current_user().await?.username)
    }

    async fn roles(&self) -> Result<Vec<Role>> {
        self.rest.list_roles(&self.server_id).await
    }

    async fn create_role(&self, role: &CreateRole) -> Result<Role> {
        self.rest.create_role(&self.server_id, role, Some(reason::ROLE_CREATE)).await
    }

    async fn edit_role(&self, role_id: &str, edit: &EditRole) -> Result<Role> {
        self.rest.modify_role(&self.server_id, role_id, edit, Some(reason::IDENTITY)).await
    }

    async fn delete_role(&self, role_id: &str) -> Result<()> {
        self.rest.delete_role(&self.server_id, role_id, Some(reason::ROLE_RECREATE)).await
    }

    async fn reorder_roles(&self, positions: &[Position]) -> Result<()> {
        self.rest
            .modify_role_positions(&self.server_id, positions, Some(reason::ROLE_HIERARCHY))
            .await
            .map(drop)
    }

    async fn channels(&self) -> Result<Vec<Channel>> {
        self.rest.list_channels(&self.server_id).await
    }

    async fn create_channel(&self, channel: &CreateChannel) -> Result<Channel> {
        let why = reason::create(channel.kind);
        self.rest.create_channel(&self.server_id, channel, Some(why)).await
    }

    async fn delete_channel(&self, channel: &Channel) -> Result<()> {
        self.rest.delete_channel(&channel.id, Some(reason::delete(channel.kind))).await
    }

    async fn reorder_channels(&self, positions: &[Position]) -> Result<()> {
        self.rest
            .modify_channel_positions(&self.server_id, positions, Some(reason::CHANNEL_SORT))
            .await
    }

    async fn move_channel(&self, channel_id: &str, position: i32) -> Result<()> {
        self.rest
            .modify_channel(channel_id, &json!({ "position": position }), Some(reason::CHANNEL_SORT))
            .await
            .map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::reason;
    use keystone_sdk::ChannelType;

    #[test]
    fn audit_reason_follows_channel_kind() {
        assert_eq!(reason::delete(ChannelType::CATEGORY), reason::CATEGORY_DELETE);
        assert_eq!(reason::delete(ChannelType::VOICE), reason::CHANNEL_DELETE);
        assert_eq!(reason::create(ChannelType::CATEGORY), reason::CATEGORY_CREATE);
        assert_eq!(reason::create(ChannelType::TEXT), reason::CHANNEL_CREATE);
    }
}
