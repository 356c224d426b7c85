//! Async REST client for the platform's management API.

use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::error::{PlatformError, Result};
use crate::types::{
    Channel, CreateChannel, CreateRole, EditRole, Embed, Position, Role, User,
};

const DEFAULT_BASE: &str = "https://discord.com/api/v10";
const AUDIT_REASON_HEADER: &str = "X-Audit-Log-Reason";

/// Async platform REST client.
///
/// ```rust,no_run
/// use keystone_sdk::rest::RestClient;
///
/// #[tokio::main]
/// async fn main() -> keystone_sdk::Result<()> {
///     let rest = RestClient::new("Bot mytoken", None)?;
///     let roles = rest.list_roles("1369754088941682830").await?;
///     println!("{roles:?}");
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct RestClient {
    client: Client,
    base_url: String,
}

impl RestClient {
    pub fn new(token: impl Into<String>, base_url: Option<&str>) -> Result<Self> {
        let token = {
            let t = token.into();
            if t.starts_with("Bot ") { t } else { format!("Bot {t}") }
        };
        let client = Client::builder()
            .default_headers({
                let mut h = reqwest::header::HeaderMap::new();
                h.insert(
                    reqwest::header::AUTHORIZATION,
                    reqwest::header::HeaderValue::from_str(&token)
                        .map_err(|e| PlatformError::Other(e.to_string()))?,
                );
                h.insert(
                    reqwest::header::CONTENT_TYPE,
                    reqwest::header::HeaderValue::from_static("application/json"),
                );
                h
            })
            .build()
            .map_err(PlatformError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.unwrap_or(DEFAULT_BASE).trim_end_matches('/').to_owned(),
        })
    }

    // ── Internal ──────────────────────────────────────────────────────────────

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        reason: Option<&str>,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.client.request(method, &url);
        if let Some(b) = body {
            req = req.json(b);
        }
        if let Some(r) = reason {
            req = req.header(AUDIT_REASON_HEADER, encode_reason(r));
        }
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let msg = resp
                .json::<Value>()
                .await
                .ok()
                .and_then(|v| v.get("message").and_then(|e| e.as_str()).map(str::to_owned))
                .unwrap_or_else(|| status.to_string());
            return Err(PlatformError::Api { status: status.as_u16(), message: msg });
        }
        if status == StatusCode::NO_CONTENT {
            return serde_json::from_value(Value::Null).map_err(PlatformError::Json);
        }
        Ok(resp.json::<T>().await?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(Method::GET, path, None, None).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: &Value, reason: Option<&str>) -> Result<T> {
        self.request(Method::POST, path, Some(body), reason).await
    }

    async fn patch<T: DeserializeOwned>(&self, path: &str, body: &Value, reason: Option<&str>) -> Result<T> {
        self.request(Method::PATCH, path, Some(body), reason).await
    }

    async fn put<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T> {
        self.request(Method::PUT, path, Some(body), None).await
    }

    async fn delete(&self, path: &str, reason: Option<&str>) -> Result<()> {
        self.request::<Value>(Method::DELETE, path, None, reason).await.map(drop)
    }

    // ── Users ─────────────────────────────────────────────────────────────────

    pub async fn current_user(&self) -> Result<User> {
        self.get("/users/@me").await
    }

    // ── Roles ─────────────────────────────────────────────────────────────────

    pub async fn list_roles(&self, server_id: &str) -> Result<Vec<Role>> {
        self.get(&format!("/guilds/{server_id}/roles")).await
    }

    pub async fn create_role(&self, server_id: &str, role: &CreateRole, reason: Option<&str>) -> Result<Role> {
        self.post(&format!("/guilds/{server_id}/roles"), &to_body(role)?, reason).await
    }

    pub async fn modify_role(
        &self,
        server_id: &str,
        role_id: &str,
        edit: &EditRole,
        reason: Option<&str>,
    ) -> Result<Role> {
        self.patch(&format!("/guilds/{server_id}/roles/{role_id}"), &to_body(edit)?, reason).await
    }

    pub async fn modify_role_positions(
        &self,
        server_id: &str,
        positions: &[Position],
        reason: Option<&str>,
    ) -> Result<Vec<Role>> {
        self.patch(&format!("/guilds/{server_id}/roles"), &to_body(positions)?, reason).await
    }

    pub async fn delete_role(&self, server_id: &str, role_id: &str, reason: Option<&str>) -> Result<()> {
        self.delete(&format!("/guilds/{server_id}/roles/{role_id}"), reason).await
    }

    // ── Channels ──────────────────────────────────────────────────────────────

    pub async fn list_channels(&self, server_id: &str) -> Result<Vec<Channel>> {
        self.get(&format!("/guilds/{server_id}/channels")).await
    }

    pub async fn create_channel(
        &self,
        server_id: &str,
        channel: &CreateChannel,
        reason: Option<&str>,
    ) -> Result<Channel> {
        self.post(&format!("/guilds/{server_id}/channels"), &to_body(channel)?, reason).await
    }

    pub async fn modify_channel(&self, channel_id: &str, fields: &Value, reason: Option<&str>) -> Result<Channel> {
        self.patch(&format!("/channels/{channel_id}"), fields, reason).await
    }

    pub async fn modify_channel_positions(
        &self,
        server_id: &str,
        positions: &[Position],
        reason: Option<&str>,
    ) -> Result<()> {
        self.patch::<Value>(&format!("/guilds/{server_id}/channels"), &to_body(positions)?, reason)
            .await
            .map(drop)
    }

    pub async fn delete_channel(&self, channel_id: &str, reason: Option<&str>) -> Result<()> {
        self.delete(&format!("/channels/{channel_id}"), reason).await
    }

    // ── Messages ──────────────────────────────────────────────────────────────

    /// Open (or fetch) the DM channel with a user.
    pub async fn create_dm(&self, user_id: &str) -> Result<Channel> {
        self.post("/users/@me/channels", &json!({ "recipient_id": user_id }), None).await
    }

    pub async fn create_message(
        &self,
        channel_id: &str,
        content: Option<&str>,
        embeds: Option<&[Embed]>,
    ) -> Result<Value> {
        let mut body = json!({});
        if let Some(c) = content { body["content"] = json!(c); }
        if let Some(e) = embeds { body["embeds"] = serde_json::to_value(e)?; }
        self.post(&format!("/channels/{channel_id}/messages"), &body, None).await
    }

    // ── Global commands ───────────────────────────────────────────────────────

    pub async fn bulk_overwrite_global_commands(&self, app_id: &str, commands: &[Value]) -> Result<Vec<Value>> {
        self.put(&format!("/applications/{app_id}/commands"), &json!(commands)).await
    }

    // ── Interactions ──────────────────────────────────────────────────────────

    pub async fn create_interaction_response(
        &self,
        interaction_id: &str,
        interaction_token: &str,
        response_type: u8,
        data: Option<&Value>,
    ) -> Result<()> {
        let mut body = json!({ "type": response_type });
        if let Some(d) = data {
            body["data"] = d.clone();
        }
        self.request::<Value>(
            Method::POST,
            &format!("/interactions/{interaction_id}/{interaction_token}/callback"),
            Some(&body),
            None,
        )
        .await
        .map(drop)
    }

    /// Send a follow-up message for an interaction that was already acknowledged.
    pub async fn create_followup(
        &self,
        app_id: &str,
        interaction_token: &str,
        content: Option<&str>,
        embeds: Option<&[Embed]>,
        ephemeral: bool,
    ) -> Result<()> {
        let mut body = json!({});
        if let Some(c) = content { body["content"] = json!(c); }
        if let Some(e) = embeds { body["embeds"] = serde_json::to_value(e)?; }
        if ephemeral { body["flags"] = json!(64); }
        self.post::<Value>(&format!("/webhooks/{app_id}/{interaction_token}"), &body, None)
            .await
            .map(drop)
    }
}

fn to_body<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(PlatformError::Json)
}

/// Audit-log reasons are sent percent-encoded so non-ASCII text survives the header.
fn encode_reason(reason: &str) -> String {
    url::form_urlencoded::byte_serialize(reason.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasons_are_percent_encoded() {
        assert_eq!(encode_reason("sync roles"), "sync%20roles");
        assert_eq!(encode_reason("a+b"), "a%2Bb");
        assert!(encode_reason("синхронизация").starts_with('%'));
    }

    #[test]
    fn base_url_drops_trailing_slash() {
        let rest = RestClient::new("abc", Some("http://localhost:3000/api/")).unwrap();
        assert_eq!(rest.base_url, "http://localhost:3000/api");
    }
}
