//! High-level `PlatformClient` combining REST + gateway with async command routing.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::Result;
use crate::gateway::{GatewayClient, GatewayEvent};
use crate::rest::RestClient;
use crate::types::{Embed, Interaction};

/// Async handler invoked for every matching slash-command interaction.
pub type CommandHandler = Arc<dyn Fn(Interaction) -> BoxFuture<'static, ()> + Send + Sync + 'static>;

/// Interaction callback types.
pub mod callback {
    pub const CHANNEL_MESSAGE: u8 = 4;
    pub const DEFERRED_CHANNEL_MESSAGE: u8 = 5;
}

const EPHEMERAL: u64 = 1 << 6;

/// The bot client: REST access plus a gateway that dispatches slash commands.
///
/// ```rust,no_run
/// use keystone_sdk::{PlatformClient, builders::SlashCommandBuilder};
///
/// #[tokio::main]
/// async fn main() -> keystone_sdk::Result<()> {
///     let mut client = PlatformClient::new("Bot mytoken", None, None)?;
///
///     client.command(
///         SlashCommandBuilder::new().name("ping").description("Pong!").build(),
///         |interaction| Box::pin(async move { println!("{}", interaction.id) }),
///     );
///
///     client.login("your-app-id").await
/// }
/// ```
pub struct PlatformClient {
    pub rest: RestClient,
    gateway: GatewayClient,
    commands: HashMap<String, (Value, CommandHandler)>,
}

impl PlatformClient {
    pub fn new(
        token: impl Into<String>,
        rest_url: Option<&str>,
        gateway_url: Option<&str>,
    ) -> Result<Self> {
        let token_str: String = token.into();
        let token_str = if token_str.starts_with("Bot ") {
            token_str
        } else {
            format!("Bot {token_str}")
        };
        Ok(Self {
            rest: RestClient::new(token_str.clone(), rest_url)?,
            gateway: GatewayClient::new(token_str, gateway_url),
            commands: HashMap::new(),
        })
    }

    /// Register a slash command and its handler. Call before [`login`](Self::login).
    pub fn command(
        &mut self,
        definition: Value,
        handler: impl Fn(Interaction) -> BoxFuture<'static, ()> + Send + Sync + 'static,
    ) -> &mut Self {
        let name = definition["name"]
            .as_str()
            .unwrap_or_default()
            .to_owned();
        self.commands.insert(name, (definition, Arc::new(handler)));
        self
    }

    /// Subscribe to raw gateway events.
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.gateway.subscribe()
    }

    /// Bulk-register all commands then start the gateway.
    ///
    /// Returns once the gateway task is running; the caller keeps the process alive.
    pub async fn login(self, app_id: &str) -> Result<()> {
        if !self.commands.is_empty() {
            let defs: Vec<Value> = self.commands.values().map(|(d, _)| d.clone()).collect();
            self.rest.bulk_overwrite_global_commands(app_id, &defs).await?;
        }

        let commands: Arc<HashMap<String, (Value, CommandHandler)>> = Arc::new(self.commands);
        let mut events = self.gateway.subscribe();
        let cmds = Arc::clone(&commands);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) if event.event.as_deref() == Some("INTERACTION_CREATE") => {
                        route_interaction(&cmds, event.data);
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Gateway: command router lagged, {n} events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        self.gateway.connect().await
    }
}

/// Reply helpers shared by command handlers.
impl RestClient {
    pub async fn reply(
        &self,
        interaction: &Interaction,
        content: Option<&str>,
        embeds: Option<&[Embed]>,
        ephemeral: bool,
    ) -> Result<()> {
        let mut data = serde_json::json!({});
        if let Some(c) = content { data["content"] = serde_json::json!(c); }
        if let Some(e) = embeds { data["embeds"] = serde_json::to_value(e)?; }
        if ephemeral { data["flags"] = serde_json::json!(EPHEMERAL); }
        self.create_interaction_response(&interaction.id, &interaction.token, callback::CHANNEL_MESSAGE, Some(&data))
            .await
    }

    pub async fn defer_reply(&self, interaction: &Interaction, ephemeral: bool) -> Result<()> {
        let data = ephemeral.then(|| serde_json::json!({ "flags": EPHEMERAL }));
        self.create_interaction_response(
            &interaction.id,
            &interaction.token,
            callback::DEFERRED_CHANNEL_MESSAGE,
            data.as_ref(),
        )
        .await
    }

    pub async fn followup(
        &self,
        interaction: &Interaction,
        content: Option<&str>,
        embeds: Option<&[Embed]>,
        ephemeral: bool,
    ) -> Result<()> {
        self.create_followup(&interaction.application_id, &interaction.token, content, embeds, ephemeral)
            .await
    }
}

fn route_interaction(commands: &HashMap<String, (Value, CommandHandler)>, data: Value) {
    let interaction: Interaction = match serde_json::from_value(data) {
        Ok(i) => i,
        Err(e) => {
            warn!("Gateway: dropping malformed interaction: {e}");
            return;
        }
    };

    let Some(name) = interaction.command_name().map(str::to_owned) else {
        return;
    };
    match commands.get(&name) {
        Some((_, handler)) => {
            let handler = Arc::clone(handler);
            tokio::spawn(async move { handler(interaction).await });
        }
        None => debug!(command = %name, "Gateway: no handler registered"),
    }
}
