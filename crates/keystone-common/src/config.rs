//! Application configuration loaded from environment variables and config files.
//!
//! Supports `.env` files for development and environment variables for production.
//! Config precedence: env vars > .env file > keystone.toml > defaults
//!
//! The loaded [`AppConfig`] is returned by value and passed down explicitly.

use serde::Deserialize;

/// Load the application configuration.
///
/// `file` overrides the default `keystone` config file stem.
pub fn init(file: Option<&str>) -> Result<AppConfig, config::ConfigError> {
    // Load .env file if present (development)
    let _ = dotenvy::dotenv();

    let cfg = config::Config::builder()
        // Defaults
        .set_default("platform.rest_url", "https://discord.com/api/v10")?
        .set_default("platform.gateway_url", "wss://gateway.discord.gg/?v=10&encoding=json")?
        .set_default("provisioning.structure_path", "main_server_structure.json")?
        .set_default("provisioning.blueprint_path", "blueprint.toml")?
        .set_default("pacing.role_settle_ms", 2000)?
        .set_default("pacing.role_step_ms", 300)?
        .set_default("pacing.category_settle_ms", 1000)?
        .set_default("pacing.channel_settle_ms", 1000)?
        .set_default("pacing.channel_step_ms", 200)?
        .set_default("pacing.creation_settle_ms", 2000)?
        .set_default("pacing.reposition_settle_ms", 1000)?
        // Optional config file
        .add_source(config::File::with_name(file.unwrap_or("keystone")).required(false))
        // Environment variables (KEYSTONE_BOT__TOKEN, KEYSTONE_PROVISIONING__STRUCTURE_PATH, etc.)
        .add_source(
            config::Environment::with_prefix("KEYSTONE")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    cfg.try_deserialize()
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub bot: BotConfig,
    pub platform: PlatformConfig,
    pub provisioning: ProvisioningConfig,
    pub pacing: PacingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BotConfig {
    /// Bot token, with or without the `Bot ` prefix.
    pub token: String,
    /// Application ID used to register slash commands.
    pub application_id: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PlatformConfig {
    pub rest_url: String,
    pub gateway_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProvisioningConfig {
    /// Where `update-local-structure` writes and `setup-server` reads the document.
    pub structure_path: String,
    pub blueprint_path: String,
    /// Server whose layout `update-local-structure` captures.
    #[serde(default)]
    pub reference_server_id: Option<String>,
}

/// Fixed delays around bulk mutations. The remote store's hierarchy and
/// position bookkeeping is only eventually consistent, and the delays keep the
/// run under the platform's rate limits.
#[derive(Debug, Deserialize, Clone)]
pub struct PacingConfig {
    /// After deleting managed roles.
    pub role_settle_ms: u64,
    /// After each role creation.
    pub role_step_ms: u64,
    /// After category deletion and creation.
    pub category_settle_ms: u64,
    /// After channel deletion.
    pub channel_settle_ms: u64,
    /// After each channel creation.
    pub channel_step_ms: u64,
    /// After the channel creation phase.
    pub creation_settle_ms: u64,
    /// After the category reorder batch.
    pub reposition_settle_ms: u64,
}
