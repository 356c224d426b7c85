//! Slash commands and the operations behind them.
//!
//! All commands are registered with `default_member_permissions` set to
//! Administrator, and the invoker's permissions are checked again on receipt.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use keystone_common::config::AppConfig;
use keystone_common::error::{KeystoneError, KeystoneResult};
use keystone_common::models::StructureDocument;
use keystone_common::permissions::Permissions;
use keystone_provision::document::{capture_path, load_document, save_document};
use keystone_provision::{CaptureMode, Orchestrator, RemoteSnapshot, RunReport, ServerStore};
use keystone_sdk::builders::SlashCommandBuilder;
use keystone_sdk::{Embed, Interaction, PlatformClient, RestClient};
use serde_json::Value;

use crate::summary;

pub const SETUP_SERVER: &str = "setup-server";
pub const UPDATE_LOCAL_STRUCTURE: &str = "update-local-structure";
pub const SAVE_STRUCTURE: &str = "save-structure";

/// Everything a command handler needs, shared across invocations.
pub struct BotState {
    pub config: AppConfig,
    pub rest: RestClient,
    pub orchestrator: Orchestrator,
}

// ── Operations ────────────────────────────────────────────────────────────────

/// Run the orchestrator on `server_id` with the document at `structure`.
pub async fn provision(
    rest: &RestClient,
    orchestrator: &Orchestrator,
    server_id: &str,
    structure: &Path,
) -> KeystoneResult<RunReport> {
    let document = load_document(structure)?;
    let store = ServerStore::new(rest.clone(), server_id);
    orchestrator.run(&store, &document).await
}

/// Snapshot `server_id` and write it to `out`.
pub async fn capture(
    rest: &RestClient,
    server_id: &str,
    mode: CaptureMode,
    out: &Path,
) -> KeystoneResult<StructureDocument> {
    let store = ServerStore::new(rest.clone(), server_id);
    let snapshot = RemoteSnapshot::take(&store)
        .await
        .map_err(|e| KeystoneError::from_lookup(format!("Server {server_id}"), e))?;
    let document = snapshot.capture_document(mode);
    save_document(out, &document)?;
    Ok(document)
}

// ── Registration ──────────────────────────────────────────────────────────────

pub fn definitions() -> Vec<Value> {
    let admin = Permissions::ADMINISTRATOR.bits();
    vec![
        SlashCommandBuilder::new()
            .name(SETUP_SERVER)
            .description("Recreate roles and sync channels from the local structure copy")
            .default_member_permissions(admin)
            .dm_permission(false)
            .build(),
        SlashCommandBuilder::new()
            .name(UPDATE_LOCAL_STRUCTURE)
            .description("Capture the reference server's channels into the local structure copy")
            .default_member_permissions(admin)
            .dm_permission(false)
            .build(),
        SlashCommandBuilder::new()
            .name(SAVE_STRUCTURE)
            .description("Save any server's channel layout to a file")
            .default_member_permissions(admin)
            .dm_permission(false)
            .string_option(|o| o.name("server_id").description("Server to capture").required().max_length(20))
            .build(),
    ]
}

pub fn register(client: &mut PlatformClient, state: Arc<BotState>) {
    for definition in definitions() {
        let name = definition["name"].as_str().unwrap_or_default().to_owned();
        let state = Arc::clone(&state);
        client.command(definition, move |interaction| {
            let state = Arc::clone(&state);
            let name = name.clone();
            Box::pin(async move {
                match name.as_str() {
                    SETUP_SERVER => setup_server(&state, interaction).await,
                    UPDATE_LOCAL_STRUCTURE => update_local_structure(&state, interaction).await,
                    SAVE_STRUCTURE => save_structure(&state, interaction).await,
                    _ => {}
                }
            })
        });
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────────

fn is_admin(interaction: &Interaction) -> bool {
    Permissions::from_bits_truncate(interaction.invoker_permissions()).is_admin()
}

/// Reject non-administrators and acknowledge the command ephemerally.
async fn admit(rest: &RestClient, interaction: &Interaction) -> bool {
    if !is_admin(interaction) {
        if let Err(e) = rest
            .reply(interaction, Some("You need the Administrator permission to use this command."), None, true)
            .await
        {
            tracing::warn!(error = %e, "Failed to reply to interaction");
        }
        return false;
    }
    if let Err(e) = rest.defer_reply(interaction, true).await {
        tracing::warn!(error = %e, "Failed to acknowledge interaction");
        return false;
    }
    true
}

async fn say(rest: &RestClient, interaction: &Interaction, content: &str, embeds: Option<&[Embed]>) {
    if let Err(e) = rest.followup(interaction, Some(content), embeds, true).await {
        tracing::warn!(error = %e, "Failed to send follow-up");
    }
}

async fn setup_server(state: &BotState, interaction: Interaction) {
    let rest = &state.rest;
    let Some(server_id) = interaction.guild_id.clone() else {
        if let Err(e) = rest.reply(&interaction, Some("This command must be run in a server."), None, true).await {
            tracing::warn!(error = %e, "Failed to reply to interaction");
        }
        return;
    };
    if !admit(rest, &interaction).await {
        return;
    }

    let structure = PathBuf::from(&state.config.provisioning.structure_path);
    let report = match provision(rest, &state.orchestrator, &server_id, &structure).await {
        Ok(report) => report,
        Err(KeystoneError::NotFound { resource }) if !structure.exists() => {
            let hint = format!("{resource} not found. Run `/{UPDATE_LOCAL_STRUCTURE}` first.");
            say(rest, &interaction, &hint, None).await;
            return;
        }
        Err(e) => {
            say(rest, &interaction, &e.user_message(), None).await;
            return;
        }
    };

    let embed = summary::render(&report);
    deliver_report(rest, &interaction, embed).await;
}

/// DM the report to the invoker, falling back to an ephemeral follow-up when
/// their DMs are closed.
async fn deliver_report(rest: &RestClient, interaction: &Interaction, embed: Embed) {
    let embeds = [embed];
    let Some(user) = interaction.invoker() else {
        say(rest, interaction, "Sync finished.", Some(&embeds)).await;
        return;
    };

    let sent = match rest.create_dm(&user.id).await {
        Ok(dm) => rest.create_message(&dm.id, None, Some(&embeds)).await.map(drop),
        Err(e) => Err(e),
    };
    match sent {
        Ok(()) => say(rest, interaction, "The sync report was sent to your direct messages.", None).await,
        Err(e) if e.is_forbidden() => {
            say(
                rest,
                interaction,
                "Could not send you a direct message. Check your privacy settings. Here is the report:",
                Some(&embeds),
            )
            .await;
        }
        Err(e) => tracing::warn!(user_id = %user.id, error = %e, "Failed to deliver sync report"),
    }
}

async fn update_local_structure(state: &BotState, interaction: Interaction) {
    let rest = &state.rest;
    if !admit(rest, &interaction).await {
        return;
    }
    let Some(reference) = state.config.provisioning.reference_server_id.as_deref() else {
        say(rest, &interaction, "No reference server is configured.", None).await;
        return;
    };

    let out = PathBuf::from(&state.config.provisioning.structure_path);
    match capture(rest, reference, CaptureMode::Full, &out).await {
        Ok(_) => {
            let msg = format!("Channel structure saved to `{}`.", out.display());
            say(rest, &interaction, &msg, None).await;
        }
        Err(e) => {
            let msg = format!("Could not save the structure: {}", e.user_message());
            say(rest, &interaction, &msg, None).await;
        }
    }
}

async fn save_structure(state: &BotState, interaction: Interaction) {
    let rest = &state.rest;
    if !admit(rest, &interaction).await {
        return;
    }
    let Some(server_id) = interaction.option("server_id").and_then(Value::as_str).map(str::to_owned) else {
        say(rest, &interaction, "Missing `server_id`.", None).await;
        return;
    };
    if server_id.is_empty() || !server_id.bytes().all(|b| b.is_ascii_digit()) {
        say(rest, &interaction, "`server_id` must be a numeric id.", None).await;
        return;
    }

    let out = capture_path(&server_id);
    let msg = match capture(rest, &server_id, CaptureMode::Legacy, &out).await {
        Ok(_) => format!("Server structure saved to `{}`.", out.display()),
        Err(KeystoneError::NotFound { .. }) => {
            format!("Server {server_id} not found. Make sure the bot is a member of it.")
        }
        Err(e) => format!("Could not save the structure: {}", e.user_message()),
    };
    say(rest, &interaction, &msg, None).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn interaction(permissions: Option<&str>) -> Interaction {
        serde_json::from_value(json!({
            "id": "1",
            "application_id": "2",
            "type": 2,
            "token": "t",
            "guild_id": "3",
            "data": { "name": SAVE_STRUCTURE, "options": [{ "name": "server_id", "type": 3, "value": "99" }] },
            "member": {
                "user": { "id": "4", "username": "ops" },
                "roles": [],
                "permissions": permissions,
            },
        }))
        .unwrap()
    }

    #[test]
    fn every_command_is_admin_gated() {
        let defs = definitions();
        assert_eq!(defs.len(), 3);
        for def in &defs {
            assert_eq!(def["default_member_permissions"], "8");
        }
        let save = defs.iter().find(|d| d["name"] == SAVE_STRUCTURE).unwrap();
        assert_eq!(save["options"][0]["name"], "server_id");
        assert_eq!(save["options"][0]["required"], true);
    }

    #[test]
    fn admin_check_reads_member_permissions() {
        assert!(is_admin(&interaction(Some("8"))));
        assert!(is_admin(&interaction(Some("2147483656"))));
        assert!(!is_admin(&interaction(Some("2048"))));
        assert!(!is_admin(&interaction(None)));
    }
}
