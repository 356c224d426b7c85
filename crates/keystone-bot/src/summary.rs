//! Rendering a run report as a message embed.

use keystone_provision::RunReport;
use keystone_sdk::Embed;
use keystone_sdk::builders::EmbedBuilder;

const GREEN: u32 = 0x2ECC71;
const ORANGE: u32 = 0xE67E22;

pub fn render(report: &RunReport) -> Embed {
    let roles = format!(
        "Created: **{}**, Updated: **{}**, Deleted: **{}**",
        report.roles.created, report.roles.updated, report.roles.deleted
    );
    let channels = format!(
        "Categories created/deleted: **{}/{}**\nChannels created/deleted: **{}/{}**",
        report.categories.created,
        report.categories.deleted,
        report.channels.created,
        report.channels.deleted
    );

    let mut embed = EmbedBuilder::new()
        .title("Server sync complete")
        .field("Roles", roles, false)
        .field("Channels", channels, false)
        .footer(format!("Server {}", report.server_id))
        .timestamp(report.finished_at.to_rfc3339());

    let errors = report.total_errors();
    embed = if errors == 0 {
        embed.color(GREEN)
    } else {
        embed
            .field(
                "Errors",
                format!("**{errors}** operations failed during the run. Check the bot log."),
                false,
            )
            .color(ORANGE)
    };
    embed.build()
}
