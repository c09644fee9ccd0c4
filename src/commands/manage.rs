use tracing::info;

use crate::state::Context;

/// Unload every file (admin only)
#[poise::command(slash_command, guild_only)]
pub async fn clear(ctx: Context<'_>) -> Result<(), anyhow::Error> {
    if !ctx.data().is_admin(ctx.author().id.get()) {
        ctx.say("This command is admin-only.").await?;
        return Ok(());
    }

    let removed = ctx.data().corpus.clear().await;
    info!(user = ctx.author().name, removed, "corpus cleared");
    ctx.say(format!("Unloaded {} file(s).", removed)).await?;
    Ok(())
}
