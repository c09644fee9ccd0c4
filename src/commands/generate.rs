use tracing::{error, info};

use super::send_chunked;
use crate::qa::Generate;
use crate::state::Context;

/// Send text straight to the language model
#[poise::command(slash_command, guild_only)]
pub async fn generate(
    ctx: Context<'_>,
    #[description = "Prompt text"] text: String,
) -> Result<(), anyhow::Error> {
    ctx.defer().await?;

    info!(user = ctx.author().name, prompt_len = text.len(), "raw generation");

    match ctx.data().llm.generate(&text).await {
        Ok(output) => send_chunked(&ctx, &output).await,
        Err(e) => {
            error!(error = %e, "raw generation failed");
            ctx.say("Failed to generate a response.").await?;
            Ok(())
        }
    }
}
