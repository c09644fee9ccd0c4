use crate::state::Context;

/// Configure answer style (admin only)
#[poise::command(slash_command, guild_only)]
pub async fn config(
    ctx: Context<'_>,
    #[description = "word_limit | line_breaks"] param: Option<String>,
    #[description = "New value (line_breaks: 0 or 1)"] value: Option<u32>,
) -> Result<(), anyhow::Error> {
    let user_id = ctx.author().id.get();
    if !ctx.data().is_admin(user_id) {
        ctx.say("This command is admin-only.").await?;
        return Ok(());
    }

    match (param.as_deref(), value) {
        // Show current config
        (None, _) => {
            let config = ctx.data().ask_config.read().await;
            ctx.say(format!(
                "**Answer Configuration:**\n\
                 `word_limit`: {}\n\
                 `line_breaks`: {}",
                config.word_limit, config.line_breaks
            ))
            .await?;
        }
        // Set a parameter
        (Some(key), Some(val)) => {
            let mut config = ctx.data().ask_config.write().await;
            match key {
                "word_limit" if val == 0 => {
                    ctx.say("`word_limit` must be at least 1").await?;
                }
                "word_limit" => {
                    config.word_limit = val;
                    ctx.say(format!("`word_limit` set to {}", val)).await?;
                }
                "line_breaks" => {
                    config.line_breaks = val != 0;
                    ctx.say(format!("`line_breaks` set to {}", config.line_breaks))
                        .await?;
                }
                _ => {
                    ctx.say(format!(
                        "Unknown param `{}`. Valid: `word_limit`, `line_breaks`",
                        key
                    ))
                    .await?;
                }
            }
        }
        (Some(_), None) => {
            ctx.say("Provide both `param` and `value`. Example: `/sage config word_limit 150`")
                .await?;
        }
    }

    Ok(())
}
