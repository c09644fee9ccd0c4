use std::error::Error as _;

use tracing::{error, info, warn};

use super::{drive_and_folder, send_chunked};
use crate::docs::ingest::ingest_batch;
use crate::error::AskError;
use crate::state::Context;

/// Ask a question about the loaded files
#[poise::command(slash_command, guild_only)]
pub async fn ask(
    ctx: Context<'_>,
    #[description = "Your question"] question: String,
    #[description = "Reload this Drive folder before answering"] folder: Option<String>,
) -> Result<(), anyhow::Error> {
    ctx.defer().await?;
    let data = ctx.data();

    if folder.is_some() {
        let Some((drive, folder)) = drive_and_folder(&ctx, folder).await? else {
            return Ok(());
        };
        match ingest_batch(&data.corpus, &*drive, &folder).await {
            Ok(report) => info!(
                folder,
                loaded = report.datasets.len(),
                failed = report.failures.len(),
                "corpus reloaded for question"
            ),
            Err(e) => {
                warn!(folder, error = %e, "folder reload failed");
                ctx.say(format!("Could not reload folder `{}`: {}", folder, e))
                    .await?;
                return Ok(());
            }
        }
    }

    // Read current config
    let config = data.ask_config.read().await;
    let word_limit = config.word_limit;
    let line_breaks = config.line_breaks;
    drop(config);

    info!(user = ctx.author().name, question, "question received");

    match data
        .qa
        .ask(&data.corpus, &question, word_limit, line_breaks)
        .await
    {
        Ok(response) => {
            info!(
                files = response.files,
                records = response.records,
                context_chars = response.context_chars,
                answer_len = response.answer.len(),
                "answer ready"
            );
            let full = format!(
                "**Q:** {}\n**Files:** {} | **Records:** {}\n\n**A:** {}",
                question, response.files, response.records, response.answer
            );
            send_chunked(&ctx, &full).await
        }
        Err(AskError::EmptyContext) => {
            ctx.say(AskError::EMPTY_CONTEXT_GUIDANCE).await?;
            Ok(())
        }
        Err(e) => {
            let cause = e.source().map(|s| s.to_string()).unwrap_or_default();
            error!(error = %e, cause, "answer generation failed");
            ctx.say("Error generating answer").await?;
            Ok(())
        }
    }
}
