use super::send_chunked;
use crate::state::Context;

/// List the files currently loaded for answering
#[poise::command(slash_command, guild_only)]
pub async fn sources(ctx: Context<'_>) -> Result<(), anyhow::Error> {
    let datasets = ctx.data().corpus.snapshot().await;

    if datasets.is_empty() {
        ctx.say("No files loaded yet. Use `/sage upload` or `/sage sync` to add some.")
            .await?;
        return Ok(());
    }

    let mut output = format!("**Loaded Files ({})**\n\n", datasets.len());
    for dataset in datasets.iter() {
        let when = chrono::DateTime::from_timestamp(dataset.ingested_at, 0)
            .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_default();
        output.push_str(&format!(
            "  - {} ({}, {} records) `{}`\n    Loaded: {}\n",
            dataset.provenance,
            dataset.format,
            dataset.records.len(),
            &dataset.digest[..dataset.digest.len().min(12)],
            when
        ));
    }

    send_chunked(&ctx, &output).await
}
