use anyhow::Context as _;
use poise::serenity_prelude as serenity;
use tracing::{info, warn};

use crate::docs::ingest::ingest_single;
use crate::state::Context;

/// Upload a CSV, spreadsheet or PDF and add it to the loaded files
#[poise::command(slash_command, guild_only)]
pub async fn upload(
    ctx: Context<'_>,
    #[description = "CSV, spreadsheet (xlsx/xls/ods) or PDF"] file: serenity::Attachment,
    #[description = "Drive folder to store it in (defaults to DRIVE_FOLDER_ID)"]
    folder: Option<String>,
) -> Result<(), anyhow::Error> {
    ctx.defer().await?;
    let data = ctx.data();

    info!(
        user = ctx.author().name,
        file = file.filename,
        size = file.size,
        "upload started"
    );

    let bytes = file
        .download()
        .await
        .context("Failed to download attachment")?;
    let content_type = file.content_type.as_deref();

    // Keep a copy in Drive when it is configured; the stored name is the provenance.
    let mut name = file.filename.clone();
    let mut stored = String::new();
    if let (Some(drive), Some(folder)) = (&data.drive, data.folder_or_default(folder)) {
        let remote = drive
            .upload(&folder, &file.filename, bytes.clone(), content_type)
            .await?;
        stored = format!("\nStored in Drive folder `{}` as `{}`", folder, remote.id);
        name = remote.name;
    }

    match ingest_single(&data.corpus, &name, bytes, content_type).await {
        Ok(dataset) => {
            let loaded = data.corpus.snapshot().await.len();
            ctx.say(format!(
                "Processed **{}** ({}, {} records). {} file(s) loaded.{}",
                dataset.provenance,
                dataset.format,
                dataset.records.len(),
                loaded,
                stored
            ))
            .await?;
        }
        Err(e) => {
            warn!(file = name, kind = %e.kind(), error = %e, "upload not ingested");
            ctx.say(format!("Could not process **{}**: {}{}", name, e, stored))
                .await?;
        }
    }

    Ok(())
}
