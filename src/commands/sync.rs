use tracing::info;

use super::{drive_and_folder, send_chunked};
use crate::docs::ingest::{ingest_batch, RemoteStore};
use crate::docs::types::BatchReport;
use crate::state::Context;

fn report_text(folder: &str, report: &BatchReport) -> String {
    let mut out = format!(
        "Loaded **{}** of {} file(s) from folder `{}`.\n",
        report.datasets.len(),
        report.listed,
        folder
    );
    for dataset in report.datasets.iter() {
        out.push_str(&format!(
            "- {} ({}, {} records)\n",
            dataset.provenance,
            dataset.format,
            dataset.records.len()
        ));
    }
    if !report.failures.is_empty() {
        out.push_str("\n**Skipped:**\n");
        for failure in &report.failures {
            out.push_str(&format!(
                "- {} (`{}`, id `{}`): {}\n",
                failure.file_name, failure.kind, failure.file_id, failure.message
            ));
        }
    }
    out
}

/// Replace the loaded files with everything in a Drive folder
#[poise::command(slash_command, guild_only)]
pub async fn sync(
    ctx: Context<'_>,
    #[description = "Drive folder id (defaults to DRIVE_FOLDER_ID)"] folder: Option<String>,
) -> Result<(), anyhow::Error> {
    ctx.defer().await?;
    let Some((drive, folder)) = drive_and_folder(&ctx, folder).await? else {
        return Ok(());
    };

    info!(user = ctx.author().name, folder, "folder sync started");

    match ingest_batch(&ctx.data().corpus, &*drive, &folder).await {
        Ok(report) => send_chunked(&ctx, &report_text(&folder, &report)).await,
        Err(e) => {
            ctx.say(format!("Could not sync folder `{}`: {}", folder, e))
                .await?;
            Ok(())
        }
    }
}

/// List the files in a Drive folder
#[poise::command(slash_command, guild_only)]
pub async fn files(
    ctx: Context<'_>,
    #[description = "Drive folder id (defaults to DRIVE_FOLDER_ID)"] folder: Option<String>,
) -> Result<(), anyhow::Error> {
    ctx.defer().await?;
    let Some((drive, folder)) = drive_and_folder(&ctx, folder).await? else {
        return Ok(());
    };

    let listed = drive.list_folder(&folder).await?;
    if listed.is_empty() {
        ctx.say(format!("Folder `{}` is empty.", folder)).await?;
        return Ok(());
    }

    let mut output = format!("**Files in `{}`**\n", folder);
    for file in &listed {
        output.push_str(&format!("- {} `{}`\n", file.name, file.id));
    }
    send_chunked(&ctx, &output).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::docs::types::{BatchFailure, FileDataset, Format};
    use crate::error::FailureKind;

    #[test]
    fn report_lists_loaded_and_skipped_files() {
        let report = BatchReport {
            datasets: Arc::new(vec![FileDataset {
                provenance: "a.csv".into(),
                format: Format::Csv,
                records: Vec::new(),
                digest: String::new(),
                ingested_at: 0,
            }]),
            failures: vec![BatchFailure {
                file_id: "2".into(),
                file_name: "b.csv".into(),
                kind: FailureKind::Transport,
                message: "could not reach 'b.csv': timed out".into(),
            }],
            listed: 2,
        };

        let text = report_text("f1", &report);

        assert!(text.starts_with("Loaded **1** of 2 file(s) from folder `f1`."));
        assert!(text.contains("- a.csv (csv, 0 records)"));
        assert!(text.contains("- b.csv (`transport_error`, id `2`): could not reach 'b.csv': timed out"));
    }
}
