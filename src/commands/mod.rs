mod ask;
mod config;
mod generate;
mod manage;
mod sources;
mod sync;
mod upload;

use std::sync::Arc;

use crate::drive::DriveClient;
use crate::state::Context;

/// Discord rejects messages over 2000 chars.
const CHUNK_LIMIT: usize = 1990;

/// FileSage - ask questions about your CSV, spreadsheet and PDF files
#[poise::command(
    slash_command,
    subcommands(
        "ask::ask",
        "upload::upload",
        "sync::sync",
        "sync::files",
        "sources::sources",
        "generate::generate",
        "manage::clear",
        "config::config"
    )
)]
pub async fn sage(_ctx: Context<'_>) -> Result<(), anyhow::Error> {
    Ok(())
}

/// Split `text` into pieces of at most `limit` bytes, preferring line then
/// word boundaries and never cutting inside a character.
fn split_chunks(text: &str, limit: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut remaining = text;
    while !remaining.is_empty() {
        let split_at = if remaining.len() <= limit {
            remaining.len()
        } else {
            let mut end = limit;
            while end > 0 && !remaining.is_char_boundary(end) {
                end -= 1;
            }
            remaining[..end]
                .rfind('\n')
                .or_else(|| remaining[..end].rfind(' '))
                .map(|i| i + 1)
                .unwrap_or(if end == 0 { remaining.len() } else { end })
        };
        let (chunk, rest) = remaining.split_at(split_at);
        chunks.push(chunk);
        remaining = rest;
    }
    chunks
}

/// Send a message in Discord-safe chunks.
/// Follow-ups go through ctx.say() so they ride the interaction webhook,
/// which doesn't require Send Messages channel permission.
pub(crate) async fn send_chunked(ctx: &Context<'_>, text: &str) -> Result<(), anyhow::Error> {
    for chunk in split_chunks(text, CHUNK_LIMIT) {
        ctx.say(chunk).await?;
    }
    Ok(())
}

/// The Drive client and target folder, or a reply explaining what is missing.
pub(crate) async fn drive_and_folder(
    ctx: &Context<'_>,
    folder: Option<String>,
) -> Result<Option<(Arc<DriveClient>, String)>, anyhow::Error> {
    let data = ctx.data();
    let Some(drive) = data.drive.clone() else {
        ctx.say("Google Drive is not configured (set `DRIVE_ACCESS_TOKEN`).")
            .await?;
        return Ok(None);
    };
    let Some(folder) = data.folder_or_default(folder) else {
        ctx.say("No folder given and no `DRIVE_FOLDER_ID` default is set.")
            .await?;
        return Ok(None);
    };
    Ok(Some((drive, folder)))
}
