mod commands;
mod docs;
mod drive;
mod error;
mod llm;
mod qa;
mod state;

use std::collections::HashSet;
use std::sync::Arc;

use poise::serenity_prelude as serenity;
use poise::{Framework, FrameworkOptions};
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use docs::Corpus;
use drive::DriveClient;
use llm::LlmClient;
use qa::QaEngine;
use state::{AppState, AskConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load env
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let token = dotenv::var("DISCORD_TOKEN").expect("DISCORD_TOKEN required");
    let guild_id: Option<serenity::GuildId> = dotenv::var("DISCORD_GUILD_ID")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(serenity::GuildId::new);

    // Init LLM client
    let llm_client = Arc::new(LlmClient::from_env()?);
    info!(
        provider = ?llm_client.provider(),
        model = llm_client.model(),
        "LLM client initialized"
    );

    let drive = DriveClient::from_env()?.map(Arc::new);
    let default_folder = dotenv::var("DRIVE_FOLDER_ID")
        .ok()
        .filter(|s| !s.trim().is_empty());
    if drive.is_some() {
        info!(default_folder = ?default_folder, "Drive client initialized");
    } else {
        warn!("DRIVE_ACCESS_TOKEN not set; folder sync and Drive upload disabled");
    }

    // Parse admin user IDs from env
    let admin_ids: HashSet<u64> = dotenv::var("ADMIN_USER_IDS")
        .unwrap_or_default()
        .split(',')
        .filter_map(|s| s.trim().parse::<u64>().ok())
        .collect();
    if !admin_ids.is_empty() {
        info!(count = admin_ids.len(), "Admin users configured");
    }

    let qa = Arc::new(QaEngine::new(llm_client.clone()));

    let app_state = AppState {
        corpus: Arc::new(Corpus::new()),
        llm: llm_client,
        qa,
        drive,
        default_folder,
        admin_ids,
        ask_config: Arc::new(RwLock::new(AskConfig::default())),
    };

    let intents =
        serenity::GatewayIntents::GUILDS | serenity::GatewayIntents::GUILD_MESSAGES;

    let framework = Framework::builder()
        .options(FrameworkOptions {
            commands: vec![commands::sage()],
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                info!("Bot connected as: {} ({})", ready.user.name, ready.user.id);

                let commands = &framework.options().commands;
                info!("Registering {} top-level command(s):", commands.len());
                for cmd in commands {
                    info!("  /{} ({} subcommands)", cmd.name, cmd.subcommands.len());
                    for sub in &cmd.subcommands {
                        info!("    /{} {}", cmd.name, sub.name);
                    }
                }

                if let Some(gid) = guild_id {
                    info!("Registering to guild {} (instant)", gid);
                    poise::builtins::register_in_guild(
                        ctx,
                        &framework.options().commands,
                        gid,
                    )
                    .await?;
                } else {
                    info!("Registering globally (up to 1 hour delay)");
                    poise::builtins::register_globally(
                        ctx,
                        &framework.options().commands,
                    )
                    .await?;
                }

                Ok(app_state)
            })
        })
        .build();

    info!("Starting FileSage Discord bot...");

    let mut client = serenity::ClientBuilder::new(&token, intents)
        .framework(framework)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create client: {}", e))?;

    if let Err(e) = client.start().await {
        error!("Client error: {}", e);
    }

    Ok(())
}
