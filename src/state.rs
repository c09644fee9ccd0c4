use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::docs::Corpus;
use crate::drive::DriveClient;
use crate::llm::LlmClient;
use crate::qa::QaEngine;

/// Answer style parameters (admins can modify at runtime).
pub struct AskConfig {
    pub word_limit: u32,
    pub line_breaks: bool,
}

impl Default for AskConfig {
    fn default() -> Self {
        Self {
            word_limit: 100,
            line_breaks: true,
        }
    }
}

pub struct AppState {
    pub corpus: Arc<Corpus>,
    pub llm: Arc<LlmClient>,
    pub qa: Arc<QaEngine>,
    /// Absent when no Drive token is configured.
    pub drive: Option<Arc<DriveClient>>,
    pub default_folder: Option<String>,
    pub admin_ids: HashSet<u64>,
    pub ask_config: Arc<RwLock<AskConfig>>,
}

impl AppState {
    pub fn is_admin(&self, user_id: u64) -> bool {
        self.admin_ids.contains(&user_id)
    }

    /// Explicit folder argument, else the configured default.
    pub fn folder_or_default(&self, folder: Option<String>) -> Option<String> {
        folder
            .filter(|f| !f.trim().is_empty())
            .or_else(|| self.default_folder.clone())
    }
}

pub type Context<'a> = poise::Context<'a, AppState, anyhow::Error>;
