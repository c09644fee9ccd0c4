pub mod prompts;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::docs::render::render;
use crate::docs::Corpus;
use crate::error::AskError;

/// Text-in, text-out generation backend.
#[async_trait]
pub trait Generate: Send + Sync {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String>;
}

pub struct QaResponse {
    pub answer: String,
    pub files: usize,
    pub records: usize,
    pub context_chars: usize,
}

pub struct QaEngine {
    llm: Arc<dyn Generate>,
}

impl QaEngine {
    pub fn new(llm: Arc<dyn Generate>) -> Self {
        Self { llm }
    }

    /// Answer `question` from whatever the corpus holds right now.
    pub async fn ask(
        &self,
        corpus: &Corpus,
        question: &str,
        word_limit: u32,
        line_breaks: bool,
    ) -> Result<QaResponse, AskError> {
        let datasets = corpus.snapshot().await;
        if datasets.is_empty() {
            return Err(AskError::EmptyContext);
        }

        let context = render(&datasets);
        let records = datasets.iter().map(|d| d.records.len()).sum();
        debug!(
            files = datasets.len(),
            records,
            chars = context.len(),
            "context rendered"
        );

        let answer = self
            .answer(&context, question, word_limit, line_breaks)
            .await?;

        Ok(QaResponse {
            answer,
            files: datasets.len(),
            records,
            context_chars: context.len(),
        })
    }

    /// One generation call over an already rendered context. No retry.
    pub async fn answer(
        &self,
        context: &str,
        question: &str,
        word_limit: u32,
        line_breaks: bool,
    ) -> Result<String, AskError> {
        if context.trim().is_empty() {
            return Err(AskError::EmptyContext);
        }

        let prompt = prompts::answer_prompt(context, question, word_limit, line_breaks);
        let answer = self
            .llm
            .generate(&prompt)
            .await
            .map_err(|e| AskError::Generation(e.into()))?;

        if answer.trim().is_empty() {
            return Err(AskError::Generation("backend returned an empty answer".into()));
        }

        info!(
            prompt_len = prompt.len(),
            answer_len = answer.len(),
            "question answered"
        );
        Ok(answer)
    }
}
