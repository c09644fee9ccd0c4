use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::qa::Generate;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// Any `/v1/chat/completions` compatible server.
    OpenAi,
    Gemini,
}

pub struct LlmClient {
    client: reqwest::Client,
    provider: Provider,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl LlmClient {
    pub fn from_env() -> Result<Self> {
        let provider = match dotenv::var("LLM_PROVIDER")
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str()
        {
            "gemini" | "google" => Provider::Gemini,
            "" | "openai" => Provider::OpenAi,
            other => bail!("Unknown LLM_PROVIDER '{}': use openai or gemini", other),
        };

        let (default_base, default_model) = match provider {
            Provider::OpenAi => ("http://localhost:1234/v1", "qwen/qwen3-8b"),
            Provider::Gemini => (GEMINI_BASE_URL, "gemini-1.5-flash"),
        };
        let base_url = dotenv::var("LLM_BASE_URL").unwrap_or_else(|_| default_base.to_string());
        let model = dotenv::var("LLM_MODEL").unwrap_or_else(|_| default_model.to_string());
        let api_key = dotenv::var("LLM_API_KEY").ok().filter(|k| !k.is_empty());

        if provider == Provider::Gemini && api_key.is_none() {
            bail!("LLM_API_KEY is required for the gemini provider");
        }

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            provider,
            base_url,
            model,
            api_key,
        })
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Resolve the chat completions endpoint from the base URL.
    fn chat_endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/chat/completions") {
            base.to_string()
        } else if base.ends_with("/v1") {
            format!("{}/chat/completions", base)
        } else {
            format!("{}/v1/chat/completions", base)
        }
    }

    fn gemini_endpoint(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model.trim()
        )
    }

    /// Non-streaming chat completion.
    pub async fn chat(&self, messages: &[Message]) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": 0.3,
            "max_tokens": 2048,
        });

        let mut req = self.client.post(self.chat_endpoint()).json(&body);
        if let Some(key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }

        let resp = req.send().await.context("LLM request failed")?;
        let status = resp.status();
        let text = resp.text().await.context("Failed to read LLM response")?;
        if !status.is_success() {
            bail!("LLM returned {}: {}", status, text);
        }
        let json: serde_json::Value =
            serde_json::from_str(&text).context("Failed to parse LLM JSON")?;

        json["choices"]
            .get(0)
            .and_then(|c| c["message"]["content"].as_str())
            .map(str::to_string)
            .context("LLM response has no message content")
    }

    async fn gemini(&self, prompt: &str) -> Result<String> {
        let key = self
            .api_key
            .as_deref()
            .context("Missing API key for Gemini")?;
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
        };

        let resp = self
            .client
            .post(self.gemini_endpoint())
            .query(&[("key", key)])
            .json(&body)
            .send()
            .await
            .context("Gemini request failed")?;
        let status = resp.status();
        let text = resp.text().await.context("Failed to read Gemini response")?;
        if !status.is_success() {
            bail!("Gemini returned {}: {}", status, text);
        }
        let parsed: GeminiResponse =
            serde_json::from_str(&text).context("Failed to parse Gemini JSON")?;

        // Drain every part of the first candidate.
        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .context("Gemini returned no candidates")?;
        Ok(candidate
            .content
            .parts
            .into_iter()
            .map(|p| p.text)
            .collect::<Vec<_>>()
            .join(""))
    }
}

#[async_trait]
impl Generate for LlmClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        match self.provider {
            Provider::OpenAi => {
                let messages = vec![Message {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                }];
                self.chat(&messages).await
            }
            Provider::Gemini => self.gemini(prompt).await,
        }
    }
}

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiCandidateContent,
}

#[derive(Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiCandidatePart>,
}

#[derive(Deserialize)]
struct GeminiCandidatePart {
    #[serde(default)]
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(provider: Provider, base_url: &str) -> LlmClient {
        LlmClient {
            client: reqwest::Client::new(),
            provider,
            base_url: base_url.to_string(),
            model: "m".to_string(),
            api_key: None,
        }
    }

    #[test]
    fn chat_endpoint_from_base_url() {
        let c = |b| client(Provider::OpenAi, b).chat_endpoint();
        assert_eq!(c("http://h:1/v1"), "http://h:1/v1/chat/completions");
        assert_eq!(c("http://h:1/v1/"), "http://h:1/v1/chat/completions");
        assert_eq!(c("http://h:1"), "http://h:1/v1/chat/completions");
        assert_eq!(
            c("http://h:1/v1/chat/completions"),
            "http://h:1/v1/chat/completions"
        );
    }

    #[test]
    fn gemini_endpoint_names_model() {
        assert_eq!(
            client(Provider::Gemini, GEMINI_BASE_URL).gemini_endpoint(),
            format!("{}/m:generateContent", GEMINI_BASE_URL)
        );
    }

    #[test]
    fn gemini_response_parts_are_joined() {
        let parsed: GeminiResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Ann "},{"text":"is 30"}]}}]}"#,
        )
        .unwrap();
        let text: String = parsed.candidates[0]
            .content
            .parts
            .iter()
            .map(|p| p.text.as_str())
            .collect();
        assert_eq!(text, "Ann is 30");
    }
}
