use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{AggregatorError, Result};

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Something that can write a short summary of an article.
#[async_trait]
pub trait LlmAdapter: Send + Sync {
    fn adapter_name(&self) -> String;

    async fn create_summary(&self, title: Option<&str>, text: &str) -> Result<String>;
}

/// Extractive fallback: the first sentences of the article, prefixed by its title.
pub struct LeadSentencesAdapter {
    sentences: usize,
}

impl LeadSentencesAdapter {
    pub fn new() -> Self {
        Self { sentences: 2 }
    }

    pub fn with_sentences(mut self, sentences: usize) -> Self {
        self.sentences = sentences.max(1);
        self
    }
}

impl Default for LeadSentencesAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmAdapter for LeadSentencesAdapter {
    fn adapter_name(&self) -> String {
        format!("Lead sentences ({})", self.sentences)
    }

    async fn create_summary(&self, title: Option<&str>, text: &str) -> Result<String> {
        let lead: Vec<&str> = text
            .split_inclusive(['.', '!', '?'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .take(self.sentences)
            .collect();

        if lead.is_empty() {
            return Err(AggregatorError::Parse("no sentences to summarize".to_string()));
        }

        let lead = lead.join(" ");
        Ok(match title {
            Some(title) if !title.is_empty() => format!("{}: {}", title, lead),
            _ => lead,
        })
    }
}

/// Summaries from the OpenAI Chat Completions API.
pub struct OpenAiAdapter {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAiAdapter {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            model: model.into(),
            endpoint: OPENAI_CHAT_URL.to_string(),
        })
    }

    /// Points the adapter at another Chat Completions compatible endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}

#[derive(Deserialize)]
struct ChoiceMsg {
    content: String,
}

// Keeps requests well inside the model context.
const MAX_INPUT_CHARS: usize = 12_000;

#[async_trait]
impl LlmAdapter for OpenAiAdapter {
    fn adapter_name(&self) -> String {
        format!("OpenAI ({})", self.model)
    }

    async fn create_summary(&self, title: Option<&str>, text: &str) -> Result<String> {
        let body: String = text.chars().take(MAX_INPUT_CHARS).collect();
        let input = match title {
            Some(title) => format!("Title: {}\n\n{}", title, body),
            None => body,
        };

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: "Summarize the article in at most three sentences. Plain text, neutral tone.",
                },
                Msg {
                    role: "user",
                    content: &input,
                },
            ],
            temperature: 0.2,
            max_tokens: 200,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AggregatorError::Status {
                url: self.endpoint.clone(),
                status: status.as_u16(),
            });
        }

        let body: ChatResponse = response.json().await?;
        let summary = body
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .unwrap_or_default();

        if summary.is_empty() {
            return Err(AggregatorError::Parse("empty completion".to_string()));
        }
        debug!("{} produced {} chars", self.adapter_name(), summary.len());
        Ok(summary)
    }
}
