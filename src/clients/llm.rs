use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::models::PropertyRecord;

const SYSTEM_PROMPT: &str =
    "Extract the property data from the listing text. Use null for attributes \
     the listing does not mention.";

/// Language-model collaborator: listing text in, raw structured JSON out.
/// Schema validation happens in the extraction stage, not here.
#[async_trait]
pub trait PropertyExtractor: Send + Sync {
    async fn extract(&self, listing_text: &str) -> Result<serde_json::Value>;
}

/// OpenAI chat-completions client constrained to the property record shape
/// via the strict `json_schema` response format.
pub struct OpenAiExtractor {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct JsonSchemaFormat {
    name: String,
    strict: bool,
    schema: serde_json::Value,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
    json_schema: JsonSchemaFormat,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

impl OpenAiExtractor {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: "gpt-4o".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Custom base URL, for proxies or compatible providers.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait]
impl PropertyExtractor for OpenAiExtractor {
    async fn extract(&self, listing_text: &str) -> Result<serde_json::Value> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: listing_text.to_string(),
                },
            ],
            temperature: 0.0,
            response_format: ResponseFormat {
                format_type: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: "property_record".to_string(),
                    strict: true,
                    schema: PropertyRecord::json_schema(),
                },
            },
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .context("Failed to reach completion service")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Completion service returned {status}: {body}");
        }

        let chat: ChatResponse = response
            .json()
            .await
            .context("Failed to parse completion response")?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .context("Completion response contained no choices")?;

        serde_json::from_str(&content).context("Completion content is not valid JSON")
    }
}
