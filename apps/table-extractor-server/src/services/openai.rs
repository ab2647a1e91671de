//! OpenAI chat completions client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::http::{build_client, check_status, endpoint, required};
use super::types::{ServiceError, TextCompletion};

pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

const MAX_TOKENS: u32 = 4000;
const TEMPERATURE: f32 = 0.1;

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_OPENAI_URL.to_string(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            timeout: Duration::from_secs(super::http::DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

pub struct OpenAiClient {
    client: Client,
    config: OpenAiConfig,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self, ServiceError> {
        Ok(Self {
            client: build_client(config.timeout)?,
            config,
        })
    }
}

#[async_trait]
impl TextCompletion for OpenAiClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, ServiceError> {
        let api_key = required(
            &self.config.api_key,
            ServiceError::MissingCredentials("OPENAI_API_KEY"),
        )?;

        let request = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: prompt },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let response = self
            .client
            .post(endpoint(&self.config.base_url, "/v1/chat/completions"))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;
        let body: ChatResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ServiceError::Decode(format!("Failed to parse completion: {}", e)))?;

        first_choice(body)
    }
}

fn first_choice(body: ChatResponse) -> Result<String, ServiceError> {
    body.choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .ok_or_else(|| ServiceError::Decode("completion has no content".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = ChatRequest {
            model: DEFAULT_OPENAI_MODEL,
            messages: [
                ChatMessage { role: "system", content: "sys" },
                ChatMessage { role: "user", content: "hi" },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["max_tokens"], 4000);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
    }

    #[test]
    fn test_first_choice_is_trimmed() {
        let body: ChatResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"role": "assistant", "content": "\n NO_TABLES_FOUND \n"}}]}"#,
        )
        .unwrap();
        assert_eq!(first_choice(body).unwrap(), "NO_TABLES_FOUND");

        let empty: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(first_choice(empty), Err(ServiceError::Decode(_))));
    }

    #[tokio::test]
    async fn test_missing_key() {
        let client = OpenAiClient::new(OpenAiConfig::default()).unwrap();
        let result = client.complete("sys", "prompt").await;
        assert!(matches!(
            result,
            Err(ServiceError::MissingCredentials("OPENAI_API_KEY"))
        ));
    }
}
