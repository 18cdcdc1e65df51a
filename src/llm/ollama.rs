use crate::llm::client::{GenerationParams, LLMClient};
use crate::llm::http::{build_http_client, send_with_retry};
use crate::types::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Client for a local Ollama server
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    params: GenerationParams,
}

impl OllamaClient {
    pub fn new(base_url: String, model: String, params: GenerationParams) -> Result<Self> {
        Ok(Self {
            http: build_http_client(&params)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            params,
        })
    }

    async fn complete(&self, system: Option<&str>, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            system,
            stream: false,
            options: GenerateOptions {
                temperature: self.params.temperature,
                num_predict: self.params.max_tokens,
            },
        };
        let url = format!("{}/api/generate", self.base_url);

        let response: GenerateResponse =
            send_with_retry(&self.params, || self.http.post(&url).json(&request)).await?;

        let text = response.response.trim();
        if text.is_empty() {
            return Err(AppError::LLM(format!("Empty response from {}", self.model)));
        }
        Ok(text.to_string())
    }
}

#[async_trait]
impl LLMClient for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.complete(None, prompt).await
    }

    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.complete(Some(system), prompt).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
