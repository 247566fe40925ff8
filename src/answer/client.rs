//! Ollama answerer
//!
//! Single non-streaming `POST /api/generate` per question.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::answer::{Answer, Answerer};
use crate::errors::{PolicyError, Result};

/// Default Ollama API endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default model
pub const DEFAULT_MODEL: &str = "qwen2.5:7b-instruct";

/// Request timeout (60 seconds, generation is not streamed)
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Answerer backed by a local Ollama server
#[derive(Debug, Clone)]
pub struct OllamaAnswerer {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaAnswerer {
    /// Create with default settings
    pub fn new() -> Result<Self> {
        Self::with_config(DEFAULT_OLLAMA_URL, DEFAULT_MODEL)
    }

    /// Create with custom endpoint and model
    pub fn with_config(base_url: &str, model: &str) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    fn prompt(question: &str, context: &str) -> String {
        format!(
            "Answer the question using only the insurance policy excerpts below. \
             If the excerpts do not contain the answer, say so.\n\n\
             Excerpts:\n{}\n\nQuestion: {}\nAnswer:",
            context, question
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Answerer for OllamaAnswerer {
    async fn answer(&self, question: &str, context: &str) -> Result<Answer> {
        let url = format!("{}/api/generate", self.base_url);

        let request = OllamaGenerateRequest {
            model: self.model.clone(),
            prompt: Self::prompt(question, context),
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| PolicyError::AnswerUnavailable(format!("Failed to send request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(PolicyError::AnswerUnavailable(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let generated: OllamaGenerateResponse = response
            .json()
            .await
            .map_err(|e| PolicyError::AnswerUnavailable(format!("Failed to parse response: {}", e)))?;

        tracing::debug!("Answerer produced {} chars", generated.response.len());

        Ok(Answer {
            text: generated.response.trim().to_string(),
            confidence: None,
        })
    }
}

/// Ollama generate request
#[derive(Debug, Clone, Serialize)]
struct OllamaGenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
}

/// Ollama generate response (non-streaming)
#[derive(Debug, Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}
