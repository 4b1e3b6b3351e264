use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::extract::ParseError;
use crate::config::Config;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("AI backend request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Ollama 风格生成接口的客户端；每次请求同步调用，无重试/排队
#[derive(Clone)]
pub struct AiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl AiClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.ollama_base_url.trim_end_matches('/').to_string(),
            model: config.ollama_model.clone(),
        }
    }

    pub async fn generate(&self, prompt: &str) -> Result<String, AiError> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let resp = self
            .http
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        Ok(resp.json::<GenerateResponse>().await?.response)
    }
}
