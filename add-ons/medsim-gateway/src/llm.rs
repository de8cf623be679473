//! Generative-language backend.
//!
//! The pipeline talks to a [`ChatModel`], a thin async seam over "prompt in,
//! raw text out". Production is the Google generative-language REST API;
//! tests script the trait.

use crate::error::{GatewayError, GatewayResult};
use async_trait::async_trait;
use medsim_core::SimulationConfig;
use std::time::Duration;
use tracing::debug;

/// Backend that turns a prompt into the model's raw text reply.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> GatewayResult<String>;
}

/// Google generative-language client (`models/{model}:generateContent`).
#[derive(Debug, Clone)]
pub struct GeminiChat {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiChat {
    /// Build from config. Errors when the key is absent — callers gate on
    /// [`SimulationConfig::has_credentials`] before constructing.
    pub fn from_config(config: &SimulationConfig) -> GatewayResult<Self> {
        let api_key = config
            .gemini_api_key
            .clone()
            .ok_or_else(|| GatewayError::Llm("GEMINI_API_KEY is not set".to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| GatewayError::Llm(e.to_string()))?;
        Ok(Self {
            base_url: config.llm_base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.llm_model.clone(),
            client,
        })
    }
}

#[async_trait]
impl ChatModel for GeminiChat {
    async fn generate(&self, prompt: &str) -> GatewayResult<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let res = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Llm(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(GatewayError::Llm(format!("API error {}: {}", status, body)));
        }

        let json: serde_json::Value = res
            .json()
            .await
            .map_err(|e| GatewayError::Llm(e.to_string()))?;
        let text = json
            .get("candidates")
            .and_then(|c| c.get(0))
            .and_then(|c| c.pointer("/content/parts/0/text"))
            .and_then(|t| t.as_str())
            .ok_or_else(|| GatewayError::Llm("reply has no candidate text".to_string()))?;
        debug!(chars = text.len(), "model reply received");
        Ok(text.to_string())
    }
}
