//! Speech-synthesis backend.
//!
//! [`SpeechSynth`] covers the two operations the gateway needs: synthesize
//! one segment's text to MP3 bytes, and pass the provider's voice catalog
//! through to `/voices`. Production is the ElevenLabs REST API.

use crate::error::{GatewayError, GatewayResult};
use async_trait::async_trait;
use medsim_core::SimulationConfig;
use std::time::Duration;

/// Backend that turns text into encoded speech audio.
#[async_trait]
pub trait SpeechSynth: Send + Sync {
    /// Synthesize one spoken line to MP3 bytes.
    async fn synthesize(&self, text: &str) -> GatewayResult<Vec<u8>>;
    /// The provider's voice catalog, passed through verbatim.
    async fn voices(&self) -> GatewayResult<serde_json::Value>;
}

/// ElevenLabs text-to-speech client.
#[derive(Debug, Clone)]
pub struct ElevenLabsTts {
    base_url: String,
    api_key: String,
    voice_id: String,
    client: reqwest::Client,
}

impl ElevenLabsTts {
    pub fn from_config(config: &SimulationConfig) -> GatewayResult<Self> {
        let api_key = config
            .eleven_labs_api_key
            .clone()
            .ok_or_else(|| GatewayError::Tts("ELEVEN_LABS_API_KEY is not set".to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| GatewayError::Tts(e.to_string()))?;
        Ok(Self {
            base_url: config.tts_base_url.trim_end_matches('/').to_string(),
            api_key,
            voice_id: config.voice_id.clone(),
            client,
        })
    }
}

#[async_trait]
impl SpeechSynth for ElevenLabsTts {
    async fn synthesize(&self, text: &str) -> GatewayResult<Vec<u8>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/text-to-speech/{}", self.base_url, self.voice_id);
        let body = serde_json::json!({
            "text": text,
            "model_id": "eleven_multilingual_v2",
        });
        let res = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .header("accept", "audio/mpeg")
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Tts(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(GatewayError::Tts(format!("API error {}: {}", status, body)));
        }
        let bytes = res.bytes().await.map_err(|e| GatewayError::Tts(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn voices(&self) -> GatewayResult<serde_json::Value> {
        let url = format!("{}/voices", self.base_url);
        let res = self
            .client
            .get(&url)
            .header("xi-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| GatewayError::Tts(e.to_string()))?;
        if !res.status().is_success() {
            return Err(GatewayError::Tts(format!("API error {}", res.status())));
        }
        res.json().await.map_err(|e| GatewayError::Tts(e.to_string()))
    }
}
