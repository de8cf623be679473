//! Simulation configuration loaded from the environment.
//!
//! The gateway loads `.env` (dotenvy) before calling [`SimulationConfig::from_env`].
//! Both API keys are required only for the enriched path: when either is
//! missing the pipeline degrades to the scripted technical-difficulty reply
//! instead of calling any external service.
//!
//! | Env | Default | Description |
//! |-----|---------|-------------|
//! | GEMINI_API_KEY | (unset) | Generative-language service key. |
//! | ELEVEN_LABS_API_KEY | (unset) | Speech-synthesis service key. |
//! | ELEVEN_LABS_VOICE_ID | TojRWZatQyy9dujEdiQ1 | Patient voice. |
//! | MEDSIM_LLM_MODEL | gemini-2.0-flash | Generation model name. |
//! | MEDSIM_LLM_API_URL | Google generativelanguage v1beta | LLM base URL override (tests). |
//! | MEDSIM_TTS_API_URL | https://api.elevenlabs.io/v1 | TTS base URL override (tests). |
//! | MEDSIM_PORT | 3000 | Gateway listen port. |
//! | MEDSIM_AUDIO_DIR | audios | Intermediate clip/cue artifact directory. |

use std::path::PathBuf;

/// Gateway + pipeline configuration, one instance built at startup and shared
/// behind an `Arc`.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub gemini_api_key: Option<String>,
    pub eleven_labs_api_key: Option<String>,
    pub voice_id: String,
    pub llm_model: String,
    pub llm_base_url: String,
    pub tts_base_url: String,
    pub port: u16,
    pub audio_dir: PathBuf,
}

impl SimulationConfig {
    /// Load from environment. Unset or invalid values fall back to the
    /// defaults in the module table.
    pub fn from_env() -> Self {
        Self {
            gemini_api_key: env_opt_string("GEMINI_API_KEY"),
            eleven_labs_api_key: env_opt_string("ELEVEN_LABS_API_KEY"),
            voice_id: env_string("ELEVEN_LABS_VOICE_ID", "TojRWZatQyy9dujEdiQ1"),
            llm_model: env_string("MEDSIM_LLM_MODEL", "gemini-2.0-flash"),
            llm_base_url: env_string(
                "MEDSIM_LLM_API_URL",
                "https://generativelanguage.googleapis.com/v1beta",
            ),
            tts_base_url: env_string("MEDSIM_TTS_API_URL", "https://api.elevenlabs.io/v1"),
            port: env_port("MEDSIM_PORT", 3000),
            audio_dir: PathBuf::from(env_string("MEDSIM_AUDIO_DIR", "audios")),
        }
    }

    /// Both external-service keys are present; the enriched pipeline may run.
    pub fn has_credentials(&self) -> bool {
        self.gemini_api_key.is_some() && self.eleven_labs_api_key.is_some()
    }
}

impl Default for SimulationConfig {
    /// Defaults only, ignoring the environment. Used by tests.
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            eleven_labs_api_key: None,
            voice_id: "TojRWZatQyy9dujEdiQ1".to_string(),
            llm_model: "gemini-2.0-flash".to_string(),
            llm_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            tts_base_url: "https://api.elevenlabs.io/v1".to_string(),
            port: 3000,
            audio_dir: PathBuf::from("audios"),
        }
    }
}

fn env_opt_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_string(name: &str, default: &str) -> String {
    env_opt_string(name).unwrap_or_else(|| default.to_string())
}

fn env_port(name: &str, default: u16) -> u16 {
    match std::env::var(name) {
        Ok(v) => v.trim().parse().unwrap_or(default),
        Err(_) => default,
    }
}
