//! Gateway error taxonomy.
//!
//! Only the terminal variant ever reaches an HTTP client, and even then as a
//! scripted distress reply with status 500. Everything else is absorbed along
//! the pipeline: missing credentials and malformed model output become
//! scripted replies, per-segment audio failures null out that segment's audio.

use medsim_core::ReplyParseError;
use thiserror::Error;

/// Result type alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Language model error: {0}")]
    Llm(String),

    #[error("Speech synthesis error: {0}")]
    Tts(String),

    #[error("Audio transcode error: {0}")]
    Transcode(String),

    #[error("Phoneme alignment error: {0}")]
    Alignment(String),

    #[error("Malformed model reply: {0}")]
    MalformedReply(#[from] ReplyParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
