//! Error types for the avatar session.

use thiserror::Error;

/// Result type alias for avatar operations.
pub type AvatarResult<T> = Result<T, AvatarError>;

/// Errors that can occur while driving playback. Most are absorbed by the
/// driver (a failed clip plays as silence and the queue still advances);
/// construction errors surface to the caller.
#[derive(Error, Debug)]
pub enum AvatarError {
    #[error("Audio device error: {0}")]
    AudioDevice(String),

    #[error("Audio playback error: {0}")]
    Playback(String),

    #[error("Audio decode error: {0}")]
    Decode(String),
}
