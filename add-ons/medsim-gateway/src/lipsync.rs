//! Phoneme timeline extraction: MP3 clip → timed viseme cues.
//!
//! Two external binaries do the work: `ffmpeg` transcodes the clip to WAV,
//! `rhubarb` runs phonetic recognition over the waveform and writes a
//! `{ "mouthCues": [...] }` JSON file. No retries anywhere: a transcode or
//! alignment failure is an error the pipeline turns into a silent segment,
//! while an unreadable cue file degrades to an empty timeline ("no mouth
//! movement", not an error).
//!
//! Artifacts land under the audio dir as `{stem}.mp3` / `.wav` / `.json`,
//! where the pipeline keys `stem` by turn id and segment index so concurrent
//! or successive turns never collide on paths. They are scratch files: once
//! the cues are in memory all three are removed, win or lose, so the audio
//! dir holds only the prerecorded clips between turns.

use crate::error::{GatewayError, GatewayResult};
use async_trait::async_trait;
use medsim_core::MouthCues;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::process::Command;
use tracing::{debug, warn};

/// Seam for the external alignment pipeline; tests script this.
#[async_trait]
pub trait CueExtractor: Send + Sync {
    /// Extract the viseme timeline for one MP3 clip. `stem` keys the
    /// intermediate artifacts on disk.
    async fn extract(&self, stem: &str, mp3: &[u8]) -> GatewayResult<MouthCues>;
}

/// ffmpeg + rhubarb implementation.
pub struct RhubarbExtractor {
    audio_dir: PathBuf,
    ffmpeg_bin: String,
    rhubarb_bin: String,
}

impl RhubarbExtractor {
    pub fn new(audio_dir: impl Into<PathBuf>) -> Self {
        Self {
            audio_dir: audio_dir.into(),
            ffmpeg_bin: "ffmpeg".to_string(),
            rhubarb_bin: "rhubarb".to_string(),
        }
    }

    async fn run(&self, program: &str, args: &[&str]) -> GatewayResult<()> {
        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| GatewayError::Transcode(format!("{program}: {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GatewayError::Transcode(format!(
                "{program} exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl CueExtractor for RhubarbExtractor {
    async fn extract(&self, stem: &str, mp3: &[u8]) -> GatewayResult<MouthCues> {
        tokio::fs::create_dir_all(&self.audio_dir).await?;
        let mp3_path = self.audio_dir.join(format!("{stem}.mp3"));
        let wav_path = self.audio_dir.join(format!("{stem}.wav"));
        let cue_path = self.audio_dir.join(format!("{stem}.json"));
        tokio::fs::write(&mp3_path, mp3).await?;

        let result = self.align(stem, &mp3_path, &wav_path, &cue_path).await;

        // Scratch files only; every turn uses fresh stems, so anything left
        // behind would accumulate forever.
        for path in [&mp3_path, &wav_path, &cue_path] {
            let _ = tokio::fs::remove_file(path).await;
        }
        result
    }
}

impl RhubarbExtractor {
    async fn align(
        &self,
        stem: &str,
        mp3_path: &Path,
        wav_path: &Path,
        cue_path: &Path,
    ) -> GatewayResult<MouthCues> {
        let started = Instant::now();
        self.run(
            &self.ffmpeg_bin,
            &["-y", "-i", path_str(mp3_path), path_str(wav_path)],
        )
        .await?;
        debug!(stem, elapsed_ms = started.elapsed().as_millis() as u64, "transcode done");

        self.run(
            &self.rhubarb_bin,
            &[
                "-f",
                "json",
                "-o",
                path_str(cue_path),
                path_str(wav_path),
                "-r",
                "phonetic",
            ],
        )
        .await
        .map_err(|e| GatewayError::Alignment(e.to_string()))?;
        debug!(stem, elapsed_ms = started.elapsed().as_millis() as u64, "alignment done");

        Ok(read_cue_file(cue_path).await)
    }
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap_or_default()
}

/// Read a cue file, degrading to an empty timeline when unreadable.
pub async fn read_cue_file(path: &Path) -> MouthCues {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => match serde_json::from_str(&raw) {
            Ok(cues) => cues,
            Err(e) => {
                warn!("unparsable cue file {}: {}", path.display(), e);
                MouthCues::default()
            }
        },
        Err(e) => {
            warn!("unreadable cue file {}: {}", path.display(), e);
            MouthCues::default()
        }
    }
}

/// Read a prerecorded clip as base64, absorbing errors to `None`.
pub async fn audio_file_to_base64(path: &Path) -> Option<String> {
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
    match tokio::fs::read(path).await {
        Ok(bytes) => Some(BASE64.encode(bytes)),
        Err(e) => {
            warn!("unreadable audio file {}: {}", path.display(), e);
            None
        }
    }
}
