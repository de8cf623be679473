//! Reply segments and the lip-sync cue schema.
//!
//! A **ReplySegment** is one unit of patient speech: the spoken line, the
//! facial expression and animation clip to hold while it plays, and (once the
//! pipeline has enriched it) base64 audio plus a timed viseme cue list in the
//! rhubarb `{ "mouthCues": [...] }` schema. Wire names are camelCase to match
//! the frontend contract.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Named facial expression preset, selected per segment by the language model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum FacialExpression {
    #[default]
    Default,
    Smile,
    Sad,
    Surprised,
    Angry,
    Worried,
    Pain,
    FunnyFace,
    Crazy,
}

/// Skeletal animation clip played while a segment is active. Spellings match
/// the clip names baked into the animation asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AnimationClip {
    #[serde(rename = "Talking_0")]
    Talking0,
    #[serde(rename = "Talking_1")]
    Talking1,
    #[serde(rename = "Talking_2")]
    Talking2,
    Crying,
    Laughing,
    #[default]
    Idle,
    Terrified,
    Angry,
    #[serde(rename = "Standing Idle")]
    StandingIdle,
}

/// One-shot gesture tag. A segment carrying one plays instantaneously: the
/// gesture fires and the queue advances without waiting on audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecialAction {
    Wink,
}

/// Phoneme class emitted by the forced aligner. Each maps to one mouth-shape
/// morph target (see [`crate::expression`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Viseme {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    X,
}

/// One timed mouth-shape cue, seconds relative to the start of the segment's
/// audio. Cues in a list are sorted by `start` and non-overlapping; `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisemeCue {
    pub start: f32,
    pub end: f32,
    pub value: Viseme,
}

/// The aligner's output schema: `{ "mouthCues": [...] }`. An empty cue list is
/// legitimate and means "no mouth movement", never an error.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MouthCues {
    #[serde(rename = "mouthCues", default)]
    pub mouth_cues: Vec<VisemeCue>,
}

impl MouthCues {
    /// The cue whose `[start, end)` window contains `t`, scanning in list
    /// order and stopping at the first match. Cues are non-overlapping by
    /// contract, so the scan order only matters as a tie-break on malformed
    /// input.
    pub fn active_cue(&self, t: f32) -> Option<&VisemeCue> {
        self.mouth_cues
            .iter()
            .find(|cue| t >= cue.start && t < cue.end)
    }
}

/// One unit of patient speech with its presentation tags and, after
/// enrichment, audio + lip-sync data. `audio == None` implies `lipsync == None`
/// in pipeline output (a silent segment); a segment with audio may still carry
/// an empty cue list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplySegment {
    pub text: String,
    #[serde(rename = "facialExpression", default)]
    pub facial_expression: FacialExpression,
    #[serde(default)]
    pub animation: AnimationClip,
    #[serde(
        rename = "specialAction",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub special_action: Option<SpecialAction>,
    /// Base64-encoded MP3 bytes, absent for silent segments.
    #[serde(default)]
    pub audio: Option<String>,
    #[serde(default)]
    pub lipsync: Option<MouthCues>,
}

impl ReplySegment {
    /// A bare spoken segment, not yet enriched with audio.
    pub fn spoken(
        text: impl Into<String>,
        facial_expression: FacialExpression,
        animation: AnimationClip,
    ) -> Self {
        Self {
            text: text.into(),
            facial_expression,
            animation,
            special_action: None,
            audio: None,
            lipsync: None,
        }
    }
}

/// Body of `POST /chat` responses: `{ "messages": [...] }`, playback order
/// equals list order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub messages: Vec<ReplySegment>,
}

/// The language model's reply could not be decoded into segments. Callers
/// absorb this into the scripted clarification fallback; it never reaches the
/// HTTP client as an error.
#[derive(Debug, Error)]
pub enum ReplyParseError {
    #[error("reply is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("reply JSON has no messages")]
    Empty,
}

/// Decode a raw language-model reply into ordered segments.
///
/// Strips markdown code fences (the model wraps its JSON in ```json blocks
/// more often than not) and requires the documented
/// `{ "messages": [{text, facialExpression, animation, specialAction?}] }`
/// shape. Anything else is [`ReplyParseError`].
pub fn parse_reply_segments(raw: &str) -> Result<Vec<ReplySegment>, ReplyParseError> {
    let cleaned = strip_code_fences(raw);
    let response: ChatResponse = serde_json::from_str(&cleaned)?;
    if response.messages.is_empty() {
        return Err(ReplyParseError::Empty);
    }
    Ok(response.messages)
}

fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}
