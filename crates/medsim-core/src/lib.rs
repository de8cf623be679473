//! # MedSim Core — shared vocabulary of the virtual-patient simulation
//!
//! Everything both halves of the system agree on: the reply-segment wire
//! format produced by the gateway and consumed by the avatar session, the
//! static facial-expression presets and viseme map, the patient persona
//! prompt, the scripted in-character fallback lines, and the environment
//! configuration.
//!
//! This crate is pure data and parsing — no I/O, no async.

pub mod config;
pub mod expression;
pub mod prompt;
pub mod script;
pub mod segment;

pub use config::SimulationConfig;
pub use expression::{
    expression_preset, is_blink_target, BLINK_LEFT_TARGET, BLINK_RIGHT_TARGET, VISEME_TARGETS,
};
pub use prompt::build_patient_prompt;
pub use script::{
    clarification_reply, distress_reply, introduction_reply, technical_difficulty_reply,
};
pub use segment::{
    parse_reply_segments, AnimationClip, ChatResponse, FacialExpression, MouthCues,
    ReplyParseError, ReplySegment, SpecialAction, Viseme, VisemeCue,
};
