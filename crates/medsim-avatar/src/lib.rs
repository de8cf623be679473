//! # MedSim Avatar — consultation-side playback state
//!
//! Drives the virtual patient's face from the gateway's reply segments:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                  Consultation Session                      │
//! │  ┌─────────────┐   ┌─────────────────┐   ┌──────────────┐  │
//! │  │ Reply Queue │ → │ Playback Driver │ → │ Blend Engine │  │
//! │  │   (FIFO)    │   │ (one Active)    │   │ (per frame)  │  │
//! │  └─────────────┘   └─────────────────┘   └──────────────┘  │
//! │         ↑                  ↓                      ↑        │
//! │   gateway reply      AudioSink (rodio)      blink flags    │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! Single-threaded cooperative model: the renderer calls
//! [`ConsultationSession::frame`] once per frame; timers and the blink loop
//! are the only background tasks, and all of them are cancellable. The crate
//! owns the playback *state* (morph-target weights), not the rendering.

pub mod blend;
pub mod blink;
pub mod error;
pub mod playback;
pub mod queue;
pub mod session;
pub mod timer;

pub use blend::{BlendConfig, BlendEngine, FrameInput};
pub use blink::{BlinkScheduler, GazeFlags};
pub use error::{AvatarError, AvatarResult};
pub use playback::{AudioSink, PlaybackDriver, RodioSink};
pub use queue::ReplyQueue;
pub use session::ConsultationSession;
pub use timer::OneShotTimer;
