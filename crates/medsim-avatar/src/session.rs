//! One consultation session: explicit owner of all playback state.
//!
//! Wires the queue, playback driver, blend engine, and blink scheduler
//! together. One instance per active consultation, passed by reference to
//! whoever renders it — there is no ambient or process-wide session.

use crate::blend::{BlendEngine, FrameInput};
use crate::blink::{BlinkScheduler, GazeFlags};
use crate::playback::{AudioSink, PlaybackDriver};
use medsim_core::{AnimationClip, ChatResponse, FacialExpression, ReplySegment};
use std::sync::Arc;

pub struct ConsultationSession {
    driver: PlaybackDriver,
    blend: BlendEngine,
    gaze: Arc<GazeFlags>,
    blink: BlinkScheduler,
}

impl ConsultationSession {
    /// Start a session over the given sink and the model's morph-target
    /// dictionary. Spawns the blink loop; call [`shutdown`](Self::shutdown)
    /// (or drop) to cancel it.
    pub fn start(sink: Arc<dyn AudioSink>, morph_targets: impl IntoIterator<Item = String>) -> Self {
        let gaze = Arc::new(GazeFlags::default());
        let blink = BlinkScheduler::spawn(Arc::clone(&gaze));
        Self {
            driver: PlaybackDriver::new(sink, Arc::clone(&gaze)),
            blend: BlendEngine::new(morph_targets),
            gaze,
            blink,
        }
    }

    /// Feed one gateway response into the queue.
    pub fn handle_reply(&mut self, response: ChatResponse) {
        self.driver.enqueue_turn(response.messages);
    }

    /// Feed raw segments (e.g. a locally scripted gesture).
    pub fn enqueue(&mut self, segments: impl IntoIterator<Item = ReplySegment>) {
        self.driver.enqueue_turn(segments);
    }

    /// Per-frame update: advance the queue and blend every morph target.
    pub fn frame(&mut self) {
        self.driver.tick();
        let frame = FrameInput {
            expression: self.driver.expression(),
            blink_left: self.gaze.left_closed(),
            blink_right: self.gaze.right_closed(),
            lipsync: self.driver.active_lipsync(),
        };
        self.blend.update(frame);
    }

    /// Freeze automatic blending for manual posing.
    pub fn set_setup_mode(&mut self, on: bool) {
        self.blend.set_setup_mode(on);
    }

    pub fn expression(&self) -> FacialExpression {
        self.driver.expression()
    }

    pub fn animation(&self) -> AnimationClip {
        self.driver.animation()
    }

    pub fn is_speaking(&self) -> bool {
        self.driver.is_busy()
    }

    pub fn blend(&self) -> &BlendEngine {
        &self.blend
    }

    pub fn blend_mut(&mut self) -> &mut BlendEngine {
        &mut self.blend
    }

    /// Stop audio, drop pending segments, and cancel the blink loop.
    pub fn shutdown(&mut self) {
        self.driver.clear();
        self.blink.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AvatarResult;
    use medsim_core::{MouthCues, Viseme, VisemeCue};
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Default)]
    struct SilentSink {
        playing: AtomicBool,
    }

    impl AudioSink for SilentSink {
        fn play(&self, _bytes: &[u8]) -> AvatarResult<()> {
            self.playing.store(true, Ordering::Release);
            Ok(())
        }
        fn stop(&self) {
            self.playing.store(false, Ordering::Release);
        }
        fn is_playing(&self) -> bool {
            self.playing.load(Ordering::Acquire)
        }
    }

    fn targets() -> Vec<String> {
        vec!["browInnerUp".to_string(), "mouthFrownLeft".to_string()]
    }

    #[tokio::test]
    async fn frames_blend_toward_the_active_segment_expression() {
        let sink = Arc::new(SilentSink::default());
        let mut session = ConsultationSession::start(sink.clone(), targets());

        use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
        let segment = ReplySegment {
            audio: Some(BASE64.encode(b"clip")),
            lipsync: Some(MouthCues {
                mouth_cues: vec![VisemeCue { start: 0.0, end: 60.0, value: Viseme::C }],
            }),
            ..ReplySegment::spoken("…", FacialExpression::Worried, AnimationClip::Talking1)
        };
        session.handle_reply(ChatResponse { messages: vec![segment] });

        for _ in 0..200 {
            session.frame();
        }
        // worried raises browInnerUp to 0.6 and the active cue opens viseme_I
        assert!((session.blend().weight("browInnerUp") - 0.6).abs() < 1e-3);
        assert!(session.blend().weight("viseme_I") > 0.9);

        session.shutdown();
        assert!(!session.is_speaking());
    }

    #[tokio::test]
    async fn idle_session_relaxes_to_default() {
        let sink = Arc::new(SilentSink::default());
        let mut session = ConsultationSession::start(sink, targets());
        assert_eq!(session.expression(), FacialExpression::Default);
        assert_eq!(session.animation(), AnimationClip::Idle);
        for _ in 0..10 {
            session.frame();
        }
        assert!(session.blend().weight("browInnerUp").abs() < 1e-3);
    }
}
