//! Playback driver: consumes the reply queue, one Active segment at a time.
//!
//! Per segment the lifecycle is `Pending → Active → Done`. Entering Active
//! stops whatever was playing, applies the segment's expression and
//! animation, then either fires the wink gesture (instantaneous), starts
//! audio playback, or arms the fixed 2-second fallback for silent segments.
//! Completion — audio ended, audio errored, or timer elapsed — resets the
//! blend targets and activates the new queue head. Single-consumer by
//! construction: this is cooperative scheduling, no locking.

use crate::blink::GazeFlags;
use crate::error::{AvatarError, AvatarResult};
use crate::queue::ReplyQueue;
use crate::timer::OneShotTimer;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use medsim_core::{AnimationClip, FacialExpression, MouthCues, ReplySegment, SpecialAction};
use rodio::{OutputStream, OutputStreamHandle, Sink, Source};
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Hold time for a segment with neither audio nor special action. A policy
/// constant, not derived from text length.
pub const SILENT_SEGMENT_HOLD: Duration = Duration::from_secs(2);

/// How long a wink holds the lid closed.
pub const WINK_HOLD: Duration = Duration::from_millis(300);

/// Audio playback seam. The driver only needs start/stop/still-playing; the
/// real implementation wraps a rodio sink, tests script a fake.
pub trait AudioSink {
    /// Begin playing an encoded clip (MP3/WAV). Replaces anything queued.
    fn play(&self, bytes: &[u8]) -> AvatarResult<()>;
    /// Stop immediately and clear the queue.
    fn stop(&self);
    /// Whether playback is still in progress.
    fn is_playing(&self) -> bool;
}

/// Default output-device sink.
pub struct RodioSink {
    _stream: OutputStream,
    _stream_handle: OutputStreamHandle,
    sink: Sink,
}

impl RodioSink {
    pub fn new() -> AvatarResult<Self> {
        let (stream, stream_handle) = OutputStream::try_default()
            .map_err(|e| AvatarError::AudioDevice(e.to_string()))?;
        let sink = Sink::try_new(&stream_handle)
            .map_err(|e| AvatarError::AudioDevice(e.to_string()))?;
        Ok(Self {
            _stream: stream,
            _stream_handle: stream_handle,
            sink,
        })
    }
}

impl AudioSink for RodioSink {
    fn play(&self, bytes: &[u8]) -> AvatarResult<()> {
        self.sink.stop();
        let cursor = Cursor::new(bytes.to_vec());
        let source = rodio::Decoder::new(cursor)
            .map_err(|e| AvatarError::Decode(e.to_string()))?;
        self.sink.append(source.convert_samples::<f32>());
        self.sink.play();
        Ok(())
    }

    fn stop(&self) {
        self.sink.stop();
    }

    fn is_playing(&self) -> bool {
        !self.sink.empty()
    }
}

enum Completion {
    /// Done when the sink stops playing (natural end; errors complete before
    /// an Active segment is even created).
    AudioEnded,
    /// Done when the fallback timer fires.
    Timer {
        fired: Arc<AtomicBool>,
        _timer: OneShotTimer,
    },
}

struct ActiveSegment {
    segment: ReplySegment,
    started: Instant,
    completion: Completion,
}

/// Drives segments from the queue through playback, exposing the expression,
/// animation, and lip-sync position the blend engine reads each frame.
pub struct PlaybackDriver {
    queue: ReplyQueue,
    sink: Arc<dyn AudioSink>,
    gaze: Arc<GazeFlags>,
    active: Option<ActiveSegment>,
    expression: FacialExpression,
    animation: AnimationClip,
    wink_timer: Option<OneShotTimer>,
}

impl PlaybackDriver {
    pub fn new(sink: Arc<dyn AudioSink>, gaze: Arc<GazeFlags>) -> Self {
        Self {
            queue: ReplyQueue::new(),
            sink,
            gaze,
            active: None,
            expression: FacialExpression::Default,
            animation: AnimationClip::Idle,
            wink_timer: None,
        }
    }

    /// Enqueue one pipeline response and start playing if idle.
    pub fn enqueue_turn(&mut self, segments: impl IntoIterator<Item = ReplySegment>) {
        self.queue.push_turn(segments);
        if self.active.is_none() {
            self.activate_next();
        }
    }

    /// Drop all pending segments and stop any in-progress audio.
    pub fn clear(&mut self) {
        self.queue.clear();
        if self.active.take().is_some() {
            self.sink.stop();
        }
        self.reset_targets();
    }

    /// Per-frame poll: complete the Active segment when its audio has ended
    /// or its fallback timer fired, then activate the next.
    pub fn tick(&mut self) {
        let finished = match &self.active {
            None => return,
            Some(active) => match &active.completion {
                Completion::AudioEnded => !self.sink.is_playing(),
                Completion::Timer { fired, .. } => fired.load(Ordering::Acquire),
            },
        };
        if finished {
            self.active = None;
            self.reset_targets();
            self.activate_next();
        }
    }

    /// Blend target: the Active segment's expression, or default when idle.
    pub fn expression(&self) -> FacialExpression {
        self.expression
    }

    /// The animation clip the renderer should hold.
    pub fn animation(&self) -> AnimationClip {
        self.animation
    }

    /// The Active segment's cue list and current playback position, when it
    /// is an audio segment with lip-sync data.
    pub fn active_lipsync(&self) -> Option<(&MouthCues, f32)> {
        let active = self.active.as_ref()?;
        if !matches!(active.completion, Completion::AudioEnded) {
            return None;
        }
        let cues = active.segment.lipsync.as_ref()?;
        Some((cues, active.started.elapsed().as_secs_f32()))
    }

    /// Exactly one segment is Active at any instant; true while playing.
    pub fn is_busy(&self) -> bool {
        self.active.is_some()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    fn activate_next(&mut self) {
        // Wink segments complete instantly, so keep pulling until a segment
        // actually occupies the Active slot or the queue drains.
        while self.active.is_none() {
            let Some(segment) = self.queue.pop_front() else {
                return;
            };
            self.start_segment(segment);
        }
    }

    fn start_segment(&mut self, segment: ReplySegment) {
        // Entering Active: silence whatever was still playing.
        self.sink.stop();
        self.expression = segment.facial_expression;
        self.animation = segment.animation;
        info!(
            text = %segment.text,
            expression = ?segment.facial_expression,
            animation = ?segment.animation,
            "segment active"
        );

        if let Some(SpecialAction::Wink) = segment.special_action {
            self.fire_wink();
            // Instantaneous: straight to Done, the loop pulls the next head.
            self.reset_targets();
            return;
        }

        if let Some(encoded) = segment.audio.as_deref() {
            match BASE64.decode(encoded) {
                Ok(bytes) => match self.sink.play(&bytes) {
                    Ok(()) => {
                        self.active = Some(ActiveSegment {
                            segment,
                            started: Instant::now(),
                            completion: Completion::AudioEnded,
                        });
                        return;
                    }
                    Err(e) => {
                        // Treated identically to natural completion.
                        warn!("audio playback failed, advancing: {}", e);
                        self.reset_targets();
                        return;
                    }
                },
                Err(e) => {
                    warn!("audio decode failed, advancing: {}", e);
                    self.reset_targets();
                    return;
                }
            }
        }

        // Silent segment: hold expression/animation for a fixed beat.
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let timer = OneShotTimer::spawn(SILENT_SEGMENT_HOLD, move || {
            flag.store(true, Ordering::Release);
        });
        self.active = Some(ActiveSegment {
            segment,
            started: Instant::now(),
            completion: Completion::Timer {
                fired,
                _timer: timer,
            },
        });
    }

    fn fire_wink(&mut self) {
        self.gaze.set_wink_left(true);
        let gaze = Arc::clone(&self.gaze);
        // Replacing the handle cancels a still-pending clear from an earlier wink.
        self.wink_timer = Some(OneShotTimer::spawn(WINK_HOLD, move || {
            gaze.set_wink_left(false);
        }));
    }

    fn reset_targets(&mut self) {
        self.expression = FacialExpression::Default;
        self.animation = AnimationClip::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medsim_core::{Viseme, VisemeCue};
    use std::sync::Mutex;

    /// Scripted sink: records plays, completes when told to.
    #[derive(Default)]
    struct FakeSink {
        playing: AtomicBool,
        fail_play: AtomicBool,
        played_texts: Mutex<Vec<usize>>,
    }

    impl FakeSink {
        fn finish_clip(&self) {
            self.playing.store(false, Ordering::Release);
        }

        fn play_count(&self) -> usize {
            self.played_texts.lock().unwrap().len()
        }
    }

    impl AudioSink for FakeSink {
        fn play(&self, bytes: &[u8]) -> AvatarResult<()> {
            if self.fail_play.load(Ordering::Acquire) {
                return Err(AvatarError::Playback("device gone".into()));
            }
            self.played_texts.lock().unwrap().push(bytes.len());
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

    fn audio_segment(text: &str) -> ReplySegment {
        ReplySegment {
            audio: Some(BASE64.encode(text.as_bytes())),
            lipsync: Some(MouthCues {
                mouth_cues: vec![VisemeCue { start: 0.0, end: 9.0, value: Viseme::B }],
            }),
            ..ReplySegment::spoken(text, FacialExpression::Worried, AnimationClip::Talking1)
        }
    }

    fn silent_segment(text: &str) -> ReplySegment {
        ReplySegment::spoken(text, FacialExpression::Sad, AnimationClip::Talking2)
    }

    fn wink_segment() -> ReplySegment {
        ReplySegment {
            special_action: Some(SpecialAction::Wink),
            ..ReplySegment::spoken("*cligne des yeux*", FacialExpression::Smile, AnimationClip::Idle)
        }
    }

    fn driver_with_sink() -> (PlaybackDriver, Arc<FakeSink>, Arc<GazeFlags>) {
        let sink = Arc::new(FakeSink::default());
        let gaze = Arc::new(GazeFlags::default());
        let driver = PlaybackDriver::new(
            Arc::clone(&sink) as Arc<dyn AudioSink>,
            Arc::clone(&gaze),
        );
        (driver, sink, gaze)
    }

    #[tokio::test]
    async fn plays_segments_strictly_in_order_one_active() {
        let (mut driver, sink, _) = driver_with_sink();
        driver.enqueue_turn([audio_segment("a"), audio_segment("b"), audio_segment("c")]);

        assert!(driver.is_busy());
        assert_eq!(sink.play_count(), 1);
        assert_eq!(driver.pending(), 2);

        // Still playing: tick must not advance.
        driver.tick();
        assert_eq!(sink.play_count(), 1);

        sink.finish_clip();
        driver.tick();
        assert_eq!(sink.play_count(), 2);
        sink.finish_clip();
        driver.tick();
        assert_eq!(sink.play_count(), 3);
        sink.finish_clip();
        driver.tick();
        assert!(!driver.is_busy());
        assert_eq!(driver.pending(), 0);
    }

    #[tokio::test]
    async fn active_segment_applies_and_resets_blend_targets() {
        let (mut driver, sink, _) = driver_with_sink();
        driver.enqueue_turn([audio_segment("a")]);
        assert_eq!(driver.expression(), FacialExpression::Worried);
        assert_eq!(driver.animation(), AnimationClip::Talking1);

        sink.finish_clip();
        driver.tick();
        assert_eq!(driver.expression(), FacialExpression::Default);
        assert_eq!(driver.animation(), AnimationClip::Idle);
    }

    #[tokio::test]
    async fn wink_segment_is_instantaneous_and_sets_the_flag() {
        let (mut driver, sink, gaze) = driver_with_sink();
        driver.enqueue_turn([wink_segment(), audio_segment("après")]);

        // The wink completed on enqueue and the audio segment is already up.
        assert!(gaze.wink_left());
        assert!(driver.is_busy());
        assert_eq!(sink.play_count(), 1);
        assert_eq!(driver.expression(), FacialExpression::Worried);

        // The wink clears on its own timer.
        tokio::time::sleep(WINK_HOLD + Duration::from_millis(50)).await;
        assert!(!gaze.wink_left());
    }

    #[tokio::test(start_paused = true)]
    async fn silent_segment_completes_after_fixed_hold() {
        let (mut driver, _sink, _) = driver_with_sink();
        driver.enqueue_turn([silent_segment("...")]);
        assert!(driver.is_busy());

        tokio::time::sleep(Duration::from_millis(1900)).await;
        driver.tick();
        assert!(driver.is_busy());

        tokio::time::sleep(Duration::from_millis(200)).await;
        driver.tick();
        assert!(!driver.is_busy());
        assert_eq!(driver.expression(), FacialExpression::Default);
    }

    #[tokio::test]
    async fn playback_error_advances_like_completion() {
        let (mut driver, sink, _) = driver_with_sink();
        sink.fail_play.store(true, Ordering::Release);
        driver.enqueue_turn([audio_segment("broken")]);
        // The failed segment never occupies the Active slot.
        assert!(!driver.is_busy());
        assert_eq!(driver.expression(), FacialExpression::Default);

        // A later healthy segment still plays.
        sink.fail_play.store(false, Ordering::Release);
        driver.enqueue_turn([audio_segment("fine")]);
        assert!(driver.is_busy());
    }

    #[tokio::test]
    async fn undecodable_audio_advances_like_completion() {
        let (mut driver, _sink, _) = driver_with_sink();
        let mut seg = audio_segment("x");
        seg.audio = Some("%%% not base64 %%%".into());
        driver.enqueue_turn([seg]);
        assert!(!driver.is_busy());
    }

    #[tokio::test]
    async fn clear_stops_audio_and_drops_pending() {
        let (mut driver, sink, _) = driver_with_sink();
        driver.enqueue_turn([audio_segment("a"), audio_segment("b")]);
        assert!(sink.is_playing());

        driver.clear();
        assert!(!sink.is_playing());
        assert!(!driver.is_busy());
        assert_eq!(driver.pending(), 0);
        assert_eq!(driver.expression(), FacialExpression::Default);
    }

    #[tokio::test]
    async fn lipsync_exposed_only_while_audio_is_active() {
        let (mut driver, sink, _) = driver_with_sink();
        driver.enqueue_turn([audio_segment("a")]);
        let (cues, t) = driver.active_lipsync().expect("active lipsync");
        assert_eq!(cues.mouth_cues.len(), 1);
        assert!(t >= 0.0);

        sink.finish_clip();
        driver.tick();
        assert!(driver.active_lipsync().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn silent_segment_has_no_lipsync() {
        let (mut driver, _sink, _) = driver_with_sink();
        driver.enqueue_turn([silent_segment("...")]);
        assert!(driver.active_lipsync().is_none());
    }
}
