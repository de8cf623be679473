//! The turn pipeline: one doctor utterance in, ordered reply segments out.
//!
//! Strictly sequential per turn: persona prompt → language model → typed
//! decode → per-segment speech synthesis and phoneme alignment, index by
//! index. Turns themselves are serialized behind an async mutex — a second
//! `/chat` waits for the first instead of interleaving external-process work,
//! and artifacts are keyed by a per-turn uuid besides.
//!
//! Failure policy (the patient always says something):
//! - empty/absent message → fixed two-segment introduction;
//! - missing credentials → fixed two-segment technical-difficulty reply;
//! - unparsable model output → single clarification segment, absorbed;
//! - one segment's synthesis/alignment failure → that segment plays silent
//!   (`audio: null, lipsync: null`), siblings unaffected;
//! - anything else → `Err`, which the handler maps to HTTP 500 with the
//!   single distress segment.

use crate::error::{GatewayError, GatewayResult};
use crate::lipsync::{audio_file_to_base64, read_cue_file, CueExtractor};
use crate::llm::ChatModel;
use crate::tts::SpeechSynth;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use medsim_core::{
    build_patient_prompt, clarification_reply, introduction_reply, parse_reply_segments,
    technical_difficulty_reply, ChatResponse, ReplySegment, SimulationConfig,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

/// External collaborators of one turn. `None` backends mean the gateway runs
/// without credentials and every turn degrades to the scripted reply.
pub struct TurnPipeline {
    config: Arc<SimulationConfig>,
    chat_model: Option<Arc<dyn ChatModel>>,
    synth: Option<Arc<dyn SpeechSynth>>,
    extractor: Arc<dyn CueExtractor>,
    turn_guard: Mutex<()>,
}

impl TurnPipeline {
    pub fn new(
        config: Arc<SimulationConfig>,
        chat_model: Option<Arc<dyn ChatModel>>,
        synth: Option<Arc<dyn SpeechSynth>>,
        extractor: Arc<dyn CueExtractor>,
    ) -> Self {
        Self {
            config,
            chat_model,
            synth,
            extractor,
            turn_guard: Mutex::new(()),
        }
    }

    /// Run one turn. `Ok` covers every absorbed failure path; `Err` is the
    /// terminal case the handler serves as 500 + distress.
    pub async fn run_turn(&self, message: Option<&str>) -> GatewayResult<ChatResponse> {
        let _turn = self.turn_guard.lock().await;

        let message = message.map(str::trim).filter(|m| !m.is_empty());
        let Some(message) = message else {
            return Ok(self.scripted_reply(introduction_reply(), "intro").await);
        };

        let (Some(chat_model), Some(synth)) = (&self.chat_model, &self.synth) else {
            info!("credentials unset, serving technical-difficulty reply");
            return Ok(self.scripted_reply(technical_difficulty_reply(), "api").await);
        };

        let prompt = build_patient_prompt(message);
        let raw = chat_model.generate(&prompt).await?;

        let mut segments = match parse_reply_segments(&raw).map_err(GatewayError::from) {
            Ok(segments) => segments,
            Err(e) => {
                warn!("{}, substituting clarification", e);
                clarification_reply()
            }
        };

        let turn_id = Uuid::new_v4();
        for (index, segment) in segments.iter_mut().enumerate() {
            info!(
                index,
                expression = ?segment.facial_expression,
                animation = ?segment.animation,
                "enriching segment"
            );
            self.enrich_segment(synth.as_ref(), turn_id, index, segment)
                .await;
        }

        Ok(ChatResponse { messages: segments })
    }

    /// Synthesize and align one segment. Failures null the segment's audio
    /// and lipsync; siblings and the request are unaffected.
    async fn enrich_segment(
        &self,
        synth: &dyn SpeechSynth,
        turn_id: Uuid,
        index: usize,
        segment: &mut ReplySegment,
    ) {
        let stem = format!("{turn_id}_{index}");
        let result = async {
            let mp3 = synth.synthesize(&segment.text).await?;
            let cues = self.extractor.extract(&stem, &mp3).await?;
            GatewayResult::Ok((mp3, cues))
        }
        .await;

        match result {
            Ok((mp3, cues)) => {
                segment.audio = Some(BASE64.encode(&mp3));
                segment.lipsync = Some(cues);
            }
            Err(e) => {
                warn!(index, "segment audio failed, playing silent: {}", e);
                segment.audio = None;
                segment.lipsync = None;
            }
        }
    }

    /// Attach prerecorded audio to a scripted reply when the clips exist on
    /// disk (`{prefix}_{index}.wav` / `.json` under the audio dir). A missing
    /// clip leaves that segment silent — and a silent segment never carries a
    /// timeline.
    async fn scripted_reply(&self, mut segments: Vec<ReplySegment>, prefix: &str) -> ChatResponse {
        for (index, segment) in segments.iter_mut().enumerate() {
            let wav = self.config.audio_dir.join(format!("{prefix}_{index}.wav"));
            match audio_file_to_base64(&wav).await {
                Some(audio) => {
                    let cue_path = self.config.audio_dir.join(format!("{prefix}_{index}.json"));
                    segment.audio = Some(audio);
                    segment.lipsync = Some(read_cue_file(&cue_path).await);
                }
                None => {
                    segment.audio = None;
                    segment.lipsync = None;
                }
            }
        }
        ChatResponse { messages: segments }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use async_trait::async_trait;
    use medsim_core::{AnimationClip, FacialExpression, MouthCues, Viseme, VisemeCue};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedModel {
        reply: String,
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn generate(&self, _prompt: &str) -> GatewayResult<String> {
            Ok(self.reply.clone())
        }
    }

    struct FailingModel;

    #[async_trait]
    impl ChatModel for FailingModel {
        async fn generate(&self, _prompt: &str) -> GatewayResult<String> {
            Err(GatewayError::Llm("upstream down".into()))
        }
    }

    /// Synth that fails on a chosen segment index.
    struct CountingSynth {
        calls: AtomicUsize,
        fail_on: Option<usize>,
    }

    impl CountingSynth {
        fn new(fail_on: Option<usize>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_on,
            }
        }
    }

    #[async_trait]
    impl SpeechSynth for CountingSynth {
        async fn synthesize(&self, text: &str) -> GatewayResult<Vec<u8>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on == Some(call) {
                return Err(GatewayError::Tts("quota exceeded".into()));
            }
            Ok(text.as_bytes().to_vec())
        }

        async fn voices(&self) -> GatewayResult<serde_json::Value> {
            Ok(serde_json::json!({ "voices": [] }))
        }
    }

    struct FixedExtractor;

    #[async_trait]
    impl CueExtractor for FixedExtractor {
        async fn extract(&self, _stem: &str, _mp3: &[u8]) -> GatewayResult<MouthCues> {
            Ok(MouthCues {
                mouth_cues: vec![VisemeCue { start: 0.0, end: 0.2, value: Viseme::X }],
            })
        }
    }

    struct FailingExtractor;

    #[async_trait]
    impl CueExtractor for FailingExtractor {
        async fn extract(&self, _stem: &str, _mp3: &[u8]) -> GatewayResult<MouthCues> {
            Err(GatewayError::Alignment("rhubarb not found".into()))
        }
    }

    fn config_with_credentials() -> Arc<SimulationConfig> {
        Arc::new(SimulationConfig {
            gemini_api_key: Some("test".into()),
            eleven_labs_api_key: Some("test".into()),
            ..SimulationConfig::default()
        })
    }

    fn pipeline_with(reply: &str, fail_on: Option<usize>) -> TurnPipeline {
        TurnPipeline::new(
            config_with_credentials(),
            Some(Arc::new(ScriptedModel { reply: reply.to_string() })),
            Some(Arc::new(CountingSynth::new(fail_on))),
            Arc::new(FixedExtractor),
        )
    }

    const TWO_SEGMENTS: &str = r#"```json
{"messages":[
  {"text":"Bonjour docteur.","facialExpression":"smile","animation":"Talking_0"},
  {"text":"J'ai mal à la tête.","facialExpression":"pain","animation":"Talking_1"}
]}
```"#;

    #[tokio::test]
    async fn empty_message_yields_fixed_introduction() {
        let pipeline = pipeline_with(TWO_SEGMENTS, None);
        for message in [None, Some(""), Some("   ")] {
            let response = pipeline.run_turn(message).await.unwrap();
            assert_eq!(response.messages.len(), 2);
            assert_eq!(response.messages[0].facial_expression, FacialExpression::Worried);
            assert_eq!(response.messages[1].facial_expression, FacialExpression::Sad);
            // No prerecorded clips on disk: silent, and never lipsync without audio.
            assert!(response.messages[0].audio.is_none());
            assert!(response.messages[0].lipsync.is_none());
        }
    }

    #[tokio::test]
    async fn missing_credentials_yield_technical_difficulty() {
        let pipeline = TurnPipeline::new(
            Arc::new(SimulationConfig::default()),
            None,
            None,
            Arc::new(FixedExtractor),
        );
        let response = pipeline.run_turn(Some("Bonjour")).await.unwrap();
        assert_eq!(response.messages.len(), 2);
        assert_eq!(response.messages[0].facial_expression, FacialExpression::Worried);
        assert_eq!(response.messages[0].animation, AnimationClip::Terrified);
    }

    #[tokio::test]
    async fn reply_length_and_order_are_preserved() {
        let pipeline = pipeline_with(TWO_SEGMENTS, None);
        let response = pipeline.run_turn(Some("Où avez-vous mal ?")).await.unwrap();
        assert_eq!(response.messages.len(), 2);
        assert_eq!(response.messages[0].text, "Bonjour docteur.");
        assert_eq!(response.messages[1].text, "J'ai mal à la tête.");
        for segment in &response.messages {
            assert!(segment.audio.is_some());
            let cues = segment.lipsync.as_ref().unwrap();
            assert_eq!(cues.mouth_cues.len(), 1);
        }
    }

    #[tokio::test]
    async fn non_json_reply_becomes_single_clarification() {
        let pipeline = pipeline_with("Je ne peux pas répondre en JSON, désolé.", None);
        let response = pipeline.run_turn(Some("Bonjour")).await.unwrap();
        assert_eq!(response.messages.len(), 1);
        assert_eq!(response.messages[0].facial_expression, FacialExpression::Worried);
        assert_eq!(response.messages[0].animation, AnimationClip::Talking0);
        // The fallback still goes through audio enrichment.
        assert!(response.messages[0].audio.is_some());
    }

    #[tokio::test]
    async fn one_segment_audio_failure_spares_siblings() {
        let pipeline = pipeline_with(TWO_SEGMENTS, Some(0));
        let response = pipeline.run_turn(Some("Bonjour")).await.unwrap();
        assert_eq!(response.messages.len(), 2);
        assert!(response.messages[0].audio.is_none());
        assert!(response.messages[0].lipsync.is_none());
        assert!(response.messages[1].audio.is_some());
        assert!(response.messages[1].lipsync.is_some());
    }

    #[tokio::test]
    async fn alignment_failure_silences_the_segment() {
        let pipeline = TurnPipeline::new(
            config_with_credentials(),
            Some(Arc::new(ScriptedModel { reply: TWO_SEGMENTS.to_string() })),
            Some(Arc::new(CountingSynth::new(None))),
            Arc::new(FailingExtractor),
        );
        let response = pipeline.run_turn(Some("Bonjour")).await.unwrap();
        for segment in &response.messages {
            assert!(segment.audio.is_none());
            assert!(segment.lipsync.is_none());
        }
    }

    #[tokio::test]
    async fn model_failure_is_terminal() {
        let pipeline = TurnPipeline::new(
            config_with_credentials(),
            Some(Arc::new(FailingModel)),
            Some(Arc::new(CountingSynth::new(None))),
            Arc::new(FixedExtractor),
        );
        let result = pipeline.run_turn(Some("Bonjour")).await;
        assert!(matches!(result, Err(GatewayError::Llm(_))));
    }

    #[tokio::test]
    async fn introduction_is_idempotent() {
        let pipeline = pipeline_with(TWO_SEGMENTS, None);
        let first = pipeline.run_turn(None).await.unwrap();
        let _ = pipeline.run_turn(Some("Bonjour")).await.unwrap();
        let second = pipeline.run_turn(None).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn scripted_reply_attaches_prerecorded_clips_when_present() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("intro_0.wav"), b"RIFF").await.unwrap();
        tokio::fs::write(
            dir.path().join("intro_0.json"),
            r#"{"mouthCues":[{"start":0.0,"end":0.5,"value":"D"}]}"#,
        )
        .await
        .unwrap();

        let config = Arc::new(SimulationConfig {
            audio_dir: dir.path().to_path_buf(),
            ..SimulationConfig::default()
        });
        let pipeline = TurnPipeline::new(config, None, None, Arc::new(FixedExtractor));
        let response = pipeline.run_turn(None).await.unwrap();

        assert!(response.messages[0].audio.is_some());
        assert_eq!(response.messages[0].lipsync.as_ref().unwrap().mouth_cues.len(), 1);
        // intro_1 has no clip: silent with no timeline.
        assert!(response.messages[1].audio.is_none());
        assert!(response.messages[1].lipsync.is_none());
    }
}
