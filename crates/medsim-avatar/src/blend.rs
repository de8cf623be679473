//! Per-frame morph-target blending.
//!
//! Each frame, every morph target's weight moves toward a target value by
//! linear interpolation: expression targets toward the active preset (0 when
//! absent), blink targets toward the blink/wink flags, and viseme targets
//! toward 1 for the single active cue and 0 for the rest. Rates are fixed
//! per-frame coefficients, carried over from the tuned avatar.

use medsim_core::{
    expression_preset, is_blink_target, FacialExpression, MouthCues, BLINK_LEFT_TARGET,
    BLINK_RIGHT_TARGET, VISEME_TARGETS,
};
use std::collections::BTreeMap;

/// Fixed per-frame interpolation rates.
#[derive(Debug, Clone, Copy)]
pub struct BlendConfig {
    /// Expression targets chase the preset at this rate.
    pub expression_rate: f32,
    /// Blink targets snap faster than expressions.
    pub blink_rate: f32,
    /// The active viseme's target chases 1 at this rate.
    pub viseme_attack_rate: f32,
    /// Inactive viseme targets decay toward 0 at this rate.
    pub viseme_release_rate: f32,
}

impl Default for BlendConfig {
    fn default() -> Self {
        Self {
            expression_rate: 0.1,
            blink_rate: 0.5,
            viseme_attack_rate: 0.2,
            viseme_release_rate: 0.1,
        }
    }
}

/// Everything one frame needs: the held expression, the lid flags, and the
/// active lip-sync timeline with the current playback position in seconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameInput<'a> {
    pub expression: FacialExpression,
    pub blink_left: bool,
    pub blink_right: bool,
    pub lipsync: Option<(&'a MouthCues, f32)>,
}

/// Interpolated weight of every morph target known to the model. Mutated once
/// per rendered frame; updates are idempotent and order-independent across
/// targets within a frame.
#[derive(Debug)]
pub struct BlendEngine {
    weights: BTreeMap<String, f32>,
    config: BlendConfig,
    /// When set, automatic blending is frozen so weights can be posed by hand.
    setup_mode: bool,
}

impl BlendEngine {
    /// Build from the model's morph-target dictionary. The blink and viseme
    /// targets are always registered, whether or not the caller lists them.
    pub fn new(targets: impl IntoIterator<Item = String>) -> Self {
        let mut weights: BTreeMap<String, f32> = targets.into_iter().map(|t| (t, 0.0)).collect();
        weights.entry(BLINK_LEFT_TARGET.to_string()).or_insert(0.0);
        weights.entry(BLINK_RIGHT_TARGET.to_string()).or_insert(0.0);
        for target in VISEME_TARGETS {
            weights.entry((*target).to_string()).or_insert(0.0);
        }
        Self {
            weights,
            config: BlendConfig::default(),
            setup_mode: false,
        }
    }

    pub fn with_config(mut self, config: BlendConfig) -> Self {
        self.config = config;
        self
    }

    /// Freeze or resume automatic blending.
    pub fn set_setup_mode(&mut self, on: bool) {
        self.setup_mode = on;
    }

    pub fn setup_mode(&self) -> bool {
        self.setup_mode
    }

    /// Pose a target directly. Only honored in setup mode.
    pub fn pose(&mut self, target: &str, value: f32) {
        if !self.setup_mode {
            return;
        }
        if let Some(weight) = self.weights.get_mut(target) {
            *weight = value.clamp(0.0, 1.0);
        }
    }

    /// Current interpolated weight, 0 for unknown targets.
    pub fn weight(&self, target: &str) -> f32 {
        self.weights.get(target).copied().unwrap_or(0.0)
    }

    /// All weights, for handing to the renderer.
    pub fn weights(&self) -> impl Iterator<Item = (&str, f32)> {
        self.weights.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Advance every weight one frame toward its target.
    pub fn update(&mut self, frame: FrameInput<'_>) {
        if self.setup_mode {
            return;
        }

        let preset = expression_preset(frame.expression);
        let config = self.config;

        // The cue window is [start, end); with non-overlapping cues the
        // first-match scan is only a tie-break against malformed input.
        let active_viseme = frame
            .lipsync
            .and_then(|(cues, t)| cues.active_cue(t))
            .map(|cue| cue.value.morph_target());

        for (target, weight) in self.weights.iter_mut() {
            if is_blink_target(target) {
                let closed = if target.as_str() == BLINK_LEFT_TARGET {
                    frame.blink_left
                } else {
                    frame.blink_right
                };
                let goal = if closed { 1.0 } else { 0.0 };
                *weight = lerp(*weight, goal, config.blink_rate);
            } else if VISEME_TARGETS.contains(&target.as_str()) {
                if Some(target.as_str()) == active_viseme {
                    *weight = lerp(*weight, 1.0, config.viseme_attack_rate);
                } else {
                    *weight = lerp(*weight, 0.0, config.viseme_release_rate);
                }
            } else {
                let goal = preset
                    .iter()
                    .find(|(name, _)| *name == target.as_str())
                    .map(|(_, value)| *value)
                    .unwrap_or(0.0);
                *weight = lerp(*weight, goal, config.expression_rate);
            }
        }
    }
}

fn lerp(current: f32, goal: f32, rate: f32) -> f32 {
    current + (goal - current) * rate
}
