//! Static facial-expression presets and the viseme → morph-target map.
//!
//! A preset maps morph-target names to target weights in `[0, 1]`; targets a
//! preset omits implicitly aim for 0. The tables are process-wide static data
//! tuned against the avatar mesh and never mutated at runtime; weights are
//! raw slider captures rounded to two decimals. The two blink
//! targets are deliberately absent from every preset — they are owned by the
//! blink/wink flags, not by expressions.

use crate::segment::{FacialExpression, Viseme};

/// Morph target closed by the blink flag or a left wink.
pub const BLINK_LEFT_TARGET: &str = "eyeBlinkLeft";
/// Morph target closed by the blink flag or a right wink.
pub const BLINK_RIGHT_TARGET: &str = "eyeBlinkRight";

/// Distinct mouth-shape morph targets the lip-sync loop drives. `A` and `X`
/// share `viseme_PP`, so this is shorter than the phoneme-class alphabet.
pub const VISEME_TARGETS: &[&str] = &[
    "viseme_PP",
    "viseme_kk",
    "viseme_I",
    "viseme_AA",
    "viseme_O",
    "viseme_U",
    "viseme_FF",
    "viseme_TH",
];

impl Viseme {
    /// The morph target this phoneme class drives.
    pub fn morph_target(self) -> &'static str {
        match self {
            Viseme::A => "viseme_PP",
            Viseme::B => "viseme_kk",
            Viseme::C => "viseme_I",
            Viseme::D => "viseme_AA",
            Viseme::E => "viseme_O",
            Viseme::F => "viseme_U",
            Viseme::G => "viseme_FF",
            Viseme::H => "viseme_TH",
            Viseme::X => "viseme_PP",
        }
    }
}

/// Whether `target` is one of the two blink targets, which expression presets
/// must never touch.
pub fn is_blink_target(target: &str) -> bool {
    target == BLINK_LEFT_TARGET || target == BLINK_RIGHT_TARGET
}

/// The weight table for an expression. Lookup is by morph-target name;
/// absent entries target 0.
pub fn expression_preset(expression: FacialExpression) -> &'static [(&'static str, f32)] {
    match expression {
        FacialExpression::Default => &[],
        FacialExpression::Smile => SMILE,
        FacialExpression::FunnyFace => FUNNY_FACE,
        FacialExpression::Sad => SAD,
        FacialExpression::Surprised => SURPRISED,
        FacialExpression::Angry => ANGRY,
        FacialExpression::Crazy => CRAZY,
        FacialExpression::Pain => PAIN,
        FacialExpression::Worried => WORRIED,
    }
}

const SMILE: &[(&str, f32)] = &[
    ("browInnerUp", 0.17),
    ("eyeSquintLeft", 0.4),
    ("eyeSquintRight", 0.44),
    ("noseSneerLeft", 0.17),
    ("noseSneerRight", 0.14),
    ("mouthPressLeft", 0.61),
    ("mouthPressRight", 0.41),
];

const FUNNY_FACE: &[(&str, f32)] = &[
    ("jawLeft", 0.63),
    ("mouthPucker", 0.53),
    ("noseSneerLeft", 1.0),
    ("noseSneerRight", 0.39),
    ("mouthLeft", 1.0),
    ("eyeLookUpLeft", 1.0),
    ("eyeLookUpRight", 1.0),
    ("cheekPuff", 1.0),
    ("mouthDimpleLeft", 0.41),
    ("mouthRollLower", 0.32),
    ("mouthSmileLeft", 0.35),
    ("mouthSmileRight", 0.35),
];

const SAD: &[(&str, f32)] = &[
    ("mouthFrownLeft", 1.0),
    ("mouthFrownRight", 1.0),
    ("mouthShrugLower", 0.78),
    ("browInnerUp", 0.45),
    ("eyeSquintLeft", 0.72),
    ("eyeSquintRight", 0.75),
    ("eyeLookDownLeft", 0.5),
    ("eyeLookDownRight", 0.5),
    ("jawForward", 1.0),
];

const SURPRISED: &[(&str, f32)] = &[
    ("eyeWideLeft", 0.5),
    ("eyeWideRight", 0.5),
    ("jawOpen", 0.35),
    ("mouthFunnel", 1.0),
    ("browInnerUp", 1.0),
];

const ANGRY: &[(&str, f32)] = &[
    ("browDownLeft", 1.0),
    ("browDownRight", 1.0),
    ("eyeSquintLeft", 1.0),
    ("eyeSquintRight", 1.0),
    ("jawForward", 1.0),
    ("jawLeft", 1.0),
    ("mouthShrugLower", 1.0),
    ("noseSneerLeft", 1.0),
    ("noseSneerRight", 0.42),
    ("eyeLookDownLeft", 0.16),
    ("eyeLookDownRight", 0.16),
    ("cheekSquintLeft", 1.0),
    ("cheekSquintRight", 1.0),
    ("mouthClose", 0.23),
    ("mouthFunnel", 0.63),
    ("mouthDimpleRight", 1.0),
];

const CRAZY: &[(&str, f32)] = &[
    ("browInnerUp", 0.9),
    ("jawForward", 1.0),
    ("noseSneerLeft", 0.57),
    ("noseSneerRight", 0.51),
    ("eyeLookDownLeft", 0.39),
    ("eyeLookUpRight", 0.4),
    ("eyeLookInLeft", 0.96),
    ("eyeLookInRight", 0.96),
    ("jawOpen", 0.96),
    ("mouthDimpleLeft", 0.96),
    ("mouthDimpleRight", 0.96),
    ("mouthStretchLeft", 0.28),
    ("mouthStretchRight", 0.29),
    ("mouthSmileLeft", 0.56),
    ("mouthSmileRight", 0.38),
    ("tongueOut", 0.96),
];

// Clinical expressions used by the patient persona.
const PAIN: &[(&str, f32)] = &[
    ("browDownLeft", 0.8),
    ("browDownRight", 0.8),
    ("eyeSquintLeft", 0.7),
    ("eyeSquintRight", 0.7),
    ("mouthFrownLeft", 0.6),
    ("mouthFrownRight", 0.6),
];

const WORRIED: &[(&str, f32)] = &[
    ("browInnerUp", 0.6),
    ("eyeLookDownLeft", 0.3),
    ("eyeLookDownRight", 0.3),
    ("mouthFrownLeft", 0.4),
    ("mouthFrownRight", 0.4),
];
