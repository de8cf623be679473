//! Scripted in-character replies.
//!
//! Every failure mode degrades to one of these instead of a technical error:
//! the user-visible contract is that the patient always says something. The
//! lines are fixed; the gateway may attach prerecorded audio to the intro and
//! technical-difficulty segments when the clips exist on disk.

use crate::segment::{AnimationClip, FacialExpression, ReplySegment};

/// Greeting played when the doctor opens the consultation without saying
/// anything (empty or absent message). Always exactly these two segments, in
/// this order, independent of prior calls.
pub fn introduction_reply() -> Vec<ReplySegment> {
    vec![
        ReplySegment::spoken(
            "Bonjour docteur... Je ne me sens pas très bien aujourd'hui.",
            FacialExpression::Worried,
            AnimationClip::Talking1,
        ),
        ReplySegment::spoken(
            "J'ai des maux de tête et je me sens fatigué depuis quelques jours...",
            FacialExpression::Sad,
            AnimationClip::Talking2,
        ),
    ]
}

/// Reply when the external-service credentials are not configured. The
/// request still succeeds; the patient stays in character.
pub fn technical_difficulty_reply() -> Vec<ReplySegment> {
    vec![
        ReplySegment::spoken(
            "Désolé docteur, il y a un problème technique avec mes systèmes...",
            FacialExpression::Worried,
            AnimationClip::Terrified,
        ),
        ReplySegment::spoken(
            "J'espère que vous pourrez quand même m'aider...",
            FacialExpression::Sad,
            AnimationClip::Talking0,
        ),
    ]
}

/// Substitute for an unparsable language-model reply.
pub fn clarification_reply() -> Vec<ReplySegment> {
    vec![ReplySegment::spoken(
        "Excusez-moi docteur, je n'ai pas bien compris votre question...",
        FacialExpression::Worried,
        AnimationClip::Talking0,
    )]
}

/// Terminal fallback for any unanticipated pipeline error (served with
/// HTTP 500, no partial results).
pub fn distress_reply() -> Vec<ReplySegment> {
    vec![ReplySegment::spoken(
        "Je ne me sens vraiment pas bien docteur...",
        FacialExpression::Pain,
        AnimationClip::Crying,
    )]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn introduction_is_worried_then_sad() {
        let reply = introduction_reply();
        assert_eq!(reply.len(), 2);
        assert_eq!(reply[0].facial_expression, FacialExpression::Worried);
        assert_eq!(reply[1].facial_expression, FacialExpression::Sad);
    }

    #[test]
    fn scripted_replies_ship_without_audio() {
        for segment in introduction_reply()
            .into_iter()
            .chain(technical_difficulty_reply())
            .chain(clarification_reply())
            .chain(distress_reply())
        {
            assert!(segment.audio.is_none());
            assert!(segment.lipsync.is_none());
            assert!(segment.special_action.is_none());
        }
    }

    #[test]
    fn distress_is_a_single_crying_segment() {
        let reply = distress_reply();
        assert_eq!(reply.len(), 1);
        assert_eq!(reply[0].facial_expression, FacialExpression::Pain);
        assert_eq!(reply[0].animation, AnimationClip::Crying);
    }
}
