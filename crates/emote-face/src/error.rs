//! Error types for the emote-face crate.
//!
//! Nothing in this crate is fatal to the host. Errors are returned by the
//! building and playback entry points so callers can log them; the facade in
//! `emote-core` turns runtime errors into logged no-ops.

use emote_types::{ClipHandle, EmotionId, PhonemeId, ReactionId, SpeechClipId};

/// Errors raised while building or driving the face.
#[derive(Debug, thiserror::Error)]
pub enum FaceError {
    /// No emotion with this id exists.
    #[error("unknown emotion: {0}")]
    UnknownEmotion(EmotionId),

    /// No phoneme with this id exists.
    #[error("unknown phoneme: {0}")]
    UnknownPhoneme(PhonemeId),

    /// No speech clip with this id exists.
    #[error("unknown speech clip: {0}")]
    UnknownSpeechClip(SpeechClipId),

    /// No reaction with this id exists.
    #[error("unknown reaction: {0}")]
    UnknownReaction(ReactionId),

    /// A name lookup failed.
    #[error("no {kind} named {name:?}")]
    UnknownName {
        /// What was being looked up (emotion, phoneme, clip, reaction).
        kind: &'static str,
        /// The name that did not resolve.
        name: String,
    },

    /// An index lookup was out of range.
    #[error("no {kind} at index {index}")]
    UnknownIndex {
        /// What was being looked up.
        kind: &'static str,
        /// The out-of-range index.
        index: usize,
    },

    /// Two definitions share a name.
    #[error("duplicate {kind} name: {name:?}")]
    DuplicateName {
        /// What kind of definition collided.
        kind: &'static str,
        /// The colliding name.
        name: String,
    },

    /// The clip has no decoded sample buffer.
    #[error("speech clip {clip} could not be sampled: {source}")]
    ClipNotDecodable {
        /// The clip that failed.
        clip: SpeechClipId,
        /// Why the audio collaborator refused.
        source: AudioError,
    },

    /// The audio output is playing something this engine did not start.
    #[error("audio output busy, cannot play {0}")]
    AudioBusy(SpeechClipId),

    /// No audio collaborator was supplied.
    #[error("no audio output available")]
    NoAudioOutput,

    /// The reaction stage is already bound to another actor.
    #[error("reaction {0} is already active for this stage")]
    ReactionBusy(ReactionId),

    /// The stage is disabled or has no trigger path.
    #[error("reaction {0} stage is not playable")]
    StageUnavailable(ReactionId),
}

/// Errors returned by an [`AudioOutput`](crate::collaborators::AudioOutput)
/// when loading samples.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AudioError {
    /// The asset is compressed or streamed and has no decoded buffer.
    #[error("clip {0} has no decoded sample data")]
    NotDecoded(ClipHandle),

    /// The host does not know the asset.
    #[error("unknown clip {0}")]
    UnknownClip(ClipHandle),
}
