//! Blend-shape channels, blink, gaze, speech and reactions for the Emote
//! facial animation engine.
//!
//! This crate is the logic layer -- everything that decides what weight each
//! blend shape should have and when transitions happen, without touching I/O.
//! It sits between `emote-types` (the data definitions) and `emote-core`
//! (configuration and the per-tick facade). Rendering, skinning and audio are
//! reached only through the [`collaborators`] traits.
//!
//! # Modules
//!
//! - [`blink`] -- Interval/blink timer driving the eyelid channel ([`Blink`])
//! - [`channel`] -- Fade envelopes shared by every channel ([`Channel`])
//! - [`collaborators`] -- Renderer, skeleton and audio traits
//! - [`emotion`] -- Emotion channels and sentiment queries ([`EmotionSet`])
//! - [`error`] -- Error types ([`FaceError`], [`AudioError`])
//! - [`events`] -- Reaction notice subscriptions ([`NoticeBus`])
//! - [`gaze`] -- Idle eye wandering ([`EyeGaze`])
//! - [`phoneme`] -- Phoneme channels and weighted selection ([`PhonemeSet`])
//! - [`random`] -- Range and choice helpers over an injected RNG
//! - [`reaction`] -- Proximity reactions ([`ReactionEngine`])
//! - [`registry`] -- Blend-shape registry and drift detection ([`BlendShapeRegistry`])
//! - [`speech`] -- Amplitude-driven lip-sync ([`SpeechDriver`])

pub mod blink;
pub mod channel;
pub mod collaborators;
pub mod emotion;
pub mod error;
pub mod events;
pub mod gaze;
pub mod phoneme;
pub mod random;
pub mod reaction;
pub mod registry;
pub mod speech;

#[cfg(test)]
pub(crate) mod testing;

// Re-export primary types at crate root for convenience.
pub use blink::{Blink, BlinkPhase};
pub use channel::{Channel, ChannelStep, EmotionShape, Envelope, MIN_DURATION, MIN_PLAY_SPEED};
pub use collaborators::{AudioOutput, ClipSamples, ShapeRenderer, Skeleton};
pub use emotion::{Emotion, EmotionSet};
pub use error::{AudioError, FaceError};
pub use events::{NoticeBus, NoticeCallback, SubscriptionId};
pub use gaze::{EyeGaze, GazePhase};
pub use phoneme::{Phoneme, PhonemeSet, compute_cdf, select_weighted};
pub use reaction::{ActiveStage, Reaction, ReactionContext, ReactionEngine, StageState};
pub use registry::{BlendShape, BlendShapeRegistry, name_hash};
pub use speech::{DEFAULT_MIN_SPEECH_SPEED, SpeechClip, SpeechDriver, SpeechToken};
