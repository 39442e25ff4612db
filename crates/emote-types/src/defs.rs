//! Authoring definitions.
//!
//! These are the load-time static descriptions of everything a character's
//! face can do: which blend shapes exist, which channels drive them, which
//! speech clips and reactions are available. They reference each other by
//! *name*; the runtime crates resolve names to index ids when building.
//!
//! Every field carries a serde default so authoring files only need to
//! spell out what differs from the defaults.

use serde::{Deserialize, Serialize};

use crate::enums::ReactTo;
use crate::ids::{ClipHandle, MeshHandle, ModelId};

fn default_fade() -> f32 {
    0.25
}

fn default_max_weight() -> f32 {
    100.0
}

fn default_one() -> f32 {
    1.0
}

const fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Blend shapes
// ---------------------------------------------------------------------------

/// A manually authored blend-shape binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlendShapeDef {
    /// Name the shape is registered under (and expected to carry on the mesh).
    pub name: String,
    /// Mesh carrying the shape.
    pub mesh: MeshHandle,
    /// Index of the shape on the mesh.
    pub index: u32,
}

/// A blend shape driven by a channel, with its maximum weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeRefDef {
    /// Name of the registered blend shape.
    pub blend_shape: String,
    /// Weight applied at full channel progress, in `[0, 100]`.
    #[serde(default = "default_max_weight")]
    pub max_weight: f32,
}

// ---------------------------------------------------------------------------
// Channels
// ---------------------------------------------------------------------------

/// Intensity axes of an emotion, each in `[-1, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EmotionAxes {
    /// Anger intensity.
    #[serde(default)]
    pub anger: f32,
    /// Joy intensity.
    #[serde(default)]
    pub joy: f32,
    /// Surprise intensity.
    #[serde(default)]
    pub surprise: f32,
    /// Trust intensity.
    #[serde(default)]
    pub trust: f32,
}

/// Seconds an emotion holds at full weight when played by a reaction stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HoldDef {
    /// Hold for enter reactions.
    #[serde(default)]
    pub enter: f32,
    /// Hold for exit reactions.
    #[serde(default)]
    pub exit: f32,
    /// Hold for stay reactions.
    #[serde(default)]
    pub stay: f32,
}

/// An emotion channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionDef {
    /// Unique emotion name.
    pub name: String,
    /// Seconds to ramp from 0 to 1.
    #[serde(default = "default_fade")]
    pub fade_in: f32,
    /// Seconds to ramp from 1 to 0.
    #[serde(default = "default_fade")]
    pub fade_out: f32,
    /// Whether the channel may play at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Sentiment axes.
    #[serde(default)]
    pub axes: EmotionAxes,
    /// Eligible for random selection while speech plays.
    #[serde(default)]
    pub vox: bool,
    /// Per-stage hold durations used by reactions.
    #[serde(default)]
    pub hold: HoldDef,
    /// Speed multiplier used when a reaction plays this emotion.
    #[serde(default = "default_one")]
    pub play_speed: f32,
    /// Blend shapes driven by the emotion.
    #[serde(default)]
    pub shapes: Vec<ShapeRefDef>,
}

/// A phoneme (viseme) channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhonemeDef {
    /// Unique phoneme name.
    pub name: String,
    /// Relative frequency used for weighted random selection.
    #[serde(default = "default_one")]
    pub frequency: f32,
    /// Seconds one utterance of the phoneme lasts at speed 1.
    #[serde(default = "default_phoneme_duration")]
    pub duration: f32,
    /// Seconds to open the mouth shape.
    #[serde(default = "default_phoneme_fade")]
    pub fade_in: f32,
    /// Seconds to close the mouth shape.
    #[serde(default = "default_phoneme_fade")]
    pub fade_out: f32,
    /// Whether the channel may play at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Blend shapes driven by the phoneme.
    #[serde(default)]
    pub shapes: Vec<ShapeRefDef>,
}

fn default_phoneme_duration() -> f32 {
    0.12
}

fn default_phoneme_fade() -> f32 {
    0.04
}

/// Blink timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlinkDef {
    /// Whether blinking starts enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Shortest open-eye interval in seconds.
    #[serde(default = "default_min_blink_interval")]
    pub min_interval: f32,
    /// Longest open-eye interval in seconds.
    #[serde(default = "default_max_blink_interval")]
    pub max_interval: f32,
    /// Seconds one blink lasts.
    #[serde(default = "default_blink_duration")]
    pub duration: f32,
    /// Snap closed for the whole blink instead of ramping.
    #[serde(default)]
    pub simple: bool,
    /// Blend shapes closing the eyelids.
    #[serde(default)]
    pub shapes: Vec<ShapeRefDef>,
}

fn default_min_blink_interval() -> f32 {
    2.0
}

fn default_max_blink_interval() -> f32 {
    6.0
}

fn default_blink_duration() -> f32 {
    0.15
}

impl Default for BlinkDef {
    fn default() -> Self {
        Self {
            enabled: true,
            min_interval: default_min_blink_interval(),
            max_interval: default_max_blink_interval(),
            duration: default_blink_duration(),
            simple: false,
            shapes: Vec::new(),
        }
    }
}

/// Eye gaze wandering limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GazeDef {
    /// Whether gaze wandering starts enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Leftmost yaw in degrees.
    #[serde(default = "default_min_horizontal")]
    pub min_horizontal: f32,
    /// Rightmost yaw in degrees.
    #[serde(default = "default_max_horizontal")]
    pub max_horizontal: f32,
    /// Lowest pitch in degrees.
    #[serde(default = "default_min_vertical")]
    pub min_vertical: f32,
    /// Highest pitch in degrees.
    #[serde(default = "default_max_vertical")]
    pub max_vertical: f32,
    /// Shortest hold on a target in seconds.
    #[serde(default = "default_min_hold")]
    pub min_hold: f32,
    /// Longest hold on a target in seconds.
    #[serde(default = "default_max_hold")]
    pub max_hold: f32,
    /// Angular speed in degrees per second.
    #[serde(default = "default_gaze_speed")]
    pub speed: f32,
}

fn default_min_horizontal() -> f32 {
    -12.0
}

fn default_max_horizontal() -> f32 {
    12.0
}

fn default_min_vertical() -> f32 {
    -6.0
}

fn default_max_vertical() -> f32 {
    6.0
}

fn default_min_hold() -> f32 {
    0.5
}

fn default_max_hold() -> f32 {
    2.5
}

fn default_gaze_speed() -> f32 {
    180.0
}

impl Default for GazeDef {
    fn default() -> Self {
        Self {
            enabled: true,
            min_horizontal: default_min_horizontal(),
            max_horizontal: default_max_horizontal(),
            min_vertical: default_min_vertical(),
            max_vertical: default_max_vertical(),
            min_hold: default_min_hold(),
            max_hold: default_max_hold(),
            speed: default_gaze_speed(),
        }
    }
}

// ---------------------------------------------------------------------------
// Speech
// ---------------------------------------------------------------------------

/// A speech audio clip and how it drives the face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechClipDef {
    /// Unique clip name.
    pub name: String,
    /// Host audio asset.
    pub clip: ClipHandle,
    /// Playback speed multiplier.
    #[serde(default = "default_one")]
    pub speed: f32,
    /// Playback volume in `[0, 1]`.
    #[serde(default = "default_one")]
    pub volume: f32,
    /// Amplitude at or below which the clip counts as silent.
    #[serde(default = "default_silence_threshold")]
    pub silence_threshold: f32,
    /// Pick emotions on a timer regardless of silence.
    #[serde(default)]
    pub ignore_silence: bool,
    /// Fade the current vox emotion out early when the clip goes silent.
    #[serde(default)]
    pub fade_emotion_on_silence: bool,
    /// Shortest gap between timed emotion picks in seconds.
    #[serde(default = "default_emotion_min_interval")]
    pub emotion_min_interval: f32,
    /// Longest gap between timed emotion picks in seconds.
    #[serde(default = "default_emotion_max_interval")]
    pub emotion_max_interval: f32,
}

fn default_silence_threshold() -> f32 {
    0.02
}

fn default_emotion_min_interval() -> f32 {
    1.0
}

fn default_emotion_max_interval() -> f32 {
    3.0
}

// ---------------------------------------------------------------------------
// Reactions
// ---------------------------------------------------------------------------

/// Candidates for one reaction stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDef {
    /// Whether the stage reacts at all.
    #[serde(default)]
    pub enabled: bool,
    /// Emotion names, one picked at random.
    #[serde(default)]
    pub emotions: Vec<String>,
    /// Speech clip names, one picked at random.
    #[serde(default)]
    pub speech: Vec<String>,
}

/// A proximity reaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionDef {
    /// Unique reaction name.
    pub name: String,
    /// Relationship filter.
    #[serde(default)]
    pub react_to: ReactTo,
    /// Optional allow-list of model ids; empty means any model.
    #[serde(default)]
    pub models: Vec<ModelId>,
    /// Enter stage.
    #[serde(default)]
    pub enter: StageDef,
    /// Exit stage.
    #[serde(default)]
    pub exit: StageDef,
    /// Stay stage (stored only).
    #[serde(default)]
    pub stay: StageDef,
}
