//! Configuration loading and typed config structures for a character's face.
//!
//! The authoring file (`emote-config.yaml` by default) describes one
//! character: which blend shapes exist, the emotion and phoneme channels,
//! blink and gaze parameters, speech clips, reactions and proximity
//! settings. Channel and reaction definitions reuse the serde types from
//! `emote-types`; this module adds the sections around them.

use std::path::Path;

use emote_types::{
    BlendShapeDef, BlinkDef, EmotionDef, GazeDef, MeshHandle, PhonemeDef, ReactionDef, SpeechClipDef,
};
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level face configuration.
///
/// Mirrors the structure of `emote-config.yaml`. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FaceConfig {
    /// Character identity and randomness.
    #[serde(default)]
    pub character: CharacterConfig,

    /// Host tick rate.
    #[serde(default)]
    pub timing: TimingConfig,

    /// Blend-shape registration.
    #[serde(default)]
    pub blend_shapes: BlendShapesConfig,

    /// Emotion channels.
    #[serde(default)]
    pub emotions: Vec<EmotionDef>,

    /// Phoneme channels.
    #[serde(default)]
    pub phonemes: Vec<PhonemeDef>,

    /// Blink timer.
    #[serde(default)]
    pub blink: BlinkDef,

    /// Eye gaze limits.
    #[serde(default)]
    pub gaze: GazeDef,

    /// Speech clips.
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Proximity reactions.
    #[serde(default)]
    pub reactions: Vec<ReactionDef>,

    /// Proximity zone settings.
    #[serde(default)]
    pub proximity: ProximityConfig,
}

impl FaceConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        Ok(config)
    }
}

/// Character identity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CharacterConfig {
    /// Character name, used in logs. Must not be empty.
    #[serde(default = "default_character_name")]
    pub name: String,

    /// RNG seed. Absent means seed from OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for CharacterConfig {
    fn default() -> Self {
        Self {
            name: default_character_name(),
            seed: None,
        }
    }
}

fn default_character_name() -> String {
    "character".to_owned()
}

/// Host tick rate.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TimingConfig {
    /// Milliseconds between ticks for hosts that tick at a fixed rate.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

const fn default_tick_interval_ms() -> u64 {
    20
}

/// Blend-shape registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BlendShapesConfig {
    /// Meshes whose every shape is registered under its live name.
    #[serde(default)]
    pub scan_meshes: Vec<MeshHandle>,

    /// Explicit bindings, registered before any scan.
    #[serde(default)]
    pub manual: Vec<BlendShapeDef>,
}

/// Speech settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpeechConfig {
    /// Lower bound on the phoneme playback speed.
    #[serde(default = "default_min_speech_speed")]
    pub min_speech_speed: f32,

    /// Speech clips.
    #[serde(default)]
    pub clips: Vec<SpeechClipDef>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            min_speech_speed: default_min_speech_speed(),
            clips: Vec::new(),
        }
    }
}

const fn default_min_speech_speed() -> f32 {
    emote_face::DEFAULT_MIN_SPEECH_SPEED
}

/// Proximity zone settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProximityConfig {
    /// Radius of the trigger zone the host maintains, in metres.
    #[serde(default = "default_radius")]
    pub radius: f32,

    /// Distance beyond which distance-tagged events are ignored.
    #[serde(default = "default_react_distance")]
    pub react_distance: f32,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            radius: default_radius(),
            react_distance: default_react_distance(),
        }
    }
}

const fn default_radius() -> f32 {
    3.0
}

const fn default_react_distance() -> f32 {
    2.0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use emote_types::ReactTo;

    #[test]
    fn default_config_is_valid() {
        let config = FaceConfig::default();
        assert_eq!(config.character.name, "character");
        assert_eq!(config.character.seed, None);
        assert_eq!(config.timing.tick_interval_ms, 20);
        assert!((config.speech.min_speech_speed - 0.05).abs() < f32::EPSILON);
        assert!(config.blink.enabled);
        assert!(config.emotions.is_empty());
    }

    #[test]
    fn empty_yaml_gives_defaults() {
        let config = FaceConfig::parse("{}").unwrap();
        assert_eq!(config, FaceConfig::default());
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
character:
  name: "Mira"
  seed: 7

timing:
  tick_interval_ms: 16

blend_shapes:
  scan_meshes: [0]
  manual:
    - { name: "Jaw_Open", mesh: 1, index: 4 }

emotions:
  - name: "Smile"
    fade_in: 0.3
    fade_out: 0.1
    vox: true
    axes: { joy: 0.8 }
    hold: { enter: 1.5 }
    shapes:
      - { blend_shape: "Mouth_Smile", max_weight: 80 }

phonemes:
  - { name: "AA", frequency: 2, shapes: [ { blend_shape: "Jaw_Open" } ] }

blink:
  min_interval: 1.5
  max_interval: 4
  simple: true

gaze:
  enabled: false

speech:
  min_speech_speed: 0.1
  clips:
    - { name: "Hello", clip: 3, ignore_silence: true }

reactions:
  - name: "Greet"
    react_to: FriendOnly
    enter: { enabled: true, emotions: ["Smile"], speech: ["Hello"] }

proximity:
  radius: 5
  react_distance: 2.5
"#;
        let config = FaceConfig::parse(yaml).unwrap();
        assert_eq!(config.character.name, "Mira");
        assert_eq!(config.character.seed, Some(7));
        assert_eq!(config.timing.tick_interval_ms, 16);
        assert_eq!(config.blend_shapes.scan_meshes, vec![MeshHandle(0)]);
        assert_eq!(config.blend_shapes.manual.len(), 1);
        assert_eq!(config.emotions.len(), 1);
        assert!((config.emotions[0].hold.enter - 1.5).abs() < f32::EPSILON);
        assert!((config.phonemes[0].frequency - 2.0).abs() < f32::EPSILON);
        assert!(config.blink.simple);
        assert!(!config.gaze.enabled);
        assert!(config.speech.clips[0].ignore_silence);
        assert_eq!(config.reactions[0].react_to, ReactTo::FriendOnly);
        assert!((config.proximity.react_distance - 2.5).abs() < f32::EPSILON);
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        let err = FaceConfig::parse("emotions: 12").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml { .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = FaceConfig::from_file(Path::new("/nonexistent/emote-config.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("emote-config.yaml");
        if path.exists() {
            let config = FaceConfig::from_file(&path);
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
            let config = config.unwrap();
            assert_eq!(config.character.name, "Mira");
            assert_eq!(config.reactions.len(), 2);
        }
    }
}
