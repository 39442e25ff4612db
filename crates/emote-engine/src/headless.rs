//! Headless stand-ins for the host collaborators.
//!
//! The engine binary has no renderer, skeleton, or audio device. These
//! implementations record what the face writes so the run can be traced,
//! and synthesize speech audio so the speech driver has something to
//! sample. Each is a cheap `Clone` handle over shared state: one copy is
//! handed to the [`ShapesModule`](emote_core::ShapesModule), the engine
//! keeps another to read back from.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use emote_core::FaceConfig;
use emote_face::{AudioError, AudioOutput, ClipSamples, ShapeRenderer, Skeleton};
use emote_types::{BoneHandle, BoneRole, ClipHandle, MeshHandle, Quat};

/// Sample rate of synthesized speech clips.
pub const SPEECH_SAMPLE_RATE: u32 = 8_000;

/// Length of every synthesized speech clip, in seconds.
pub const SPEECH_CLIP_SECONDS: f32 = 2.5;

/// Syllables per second in synthesized speech.
const SYLLABLE_RATE: f32 = 4.0;

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct RendererState {
    meshes: BTreeMap<MeshHandle, Vec<String>>,
    weights: BTreeMap<(MeshHandle, u32), f32>,
}

/// Renderer that keeps blend-shape names and the last weight written to each.
#[derive(Debug, Clone, Default)]
pub struct HeadlessRenderer {
    state: Rc<RefCell<RendererState>>,
}

impl HeadlessRenderer {
    /// Build a renderer whose meshes carry every shape the configuration
    /// mentions.
    ///
    /// Manual bindings land exactly where they point, with placeholder
    /// names filling any gap below them. Shapes referenced by channels but
    /// not bound manually are appended to the first scanned mesh. Without a
    /// scanned mesh they stay missing, as they would on a real rig.
    pub fn from_config(config: &FaceConfig) -> Self {
        let mut meshes: BTreeMap<MeshHandle, Vec<String>> = BTreeMap::new();

        for def in &config.blend_shapes.manual {
            let Ok(index) = usize::try_from(def.index) else {
                continue;
            };
            let names = meshes.entry(def.mesh).or_default();
            while names.len() <= index {
                names.push(format!("Unused{}", names.len()));
            }
            if let Some(slot) = names.get_mut(index) {
                slot.clone_from(&def.name);
            }
        }

        if let Some(&scanned) = config.blend_shapes.scan_meshes.first() {
            let referenced = referenced_shapes(config);
            let names = meshes.entry(scanned).or_default();
            for name in referenced {
                let bound = config.blend_shapes.manual.iter().any(|def| def.name == name);
                if !bound && !names.contains(&name) {
                    names.push(name);
                }
            }
        }

        let renderer = Self::default();
        renderer.state.borrow_mut().meshes = meshes;
        renderer
    }

    /// Total number of shapes across all meshes.
    pub fn shape_total(&self) -> usize {
        self.state.borrow().meshes.values().map(Vec::len).sum()
    }

    /// Last written weight of every shape that has been written, by name.
    pub fn weights_by_name(&self) -> BTreeMap<String, f32> {
        let state = self.state.borrow();
        state
            .weights
            .iter()
            .filter_map(|(&(mesh, index), &weight)| {
                let name = state.meshes.get(&mesh)?.get(usize::try_from(index).ok()?)?;
                Some((name.clone(), weight))
            })
            .collect()
    }
}

/// Every shape name referenced by an emotion, phoneme, or the blink.
fn referenced_shapes(config: &FaceConfig) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let refs = config
        .emotions
        .iter()
        .flat_map(|e| e.shapes.iter())
        .chain(config.phonemes.iter().flat_map(|p| p.shapes.iter()))
        .chain(config.blink.shapes.iter());
    for shape in refs {
        if !names.contains(&shape.blend_shape) {
            names.push(shape.blend_shape.clone());
        }
    }
    names
}

impl ShapeRenderer for HeadlessRenderer {
    fn set_shape_weight(&mut self, mesh: MeshHandle, index: u32, weight: f32) {
        self.state.borrow_mut().weights.insert((mesh, index), weight);
    }

    fn shape_name(&self, mesh: MeshHandle, index: u32) -> Option<String> {
        let state = self.state.borrow();
        state.meshes.get(&mesh)?.get(usize::try_from(index).ok()?).cloned()
    }

    fn shape_count(&self, mesh: MeshHandle) -> u32 {
        self.state
            .borrow()
            .meshes
            .get(&mesh)
            .map_or(0, |names| u32::try_from(names.len()).unwrap_or(u32::MAX))
    }
}

// ---------------------------------------------------------------------------
// Skeleton
// ---------------------------------------------------------------------------

/// Bone handle of the left eye.
pub const LEFT_EYE: BoneHandle = BoneHandle(1);

/// Bone handle of the right eye.
pub const RIGHT_EYE: BoneHandle = BoneHandle(2);

/// Skeleton with two eye bones that remembers their rotations.
#[derive(Debug, Clone, Default)]
pub struct HeadlessSkeleton {
    rotations: Rc<RefCell<BTreeMap<BoneHandle, Quat>>>,
}

impl HeadlessSkeleton {
    /// Last rotation written to `bone`.
    pub fn rotation(&self, bone: BoneHandle) -> Option<Quat> {
        self.rotations.borrow().get(&bone).copied()
    }
}

impl Skeleton for HeadlessSkeleton {
    fn bone(&self, role: BoneRole) -> Option<BoneHandle> {
        match role {
            BoneRole::LeftEye => Some(LEFT_EYE),
            BoneRole::RightEye => Some(RIGHT_EYE),
            BoneRole::Head | BoneRole::Jaw => None,
        }
    }

    fn set_local_rotation(&mut self, bone: BoneHandle, rotation: Quat) {
        self.rotations.borrow_mut().insert(bone, rotation);
    }
}

// ---------------------------------------------------------------------------
// Audio
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct AudioState {
    clips: BTreeMap<ClipHandle, ClipSamples>,
    playing: Option<ClipHandle>,
    speed: f32,
    time: f32,
}

/// Audio slot that plays synthesized clips against the engine's clock.
#[derive(Debug, Clone, Default)]
pub struct SimulatedAudio {
    state: Rc<RefCell<AudioState>>,
}

impl SimulatedAudio {
    /// Synthesize a speech-like clip for every clip the configuration names.
    pub fn from_config(config: &FaceConfig) -> Self {
        let audio = Self::default();
        {
            let mut state = audio.state.borrow_mut();
            for def in &config.speech.clips {
                state
                    .clips
                    .entry(def.clip)
                    .or_insert_with(|| synthesize_speech(SPEECH_CLIP_SECONDS));
            }
        }
        audio
    }

    /// Number of clips available.
    pub fn clip_count(&self) -> usize {
        self.state.borrow().clips.len()
    }

    /// Advance playback by `dt` seconds; playback stops at the clip's end.
    pub fn advance(&self, dt: f32) {
        let mut state = self.state.borrow_mut();
        let Some(clip) = state.playing else {
            return;
        };
        let step = dt * state.speed;
        state.time += step;
        let duration = state.clips.get(&clip).map_or(0.0, ClipSamples::duration);
        if state.time >= duration {
            state.playing = None;
            state.time = 0.0;
        }
    }

    /// The clip currently playing.
    pub fn playing(&self) -> Option<ClipHandle> {
        self.state.borrow().playing
    }
}

impl AudioOutput for SimulatedAudio {
    fn load_samples(&mut self, clip: ClipHandle) -> Result<ClipSamples, AudioError> {
        self.state
            .borrow()
            .clips
            .get(&clip)
            .cloned()
            .ok_or(AudioError::UnknownClip(clip))
    }

    fn play(&mut self, clip: ClipHandle, speed: f32, _volume: f32) {
        let mut state = self.state.borrow_mut();
        state.playing = Some(clip);
        state.speed = speed;
        state.time = 0.0;
    }

    fn stop(&mut self) {
        let mut state = self.state.borrow_mut();
        state.playing = None;
        state.time = 0.0;
    }

    fn is_playing(&self) -> bool {
        self.state.borrow().playing.is_some()
    }

    fn current_time(&self) -> f32 {
        self.state.borrow().time
    }
}

/// Mono speech-like audio: half-sine syllables with every fourth syllable
/// left silent as a pause between words.
pub fn synthesize_speech(seconds: f32) -> ClipSamples {
    let rate = SPEECH_SAMPLE_RATE as f32;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let frames = (seconds.max(0.0) * rate) as usize;
    let samples = (0..frames)
        .map(|frame| {
            let t = frame as f32 / rate;
            let position = t * SYLLABLE_RATE;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let syllable = position as u64;
            if syllable % 4 == 3 {
                0.0
            } else {
                0.6 * (core::f32::consts::PI * position.fract()).sin()
            }
        })
        .collect();
    ClipSamples::new(samples, 1, SPEECH_SAMPLE_RATE)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const CONFIG: &str = r"
blend_shapes:
  scan_meshes: [0]
  manual:
    - { name: Blink, mesh: 1, index: 2 }
emotions:
  - name: Smile
    shapes: [{ blend_shape: Smile }, { blend_shape: Blink }]
phonemes:
  - name: AA
    shapes: [{ blend_shape: Jaw_Open }]
speech:
  clips:
    - { name: Hello, clip: 7 }
";

    fn config() -> FaceConfig {
        FaceConfig::parse(CONFIG).unwrap()
    }

    #[test]
    fn manual_bindings_land_at_their_index() {
        let renderer = HeadlessRenderer::from_config(&config());
        assert_eq!(renderer.shape_name(MeshHandle(1), 2).as_deref(), Some("Blink"));
        assert_eq!(renderer.shape_name(MeshHandle(1), 0).as_deref(), Some("Unused0"));
        assert_eq!(renderer.shape_count(MeshHandle(1)), 3);
    }

    #[test]
    fn referenced_shapes_are_added_to_the_scanned_mesh() {
        let renderer = HeadlessRenderer::from_config(&config());
        assert_eq!(renderer.shape_count(MeshHandle(0)), 2);
        assert_eq!(renderer.shape_name(MeshHandle(0), 0).as_deref(), Some("Smile"));
        assert_eq!(renderer.shape_name(MeshHandle(0), 1).as_deref(), Some("Jaw_Open"));
        assert_eq!(renderer.shape_total(), 5);
    }

    #[test]
    fn weights_are_reported_by_name() {
        let mut renderer = HeadlessRenderer::from_config(&config());
        renderer.set_shape_weight(MeshHandle(0), 1, 42.0);
        renderer.set_shape_weight(MeshHandle(9), 0, 10.0);
        let weights = renderer.weights_by_name();
        assert_eq!(weights.len(), 1);
        assert_eq!(weights.get("Jaw_Open"), Some(&42.0));
    }

    #[test]
    fn skeleton_has_eyes_only() {
        let mut skeleton = HeadlessSkeleton::default();
        assert_eq!(skeleton.bone(BoneRole::LeftEye), Some(LEFT_EYE));
        assert_eq!(skeleton.bone(BoneRole::Jaw), None);
        skeleton.set_local_rotation(RIGHT_EYE, Quat::IDENTITY);
        assert_eq!(skeleton.rotation(RIGHT_EYE), Some(Quat::IDENTITY));
    }

    #[test]
    fn synthesized_speech_has_pauses() {
        let clip = synthesize_speech(1.0);
        assert!((clip.duration() - 1.0).abs() < 1e-3);
        // Syllable 1 peaks at 0.375 s, syllable 3 (0.75 s..1.0 s) is silent.
        assert!(clip.amplitude_at(0.35) > 0.3);
        assert!(clip.amplitude_at(0.8) < 1e-6);
    }

    #[test]
    fn audio_plays_until_the_clip_ends() {
        let mut audio = SimulatedAudio::from_config(&config());
        assert_eq!(audio.clip_count(), 1);
        assert!(audio.load_samples(ClipHandle(7)).is_ok());
        assert!(audio.load_samples(ClipHandle(8)).is_err());

        audio.play(ClipHandle(7), 2.0, 1.0);
        audio.advance(0.5);
        assert!((audio.current_time() - 1.0).abs() < 1e-6);
        audio.advance(1.0);
        assert!(audio.playing().is_none());
        assert!(!audio.is_playing());
    }
}
