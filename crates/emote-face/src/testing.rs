//! In-test fakes for the host collaborators.
//!
//! Each fake is a cheap `Clone` handle over shared `Rc<RefCell<_>>` state, so
//! a test can hand one copy to the engine and keep another to inspect what
//! the engine did.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use emote_types::{BoneHandle, BoneRole, ClipHandle, MeshHandle, Quat};

use crate::collaborators::{AudioOutput, ClipSamples, ShapeRenderer, Skeleton};
use crate::error::AudioError;

#[derive(Debug, Default)]
struct RendererState {
    meshes: BTreeMap<MeshHandle, Vec<String>>,
    weights: BTreeMap<(MeshHandle, u32), f32>,
    writes: usize,
}

/// Renderer that stores shape names per mesh and records every weight write.
#[derive(Debug, Clone, Default)]
pub struct FakeRenderer {
    state: Rc<RefCell<RendererState>>,
}

impl FakeRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the shape list of `mesh`.
    pub fn set_mesh(&self, mesh: MeshHandle, names: &[&str]) {
        self.state
            .borrow_mut()
            .meshes
            .insert(mesh, names.iter().map(|n| (*n).to_owned()).collect());
    }

    pub fn remove_mesh(&self, mesh: MeshHandle) {
        self.state.borrow_mut().meshes.remove(&mesh);
    }

    /// Last weight written to shape `index` on `mesh`.
    pub fn weight(&self, mesh: MeshHandle, index: u32) -> Option<f32> {
        self.state.borrow().weights.get(&(mesh, index)).copied()
    }

    pub fn write_count(&self) -> usize {
        self.state.borrow().writes
    }
}

impl ShapeRenderer for FakeRenderer {
    fn set_shape_weight(&mut self, mesh: MeshHandle, index: u32, weight: f32) {
        let mut state = self.state.borrow_mut();
        state.weights.insert((mesh, index), weight);
        state.writes = state.writes.saturating_add(1);
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

#[derive(Debug, Default)]
struct SkeletonState {
    bones: BTreeMap<BoneRole, BoneHandle>,
    rotations: BTreeMap<BoneHandle, Quat>,
}

/// Skeleton with a configurable set of bones.
#[derive(Debug, Clone, Default)]
pub struct FakeSkeleton {
    state: Rc<RefCell<SkeletonState>>,
}

impl FakeSkeleton {
    /// A rig with both eyes (bones 1 and 2).
    pub fn with_eyes() -> Self {
        let skeleton = Self::default();
        {
            let mut state = skeleton.state.borrow_mut();
            state.bones.insert(BoneRole::LeftEye, BoneHandle(1));
            state.bones.insert(BoneRole::RightEye, BoneHandle(2));
        }
        skeleton
    }

    /// A rig with no bones at all.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn rotation(&self, bone: BoneHandle) -> Option<Quat> {
        self.state.borrow().rotations.get(&bone).copied()
    }
}

impl Skeleton for FakeSkeleton {
    fn bone(&self, role: BoneRole) -> Option<BoneHandle> {
        self.state.borrow().bones.get(&role).copied()
    }

    fn set_local_rotation(&mut self, bone: BoneHandle, rotation: Quat) {
        self.state.borrow_mut().rotations.insert(bone, rotation);
    }
}

#[derive(Debug, Default)]
struct AudioState {
    clips: BTreeMap<ClipHandle, Result<ClipSamples, AudioError>>,
    playing: Option<(ClipHandle, f32)>,
    time: f32,
    plays: Vec<ClipHandle>,
    stops: usize,
}

/// Audio slot whose playback clock is advanced by the test.
#[derive(Debug, Clone, Default)]
pub struct FakeAudio {
    state: Rc<RefCell<AudioState>>,
}

impl FakeAudio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a decoded clip.
    pub fn add_clip(&self, clip: ClipHandle, samples: ClipSamples) {
        self.state.borrow_mut().clips.insert(clip, Ok(samples));
    }

    /// Register a clip with no decoded buffer.
    pub fn add_undecodable(&self, clip: ClipHandle) {
        self.state
            .borrow_mut()
            .clips
            .insert(clip, Err(AudioError::NotDecoded(clip)));
    }

    /// Start playback behind the engine's back.
    pub fn play_foreign(&self, clip: ClipHandle) {
        let mut state = self.state.borrow_mut();
        state.playing = Some((clip, 1.0));
        state.time = 0.0;
    }

    /// Advance playback by `dt` seconds; stops at the end of the clip.
    pub fn advance(&self, dt: f32) {
        let mut state = self.state.borrow_mut();
        let Some((clip, speed)) = state.playing else {
            return;
        };
        state.time += dt * speed;
        let duration = state
            .clips
            .get(&clip)
            .and_then(|c| c.as_ref().ok())
            .map_or(0.0, ClipSamples::duration);
        if state.time >= duration {
            state.playing = None;
            state.time = 0.0;
        }
    }

    pub fn playing(&self) -> Option<ClipHandle> {
        self.state.borrow().playing.map(|(clip, _)| clip)
    }

    pub fn plays(&self) -> Vec<ClipHandle> {
        self.state.borrow().plays.clone()
    }

    pub fn stop_count(&self) -> usize {
        self.state.borrow().stops
    }
}

impl AudioOutput for FakeAudio {
    fn load_samples(&mut self, clip: ClipHandle) -> Result<ClipSamples, AudioError> {
        self.state
            .borrow()
            .clips
            .get(&clip)
            .cloned()
            .unwrap_or(Err(AudioError::UnknownClip(clip)))
    }

    fn play(&mut self, clip: ClipHandle, speed: f32, _volume: f32) {
        let mut state = self.state.borrow_mut();
        state.playing = Some((clip, speed));
        state.time = 0.0;
        state.plays.push(clip);
    }

    fn stop(&mut self) {
        let mut state = self.state.borrow_mut();
        state.playing = None;
        state.time = 0.0;
        state.stops = state.stops.saturating_add(1);
    }

    fn is_playing(&self) -> bool {
        self.state.borrow().playing.is_some()
    }

    fn current_time(&self) -> f32 {
        self.state.borrow().time
    }
}

/// A mono clip of `seconds` at 1 kHz: loud for the first half, silent after.
pub fn half_loud_clip(seconds: f32) -> ClipSamples {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let frames = (seconds * 1000.0) as usize;
    let samples = (0..frames).map(|i| if i < frames / 2 { 0.5 } else { 0.0 }).collect();
    ClipSamples::new(samples, 1, 1000)
}

/// A mono clip of `seconds` at 1 kHz with constant amplitude.
pub fn loud_clip(seconds: f32) -> ClipSamples {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let frames = (seconds * 1000.0) as usize;
    ClipSamples::new(vec![0.5; frames], 1, 1000)
}
