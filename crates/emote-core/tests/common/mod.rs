//! Host fakes shared by the integration tests.
//!
//! Each fake is a `Clone` handle over `Rc<RefCell<_>>` state: one copy goes
//! into the module, the test keeps another to inspect and steer it.

#![allow(dead_code, clippy::unwrap_used)]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use emote_core::{Collaborators, FaceConfig, ShapesModule};
use emote_face::{AudioError, AudioOutput, ClipSamples, ShapeRenderer, Skeleton};
use emote_types::{ActorId, BoneHandle, BoneRole, ClipHandle, MeshHandle, Quat};

pub const TICK: f32 = 0.02;

#[derive(Debug, Default)]
struct RendererState {
    meshes: BTreeMap<MeshHandle, Vec<String>>,
    weights: BTreeMap<(MeshHandle, u32), f32>,
}

#[derive(Debug, Clone, Default)]
pub struct Renderer {
    state: Rc<RefCell<RendererState>>,
}

impl Renderer {
    pub fn with_mesh(mesh: MeshHandle, names: &[&str]) -> Self {
        let renderer = Self::default();
        renderer.set_mesh(mesh, names);
        renderer
    }

    pub fn set_mesh(&self, mesh: MeshHandle, names: &[&str]) {
        self.state
            .borrow_mut()
            .meshes
            .insert(mesh, names.iter().map(|n| (*n).to_owned()).collect());
    }

    pub fn weight(&self, mesh: MeshHandle, index: u32) -> Option<f32> {
        self.state.borrow().weights.get(&(mesh, index)).copied()
    }
}

impl ShapeRenderer for Renderer {
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
            .map_or(0, |names| u32::try_from(names.len()).unwrap())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Eyes {
    rotations: Rc<RefCell<BTreeMap<BoneHandle, Quat>>>,
}

impl Eyes {
    pub fn rotation(&self, bone: BoneHandle) -> Option<Quat> {
        self.rotations.borrow().get(&bone).copied()
    }
}

impl Skeleton for Eyes {
    fn bone(&self, role: BoneRole) -> Option<BoneHandle> {
        match role {
            BoneRole::LeftEye => Some(BoneHandle(1)),
            BoneRole::RightEye => Some(BoneHandle(2)),
            BoneRole::Head | BoneRole::Jaw => None,
        }
    }

    fn set_local_rotation(&mut self, bone: BoneHandle, rotation: Quat) {
        self.rotations.borrow_mut().insert(bone, rotation);
    }
}

#[derive(Debug, Default)]
struct AudioState {
    clips: BTreeMap<ClipHandle, ClipSamples>,
    playing: Option<ClipHandle>,
    time: f32,
    plays: Vec<ClipHandle>,
    stops: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Audio {
    state: Rc<RefCell<AudioState>>,
}

impl Audio {
    pub fn add_clip(&self, clip: ClipHandle, samples: ClipSamples) {
        self.state.borrow_mut().clips.insert(clip, samples);
    }

    /// Advance playback; stops at the end of the clip.
    pub fn advance(&self, dt: f32) {
        let mut state = self.state.borrow_mut();
        let Some(clip) = state.playing else {
            return;
        };
        state.time += dt;
        let duration = state.clips.get(&clip).map_or(0.0, ClipSamples::duration);
        if state.time >= duration {
            state.playing = None;
            state.time = 0.0;
        }
    }

    pub fn playing(&self) -> Option<ClipHandle> {
        self.state.borrow().playing
    }

    pub fn plays(&self) -> Vec<ClipHandle> {
        self.state.borrow().plays.clone()
    }

    pub fn stops(&self) -> usize {
        self.state.borrow().stops
    }
}

impl AudioOutput for Audio {
    fn load_samples(&mut self, clip: ClipHandle) -> Result<ClipSamples, AudioError> {
        self.state
            .borrow()
            .clips
            .get(&clip)
            .cloned()
            .ok_or(AudioError::UnknownClip(clip))
    }

    fn play(&mut self, clip: ClipHandle, _speed: f32, _volume: f32) {
        let mut state = self.state.borrow_mut();
        state.playing = Some(clip);
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

/// A mono 1 kHz clip of `seconds` at constant amplitude 0.5.
pub fn loud_clip(seconds: f32) -> ClipSamples {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let frames = (seconds * 1000.0) as usize;
    ClipSamples::new(vec![0.5; frames], 1, 1000)
}

/// A face together with handles on its fakes.
pub struct Rig {
    pub module: ShapesModule,
    pub renderer: Renderer,
    pub eyes: Eyes,
    pub audio: Audio,
}

impl Rig {
    pub fn new(yaml: &str) -> Self {
        let config = FaceConfig::parse(yaml).unwrap();
        let renderer = Renderer::with_mesh(MeshHandle(0), &["Smile", "Frown", "Jaw_Open", "Blink"]);
        let eyes = Eyes::default();
        let audio = Audio::default();
        audio.add_clip(ClipHandle(1), loud_clip(1.0));
        audio.add_clip(ClipHandle(2), loud_clip(2.0));
        let module = ShapesModule::new(
            &config,
            Collaborators {
                renderer: Box::new(renderer.clone()),
                skeleton: Some(Box::new(eyes.clone())),
                audio: Some(Box::new(audio.clone())),
                self_id: ActorId::new(),
            },
        )
        .unwrap();
        Self {
            module,
            renderer,
            eyes,
            audio,
        }
    }

    /// Advance audio and the face by one tick.
    pub fn step(&mut self) -> emote_core::TickSummary {
        self.audio.advance(TICK);
        self.module.tick(TICK).unwrap()
    }

    /// Run for `seconds`, collecting every summary.
    pub fn run(&mut self, seconds: f32) -> Vec<emote_core::TickSummary> {
        let mut summaries = Vec::new();
        let mut t = 0.0;
        while t + 1e-6 < seconds {
            summaries.push(self.step());
            t += TICK;
        }
        summaries
    }
}
