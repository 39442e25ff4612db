//! Idle eye gaze.
//!
//! Both eyes wander in lockstep between random targets inside the configured
//! angle limits. Movement runs at a constant angular speed; once the eyes
//! arrive they hold for a random duration before picking the next target.

use emote_types::{BoneHandle, BoneRole, GazeDef, Quat};
use rand::Rng;
use tracing::{debug, warn};

use crate::collaborators::Skeleton;
use crate::random;

/// Dot product at or above which the eyes count as on target.
const ARRIVAL_DOT: f32 = 0.9999;

/// Phase of the gaze state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GazePhase {
    /// Rotating towards `target`.
    MovingToTarget {
        /// Rotation being approached.
        target: Quat,
    },
    /// Resting on the current rotation.
    Holding {
        /// Seconds until the next target is chosen.
        remaining: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EyeBones {
    left: BoneHandle,
    right: BoneHandle,
}

/// Eye gaze controller. Owns the skeleton collaborator.
pub struct EyeGaze {
    skeleton: Option<Box<dyn Skeleton>>,
    eyes: Option<EyeBones>,
    def: GazeDef,
    enabled: bool,
    rotation: Quat,
    phase: GazePhase,
}

impl core::fmt::Debug for EyeGaze {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EyeGaze")
            .field("eyes", &self.eyes)
            .field("enabled", &self.enabled)
            .field("rotation", &self.rotation)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

fn ordered(a: f32, b: f32) -> (f32, f32) {
    if a <= b { (a, b) } else { (b, a) }
}

impl EyeGaze {
    /// Build the controller, resolving both eye bones.
    ///
    /// Without a skeleton or without both eyes the controller stays inert and
    /// a warning is recorded.
    pub fn new(def: &GazeDef, skeleton: Option<Box<dyn Skeleton>>, warnings: &mut Vec<String>) -> Self {
        let eyes = skeleton.as_deref().and_then(|s| {
            Some(EyeBones {
                left: s.bone(BoneRole::LeftEye)?,
                right: s.bone(BoneRole::RightEye)?,
            })
        });
        if eyes.is_none() {
            warn!(has_skeleton = skeleton.is_some(), "Eye bones unavailable, gaze disabled");
            warnings.push("gaze: eye bones unavailable".to_owned());
        }

        let mut def = def.clone();
        (def.min_horizontal, def.max_horizontal) = ordered(def.min_horizontal, def.max_horizontal);
        (def.min_vertical, def.max_vertical) = ordered(def.min_vertical, def.max_vertical);
        (def.min_hold, def.max_hold) = ordered(def.min_hold.max(0.0), def.max_hold.max(0.0));
        if !def.speed.is_finite() || def.speed <= 0.0 {
            warn!(speed = def.speed, "Gaze speed not positive, using 1 deg/s");
            warnings.push(format!("gaze: speed {} not positive", def.speed));
            def.speed = 1.0;
        }

        Self {
            skeleton,
            eyes,
            def,
            enabled: false,
            rotation: Quat::IDENTITY,
            phase: GazePhase::Holding { remaining: 0.0 },
        }
    }

    /// Whether both eye bones were found.
    pub const fn is_available(&self) -> bool {
        self.eyes.is_some()
    }

    /// Whether gaze wandering is running.
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Rotation last written to both eyes.
    pub const fn rotation(&self) -> Quat {
        self.rotation
    }

    /// Current phase.
    pub const fn phase(&self) -> GazePhase {
        self.phase
    }

    /// Enable or disable wandering. Disabling recentres the eyes.
    ///
    /// Enabling an unavailable controller is ignored.
    pub fn set_enabled<R: Rng + ?Sized>(&mut self, enabled: bool, rng: &mut R) {
        if enabled && self.eyes.is_none() {
            return;
        }
        self.enabled = enabled;
        if enabled {
            self.choose_target(rng);
        } else {
            self.rotation = Quat::IDENTITY;
            self.phase = GazePhase::Holding { remaining: 0.0 };
            self.write_rotation();
        }
        debug!(enabled, "Gaze toggled");
    }

    fn choose_target<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let yaw = random::between(rng, self.def.min_horizontal, self.def.max_horizontal);
        let pitch = random::between(rng, self.def.min_vertical, self.def.max_vertical);
        self.phase = GazePhase::MovingToTarget {
            target: Quat::from_pitch_yaw(pitch, yaw),
        };
    }

    fn write_rotation(&mut self) {
        let (Some(skeleton), Some(eyes)) = (self.skeleton.as_mut(), self.eyes) else {
            return;
        };
        skeleton.set_local_rotation(eyes.left, self.rotation);
        skeleton.set_local_rotation(eyes.right, self.rotation);
    }

    /// Advance by `dt` seconds and write the eye rotation.
    pub fn tick<R: Rng + ?Sized>(&mut self, dt: f32, rng: &mut R) {
        if !self.enabled {
            return;
        }
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        match self.phase {
            GazePhase::MovingToTarget { target } => {
                self.rotation = self.rotation.rotate_towards(target, self.def.speed * dt);
                if self.rotation.dot(target).abs() >= ARRIVAL_DOT {
                    self.phase = GazePhase::Holding {
                        remaining: random::between(rng, self.def.min_hold, self.def.max_hold),
                    };
                }
                self.write_rotation();
            }
            GazePhase::Holding { remaining } => {
                if dt < remaining {
                    self.phase = GazePhase::Holding {
                        remaining: remaining - dt,
                    };
                } else {
                    self.choose_target(rng);
                }
            }
        }
    }
}
