//! Host collaborator interfaces.
//!
//! The engine never renders, skins, or decodes anything itself. It talks to
//! the host through three narrow traits:
//!
//! - [`ShapeRenderer`] -- reads shape names and writes blend-shape weights.
//! - [`Skeleton`] -- resolves bones by semantic role and rotates them.
//! - [`AudioOutput`] -- the character's single audio slot.
//!
//! All calls are assumed non-blocking. Implementations are owned by the
//! subsystem that uses them (registry, gaze controller, speech driver).

use emote_types::{BoneHandle, BoneRole, ClipHandle, MeshHandle, Quat};

use crate::error::AudioError;

/// Number of frames averaged when measuring clip amplitude.
pub const AMPLITUDE_WINDOW_FRAMES: usize = 256;

/// Skinned-mesh renderer exposing blend-shape access.
pub trait ShapeRenderer {
    /// Write the weight (in `[0, 100]`) of shape `index` on `mesh`.
    fn set_shape_weight(&mut self, mesh: MeshHandle, index: u32, weight: f32);

    /// Name of shape `index` on `mesh`, or `None` if the index is out of range
    /// or the mesh is gone.
    fn shape_name(&self, mesh: MeshHandle, index: u32) -> Option<String>;

    /// Number of shapes on `mesh` (0 for an unknown mesh).
    fn shape_count(&self, mesh: MeshHandle) -> u32;
}

/// Bone lookup and local rotation.
pub trait Skeleton {
    /// The bone playing `role`, if the rig has one.
    fn bone(&self, role: BoneRole) -> Option<BoneHandle>;

    /// Set the local rotation of `bone`.
    fn set_local_rotation(&mut self, bone: BoneHandle, rotation: Quat);
}

/// A character's single audio output slot.
pub trait AudioOutput {
    /// Fetch the decoded samples of `clip`.
    fn load_samples(&mut self, clip: ClipHandle) -> Result<ClipSamples, AudioError>;

    /// Start playing `clip` at `speed` and `volume`.
    fn play(&mut self, clip: ClipHandle, speed: f32, volume: f32);

    /// Stop whatever is playing.
    fn stop(&mut self);

    /// Whether the slot is currently playing.
    fn is_playing(&self) -> bool;

    /// Playback position of the current clip in seconds.
    fn current_time(&self) -> f32;
}

/// Decoded, interleaved PCM samples of a clip.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipSamples {
    /// Interleaved samples in `[-1, 1]`.
    pub samples: Vec<f32>,
    /// Channel count (at least 1).
    pub channels: u16,
    /// Sample rate in Hz.
    pub frequency: u32,
}

impl ClipSamples {
    /// Build a sample buffer.
    pub const fn new(samples: Vec<f32>, channels: u16, frequency: u32) -> Self {
        Self {
            samples,
            channels,
            frequency,
        }
    }

    /// Clip length in seconds.
    pub fn duration(&self) -> f32 {
        let channels = usize::from(self.channels.max(1));
        let frames = self.samples.len().checked_div(channels).unwrap_or(0);
        if self.frequency == 0 {
            return 0.0;
        }
        frames as f32 / self.frequency as f32
    }

    /// Mean absolute amplitude of the window starting at `time` seconds.
    ///
    /// Returns 0 past the end of the clip or for an empty buffer.
    pub fn amplitude_at(&self, time: f32) -> f32 {
        if !time.is_finite() || time < 0.0 || self.frequency == 0 {
            return 0.0;
        }
        let channels = usize::from(self.channels.max(1));
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let frame = (f64::from(time) * f64::from(self.frequency)) as usize;
        let Some(start) = frame.checked_mul(channels) else {
            return 0.0;
        };
        let window = AMPLITUDE_WINDOW_FRAMES.saturating_mul(channels);
        let end = start.saturating_add(window).min(self.samples.len());
        let Some(slice) = self.samples.get(start..end) else {
            return 0.0;
        };
        if slice.is_empty() {
            return 0.0;
        }
        let sum: f32 = slice.iter().map(|s| s.abs()).sum();
        sum / slice.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_accounts_for_channels() {
        let clip = ClipSamples::new(vec![0.0; 8000], 2, 4000);
        assert!((clip.duration() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn amplitude_is_mean_absolute() {
        let mut samples = vec![0.0; 1000];
        for s in samples.iter_mut().skip(500) {
            *s = -0.5;
        }
        let clip = ClipSamples::new(samples, 1, 1000);
        assert!(clip.amplitude_at(0.0) < 1e-6);
        assert!((clip.amplitude_at(0.6) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn amplitude_past_end_is_silent() {
        let clip = ClipSamples::new(vec![1.0; 100], 1, 100);
        assert!(clip.amplitude_at(5.0) < f32::EPSILON);
        assert!(clip.amplitude_at(-1.0) < f32::EPSILON);
    }
}
