//! Channels and their fade envelopes.
//!
//! A [`Channel`] is a named animatable unit: a list of weighted blend-shape
//! references plus a normalized `progress` in `[0, 1]`. Emotions, phonemes and
//! the blink all wrap one.
//!
//! Playback is modelled as an explicit [`Envelope`] record advanced by
//! [`Channel::tick`]. There is at most one envelope per channel; installing a
//! new one replaces the old one and continues from the channel's current
//! progress, so reversing direction mid-fade never snaps. Each installation
//! bumps the channel's `generation`, which lets drivers tell whether the
//! envelope they started is still the one running.
//!
//! Progress advances by rate (`1 / duration`) times elapsed time, so the
//! result is independent of the tick granularity. Time left over when a phase
//! completes is carried into the next phase within the same tick.

use emote_types::{BlendShapeId, ShapeRefDef};
use tracing::warn;

use crate::registry::BlendShapeRegistry;

/// Smallest duration a fade or hold may have. Zero or negative durations are
/// clamped up to this.
pub const MIN_DURATION: f32 = 1.0e-3;

/// Smallest playback speed accepted by [`Channel::play`].
pub const MIN_PLAY_SPEED: f32 = 0.05;

/// Progress within this distance of an endpoint counts as reached.
const PROGRESS_EPSILON: f32 = 1.0e-4;

/// Clamp a configured duration to a usable positive value.
pub fn sanitize_duration(seconds: f32) -> f32 {
    if seconds.is_finite() && seconds > MIN_DURATION {
        seconds
    } else {
        MIN_DURATION
    }
}

/// Clamp a playback speed to at least [`MIN_PLAY_SPEED`].
pub fn sanitize_speed(speed: f32) -> f32 {
    if speed.is_finite() && speed > MIN_PLAY_SPEED {
        speed
    } else {
        MIN_PLAY_SPEED
    }
}

/// A blend shape driven by a channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmotionShape {
    /// Target shape.
    pub blend_shape: BlendShapeId,
    /// Weight at full progress, in `[0, 100]`.
    pub max_weight: f32,
    /// Whether `blend_shape` resolved when last synced.
    pub synced: bool,
}

impl EmotionShape {
    /// Create a shape reference, clamping `max_weight` into `[0, 100]`.
    pub fn new(blend_shape: BlendShapeId, max_weight: f32) -> Self {
        let max_weight = if max_weight.is_finite() {
            max_weight.clamp(0.0, crate::registry::MAX_SHAPE_WEIGHT)
        } else {
            0.0
        };
        Self {
            blend_shape,
            max_weight,
            synced: true,
        }
    }
}

/// What happens after a fade-in reaches full weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AfterFadeIn {
    /// Stay at full weight until stopped.
    HoldIndefinitely,
    /// Hold for `hold` seconds, then fade out at `fade_out_rate`.
    PingPong {
        /// Seconds at full weight (0 for a plain ping-pong).
        hold: f32,
        /// Progress lost per second while fading out.
        fade_out_rate: f32,
    },
}

/// The running phase of a channel's envelope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Envelope {
    /// Ramping up at `rate` progress per second.
    FadeIn {
        /// Progress gained per second.
        rate: f32,
        /// Continuation once progress reaches 1.
        then: AfterFadeIn,
    },
    /// Holding at full weight for `remaining` seconds.
    Hold {
        /// Seconds left.
        remaining: f32,
        /// Progress lost per second once the hold ends.
        fade_out_rate: f32,
    },
    /// Holding at full weight until replaced.
    Sustain,
    /// Ramping down at `rate` progress per second; disables on completion.
    FadeOut {
        /// Progress lost per second.
        rate: f32,
    },
}

/// Result of advancing a channel by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelStep {
    /// Progress changed this tick.
    pub changed: bool,
    /// A fade-out completed and the channel disabled itself this tick.
    pub finished: bool,
}

/// A named animatable unit of weighted blend shapes.
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    name: String,
    shapes: Vec<EmotionShape>,
    fade_in: f32,
    fade_out: f32,
    /// Whether the channel may play at all (authoring switch).
    allowed: bool,
    enabled: bool,
    progress: f32,
    envelope: Option<Envelope>,
    generation: u64,
    dirty: bool,
}

impl Channel {
    /// Create an idle channel. Durations are clamped to [`MIN_DURATION`].
    pub fn new(name: impl Into<String>, shapes: Vec<EmotionShape>, fade_in: f32, fade_out: f32) -> Self {
        Self {
            name: name.into(),
            shapes,
            fade_in: sanitize_duration(fade_in),
            fade_out: sanitize_duration(fade_out),
            allowed: true,
            enabled: false,
            progress: 0.0,
            envelope: None,
            generation: 0,
            dirty: false,
        }
    }

    /// Set whether the channel may play. A disallowed channel ignores every
    /// playback request; disallowing an active channel turns it off.
    pub fn set_allowed(&mut self, allowed: bool) {
        self.allowed = allowed;
        if !allowed && (self.enabled || self.progress > 0.0) {
            self.set_off();
        }
    }

    /// Whether the channel may play.
    pub const fn is_allowed(&self) -> bool {
        self.allowed
    }

    /// Channel name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Blend-shape references.
    pub fn shapes(&self) -> &[EmotionShape] {
        &self.shapes
    }

    /// Fade-in duration in seconds.
    pub const fn fade_in(&self) -> f32 {
        self.fade_in
    }

    /// Fade-out duration in seconds.
    pub const fn fade_out(&self) -> f32 {
        self.fade_out
    }

    /// Current normalized weight.
    pub const fn progress(&self) -> f32 {
        self.progress
    }

    /// Whether the channel is enabled (playing, holding, or fading out).
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether an envelope is currently running.
    pub const fn is_animating(&self) -> bool {
        self.envelope.is_some()
    }

    /// The running envelope, if any.
    pub const fn envelope(&self) -> Option<Envelope> {
        self.envelope
    }

    /// Whether the channel is ramping up.
    pub const fn is_fading_in(&self) -> bool {
        matches!(self.envelope, Some(Envelope::FadeIn { .. }))
    }

    /// Whether the channel is ramping down.
    pub const fn is_fading_out(&self) -> bool {
        matches!(self.envelope, Some(Envelope::FadeOut { .. }))
    }

    /// Counter bumped every time an envelope is installed or cancelled.
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the envelope started at `generation` is still in effect.
    pub const fn is_playing_generation(&self, generation: u64) -> bool {
        self.generation == generation && self.enabled
    }

    fn install(&mut self, envelope: Option<Envelope>) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.envelope = envelope;
        self.generation
    }

    fn set_progress(&mut self, progress: f32) {
        let progress = progress.clamp(0.0, 1.0);
        if (progress - self.progress).abs() > f32::EPSILON || progress <= 0.0 && self.progress > 0.0 {
            self.dirty = true;
        }
        self.progress = progress;
    }

    /// Jump to full weight and stay there. Returns the new generation.
    pub fn set_on(&mut self) -> Option<u64> {
        if !self.allowed {
            return None;
        }
        let generation = self.install(Some(Envelope::Sustain));
        self.enabled = true;
        self.set_progress(1.0);
        self.dirty = true;
        Some(generation)
    }

    /// Jump to zero weight and disable. Returns the new generation.
    pub fn set_off(&mut self) -> u64 {
        let generation = self.install(None);
        self.enabled = false;
        self.set_progress(0.0);
        self.dirty = true;
        generation
    }

    /// Fade in from the current weight and hold at full weight until stopped.
    pub fn start(&mut self) -> Option<u64> {
        if !self.allowed {
            return None;
        }
        self.enabled = true;
        Some(self.install(Some(Envelope::FadeIn {
            rate: 1.0 / self.fade_in,
            then: AfterFadeIn::HoldIndefinitely,
        })))
    }

    /// Fade out from the current weight; disables on completion.
    ///
    /// A channel that is already idle at zero weight stays idle.
    pub fn stop(&mut self) -> u64 {
        if !self.enabled && self.progress <= 0.0 {
            return self.install(None);
        }
        self.install(Some(Envelope::FadeOut {
            rate: 1.0 / self.fade_out,
        }))
    }

    /// Ping-pong: fade in over `fade_in / speed`, fade out over
    /// `fade_out / speed`, then disable.
    pub fn play(&mut self, speed: f32) -> Option<u64> {
        self.play_with_hold(speed, 0.0)
    }

    /// Ping-pong with a hold of `hold` seconds (not scaled by speed) at full
    /// weight between the two fades.
    pub fn play_with_hold(&mut self, speed: f32, hold: f32) -> Option<u64> {
        if !self.allowed {
            return None;
        }
        let speed = sanitize_speed(speed);
        let hold = if hold.is_finite() { hold.max(0.0) } else { 0.0 };
        self.enabled = true;
        Some(self.install(Some(Envelope::FadeIn {
            rate: speed / self.fade_in,
            then: AfterFadeIn::PingPong {
                hold,
                fade_out_rate: speed / self.fade_out,
            },
        })))
    }

    /// Drive the progress directly, cancelling any envelope.
    ///
    /// Used by timer-driven specializations (blink) that compute their own
    /// curve. The channel counts as enabled while progress is above zero.
    pub fn drive(&mut self, progress: f32) {
        if self.envelope.is_some() {
            let _ = self.install(None);
        }
        self.set_progress(progress);
        self.enabled = self.progress > 0.0;
    }

    /// Advance the envelope by `dt` seconds.
    pub fn tick(&mut self, dt: f32) -> ChannelStep {
        let before = self.progress;
        let mut step = ChannelStep::default();
        let mut remaining = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        while let Some(envelope) = self.envelope {
            match envelope {
                Envelope::Sustain => break,
                Envelope::FadeIn { rate, then } => {
                    let next = self.progress + rate * remaining;
                    if 1.0 - next > PROGRESS_EPSILON {
                        self.set_progress(next);
                        break;
                    }
                    remaining = (remaining - (1.0 - self.progress).max(0.0) / rate).max(0.0);
                    self.set_progress(1.0);
                    self.envelope = Some(match then {
                        AfterFadeIn::HoldIndefinitely => Envelope::Sustain,
                        AfterFadeIn::PingPong { hold, fade_out_rate } if hold > 0.0 => Envelope::Hold {
                            remaining: hold,
                            fade_out_rate,
                        },
                        AfterFadeIn::PingPong { fade_out_rate, .. } => Envelope::FadeOut { rate: fade_out_rate },
                    });
                }
                Envelope::Hold {
                    remaining: hold_left,
                    fade_out_rate,
                } => {
                    if remaining < hold_left {
                        self.envelope = Some(Envelope::Hold {
                            remaining: hold_left - remaining,
                            fade_out_rate,
                        });
                        break;
                    }
                    remaining -= hold_left;
                    self.envelope = Some(Envelope::FadeOut { rate: fade_out_rate });
                }
                Envelope::FadeOut { rate } => {
                    let next = self.progress - rate * remaining;
                    if next > PROGRESS_EPSILON {
                        self.set_progress(next);
                        break;
                    }
                    self.set_progress(0.0);
                    self.envelope = None;
                    self.enabled = false;
                    step.finished = true;
                    break;
                }
            }
        }

        step.changed = (self.progress - before).abs() > f32::EPSILON || step.finished;
        step
    }

    /// Write a final zero for a channel that turned off since its last write.
    ///
    /// Runs before [`apply`](Self::apply) in a tick so a finished channel
    /// never masks an enabled one sharing the same blend shape.
    pub fn release(&mut self, registry: &mut BlendShapeRegistry) {
        if self.enabled || !self.dirty {
            return;
        }
        self.write(registry);
    }

    /// Write this channel's weights; every tick while enabled.
    ///
    /// Shapes whose reference did not resolve are skipped.
    pub fn apply(&mut self, registry: &mut BlendShapeRegistry) {
        if !self.enabled {
            return;
        }
        self.write(registry);
    }

    fn write(&mut self, registry: &mut BlendShapeRegistry) {
        self.dirty = false;
        for shape in self.shapes.iter().filter(|s| s.synced) {
            registry.apply_weight(shape.blend_shape, self.progress, shape.max_weight);
        }
    }

    /// Re-check every shape reference against the registry and force the
    /// next [`release`](Self::release) or [`apply`](Self::apply) to rewrite
    /// every weight.
    ///
    /// Returns how many references are unsynced.
    pub fn sync(&mut self, registry: &BlendShapeRegistry) -> usize {
        self.dirty = true;
        let mut unsynced: usize = 0;
        for shape in &mut self.shapes {
            shape.synced = registry.resolve(shape.blend_shape).is_some_and(|s| s.is_valid);
            if !shape.synced {
                unsynced = unsynced.saturating_add(1);
            }
        }
        unsynced
    }
}

/// Resolve authored shape references against the registry.
///
/// Names that are not registered are dropped; each one adds a warning to
/// `warnings`. References to registered but invalid shapes are kept and
/// marked unsynced so a later revalidation can bring them back.
pub fn resolve_shapes(
    owner: &str,
    refs: &[ShapeRefDef],
    registry: &BlendShapeRegistry,
    warnings: &mut Vec<String>,
) -> Vec<EmotionShape> {
    let mut shapes = Vec::with_capacity(refs.len());
    for shape_ref in refs {
        let Some(id) = registry.find(&shape_ref.blend_shape) else {
            warn!(channel = owner, shape = %shape_ref.blend_shape, "Unknown blend shape, skipped");
            warnings.push(format!("{owner}: unknown blend shape {:?}", shape_ref.blend_shape));
            continue;
        };
        let mut shape = EmotionShape::new(id, shape_ref.max_weight);
        shape.synced = registry.resolve(id).is_some_and(|s| s.is_valid);
        shapes.push(shape);
    }
    shapes
}
