//! Automatic blinking.
//!
//! A two-phase timer: eyes stay open for a random interval, then one blink
//! plays over `duration`. The blink drives its [`Channel`] directly rather
//! than through an envelope.

use emote_types::BlinkDef;
use rand::Rng;
use tracing::{debug, warn};

use crate::channel::{Channel, resolve_shapes, sanitize_duration};
use crate::random;
use crate::registry::BlendShapeRegistry;

/// Phase of the blink timer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlinkPhase {
    /// Eyes open, counting down to the next blink.
    Interval {
        /// Seconds until the blink starts.
        remaining: f32,
    },
    /// Eyelids closing and reopening.
    Blinking {
        /// Seconds since the blink started.
        elapsed: f32,
    },
}

/// Blink controller.
#[derive(Debug, Clone, PartialEq)]
pub struct Blink {
    channel: Channel,
    min_interval: f32,
    max_interval: f32,
    duration: f32,
    simple: bool,
    enabled: bool,
    phase: BlinkPhase,
}

impl Blink {
    /// Build the blink from its definition. Starts disabled; call
    /// [`set_enabled`](Self::set_enabled) to arm the timer.
    pub fn from_def(def: &BlinkDef, registry: &BlendShapeRegistry, warnings: &mut Vec<String>) -> Self {
        let shapes = resolve_shapes("blink", &def.shapes, registry, warnings);
        let (mut min_interval, mut max_interval) = (def.min_interval.max(0.0), def.max_interval.max(0.0));
        if min_interval > max_interval {
            warn!(min_interval, max_interval, "Blink interval range reversed, swapping");
            warnings.push(format!("blink: interval range {min_interval}..{max_interval} reversed"));
            core::mem::swap(&mut min_interval, &mut max_interval);
        }
        Self {
            channel: Channel::new("blink", shapes, 0.0, 0.0),
            min_interval,
            max_interval,
            duration: sanitize_duration(def.duration),
            simple: def.simple,
            enabled: false,
            phase: BlinkPhase::Interval { remaining: 0.0 },
        }
    }

    /// Whether blinking is enabled.
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Current phase.
    pub const fn phase(&self) -> BlinkPhase {
        self.phase
    }

    /// Current eyelid weight in `[0, 1]`.
    pub const fn progress(&self) -> f32 {
        self.channel.progress()
    }

    /// The underlying channel.
    pub const fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Enable or disable blinking.
    ///
    /// Either way the interval timer restarts. Disabling mid-blink opens the
    /// eyes immediately.
    pub fn set_enabled<R: Rng + ?Sized>(&mut self, enabled: bool, rng: &mut R) {
        self.enabled = enabled;
        self.restart_interval(rng);
        if !enabled {
            self.channel.drive(0.0);
        }
        debug!(enabled, "Blink toggled");
    }

    fn restart_interval<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.phase = BlinkPhase::Interval {
            remaining: random::between(rng, self.min_interval, self.max_interval),
        };
    }

    /// Eyelid weight `t` of the way through a blink.
    fn curve(&self, t: f32) -> f32 {
        if self.simple {
            return 1.0;
        }
        if t < 0.5 { 2.0 * t } else { 2.0 * (1.0 - t) }
    }

    /// Advance the timer by `dt` seconds.
    pub fn tick<R: Rng + ?Sized>(&mut self, dt: f32, rng: &mut R) {
        if !self.enabled {
            return;
        }
        let mut remaining_dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        loop {
            match self.phase {
                BlinkPhase::Interval { remaining } => {
                    if remaining_dt < remaining {
                        self.phase = BlinkPhase::Interval {
                            remaining: remaining - remaining_dt,
                        };
                        return;
                    }
                    remaining_dt -= remaining;
                    self.phase = BlinkPhase::Blinking { elapsed: 0.0 };
                }
                BlinkPhase::Blinking { elapsed } => {
                    let elapsed = elapsed + remaining_dt;
                    if elapsed < self.duration {
                        self.phase = BlinkPhase::Blinking { elapsed };
                        self.channel.drive(self.curve(elapsed / self.duration));
                        return;
                    }
                    self.channel.drive(0.0);
                    self.restart_interval(rng);
                    remaining_dt = elapsed - self.duration;
                }
            }
        }
    }

    /// Write the final open-eye zero once a blink ends.
    pub fn release(&mut self, registry: &mut BlendShapeRegistry) {
        self.channel.release(registry);
    }

    /// Write the eyelid weight while a blink is in progress.
    pub fn apply(&mut self, registry: &mut BlendShapeRegistry) {
        self.channel.apply(registry);
    }

    /// Re-check shape references; returns the unsynced count.
    pub fn sync(&mut self, registry: &BlendShapeRegistry) -> usize {
        self.channel.sync(registry)
    }
}
