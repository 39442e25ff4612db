//! Per-tick update of a [`ShapesModule`].
//!
//! Each call to [`ShapesModule::tick`] runs these steps in order:
//!
//! 1. **Clock** -- advance the tick counter and elapsed time.
//! 2. **Deferred** -- dispatch reaction requests queued before the first tick.
//! 3. **Blink and gaze** -- advance both state machines; gaze writes the eye
//!    bones directly.
//! 4. **Channels** -- advance every emotion and phoneme envelope.
//! 5. **Speech** -- sample the playing clip and pick phonemes and vox
//!    emotions, or release them when the clip has ended.
//! 6. **Reactions** -- close stages whose emotion and speech have finished.
//! 7. **Apply** -- write a final zero for channels that just turned off,
//!    then the weights of every enabled channel. Blink is written last so
//!    the eyelids win over emotions sharing them.
//! 8. **Notices** -- collect every notice raised since the previous tick.
//!
//! The cycle is deterministic given the same seed, configuration and
//! collaborator behavior.

use emote_face::ReactionContext;
use emote_types::ReactionNotice;
use tracing::{debug, info};

use crate::clock::ClockError;
use crate::module::ShapesModule;

/// What happened during one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickSummary {
    /// The tick number just completed.
    pub tick: u64,
    /// Seconds elapsed since the module was built.
    pub elapsed: f64,
    /// Reaction notices raised since the previous tick, in order.
    pub notices: Vec<ReactionNotice>,
    /// Emotions currently enabled.
    pub active_emotions: usize,
    /// Phonemes currently enabled.
    pub active_phonemes: usize,
    /// Whether a speech clip is playing.
    pub speaking: bool,
}

impl ShapesModule {
    /// Advance the face by `dt` seconds.
    ///
    /// # Errors
    ///
    /// Returns a [`ClockError`] for a non-finite `dt` or tick overflow. The
    /// face is not advanced in that case.
    pub fn tick(&mut self, dt: f32) -> Result<TickSummary, ClockError> {
        let dt = self.clock.advance(dt)?;
        let tick = self.clock.tick();

        let deferred = core::mem::take(&mut self.deferred);
        if !deferred.is_empty() {
            let started = deferred
                .into_iter()
                .map(|request| self.run_reaction(request))
                .fold(0_usize, usize::saturating_add);
            info!(tick, started, "Dispatched deferred reactions");
        }

        self.blink.tick(dt, &mut self.rng);
        self.gaze.tick(dt, &mut self.rng);

        self.emotions.tick(dt);
        self.phonemes.tick(dt);

        if let Some(token) = self
            .speech
            .tick(dt, &mut self.emotions, &mut self.phonemes, &mut self.rng)
        {
            debug!(tick, token = token.0, "Speech playback ended");
        }

        let mut ctx = ReactionContext {
            emotions: &mut self.emotions,
            phonemes: &mut self.phonemes,
            speech: &mut self.speech,
            rng: &mut self.rng,
            bus: &mut self.bus,
        };
        let closed = self.reactions.update(&mut ctx);
        if closed > 0 {
            debug!(tick, closed, "Reaction stages closed");
        }

        self.emotions.release(&mut self.registry);
        self.phonemes.release(&mut self.registry);
        self.blink.release(&mut self.registry);
        self.emotions.apply(&mut self.registry);
        self.phonemes.apply(&mut self.registry);
        self.blink.apply(&mut self.registry);

        Ok(TickSummary {
            tick,
            elapsed: self.clock.elapsed(),
            notices: self.bus.drain(),
            active_emotions: self.emotions.active_count(),
            active_phonemes: self.phonemes.active_count(),
            speaking: self.speech.is_speaking(),
        })
    }
}
