//! Scripted encounter driven against a face.
//!
//! An [`Encounter`] is a list of timed [`Cue`]s: another character walks
//! into the proximity zone, the face says something, the visitor leaves.
//! The engine asks for the cues that have come due after each tick and
//! performs them through the [`ShapesModule`] API, the same calls a game
//! host would make from its trigger callbacks.

use emote_core::{Lookup, ShapesModule};
use emote_types::{ActorId, ModelId, Relationship, SpeechClipId};
use tracing::info;

/// Something the host does to the face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cue {
    /// The visitor enters the proximity zone at `distance` metres.
    Enter {
        /// How the face regards the visitor.
        relationship: Relationship,
        /// Distance from the face.
        distance: f32,
    },
    /// The face plays the speech clip at `index`.
    Speak {
        /// Index of the speech clip.
        index: usize,
    },
    /// The visitor leaves the proximity zone at `distance` metres.
    Exit {
        /// How the face regards the visitor.
        relationship: Relationship,
        /// Distance from the face.
        distance: f32,
    },
}

/// A cue scheduled at `at` seconds of face time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    /// Face time at which the cue fires.
    pub at: f64,
    /// What happens.
    pub cue: Cue,
}

/// A single visitor's scripted encounter with the face.
#[derive(Debug, Clone)]
pub struct Encounter {
    visitor: ActorId,
    model: ModelId,
    steps: Vec<Step>,
    next: usize,
}

impl Encounter {
    /// Build an encounter from steps. Steps are sorted by time.
    pub fn new(model: ModelId, mut steps: Vec<Step>) -> Self {
        steps.sort_by(|a, b| a.at.total_cmp(&b.at));
        Self {
            visitor: ActorId::new(),
            model,
            steps,
            next: 0,
        }
    }

    /// A friend walks up, the face greets them aloud, the friend leaves.
    pub fn friendly_visit() -> Self {
        Self::new(
            ModelId(1),
            vec![
                Step {
                    at: 0.5,
                    cue: Cue::Enter {
                        relationship: Relationship::Friend,
                        distance: 1.5,
                    },
                },
                Step {
                    at: 2.0,
                    cue: Cue::Speak { index: 0 },
                },
                Step {
                    at: 5.0,
                    cue: Cue::Exit {
                        relationship: Relationship::Friend,
                        distance: 1.5,
                    },
                },
            ],
        )
    }

    /// The visiting actor.
    pub const fn visitor(&self) -> ActorId {
        self.visitor
    }

    /// Whether every cue has been taken.
    pub fn is_finished(&self) -> bool {
        self.next >= self.steps.len()
    }

    /// Take every cue scheduled at or before `elapsed`, in order.
    pub fn due(&mut self, elapsed: f64) -> Vec<Cue> {
        let mut cues = Vec::new();
        while let Some(step) = self.steps.get(self.next) {
            if step.at > elapsed {
                break;
            }
            cues.push(step.cue);
            self.next = self.next.saturating_add(1);
        }
        cues
    }

    /// Perform `cue` on `module`.
    pub fn perform(&self, cue: Cue, module: &mut ShapesModule) {
        match cue {
            Cue::Enter {
                relationship,
                distance,
            } => {
                let started = module.character_enter_at(self.visitor, self.model, relationship, distance);
                info!(visitor = %self.visitor, ?relationship, distance, started, "Visitor entered");
            }
            Cue::Speak { index } => {
                let lookup: Lookup<'_, SpeechClipId> = Lookup::Index(index);
                let playing = module.play_speech_audio(lookup);
                info!(index, playing, "Speech requested");
            }
            Cue::Exit {
                relationship,
                distance,
            } => {
                let started = module.character_exit_at(self.visitor, self.model, relationship, distance);
                info!(visitor = %self.visitor, ?relationship, distance, started, "Visitor left");
            }
        }
    }
}
