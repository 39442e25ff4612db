//! Emotion channels.
//!
//! An [`Emotion`] is a [`Channel`] plus the metadata reactions and speech use
//! to choose it: intensity axes (classified into a [`Sentiment`]), the vox
//! flag, per-stage hold durations and a default play speed.

use std::collections::BTreeMap;

use emote_types::{EmotionAxes, EmotionDef, EmotionId, HoldDef, ReactionStage, Sentiment};
use tracing::debug;

use crate::channel::{Channel, resolve_shapes};
use crate::error::FaceError;
use crate::registry::BlendShapeRegistry;

/// An emotion channel and its selection metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Emotion {
    /// Stable id (position in the owning set).
    pub id: EmotionId,
    /// The animated channel.
    pub channel: Channel,
    /// Intensity axes, each clamped to `[-1, 1]`.
    pub axes: EmotionAxes,
    /// Eligible for random selection during speech.
    pub vox: bool,
    /// Per-stage hold durations used by reactions.
    pub hold: HoldDef,
    /// Speed multiplier used when a reaction plays the emotion.
    pub play_speed: f32,
}

fn clamp_axis(value: f32) -> f32 {
    if value.is_finite() { value.clamp(-1.0, 1.0) } else { 0.0 }
}

impl Emotion {
    /// Build an emotion from its definition, resolving shape names.
    pub fn from_def(
        id: EmotionId,
        def: &EmotionDef,
        registry: &BlendShapeRegistry,
        warnings: &mut Vec<String>,
    ) -> Self {
        let shapes = resolve_shapes(&def.name, &def.shapes, registry, warnings);
        let mut channel = Channel::new(def.name.clone(), shapes, def.fade_in, def.fade_out);
        channel.set_allowed(def.enabled);
        Self {
            id,
            channel,
            axes: EmotionAxes {
                anger: clamp_axis(def.axes.anger),
                joy: clamp_axis(def.axes.joy),
                surprise: clamp_axis(def.axes.surprise),
                trust: clamp_axis(def.axes.trust),
            },
            vox: def.vox,
            hold: def.hold,
            play_speed: def.play_speed,
        }
    }

    /// Emotion name.
    pub fn name(&self) -> &str {
        self.channel.name()
    }

    /// Classify the axes.
    ///
    /// Hostile when anger is positive and at least as strong as both joy and
    /// trust; otherwise friendly when joy or trust is positive; otherwise
    /// neutral. Surprise alone never decides.
    pub fn sentiment(&self) -> Sentiment {
        let EmotionAxes { anger, joy, trust, .. } = self.axes;
        if anger > 0.0 && anger >= joy.max(trust) {
            Sentiment::Hostile
        } else if joy > 0.0 || trust > 0.0 {
            Sentiment::Friendly
        } else {
            Sentiment::Neutral
        }
    }

    /// Hold duration for a reaction stage, never negative.
    pub fn hold_for(&self, stage: ReactionStage) -> f32 {
        let hold = match stage {
            ReactionStage::Enter => self.hold.enter,
            ReactionStage::Exit => self.hold.exit,
            ReactionStage::Stay => self.hold.stay,
        };
        if hold.is_finite() { hold.max(0.0) } else { 0.0 }
    }
}

/// Every emotion of a character, addressable by id, name or index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmotionSet {
    emotions: Vec<Emotion>,
    by_name: BTreeMap<String, EmotionId>,
}

impl EmotionSet {
    /// Build the set. Duplicate names are rejected.
    pub fn from_defs(
        defs: &[EmotionDef],
        registry: &BlendShapeRegistry,
        warnings: &mut Vec<String>,
    ) -> Result<Self, FaceError> {
        let mut set = Self::default();
        for def in defs {
            if set.by_name.contains_key(&def.name) {
                return Err(FaceError::DuplicateName {
                    kind: "emotion",
                    name: def.name.clone(),
                });
            }
            let Some(id) = EmotionId::from_index(set.emotions.len()) else {
                break;
            };
            set.by_name.insert(def.name.clone(), id);
            set.emotions.push(Emotion::from_def(id, def, registry, warnings));
        }
        debug!(count = set.emotions.len(), "Built emotion set");
        Ok(set)
    }

    /// Number of emotions.
    pub fn len(&self) -> usize {
        self.emotions.len()
    }

    /// Whether there are no emotions.
    pub fn is_empty(&self) -> bool {
        self.emotions.is_empty()
    }

    /// Look up by id.
    pub fn get(&self, id: EmotionId) -> Option<&Emotion> {
        self.emotions.get(id.index()?)
    }

    /// Mutable lookup by id.
    pub fn get_mut(&mut self, id: EmotionId) -> Option<&mut Emotion> {
        self.emotions.get_mut(id.index()?)
    }

    /// Id of the emotion named `name`.
    pub fn by_name(&self, name: &str) -> Option<EmotionId> {
        self.by_name.get(name).copied()
    }

    /// Id of the emotion at list position `index`.
    pub fn by_index(&self, index: usize) -> Option<EmotionId> {
        self.emotions.get(index).map(|e| e.id)
    }

    /// Iterate over all emotions.
    pub fn iter(&self) -> impl Iterator<Item = &Emotion> {
        self.emotions.iter()
    }

    /// Mutable iteration over all emotions.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Emotion> {
        self.emotions.iter_mut()
    }

    /// Ids of playable emotions expressing `sentiment`.
    pub fn with_sentiment(&self, sentiment: Sentiment) -> Vec<EmotionId> {
        self.emotions
            .iter()
            .filter(|e| e.channel.is_allowed() && e.sentiment() == sentiment)
            .map(|e| e.id)
            .collect()
    }

    /// Ids of playable vox emotions.
    pub fn vox_ids(&self) -> Vec<EmotionId> {
        self.emotions
            .iter()
            .filter(|e| e.vox && e.channel.is_allowed())
            .map(|e| e.id)
            .collect()
    }

    /// Number of enabled emotions.
    pub fn active_count(&self) -> usize {
        self.emotions.iter().filter(|e| e.channel.is_enabled()).count()
    }

    /// Whether any vox emotion is enabled.
    pub fn any_vox_active(&self) -> bool {
        self.emotions.iter().any(|e| e.vox && e.channel.is_enabled())
    }

    /// Advance every envelope.
    pub fn tick(&mut self, dt: f32) {
        for emotion in &mut self.emotions {
            let step = emotion.channel.tick(dt);
            if step.finished {
                debug!(emotion = emotion.name(), "Emotion finished");
            }
        }
    }

    /// Write a final zero for every channel that just turned off.
    pub fn release(&mut self, registry: &mut BlendShapeRegistry) {
        for emotion in &mut self.emotions {
            emotion.channel.release(registry);
        }
    }

    /// Write the weights of every enabled channel.
    pub fn apply(&mut self, registry: &mut BlendShapeRegistry) {
        for emotion in &mut self.emotions {
            emotion.channel.apply(registry);
        }
    }

    /// Re-check shape references; returns the total unsynced count.
    pub fn sync(&mut self, registry: &BlendShapeRegistry) -> usize {
        self.emotions
            .iter_mut()
            .map(|e| e.channel.sync(registry))
            .fold(0, usize::saturating_add)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::FakeRenderer;

    fn def(name: &str, anger: f32, joy: f32, trust: f32) -> EmotionDef {
        EmotionDef {
            name: name.to_owned(),
            fade_in: 0.2,
            fade_out: 0.2,
            enabled: true,
            axes: EmotionAxes {
                anger,
                joy,
                surprise: 0.0,
                trust,
            },
            vox: false,
            hold: HoldDef::default(),
            play_speed: 1.0,
            shapes: Vec::new(),
        }
    }

    fn registry() -> BlendShapeRegistry {
        BlendShapeRegistry::new(Box::new(FakeRenderer::new()))
    }

    #[test]
    fn sentiment_classification() {
        let reg = registry();
        let mut warnings = Vec::new();
        let set = EmotionSet::from_defs(
            &[
                def("Rage", 0.9, 0.1, 0.0),
                def("Smile", 0.0, 0.8, 0.2),
                def("Blank", 0.0, 0.0, 0.0),
                def("Smirk", 0.3, 0.6, 0.0),
            ],
            &reg,
            &mut warnings,
        )
        .unwrap();
        assert_eq!(set.with_sentiment(Sentiment::Hostile), vec![EmotionId(0)]);
        assert_eq!(set.with_sentiment(Sentiment::Friendly), vec![EmotionId(1), EmotionId(3)]);
        assert_eq!(set.with_sentiment(Sentiment::Neutral), vec![EmotionId(2)]);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let reg = registry();
        let mut warnings = Vec::new();
        let err = EmotionSet::from_defs(&[def("A", 0.0, 0.0, 0.0), def("A", 0.0, 0.0, 0.0)], &reg, &mut warnings)
            .unwrap_err();
        assert!(matches!(err, FaceError::DuplicateName { kind: "emotion", .. }));
    }

    #[test]
    fn lookup_by_name_and_index() {
        let reg = registry();
        let mut warnings = Vec::new();
        let set = EmotionSet::from_defs(&[def("A", 0.0, 0.0, 0.0), def("B", 0.0, 0.0, 0.0)], &reg, &mut warnings)
            .unwrap();
        assert_eq!(set.by_name("B"), Some(EmotionId(1)));
        assert_eq!(set.by_index(0), Some(EmotionId(0)));
        assert_eq!(set.by_index(2), None);
        assert_eq!(set.get(EmotionId(1)).unwrap().name(), "B");
    }

    #[test]
    fn axes_are_clamped_and_holds_non_negative() {
        let reg = registry();
        let mut warnings = Vec::new();
        let mut d = def("Wild", 3.0, -4.0, 0.0);
        d.hold.enter = -1.0;
        d.hold.exit = 0.7;
        let e = Emotion::from_def(EmotionId(0), &d, &reg, &mut warnings);
        assert!((e.axes.anger - 1.0).abs() < f32::EPSILON);
        assert!((e.axes.joy + 1.0).abs() < f32::EPSILON);
        assert!(e.hold_for(ReactionStage::Enter).abs() < f32::EPSILON);
        assert!((e.hold_for(ReactionStage::Exit) - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn disabled_emotion_is_not_selectable() {
        let reg = registry();
        let mut warnings = Vec::new();
        let mut d = def("Grin", 0.0, 1.0, 0.0);
        d.enabled = false;
        d.vox = true;
        let mut set = EmotionSet::from_defs(&[d], &reg, &mut warnings).unwrap();
        assert!(set.vox_ids().is_empty());
        assert!(set.with_sentiment(Sentiment::Friendly).is_empty());
        assert_eq!(set.get_mut(EmotionId(0)).unwrap().channel.play(1.0), None);
    }
}
