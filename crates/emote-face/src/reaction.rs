//! Proximity reactions.
//!
//! A [`Reaction`] pairs a proximity event (another actor entering or leaving
//! the zone) with a random emotion and/or a random speech clip. Each stage
//! moves `Idle -> Active -> Idle`; while active it is bound to the actor that
//! triggered it and rejects every other actor.
//!
//! Completion is detected by polling: the stage remembers the channel
//! generation of the emotion it started and the token of the clip it
//! started. Once neither is still running, the post notice fires and the
//! stage returns to idle.

use std::collections::BTreeMap;

use emote_types::{
    EmotionId, ModelId, NoticeKind, ReactTo, ReactionDef, ReactionEvent, ReactionId, ReactionNotice,
    ReactionStage, SpeechClipId, StageDef,
};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::emotion::EmotionSet;
use crate::error::FaceError;
use crate::events::NoticeBus;
use crate::phoneme::PhonemeSet;
use crate::random;
use crate::speech::{SpeechDriver, SpeechToken};

/// Everything a reaction needs to play: the channels it drives, the speech
/// driver, the random source and the notice bus.
pub struct ReactionContext<'a, R: Rng + ?Sized> {
    /// Emotion channels.
    pub emotions: &'a mut EmotionSet,
    /// Phoneme channels (touched when speech starts or stops).
    pub phonemes: &'a mut PhonemeSet,
    /// The speech driver.
    pub speech: &'a mut SpeechDriver,
    /// Random source.
    pub rng: &'a mut R,
    /// Notice delivery.
    pub bus: &'a mut NoticeBus,
}

/// Resolved candidates of one stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageCandidates {
    /// Whether proximity events trigger the stage.
    pub enabled: bool,
    /// Emotions to pick from.
    pub emotions: Vec<EmotionId>,
    /// Speech clips to pick from.
    pub speech: Vec<SpeechClipId>,
}

/// A stage that is playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveStage {
    /// Actors the stage is bound to.
    pub binding: ReactionEvent,
    /// Emotion started by the stage and its channel generation.
    pub emotion: Option<(EmotionId, u64)>,
    /// Speech playback started by the stage.
    pub speech: Option<(SpeechClipId, SpeechToken)>,
}

/// State of one reaction stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StageState {
    /// Free to react.
    #[default]
    Idle,
    /// Playing for a bound actor.
    Active(ActiveStage),
}

/// A proximity reaction.
#[derive(Debug, Clone, PartialEq)]
pub struct Reaction {
    /// Stable id (position in the engine's list).
    pub id: ReactionId,
    /// Display name.
    pub name: String,
    /// Relationship filter.
    pub react_to: ReactTo,
    /// Model allow-list; empty accepts any model.
    pub models: Vec<ModelId>,
    /// Enter candidates.
    pub enter: StageCandidates,
    /// Exit candidates.
    pub exit: StageCandidates,
    /// Stay candidates. Stored only; no event triggers this stage.
    pub stay: StageCandidates,
    enter_state: StageState,
    exit_state: StageState,
}

impl Reaction {
    /// Whether `event` passes the relationship filter and model allow-list.
    pub fn accepts(&self, event: &ReactionEvent) -> bool {
        self.react_to.accepts(event.relationship)
            && (self.models.is_empty() || self.models.contains(&event.other_model_id))
    }

    /// Candidates of `stage`.
    pub const fn candidates(&self, stage: ReactionStage) -> &StageCandidates {
        match stage {
            ReactionStage::Enter => &self.enter,
            ReactionStage::Exit => &self.exit,
            ReactionStage::Stay => &self.stay,
        }
    }

    /// State of `stage`. Stay is always idle.
    pub const fn state(&self, stage: ReactionStage) -> StageState {
        match stage {
            ReactionStage::Enter => self.enter_state,
            ReactionStage::Exit => self.exit_state,
            ReactionStage::Stay => StageState::Idle,
        }
    }

    const fn state_mut(&mut self, stage: ReactionStage) -> Option<&mut StageState> {
        match stage {
            ReactionStage::Enter => Some(&mut self.enter_state),
            ReactionStage::Exit => Some(&mut self.exit_state),
            ReactionStage::Stay => None,
        }
    }

    /// Whether `stage` is bound to an actor.
    pub const fn is_active(&self, stage: ReactionStage) -> bool {
        matches!(self.state(stage), StageState::Active(_))
    }

    /// The actors `stage` is bound to.
    pub const fn binding(&self, stage: ReactionStage) -> Option<ReactionEvent> {
        match self.state(stage) {
            StageState::Active(active) => Some(active.binding),
            StageState::Idle => None,
        }
    }
}

/// All reactions of a character.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReactionEngine {
    reactions: Vec<Reaction>,
    by_name: BTreeMap<String, ReactionId>,
}

fn resolve_stage(
    reaction: &str,
    def: &StageDef,
    emotions: &EmotionSet,
    speech: &SpeechDriver,
    warnings: &mut Vec<String>,
) -> StageCandidates {
    let mut candidates = StageCandidates {
        enabled: def.enabled,
        ..StageCandidates::default()
    };
    for name in &def.emotions {
        match emotions.by_name(name) {
            Some(id) => candidates.emotions.push(id),
            None => {
                warn!(reaction, emotion = %name, "Unknown reaction emotion, skipped");
                warnings.push(format!("{reaction}: unknown emotion {name:?}"));
            }
        }
    }
    for name in &def.speech {
        match speech.by_name(name) {
            Some(id) => candidates.speech.push(id),
            None => {
                warn!(reaction, clip = %name, "Unknown reaction speech clip, skipped");
                warnings.push(format!("{reaction}: unknown speech clip {name:?}"));
            }
        }
    }
    candidates
}

impl ReactionEngine {
    /// Build the engine, resolving emotion and clip names. Duplicate
    /// reaction names are rejected; unknown candidate names are dropped.
    pub fn from_defs(
        defs: &[ReactionDef],
        emotions: &EmotionSet,
        speech: &SpeechDriver,
        warnings: &mut Vec<String>,
    ) -> Result<Self, FaceError> {
        let mut engine = Self::default();
        for def in defs {
            if engine.by_name.contains_key(&def.name) {
                return Err(FaceError::DuplicateName {
                    kind: "reaction",
                    name: def.name.clone(),
                });
            }
            let Some(id) = ReactionId::from_index(engine.reactions.len()) else {
                break;
            };
            engine.by_name.insert(def.name.clone(), id);
            engine.reactions.push(Reaction {
                id,
                name: def.name.clone(),
                react_to: def.react_to,
                models: def.models.clone(),
                enter: resolve_stage(&def.name, &def.enter, emotions, speech, warnings),
                exit: resolve_stage(&def.name, &def.exit, emotions, speech, warnings),
                stay: resolve_stage(&def.name, &def.stay, emotions, speech, warnings),
                enter_state: StageState::Idle,
                exit_state: StageState::Idle,
            });
        }
        debug!(count = engine.reactions.len(), "Built reaction engine");
        Ok(engine)
    }

    /// Number of reactions.
    pub fn len(&self) -> usize {
        self.reactions.len()
    }

    /// Whether there are no reactions.
    pub fn is_empty(&self) -> bool {
        self.reactions.is_empty()
    }

    /// Look up by id.
    pub fn get(&self, id: ReactionId) -> Option<&Reaction> {
        self.reactions.get(id.index()?)
    }

    /// Id of the reaction named `name`.
    pub fn by_name(&self, name: &str) -> Option<ReactionId> {
        self.by_name.get(name).copied()
    }

    /// Id of the reaction at list position `index`.
    pub fn by_index(&self, index: usize) -> Option<ReactionId> {
        self.reactions.get(index).map(|r| r.id)
    }

    /// Iterate over all reactions.
    pub fn iter(&self) -> impl Iterator<Item = &Reaction> {
        self.reactions.iter()
    }

    /// Number of active stages across all reactions.
    pub fn active_count(&self) -> usize {
        self.reactions
            .iter()
            .map(|r| usize::from(r.is_active(ReactionStage::Enter)) + usize::from(r.is_active(ReactionStage::Exit)))
            .fold(0, usize::saturating_add)
    }

    /// Handle a proximity event. Returns how many reactions started.
    ///
    /// Reactions already active for `stage` log and skip; reactions whose
    /// stage is disabled or whose filter rejects the event are skipped
    /// silently.
    pub fn on_event<R: Rng + ?Sized>(
        &mut self,
        stage: ReactionStage,
        event: ReactionEvent,
        ctx: &mut ReactionContext<'_, R>,
    ) -> usize {
        if stage == ReactionStage::Stay {
            debug!("Stay reactions have no trigger path");
            return 0;
        }
        let mut started: usize = 0;
        for reaction in &mut self.reactions {
            if let Some(bound) = reaction.binding(stage) {
                info!(
                    reaction = %reaction.name,
                    ?stage,
                    bound = %bound.other_id,
                    rejected = %event.other_id,
                    "Reaction busy, event ignored"
                );
                continue;
            }
            if !reaction.candidates(stage).enabled || !reaction.accepts(&event) {
                continue;
            }
            trigger(reaction, stage, event, ctx);
            started = started.saturating_add(1);
        }
        started
    }

    /// Play `stage` of reaction `id` for `event`, bypassing the relationship
    /// filter, model allow-list and stage enabled flag.
    ///
    /// Still refuses a stage that is already active.
    pub fn play<R: Rng + ?Sized>(
        &mut self,
        id: ReactionId,
        stage: ReactionStage,
        event: ReactionEvent,
        ctx: &mut ReactionContext<'_, R>,
    ) -> Result<(), FaceError> {
        let reaction = id
            .index()
            .and_then(|i| self.reactions.get_mut(i))
            .ok_or(FaceError::UnknownReaction(id))?;
        if stage == ReactionStage::Stay {
            return Err(FaceError::StageUnavailable(id));
        }
        if reaction.is_active(stage) {
            return Err(FaceError::ReactionBusy(id));
        }
        trigger(reaction, stage, event, ctx);
        Ok(())
    }

    /// Poll every active stage and close the ones whose emotion and speech
    /// have both finished. Returns how many stages closed.
    pub fn update<R: Rng + ?Sized>(&mut self, ctx: &mut ReactionContext<'_, R>) -> usize {
        let mut closed: usize = 0;
        for reaction in &mut self.reactions {
            for stage in [ReactionStage::Enter, ReactionStage::Exit] {
                let StageState::Active(active) = reaction.state(stage) else {
                    continue;
                };
                let emotion_done = active.emotion.is_none_or(|(id, generation)| {
                    !ctx.emotions
                        .get(id)
                        .is_some_and(|e| e.channel.is_playing_generation(generation))
                });
                let speech_done = active
                    .speech
                    .is_none_or(|(_, token)| !ctx.speech.is_playing_token(token));
                if emotion_done && speech_done {
                    finish(reaction, stage, active.binding, ctx.bus);
                    closed = closed.saturating_add(1);
                }
            }
        }
        closed
    }
}

fn trigger<R: Rng + ?Sized>(
    reaction: &mut Reaction,
    stage: ReactionStage,
    event: ReactionEvent,
    ctx: &mut ReactionContext<'_, R>,
) {
    if let Some(kind) = NoticeKind::pre(stage) {
        ctx.bus.emit(ReactionNotice {
            kind,
            reaction: reaction.id,
            event,
        });
    }

    let candidates = reaction.candidates(stage);
    let emotion = random::pick(ctx.rng, &candidates.emotions).and_then(|&id| {
        let emotion = ctx.emotions.get_mut(id)?;
        let hold = emotion.hold_for(stage);
        let generation = emotion.channel.play_with_hold(emotion.play_speed, hold)?;
        Some((id, generation))
    });

    let speech = random::pick(ctx.rng, &candidates.speech).and_then(|&id| {
        match ctx.speech.start(id, ctx.emotions, ctx.phonemes) {
            Ok(token) => Some((id, token)),
            Err(err) => {
                warn!(reaction = %reaction.name, clip = %id, %err, "Reaction speech could not play");
                None
            }
        }
    });

    info!(
        reaction = %reaction.name,
        ?stage,
        other = %event.other_id,
        emotion = ?emotion.map(|(id, _)| id),
        speech = ?speech.map(|(id, _)| id),
        "Reaction started"
    );

    if emotion.is_none() && speech.is_none() {
        finish(reaction, stage, event, ctx.bus);
        return;
    }
    if let Some(state) = reaction.state_mut(stage) {
        *state = StageState::Active(ActiveStage {
            binding: event,
            emotion,
            speech,
        });
    }
}

fn finish(reaction: &mut Reaction, stage: ReactionStage, binding: ReactionEvent, bus: &mut NoticeBus) {
    if let Some(state) = reaction.state_mut(stage) {
        *state = StageState::Idle;
    }
    if let Some(kind) = NoticeKind::post(stage) {
        bus.emit(ReactionNotice {
            kind,
            reaction: reaction.id,
            event: binding,
        });
    }
    debug!(reaction = %reaction.name, ?stage, "Reaction finished");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::registry::BlendShapeRegistry;
    use crate::testing::{FakeAudio, FakeRenderer, loud_clip};
    use emote_types::{ActorId, ClipHandle, EmotionAxes, EmotionDef, HoldDef, Relationship, SpeechClipDef};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    const TICK: f32 = 0.02;

    struct World {
        emotions: EmotionSet,
        phonemes: PhonemeSet,
        speech: SpeechDriver,
        audio: FakeAudio,
        rng: SmallRng,
        bus: NoticeBus,
        engine: ReactionEngine,
    }

    impl World {
        fn new(defs: &[ReactionDef]) -> Self {
            let registry = BlendShapeRegistry::new(Box::new(FakeRenderer::new()));
            let mut warnings = Vec::new();
            let emotions = EmotionSet::from_defs(
                &[EmotionDef {
                    name: "Wave".to_owned(),
                    fade_in: 0.2,
                    fade_out: 0.2,
                    enabled: true,
                    axes: EmotionAxes {
                        joy: 1.0,
                        ..EmotionAxes::default()
                    },
                    vox: false,
                    hold: HoldDef {
                        enter: 0.5,
                        exit: 0.0,
                        stay: 0.0,
                    },
                    play_speed: 1.0,
                    shapes: Vec::new(),
                }],
                &registry,
                &mut warnings,
            )
            .unwrap();
            let audio = FakeAudio::new();
            audio.add_clip(ClipHandle(1), loud_clip(1.0));
            let speech = SpeechDriver::from_defs(
                &[SpeechClipDef {
                    name: "Hi".to_owned(),
                    clip: ClipHandle(1),
                    speed: 1.0,
                    volume: 1.0,
                    silence_threshold: 0.02,
                    ignore_silence: false,
                    fade_emotion_on_silence: false,
                    emotion_min_interval: 1.0,
                    emotion_max_interval: 1.0,
                }],
                0.05,
                Some(Box::new(audio.clone())),
                &mut warnings,
            )
            .unwrap();
            let engine = ReactionEngine::from_defs(defs, &emotions, &speech, &mut warnings).unwrap();
            Self {
                emotions,
                phonemes: PhonemeSet::default(),
                speech,
                audio,
                rng: SmallRng::seed_from_u64(1),
                bus: NoticeBus::new(),
                engine,
            }
        }

        fn event(&mut self, stage: ReactionStage, event: ReactionEvent) -> usize {
            let mut ctx = ReactionContext {
                emotions: &mut self.emotions,
                phonemes: &mut self.phonemes,
                speech: &mut self.speech,
                rng: &mut self.rng,
                bus: &mut self.bus,
            };
            self.engine.on_event(stage, event, &mut ctx)
        }

        fn step(&mut self) {
            self.audio.advance(TICK);
            self.emotions.tick(TICK);
            let mut ctx = ReactionContext {
                emotions: &mut self.emotions,
                phonemes: &mut self.phonemes,
                speech: &mut self.speech,
                rng: &mut self.rng,
                bus: &mut self.bus,
            };
            let _ = ctx.speech.tick(TICK, ctx.emotions, ctx.phonemes, ctx.rng);
            self.engine.update(&mut ctx);
        }

        fn run(&mut self, seconds: f32) {
            let mut t = 0.0;
            while t + 1e-6 < seconds {
                self.step();
                t += TICK;
            }
        }
    }

    fn reaction(react_to: ReactTo, emotions: &[&str], speech: &[&str]) -> ReactionDef {
        ReactionDef {
            name: "Greet".to_owned(),
            react_to,
            models: Vec::new(),
            enter: StageDef {
                enabled: true,
                emotions: emotions.iter().map(|s| (*s).to_owned()).collect(),
                speech: speech.iter().map(|s| (*s).to_owned()).collect(),
            },
            exit: StageDef::default(),
            stay: StageDef::default(),
        }
    }

    fn event(relationship: Relationship) -> ReactionEvent {
        ReactionEvent {
            self_id: ActorId::new(),
            other_id: ActorId::new(),
            other_model_id: ModelId(2),
            relationship,
        }
    }

    fn kinds(bus: &mut NoticeBus) -> Vec<NoticeKind> {
        bus.drain().into_iter().map(|n| n.kind).collect()
    }

    #[test]
    fn emotion_only_reaction_posts_once() {
        let mut world = World::new(&[reaction(ReactTo::Any, &["Wave"], &[])]);
        assert_eq!(world.event(ReactionStage::Enter, event(Relationship::Neutral)), 1);
        assert!(world.engine.get(ReactionId(0)).unwrap().is_active(ReactionStage::Enter));
        assert_eq!(kinds(&mut world.bus), vec![NoticeKind::PreEnter]);

        // fade in 0.2 + hold 0.5 + fade out 0.2
        world.run(0.8);
        assert!(world.engine.get(ReactionId(0)).unwrap().is_active(ReactionStage::Enter));
        assert!(kinds(&mut world.bus).is_empty());

        world.run(0.2);
        assert!(!world.engine.get(ReactionId(0)).unwrap().is_active(ReactionStage::Enter));
        assert_eq!(kinds(&mut world.bus), vec![NoticeKind::PostEnter]);

        world.run(1.0);
        assert!(kinds(&mut world.bus).is_empty());
    }

    #[test]
    fn second_actor_is_rejected_while_active() {
        let mut world = World::new(&[reaction(ReactTo::Any, &["Wave"], &[])]);
        let first = event(Relationship::Friend);
        let second = event(Relationship::Friend);
        world.event(ReactionStage::Enter, first);
        assert_eq!(world.event(ReactionStage::Enter, second), 0);
        let bound = world.engine.get(ReactionId(0)).unwrap().binding(ReactionStage::Enter).unwrap();
        assert_eq!(bound.other_id, first.other_id);
        assert_eq!(kinds(&mut world.bus), vec![NoticeKind::PreEnter]);
    }

    #[test]
    fn friend_only_filters_relationships() {
        let mut world = World::new(&[reaction(ReactTo::FriendOnly, &["Wave"], &[])]);
        assert_eq!(world.event(ReactionStage::Enter, event(Relationship::Foe)), 0);
        assert_eq!(world.event(ReactionStage::Enter, event(Relationship::Neutral)), 0);
        assert!(kinds(&mut world.bus).is_empty());
        assert_eq!(world.event(ReactionStage::Enter, event(Relationship::Friend)), 1);
    }

    #[test]
    fn model_allow_list_filters() {
        let mut def = reaction(ReactTo::Any, &["Wave"], &[]);
        def.models = vec![ModelId(7)];
        let mut world = World::new(&[def]);
        assert_eq!(world.event(ReactionStage::Enter, event(Relationship::Friend)), 0);
        let mut allowed = event(Relationship::Friend);
        allowed.other_model_id = ModelId(7);
        assert_eq!(world.event(ReactionStage::Enter, allowed), 1);
    }

    #[test]
    fn empty_stage_posts_immediately() {
        let mut world = World::new(&[reaction(ReactTo::Any, &[], &[])]);
        assert_eq!(world.event(ReactionStage::Enter, event(Relationship::Friend)), 1);
        assert!(!world.engine.get(ReactionId(0)).unwrap().is_active(ReactionStage::Enter));
        assert_eq!(kinds(&mut world.bus), vec![NoticeKind::PreEnter, NoticeKind::PostEnter]);
    }

    #[test]
    fn waits_for_both_emotion_and_speech() {
        let mut world = World::new(&[reaction(ReactTo::Any, &["Wave"], &["Hi"])]);
        world.event(ReactionStage::Enter, event(Relationship::Friend));
        assert!(world.speech.is_speaking());
        // Emotion ends at 0.9 s, the clip at 1.0 s.
        world.run(0.94);
        assert!(world.engine.get(ReactionId(0)).unwrap().is_active(ReactionStage::Enter));
        world.run(0.1);
        assert!(!world.engine.get(ReactionId(0)).unwrap().is_active(ReactionStage::Enter));
        assert_eq!(kinds(&mut world.bus), vec![NoticeKind::PreEnter, NoticeKind::PostEnter]);
    }

    #[test]
    fn overwritten_emotion_counts_as_finished() {
        let mut world = World::new(&[reaction(ReactTo::Any, &["Wave"], &[])]);
        world.event(ReactionStage::Enter, event(Relationship::Friend));
        world.emotions.get_mut(EmotionId(0)).unwrap().channel.set_off();
        world.step();
        assert!(!world.engine.get(ReactionId(0)).unwrap().is_active(ReactionStage::Enter));
    }

    #[test]
    fn explicit_play_bypasses_filter_but_not_exclusion() {
        let mut world = World::new(&[reaction(ReactTo::Nobody, &["Wave"], &[])]);
        let mut ctx = ReactionContext {
            emotions: &mut world.emotions,
            phonemes: &mut world.phonemes,
            speech: &mut world.speech,
            rng: &mut world.rng,
            bus: &mut world.bus,
        };
        world
            .engine
            .play(ReactionId(0), ReactionStage::Enter, event(Relationship::Foe), &mut ctx)
            .unwrap();
        let err = world
            .engine
            .play(ReactionId(0), ReactionStage::Enter, event(Relationship::Foe), &mut ctx)
            .unwrap_err();
        assert!(matches!(err, FaceError::ReactionBusy(_)));
        let err = world
            .engine
            .play(ReactionId(0), ReactionStage::Stay, event(Relationship::Foe), &mut ctx)
            .unwrap_err();
        assert!(matches!(err, FaceError::StageUnavailable(_)));
    }

    #[test]
    fn stay_events_do_nothing() {
        let mut world = World::new(&[reaction(ReactTo::Any, &["Wave"], &[])]);
        assert_eq!(world.event(ReactionStage::Stay, event(Relationship::Friend)), 0);
        assert!(kinds(&mut world.bus).is_empty());
    }
}
