//! The [`ShapesModule`] facade.
//!
//! One `ShapesModule` animates one character's face. It owns the blend-shape
//! registry, every channel, blink, gaze, the speech driver, the reaction
//! engine, the notice bus and the random source, and exposes the host API:
//! explicit playback by id, name or index, proximity events, speech, and
//! observer registration.
//!
//! Runtime calls never fail loudly. Misuse (unknown names, busy audio,
//! reactions already bound) logs a warning and returns `false`; the face
//! simply does less.

use emote_face::{
    AudioOutput, Blink, BlendShapeRegistry, EmotionSet, EyeGaze, FaceError, NoticeBus,
    NoticeCallback, PhonemeSet, ReactionContext, ReactionEngine, ShapeRenderer, Skeleton,
    SpeechDriver, SubscriptionId, random,
};
use emote_types::{
    ActorId, EmotionId, ModelId, NoticeKind, PhonemeId, ReactionEvent, ReactionId, ReactionStage,
    Relationship, Sentiment, SpeechClipId,
};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::{debug, info, warn};

use crate::clock::FaceClock;
use crate::config::{FaceConfig, ProximityConfig};

/// Host objects the face drives.
pub struct Collaborators {
    /// Writes blend-shape weights and reports shape names.
    pub renderer: Box<dyn ShapeRenderer>,
    /// Eye bones for gaze. Absent disables gaze.
    pub skeleton: Option<Box<dyn Skeleton>>,
    /// The character's audio slot. Absent disables speech.
    pub audio: Option<Box<dyn AudioOutput>>,
    /// The character's own actor id, reported in reaction notices.
    pub self_id: ActorId,
}

/// Non-fatal problems found while building a module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// One line per problem, in the order found.
    pub warnings: Vec<String>,
}

impl BuildReport {
    /// Whether the build found nothing to report.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Errors that prevent a module from being built.
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    /// The character name is empty.
    #[error("character name must not be empty")]
    EmptyName,

    /// A channel, clip or reaction definition was rejected.
    #[error("face definition error: {source}")]
    Face {
        /// The underlying face error.
        #[from]
        source: FaceError,
    },
}

/// Addresses an emotion, phoneme, speech clip or reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a, I> {
    /// By stable id.
    Id(I),
    /// By unique name.
    Name(&'a str),
    /// By list position.
    Index(usize),
}

impl<'a, I> From<&'a str> for Lookup<'a, I> {
    fn from(name: &'a str) -> Self {
        Self::Name(name)
    }
}

macro_rules! lookup_from_id {
    ($($id:ty),+ $(,)?) => {
        $(
            impl From<$id> for Lookup<'_, $id> {
                fn from(id: $id) -> Self {
                    Self::Id(id)
                }
            }
        )+
    };
}

lookup_from_id!(EmotionId, PhonemeId, SpeechClipId, ReactionId);

impl<I: Copy> Lookup<'_, I> {
    fn resolve(
        self,
        kind: &'static str,
        exists: impl Fn(I) -> bool,
        by_name: impl Fn(&str) -> Option<I>,
        by_index: impl Fn(usize) -> Option<I>,
        unknown: impl Fn(I) -> FaceError,
    ) -> Result<I, FaceError> {
        match self {
            Self::Id(id) if exists(id) => Ok(id),
            Self::Id(id) => Err(unknown(id)),
            Self::Name(name) => by_name(name).ok_or_else(|| FaceError::UnknownName {
                kind,
                name: name.to_owned(),
            }),
            Self::Index(index) => by_index(index).ok_or(FaceError::UnknownIndex { kind, index }),
        }
    }
}

/// A reaction request held back until the first tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Deferred {
    /// A proximity event for every reaction.
    Proximity {
        stage: ReactionStage,
        event: ReactionEvent,
    },
    /// An explicit play of one reaction.
    Explicit {
        reaction: ReactionId,
        stage: ReactionStage,
        event: ReactionEvent,
    },
}

/// One character's face.
pub struct ShapesModule {
    pub(crate) name: String,
    pub(crate) self_id: ActorId,
    pub(crate) registry: BlendShapeRegistry,
    pub(crate) emotions: EmotionSet,
    pub(crate) phonemes: PhonemeSet,
    pub(crate) blink: Blink,
    pub(crate) gaze: EyeGaze,
    pub(crate) speech: SpeechDriver,
    pub(crate) reactions: ReactionEngine,
    pub(crate) bus: NoticeBus,
    pub(crate) rng: SmallRng,
    pub(crate) clock: FaceClock,
    pub(crate) proximity: ProximityConfig,
    pub(crate) deferred: Vec<Deferred>,
    pub(crate) report: BuildReport,
}

impl core::fmt::Debug for ShapesModule {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ShapesModule")
            .field("name", &self.name)
            .field("self_id", &self.self_id)
            .field("clock", &self.clock)
            .field("emotions", &self.emotions.len())
            .field("phonemes", &self.phonemes.len())
            .field("reactions", &self.reactions.len())
            .finish_non_exhaustive()
    }
}

fn sanitize_distance(value: f32, fallback: f32, what: &str, warnings: &mut Vec<String>) -> f32 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        warn!(what, value, fallback, "Proximity distance invalid, using fallback");
        warnings.push(format!("proximity: {what} {value} invalid"));
        fallback
    }
}

impl ShapesModule {
    /// Build a face from its configuration and host collaborators.
    ///
    /// Manual blend shapes are registered first, then every configured mesh
    /// is scanned. Channels, speech clips and reactions resolve names
    /// against what was registered; unresolved names are dropped and
    /// recorded in the [`BuildReport`].
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::EmptyName`] for an empty character name and
    /// [`ModuleError::Face`] when two definitions of the same kind share a
    /// name.
    pub fn new(config: &FaceConfig, collaborators: Collaborators) -> Result<Self, ModuleError> {
        if config.character.name.trim().is_empty() {
            return Err(ModuleError::EmptyName);
        }
        let Collaborators {
            renderer,
            skeleton,
            audio,
            self_id,
        } = collaborators;
        let mut warnings = Vec::new();

        let mut rng = config
            .character
            .seed
            .map_or_else(SmallRng::from_os_rng, SmallRng::seed_from_u64);

        let mut registry = BlendShapeRegistry::new(renderer);
        let manual = registry.register_defs(&config.blend_shapes.manual);
        let scanned = config
            .blend_shapes
            .scan_meshes
            .iter()
            .map(|&mesh| registry.scan_mesh(mesh))
            .fold(0_usize, usize::saturating_add);
        for shape in registry.iter().filter(|s| !s.is_valid) {
            warnings.push(format!("blend shape {:?} does not match the renderer", shape.name));
        }

        let emotions = EmotionSet::from_defs(&config.emotions, &registry, &mut warnings)?;
        let phonemes = PhonemeSet::from_defs(&config.phonemes, &registry, &mut warnings)?;

        let mut blink = Blink::from_def(&config.blink, &registry, &mut warnings);
        blink.set_enabled(config.blink.enabled, &mut rng);
        let mut gaze = EyeGaze::new(&config.gaze, skeleton, &mut warnings);
        gaze.set_enabled(config.gaze.enabled, &mut rng);

        let speech = SpeechDriver::from_defs(&config.speech.clips, config.speech.min_speech_speed, audio, &mut warnings)?;
        let reactions = ReactionEngine::from_defs(&config.reactions, &emotions, &speech, &mut warnings)?;

        let defaults = ProximityConfig::default();
        let proximity = ProximityConfig {
            radius: sanitize_distance(config.proximity.radius, defaults.radius, "radius", &mut warnings),
            react_distance: sanitize_distance(
                config.proximity.react_distance,
                defaults.react_distance,
                "react_distance",
                &mut warnings,
            ),
        };

        info!(
            character = %config.character.name,
            %self_id,
            blend_shapes = registry.len(),
            manual,
            scanned,
            emotions = emotions.len(),
            phonemes = phonemes.len(),
            speech_clips = speech.len(),
            reactions = reactions.len(),
            warnings = warnings.len(),
            "Face built"
        );

        Ok(Self {
            name: config.character.name.clone(),
            self_id,
            registry,
            emotions,
            phonemes,
            blink,
            gaze,
            speech,
            reactions,
            bus: NoticeBus::new(),
            rng,
            clock: FaceClock::new(),
            proximity,
            deferred: Vec::new(),
            report: BuildReport { warnings },
        })
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// Character name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The character's own actor id.
    pub const fn self_id(&self) -> ActorId {
        self.self_id
    }

    /// Problems found while building.
    pub const fn report(&self) -> &BuildReport {
        &self.report
    }

    /// The blend-shape registry.
    pub const fn registry(&self) -> &BlendShapeRegistry {
        &self.registry
    }

    /// Emotion channels.
    pub const fn emotions(&self) -> &EmotionSet {
        &self.emotions
    }

    /// Phoneme channels.
    pub const fn phonemes(&self) -> &PhonemeSet {
        &self.phonemes
    }

    /// The blink timer.
    pub const fn blink(&self) -> &Blink {
        &self.blink
    }

    /// The gaze controller.
    pub const fn gaze(&self) -> &EyeGaze {
        &self.gaze
    }

    /// The speech driver.
    pub const fn speech(&self) -> &SpeechDriver {
        &self.speech
    }

    /// Proximity reactions.
    pub const fn reactions(&self) -> &ReactionEngine {
        &self.reactions
    }

    /// The face clock.
    pub const fn clock(&self) -> &FaceClock {
        &self.clock
    }

    /// Whether a speech clip is playing.
    pub const fn is_speaking(&self) -> bool {
        self.speech.is_speaking()
    }

    // -----------------------------------------------------------------------
    // Emotions
    // -----------------------------------------------------------------------

    fn emotion_id(&self, lookup: Lookup<'_, EmotionId>) -> Result<EmotionId, FaceError> {
        lookup.resolve(
            "emotion",
            |id| self.emotions.get(id).is_some(),
            |name| self.emotions.by_name(name),
            |index| self.emotions.by_index(index),
            FaceError::UnknownEmotion,
        )
    }

    fn with_emotion(
        &mut self,
        lookup: Lookup<'_, EmotionId>,
        action: &str,
        f: impl FnOnce(&mut emote_face::Emotion) -> bool,
    ) -> bool {
        let emotion = self
            .emotion_id(lookup)
            .and_then(|id| self.emotions.get_mut(id).ok_or(FaceError::UnknownEmotion(id)));
        match emotion {
            Ok(emotion) => {
                let done = f(&mut *emotion);
                if done {
                    debug!(emotion = emotion.name(), action, "Emotion request");
                } else {
                    warn!(emotion = emotion.name(), action, "Emotion is disabled, request ignored");
                }
                done
            }
            Err(err) => {
                warn!(%err, action, "Emotion request ignored");
                false
            }
        }
    }

    /// Fade an emotion in and hold it until stopped.
    pub fn start_emotion<'a>(&mut self, lookup: impl Into<Lookup<'a, EmotionId>>) -> bool {
        self.with_emotion(lookup.into(), "start", |e| e.channel.start().is_some())
    }

    /// Fade an emotion out from its current weight.
    pub fn stop_emotion<'a>(&mut self, lookup: impl Into<Lookup<'a, EmotionId>>) -> bool {
        self.with_emotion(lookup.into(), "stop", |e| {
            let _ = e.channel.stop();
            true
        })
    }

    /// Fade an emotion in and straight back out at its configured play speed.
    pub fn play_emotion<'a>(&mut self, lookup: impl Into<Lookup<'a, EmotionId>>) -> bool {
        self.with_emotion(lookup.into(), "play", |e| e.channel.play(e.play_speed).is_some())
    }

    /// Fade an emotion in and out at `speed`.
    pub fn play_emotion_at_speed<'a>(&mut self, lookup: impl Into<Lookup<'a, EmotionId>>, speed: f32) -> bool {
        self.with_emotion(lookup.into(), "play", |e| e.channel.play(speed).is_some())
    }

    /// Switch an emotion fully on or off without fading.
    pub fn set_emotion<'a>(&mut self, lookup: impl Into<Lookup<'a, EmotionId>>, on: bool) -> bool {
        self.with_emotion(lookup.into(), if on { "set_on" } else { "set_off" }, |e| {
            if on {
                e.channel.set_on().is_some()
            } else {
                let _ = e.channel.set_off();
                true
            }
        })
    }

    /// Allow or forbid an emotion. Forbidding snaps it off.
    pub fn set_emotion_allowed<'a>(&mut self, lookup: impl Into<Lookup<'a, EmotionId>>, allowed: bool) -> bool {
        self.with_emotion(lookup.into(), "set_allowed", |e| {
            e.channel.set_allowed(allowed);
            true
        })
    }

    /// Play a random allowed emotion expressing `sentiment`.
    ///
    /// Returns the emotion played, or `None` if no emotion qualifies.
    pub fn play_random_emotion(&mut self, sentiment: Sentiment) -> Option<EmotionId> {
        let candidates = self.emotions.with_sentiment(sentiment);
        let Some(&id) = random::pick(&mut self.rng, &candidates) else {
            warn!(?sentiment, "No emotion with this sentiment");
            return None;
        };
        self.play_emotion(id).then_some(id)
    }

    // -----------------------------------------------------------------------
    // Phonemes
    // -----------------------------------------------------------------------

    fn phoneme_id(&self, lookup: Lookup<'_, PhonemeId>) -> Result<PhonemeId, FaceError> {
        lookup.resolve(
            "phoneme",
            |id| self.phonemes.get(id).is_some(),
            |name| self.phonemes.by_name(name),
            |index| self.phonemes.by_index(index),
            FaceError::UnknownPhoneme,
        )
    }

    fn with_phoneme(
        &mut self,
        lookup: Lookup<'_, PhonemeId>,
        action: &str,
        f: impl FnOnce(&mut emote_face::Phoneme) -> bool,
    ) -> bool {
        let phoneme = self
            .phoneme_id(lookup)
            .and_then(|id| self.phonemes.get_mut(id).ok_or(FaceError::UnknownPhoneme(id)));
        match phoneme {
            Ok(phoneme) => {
                let done = f(&mut *phoneme);
                if !done {
                    warn!(phoneme = phoneme.name(), action, "Phoneme is disabled, request ignored");
                }
                done
            }
            Err(err) => {
                warn!(%err, action, "Phoneme request ignored");
                false
            }
        }
    }

    /// Open a phoneme's mouth shape and hold it until stopped.
    pub fn start_phoneme<'a>(&mut self, lookup: impl Into<Lookup<'a, PhonemeId>>) -> bool {
        self.with_phoneme(lookup.into(), "start", |p| p.channel.start().is_some())
    }

    /// Close a phoneme's mouth shape from its current weight.
    pub fn stop_phoneme<'a>(&mut self, lookup: impl Into<Lookup<'a, PhonemeId>>) -> bool {
        self.with_phoneme(lookup.into(), "stop", |p| {
            let _ = p.channel.stop();
            true
        })
    }

    /// Play one utterance of a phoneme at speed 1.
    pub fn play_phoneme<'a>(&mut self, lookup: impl Into<Lookup<'a, PhonemeId>>) -> bool {
        self.with_phoneme(lookup.into(), "play", |p| p.play(1.0).is_some())
    }

    /// Switch a phoneme fully on or off without fading.
    pub fn set_phoneme<'a>(&mut self, lookup: impl Into<Lookup<'a, PhonemeId>>, on: bool) -> bool {
        self.with_phoneme(lookup.into(), if on { "set_on" } else { "set_off" }, |p| {
            if on {
                p.channel.set_on().is_some()
            } else {
                let _ = p.channel.set_off();
                true
            }
        })
    }

    /// Allow or forbid a phoneme. Forbidden phonemes are never picked by
    /// speech.
    pub fn set_phoneme_allowed<'a>(&mut self, lookup: impl Into<Lookup<'a, PhonemeId>>, allowed: bool) -> bool {
        let done = self.with_phoneme(lookup.into(), "set_allowed", |p| {
            p.channel.set_allowed(allowed);
            true
        });
        if done {
            self.phonemes.rebuild_cdf();
        }
        done
    }

    // -----------------------------------------------------------------------
    // Speech
    // -----------------------------------------------------------------------

    /// Play a speech clip, stopping the current one first.
    pub fn play_speech_audio<'a>(&mut self, lookup: impl Into<Lookup<'a, SpeechClipId>>) -> bool {
        let lookup: Lookup<'_, SpeechClipId> = lookup.into();
        let result = lookup
            .resolve(
                "speech clip",
                |id| self.speech.get(id).is_some(),
                |name| self.speech.by_name(name),
                |index| self.speech.by_index(index),
                FaceError::UnknownSpeechClip,
            )
            .and_then(|id| self.speech.start(id, &mut self.emotions, &mut self.phonemes));
        match result {
            Ok(_) => true,
            Err(err) => {
                warn!(%err, "Speech could not play");
                false
            }
        }
    }

    /// Stop the playing speech clip. Returns whether one was playing.
    pub fn stop_speech(&mut self) -> bool {
        self.speech.stop(&mut self.emotions, &mut self.phonemes).is_some()
    }

    // -----------------------------------------------------------------------
    // Reactions
    // -----------------------------------------------------------------------

    const fn event(&self, other_id: ActorId, other_model_id: ModelId, relationship: Relationship) -> ReactionEvent {
        ReactionEvent {
            self_id: self.self_id,
            other_id,
            other_model_id,
            relationship,
        }
    }

    /// Run a reaction request now, or queue it if no tick has run yet.
    /// Returns how many reaction stages started.
    fn dispatch(&mut self, request: Deferred) -> usize {
        if self.clock.is_first_tick() {
            debug!(?request, "Reaction deferred to first tick");
            self.deferred.push(request);
            return 0;
        }
        self.run_reaction(request)
    }

    pub(crate) fn run_reaction(&mut self, request: Deferred) -> usize {
        let mut ctx = ReactionContext {
            emotions: &mut self.emotions,
            phonemes: &mut self.phonemes,
            speech: &mut self.speech,
            rng: &mut self.rng,
            bus: &mut self.bus,
        };
        match request {
            Deferred::Proximity { stage, event } => self.reactions.on_event(stage, event, &mut ctx),
            Deferred::Explicit { reaction, stage, event } => {
                match self.reactions.play(reaction, stage, event, &mut ctx) {
                    Ok(()) => 1,
                    Err(err) => {
                        warn!(%err, ?stage, "Reaction could not play");
                        0
                    }
                }
            }
        }
    }

    /// Another actor entered the proximity zone.
    ///
    /// Returns how many reactions started. Events before the first tick are
    /// queued and return 0.
    pub fn character_enter(&mut self, other_id: ActorId, other_model_id: ModelId, relationship: Relationship) -> usize {
        let event = self.event(other_id, other_model_id, relationship);
        self.dispatch(Deferred::Proximity {
            stage: ReactionStage::Enter,
            event,
        })
    }

    /// Another actor left the proximity zone.
    pub fn character_exit(&mut self, other_id: ActorId, other_model_id: ModelId, relationship: Relationship) -> usize {
        let event = self.event(other_id, other_model_id, relationship);
        self.dispatch(Deferred::Proximity {
            stage: ReactionStage::Exit,
            event,
        })
    }

    fn within_react_distance(&self, distance: f32) -> bool {
        let within = distance.is_finite() && distance <= self.proximity.react_distance;
        if !within {
            debug!(distance, react_distance = self.proximity.react_distance, "Actor too far to react");
        }
        within
    }

    /// [`character_enter`](Self::character_enter) for an actor at `distance`;
    /// ignored beyond the react distance.
    pub fn character_enter_at(
        &mut self,
        other_id: ActorId,
        other_model_id: ModelId,
        relationship: Relationship,
        distance: f32,
    ) -> usize {
        if !self.within_react_distance(distance) {
            return 0;
        }
        self.character_enter(other_id, other_model_id, relationship)
    }

    /// [`character_exit`](Self::character_exit) for an actor at `distance`;
    /// ignored beyond the react distance.
    pub fn character_exit_at(
        &mut self,
        other_id: ActorId,
        other_model_id: ModelId,
        relationship: Relationship,
        distance: f32,
    ) -> usize {
        if !self.within_react_distance(distance) {
            return 0;
        }
        self.character_exit(other_id, other_model_id, relationship)
    }

    fn play_reaction(
        &mut self,
        lookup: Lookup<'_, ReactionId>,
        stage: ReactionStage,
        other_id: ActorId,
        other_model_id: ModelId,
        relationship: Relationship,
    ) -> bool {
        let reaction = lookup.resolve(
            "reaction",
            |id| self.reactions.get(id).is_some(),
            |name| self.reactions.by_name(name),
            |index| self.reactions.by_index(index),
            FaceError::UnknownReaction,
        );
        let reaction = match reaction {
            Ok(reaction) => reaction,
            Err(err) => {
                warn!(%err, ?stage, "Reaction request ignored");
                return false;
            }
        };
        let event = self.event(other_id, other_model_id, relationship);
        let deferred = self.clock.is_first_tick();
        let started = self.dispatch(Deferred::Explicit { reaction, stage, event });
        deferred || started > 0
    }

    /// Play a reaction's enter stage for `other_id`, ignoring its
    /// relationship filter, model list and enabled flag.
    pub fn play_enter_reaction<'a>(
        &mut self,
        lookup: impl Into<Lookup<'a, ReactionId>>,
        other_id: ActorId,
        other_model_id: ModelId,
        relationship: Relationship,
    ) -> bool {
        self.play_reaction(lookup.into(), ReactionStage::Enter, other_id, other_model_id, relationship)
    }

    /// Play a reaction's exit stage for `other_id`.
    pub fn play_exit_reaction<'a>(
        &mut self,
        lookup: impl Into<Lookup<'a, ReactionId>>,
        other_id: ActorId,
        other_model_id: ModelId,
        relationship: Relationship,
    ) -> bool {
        self.play_reaction(lookup.into(), ReactionStage::Exit, other_id, other_model_id, relationship)
    }

    // -----------------------------------------------------------------------
    // Proximity settings
    // -----------------------------------------------------------------------

    /// Radius of the trigger zone the host maintains.
    pub const fn proximity_radius(&self) -> f32 {
        self.proximity.radius
    }

    /// Distance beyond which distance-tagged events are ignored.
    pub const fn react_distance(&self) -> f32 {
        self.proximity.react_distance
    }

    /// Set the trigger zone radius. Negative or non-finite values are
    /// rejected.
    pub fn set_proximity_radius(&mut self, radius: f32) -> bool {
        if !radius.is_finite() || radius < 0.0 {
            warn!(radius, "Invalid proximity radius ignored");
            return false;
        }
        self.proximity.radius = radius;
        debug!(radius, "Proximity radius set");
        true
    }

    /// Set the react distance. Negative or non-finite values are rejected.
    pub fn set_react_distance(&mut self, distance: f32) -> bool {
        if !distance.is_finite() || distance < 0.0 {
            warn!(distance, "Invalid react distance ignored");
            return false;
        }
        self.proximity.react_distance = distance;
        debug!(distance, "React distance set");
        true
    }

    // -----------------------------------------------------------------------
    // Blink and gaze
    // -----------------------------------------------------------------------

    /// Enable or disable blinking. Either way the interval restarts.
    pub fn set_blink_enabled(&mut self, enabled: bool) {
        self.blink.set_enabled(enabled, &mut self.rng);
    }

    /// Enable or disable gaze wandering. Returns whether gaze is now
    /// running; it cannot run without both eye bones.
    pub fn set_gaze_enabled(&mut self, enabled: bool) -> bool {
        self.gaze.set_enabled(enabled, &mut self.rng);
        self.gaze.is_enabled() == enabled
    }

    // -----------------------------------------------------------------------
    // Observers and maintenance
    // -----------------------------------------------------------------------

    /// Register a reaction observer, optionally for one notice kind only.
    pub fn subscribe(&mut self, filter: Option<NoticeKind>, callback: NoticeCallback) -> SubscriptionId {
        self.bus.subscribe(filter, callback)
    }

    /// Remove an observer. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// Re-check every blend shape against the renderer after the host
    /// changed the character's meshes, then refresh every channel.
    ///
    /// Returns how many shapes changed state. A second call with no mesh
    /// change returns 0.
    pub fn revalidate(&mut self) -> usize {
        let changed = self.registry.revalidate();
        let unsynced = self
            .emotions
            .sync(&self.registry)
            .saturating_add(self.phonemes.sync(&self.registry))
            .saturating_add(self.blink.sync(&self.registry));
        info!(character = %self.name, changed, unsynced, "Blend shapes revalidated");
        changed
    }
}
