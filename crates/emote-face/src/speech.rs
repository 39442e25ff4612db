//! Speech playback driver.
//!
//! Owns the character's single audio slot and every authored speech clip.
//! While a clip plays, the driver samples its amplitude once per tick and
//! drives lip-sync (weighted random phonemes) and vocal expression (random
//! vox emotions) from it.
//!
//! The driver records the channel generation of every phoneme and emotion it
//! starts. If something else replaces the envelope, the driver treats that
//! channel as no longer its own and leaves it alone.

use std::collections::BTreeMap;

use emote_types::{ClipHandle, EmotionId, PhonemeId, SpeechClipDef, SpeechClipId};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::channel::MIN_PLAY_SPEED;
use crate::collaborators::{AudioOutput, ClipSamples};
use crate::emotion::EmotionSet;
use crate::error::FaceError;
use crate::phoneme::PhonemeSet;
use crate::random;

/// Default lower bound on the phoneme playback speed.
pub const DEFAULT_MIN_SPEECH_SPEED: f32 = MIN_PLAY_SPEED;

/// Identifies one playback of a speech clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpeechToken(pub u64);

/// A speech clip and how it drives the face.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechClip {
    /// Stable id (position in the driver's list).
    pub id: SpeechClipId,
    /// Unique clip name.
    pub name: String,
    /// Host audio asset.
    pub clip: ClipHandle,
    /// Playback speed multiplier.
    pub speed: f32,
    /// Playback volume in `[0, 1]`.
    pub volume: f32,
    /// Amplitude at or below which the clip counts as silent.
    pub silence_threshold: f32,
    /// Pick emotions on a timer regardless of silence.
    pub ignore_silence: bool,
    /// Fade the current emotion out early when the clip goes silent.
    pub fade_emotion_on_silence: bool,
    /// Shortest gap between timed emotion picks.
    pub emotion_min_interval: f32,
    /// Longest gap between timed emotion picks.
    pub emotion_max_interval: f32,
    /// Set when the last attempt to play this clip failed.
    pub could_not_play: bool,
}

impl SpeechClip {
    fn from_def(id: SpeechClipId, def: &SpeechClipDef, warnings: &mut Vec<String>) -> Self {
        let (mut lo, mut hi) = (def.emotion_min_interval.max(0.0), def.emotion_max_interval.max(0.0));
        if lo > hi {
            warn!(clip = %def.name, lo, hi, "Emotion interval range reversed, swapping");
            warnings.push(format!("{}: emotion interval range reversed", def.name));
            core::mem::swap(&mut lo, &mut hi);
        }
        Self {
            id,
            name: def.name.clone(),
            clip: def.clip,
            speed: if def.speed.is_finite() && def.speed > 0.0 { def.speed } else { 1.0 },
            volume: if def.volume.is_finite() { def.volume.clamp(0.0, 1.0) } else { 1.0 },
            silence_threshold: def.silence_threshold.max(0.0),
            ignore_silence: def.ignore_silence,
            fade_emotion_on_silence: def.fade_emotion_on_silence,
            emotion_min_interval: lo,
            emotion_max_interval: hi,
            could_not_play: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ActiveSpeech {
    clip: SpeechClipId,
    token: SpeechToken,
    samples: ClipSamples,
    phoneme: Option<(PhonemeId, u64)>,
    emotion: Option<(EmotionId, u64)>,
    interval_remaining: f32,
}

/// Drives phonemes and vox emotions from the playing speech clip.
pub struct SpeechDriver {
    clips: Vec<SpeechClip>,
    by_name: BTreeMap<String, SpeechClipId>,
    audio: Option<Box<dyn AudioOutput>>,
    active: Option<ActiveSpeech>,
    min_speech_speed: f32,
    next_token: u64,
}

impl core::fmt::Debug for SpeechDriver {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SpeechDriver")
            .field("clips", &self.clips)
            .field("has_audio", &self.audio.is_some())
            .field("active", &self.active.as_ref().map(|a| (a.clip, a.token)))
            .field("min_speech_speed", &self.min_speech_speed)
            .finish_non_exhaustive()
    }
}

impl SpeechDriver {
    /// Build the driver. Duplicate clip names are rejected.
    pub fn from_defs(
        defs: &[SpeechClipDef],
        min_speech_speed: f32,
        audio: Option<Box<dyn AudioOutput>>,
        warnings: &mut Vec<String>,
    ) -> Result<Self, FaceError> {
        let mut clips = Vec::with_capacity(defs.len());
        let mut by_name = BTreeMap::new();
        for def in defs {
            if by_name.contains_key(&def.name) {
                return Err(FaceError::DuplicateName {
                    kind: "speech clip",
                    name: def.name.clone(),
                });
            }
            let Some(id) = SpeechClipId::from_index(clips.len()) else {
                break;
            };
            by_name.insert(def.name.clone(), id);
            clips.push(SpeechClip::from_def(id, def, warnings));
        }
        if audio.is_none() && !clips.is_empty() {
            warn!(clips = clips.len(), "No audio output, speech disabled");
            warnings.push("speech: no audio output".to_owned());
        }
        let min_speech_speed = if min_speech_speed.is_finite() && min_speech_speed > 0.0 {
            min_speech_speed
        } else {
            DEFAULT_MIN_SPEECH_SPEED
        };
        Ok(Self {
            clips,
            by_name,
            audio,
            active: None,
            min_speech_speed,
            next_token: 0,
        })
    }

    /// Number of clips.
    pub fn len(&self) -> usize {
        self.clips.len()
    }

    /// Whether there are no clips.
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Look up a clip by id.
    pub fn get(&self, id: SpeechClipId) -> Option<&SpeechClip> {
        self.clips.get(id.index()?)
    }

    /// Id of the clip named `name`.
    pub fn by_name(&self, name: &str) -> Option<SpeechClipId> {
        self.by_name.get(name).copied()
    }

    /// Id of the clip at list position `index`.
    pub fn by_index(&self, index: usize) -> Option<SpeechClipId> {
        self.clips.get(index).map(|c| c.id)
    }

    /// Iterate over all clips.
    pub fn iter(&self) -> impl Iterator<Item = &SpeechClip> {
        self.clips.iter()
    }

    /// Whether an audio output is attached.
    pub const fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    /// Lower bound on the phoneme playback speed.
    pub const fn min_speech_speed(&self) -> f32 {
        self.min_speech_speed
    }

    /// Whether the driver is playing a clip.
    pub const fn is_speaking(&self) -> bool {
        self.active.is_some()
    }

    /// The clip currently playing.
    pub fn active_clip(&self) -> Option<SpeechClipId> {
        self.active.as_ref().map(|a| a.clip)
    }

    /// Whether the playback identified by `token` is still running.
    pub fn is_playing_token(&self, token: SpeechToken) -> bool {
        self.active.as_ref().is_some_and(|a| a.token == token)
    }

    fn mark_failed(&mut self, id: SpeechClipId) {
        if let Some(clip) = id.index().and_then(|i| self.clips.get_mut(i)) {
            clip.could_not_play = true;
        }
    }

    /// Start playing clip `id`, stopping the driver's own clip first.
    ///
    /// Fails, marking the clip `could_not_play`, when there is no audio
    /// output, when something else is already using the output, or when the
    /// clip has no decoded samples.
    pub fn start(
        &mut self,
        id: SpeechClipId,
        emotions: &mut EmotionSet,
        phonemes: &mut PhonemeSet,
    ) -> Result<SpeechToken, FaceError> {
        let Some(clip) = self.get(id).cloned() else {
            return Err(FaceError::UnknownSpeechClip(id));
        };
        if self.active.is_some() {
            let _ = self.stop(emotions, phonemes);
        }
        let Some(audio) = self.audio.as_mut() else {
            self.mark_failed(id);
            return Err(FaceError::NoAudioOutput);
        };
        if audio.is_playing() {
            self.mark_failed(id);
            return Err(FaceError::AudioBusy(id));
        }
        let samples = match audio.load_samples(clip.clip) {
            Ok(samples) => samples,
            Err(source) => {
                self.mark_failed(id);
                return Err(FaceError::ClipNotDecodable { clip: id, source });
            }
        };
        audio.play(clip.clip, clip.speed, clip.volume);

        self.next_token = self.next_token.wrapping_add(1);
        let token = SpeechToken(self.next_token);
        if let Some(c) = id.index().and_then(|i| self.clips.get_mut(i)) {
            c.could_not_play = false;
        }
        self.active = Some(ActiveSpeech {
            clip: id,
            token,
            samples,
            phoneme: None,
            emotion: None,
            interval_remaining: 0.0,
        });
        info!(clip = %clip.name, token = token.0, "Speech started");
        Ok(token)
    }

    /// Stop the driver's clip and fade out the channels it drove.
    ///
    /// Returns the token of the playback that ended, if any.
    pub fn stop(&mut self, emotions: &mut EmotionSet, phonemes: &mut PhonemeSet) -> Option<SpeechToken> {
        let active = self.active.take()?;
        if let Some(audio) = self.audio.as_mut() {
            audio.stop();
        }
        release_channels(&active, emotions, phonemes);
        debug!(clip = %active.clip, token = active.token.0, "Speech stopped");
        Some(active.token)
    }

    /// Advance one tick.
    ///
    /// Returns the token of a playback that finished during this tick.
    pub fn tick<R: Rng + ?Sized>(
        &mut self,
        dt: f32,
        emotions: &mut EmotionSet,
        phonemes: &mut PhonemeSet,
        rng: &mut R,
    ) -> Option<SpeechToken> {
        let active = self.active.as_mut()?;
        let Some(audio) = self.audio.as_ref() else {
            return None;
        };

        if !audio.is_playing() {
            let finished = self.active.take()?;
            release_channels(&finished, emotions, phonemes);
            info!(clip = %finished.clip, token = finished.token.0, "Speech finished");
            return Some(finished.token);
        }

        let clip = active.clip.index().and_then(|i| self.clips.get(i))?;
        let amplitude = active.samples.amplitude_at(audio.current_time());
        let silent = amplitude <= clip.silence_threshold;
        let speed = clip.speed.max(self.min_speech_speed);

        if !silent && !phonemes.any_active() {
            let draw = random::unit(rng);
            let played = phonemes
                .select(draw)
                .and_then(|id| Some((id, phonemes.get_mut(id)?.play(speed)?)));
            if played.is_some() {
                active.phoneme = played;
            }
        }

        let own_emotion_playing = active
            .emotion
            .and_then(|(id, g)| Some(emotions.get(id)?.channel.is_playing_generation(g)))
            .unwrap_or(false);

        if clip.ignore_silence {
            active.interval_remaining -= if dt.is_finite() { dt.max(0.0) } else { 0.0 };
            if active.interval_remaining <= 0.0 {
                if let Some(played) = play_random_vox(emotions, speed, rng) {
                    active.emotion = Some(played);
                }
                active.interval_remaining = random::between(rng, clip.emotion_min_interval, clip.emotion_max_interval);
            }
        } else if !silent {
            if !own_emotion_playing && !emotions.any_vox_active() {
                if let Some(played) = play_random_vox(emotions, speed, rng) {
                    active.emotion = Some(played);
                }
            }
        } else if clip.fade_emotion_on_silence && own_emotion_playing {
            let fading = active.emotion.and_then(|(id, _)| {
                let emotion = emotions.get_mut(id)?;
                if emotion.channel.is_fading_out() {
                    return None;
                }
                debug!(emotion = emotion.name(), "Silence, fading emotion early");
                Some((id, emotion.channel.stop()))
            });
            if fading.is_some() {
                active.emotion = fading;
            }
        }
        None
    }
}

fn play_random_vox<R: Rng + ?Sized>(emotions: &mut EmotionSet, speed: f32, rng: &mut R) -> Option<(EmotionId, u64)> {
    let candidates = emotions.vox_ids();
    let id = *random::pick(rng, &candidates)?;
    let generation = emotions.get_mut(id)?.channel.play(speed)?;
    Some((id, generation))
}

fn release_channels(active: &ActiveSpeech, emotions: &mut EmotionSet, phonemes: &mut PhonemeSet) {
    if let Some((id, generation)) = active.phoneme {
        if let Some(phoneme) = phonemes.get_mut(id).filter(|p| p.channel.is_playing_generation(generation)) {
            let _ = phoneme.channel.stop();
        }
    }
    if let Some((id, generation)) = active.emotion {
        if let Some(emotion) = emotions.get_mut(id).filter(|e| e.channel.is_playing_generation(generation)) {
            let _ = emotion.channel.stop();
        }
    }
}
