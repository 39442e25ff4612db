//! Phoneme (viseme) channels and weighted phoneme selection.

use std::collections::BTreeMap;

use emote_types::{PhonemeDef, PhonemeId};
use tracing::{debug, warn};

use crate::channel::{Channel, resolve_shapes, sanitize_speed};
use crate::error::FaceError;
use crate::registry::BlendShapeRegistry;

/// Normalize `frequencies` to sum to 1 and accumulate them in order.
///
/// Negative or non-finite frequencies count as zero. The last entry is
/// exactly 1 unless every weight is zero, in which case all entries are 0
/// and nothing can be selected.
pub fn compute_cdf(frequencies: &[f32]) -> Vec<f32> {
    let weights: Vec<f32> = frequencies
        .iter()
        .map(|f| if f.is_finite() { f.max(0.0) } else { 0.0 })
        .collect();
    let total: f32 = weights.iter().sum();
    if total <= 0.0 {
        return vec![0.0; weights.len()];
    }

    let last_weighted = weights.iter().rposition(|w| *w > 0.0);
    let mut cdf = Vec::with_capacity(weights.len());
    let mut running = 0.0_f32;
    for (index, weight) in weights.iter().enumerate() {
        running += weight / total;
        if Some(index) == last_weighted {
            running = 1.0;
        }
        cdf.push(running.min(1.0));
    }
    cdf
}

/// Index of the first weighted entry whose cumulative value is at or
/// above `draw`.
///
/// Entries that add nothing to the running total are never picked. Falls
/// back to the last weighted entry when rounding leaves `draw` above every
/// value. Returns `None` when no entry carries weight.
pub fn select_weighted(cdf: &[f32], draw: f32) -> Option<usize> {
    let mut previous = 0.0_f32;
    let mut last_weighted = None;
    for (index, &c) in cdf.iter().enumerate() {
        if c > previous {
            if c >= draw {
                return Some(index);
            }
            last_weighted = Some(index);
            previous = c;
        }
    }
    last_weighted
}

/// A phoneme channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Phoneme {
    /// Stable id (position in the owning set).
    pub id: PhonemeId,
    /// The animated channel.
    pub channel: Channel,
    /// Relative selection frequency.
    pub frequency: f32,
    /// Seconds one utterance lasts at speed 1.
    pub duration: f32,
}

impl Phoneme {
    /// Phoneme name.
    pub fn name(&self) -> &str {
        self.channel.name()
    }

    /// Play one utterance at `speed`.
    ///
    /// The mouth opens over the fade-in, holds for whatever is left of
    /// `duration`, then closes. All three parts scale with speed.
    pub fn play(&mut self, speed: f32) -> Option<u64> {
        let speed = sanitize_speed(speed);
        let hold = (self.duration - self.channel.fade_in() - self.channel.fade_out()).max(0.0) / speed;
        self.channel.play_with_hold(speed, hold)
    }
}

/// Every phoneme of a character plus the cumulative selection distribution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhonemeSet {
    phonemes: Vec<Phoneme>,
    by_name: BTreeMap<String, PhonemeId>,
    cdf: Vec<f32>,
}

impl PhonemeSet {
    /// Build the set. Duplicate names are rejected.
    pub fn from_defs(
        defs: &[PhonemeDef],
        registry: &BlendShapeRegistry,
        warnings: &mut Vec<String>,
    ) -> Result<Self, FaceError> {
        let mut set = Self::default();
        for def in defs {
            if set.by_name.contains_key(&def.name) {
                return Err(FaceError::DuplicateName {
                    kind: "phoneme",
                    name: def.name.clone(),
                });
            }
            let Some(id) = PhonemeId::from_index(set.phonemes.len()) else {
                break;
            };
            if !def.duration.is_finite() || def.duration <= 0.0 {
                warn!(phoneme = %def.name, duration = def.duration, "Phoneme duration not positive, using fades only");
                warnings.push(format!("{}: phoneme duration {} not positive", def.name, def.duration));
            }
            let shapes = resolve_shapes(&def.name, &def.shapes, registry, warnings);
            let mut channel = Channel::new(def.name.clone(), shapes, def.fade_in, def.fade_out);
            channel.set_allowed(def.enabled);
            set.by_name.insert(def.name.clone(), id);
            set.phonemes.push(Phoneme {
                id,
                channel,
                frequency: def.frequency,
                duration: if def.duration.is_finite() { def.duration.max(0.0) } else { 0.0 },
            });
        }
        set.rebuild_cdf();
        debug!(count = set.phonemes.len(), "Built phoneme set");
        Ok(set)
    }

    /// Recompute the selection distribution. Disabled phonemes get weight 0.
    pub fn rebuild_cdf(&mut self) {
        let frequencies: Vec<f32> = self
            .phonemes
            .iter()
            .map(|p| if p.channel.is_allowed() { p.frequency } else { 0.0 })
            .collect();
        self.cdf = compute_cdf(&frequencies);
    }

    /// The cumulative selection distribution, in list order.
    pub fn cdf(&self) -> &[f32] {
        &self.cdf
    }

    /// Pick a phoneme for a uniform `draw` in `[0, 1)`.
    pub fn select(&self, draw: f32) -> Option<PhonemeId> {
        let index = select_weighted(&self.cdf, draw)?;
        self.phonemes.get(index).map(|p| p.id)
    }

    /// Number of phonemes.
    pub fn len(&self) -> usize {
        self.phonemes.len()
    }

    /// Whether there are no phonemes.
    pub fn is_empty(&self) -> bool {
        self.phonemes.is_empty()
    }

    /// Look up by id.
    pub fn get(&self, id: PhonemeId) -> Option<&Phoneme> {
        self.phonemes.get(id.index()?)
    }

    /// Mutable lookup by id.
    pub fn get_mut(&mut self, id: PhonemeId) -> Option<&mut Phoneme> {
        self.phonemes.get_mut(id.index()?)
    }

    /// Id of the phoneme named `name`.
    pub fn by_name(&self, name: &str) -> Option<PhonemeId> {
        self.by_name.get(name).copied()
    }

    /// Id of the phoneme at list position `index`.
    pub fn by_index(&self, index: usize) -> Option<PhonemeId> {
        self.phonemes.get(index).map(|p| p.id)
    }

    /// Iterate over all phonemes.
    pub fn iter(&self) -> impl Iterator<Item = &Phoneme> {
        self.phonemes.iter()
    }

    /// Number of enabled phonemes.
    pub fn active_count(&self) -> usize {
        self.phonemes.iter().filter(|p| p.channel.is_enabled()).count()
    }

    /// Whether any phoneme is enabled.
    pub fn any_active(&self) -> bool {
        self.phonemes.iter().any(|p| p.channel.is_enabled())
    }

    /// Advance every envelope.
    pub fn tick(&mut self, dt: f32) {
        for phoneme in &mut self.phonemes {
            let _ = phoneme.channel.tick(dt);
        }
    }

    /// Write a final zero for every channel that just turned off.
    pub fn release(&mut self, registry: &mut BlendShapeRegistry) {
        for phoneme in &mut self.phonemes {
            phoneme.channel.release(registry);
        }
    }

    /// Write the weights of every enabled channel.
    pub fn apply(&mut self, registry: &mut BlendShapeRegistry) {
        for phoneme in &mut self.phonemes {
            phoneme.channel.apply(registry);
        }
    }

    /// Re-check shape references; returns the total unsynced count.
    pub fn sync(&mut self, registry: &BlendShapeRegistry) -> usize {
        self.phonemes
            .iter_mut()
            .map(|p| p.channel.sync(registry))
            .fold(0, usize::saturating_add)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::testing::FakeRenderer;

    fn def(name: &str, frequency: f32) -> PhonemeDef {
        PhonemeDef {
            name: name.to_owned(),
            frequency,
            duration: 0.2,
            fade_in: 0.05,
            fade_out: 0.05,
            enabled: true,
            shapes: Vec::new(),
        }
    }

    #[test]
    fn cdf_of_one_one_two() {
        let cdf = compute_cdf(&[1.0, 1.0, 2.0]);
        assert!((cdf[0] - 0.25).abs() < 1e-6);
        assert!((cdf[1] - 0.5).abs() < 1e-6);
        assert!((cdf[2] - 1.0).abs() < 1e-6);
        assert_eq!(select_weighted(&cdf, 0.3), Some(1));
        assert_eq!(select_weighted(&cdf, 0.9), Some(2));
        assert_eq!(select_weighted(&cdf, 0.0), Some(0));
    }

    #[test]
    fn zero_weight_entries_are_never_selected() {
        let cdf = compute_cdf(&[0.0, 3.0, 0.0, 1.0, 0.0]);
        assert!(cdf[0].abs() < 1e-6);
        assert!((cdf[3] - 1.0).abs() < 1e-6);
        assert_eq!(select_weighted(&cdf, 0.0), Some(1));
        assert_eq!(select_weighted(&cdf, 0.75), Some(1));
        assert_eq!(select_weighted(&cdf, 0.8), Some(3));
        assert_eq!(select_weighted(&cdf, 1.5), Some(3));
    }

    #[test]
    fn no_weight_means_no_selection() {
        let cdf = compute_cdf(&[0.0, -2.0, f32::NAN]);
        assert!(cdf.iter().all(|c| c.abs() < 1e-6));
        assert_eq!(select_weighted(&cdf, 0.0), None);
        assert_eq!(select_weighted(&cdf, 0.5), None);
        assert!(compute_cdf(&[]).is_empty());
        assert_eq!(select_weighted(&[], 0.5), None);
    }

    #[test]
    fn disabled_phonemes_are_never_selected() {
        let reg = BlendShapeRegistry::new(Box::new(FakeRenderer::new()));
        let mut warnings = Vec::new();
        let mut off = def("M", 5.0);
        off.enabled = false;
        let mut set = PhonemeSet::from_defs(&[off, def("A", 1.0)], &reg, &mut warnings).unwrap();
        assert!(set.cdf()[0].abs() < 1e-6);
        assert_eq!(set.select(0.0), Some(PhonemeId(1)));
        assert_eq!(set.select(0.99), Some(PhonemeId(1)));

        set.get_mut(PhonemeId(1)).unwrap().channel.set_allowed(false);
        set.rebuild_cdf();
        assert_eq!(set.select(0.0), None);
        assert_eq!(set.select(0.5), None);
    }

    #[test]
    fn utterance_lasts_duration_over_speed() {
        let reg = BlendShapeRegistry::new(Box::new(FakeRenderer::new()));
        let mut warnings = Vec::new();
        let mut set = PhonemeSet::from_defs(&[def("O", 1.0)], &reg, &mut warnings).unwrap();
        let p = set.get_mut(PhonemeId(0)).unwrap();
        p.play(2.0);
        // 0.2 s at speed 2 takes 0.1 s.
        let mut elapsed = 0.0_f32;
        while p.channel.is_enabled() && elapsed < 1.0 {
            p.channel.tick(0.01);
            elapsed += 0.01;
        }
        assert!((elapsed - 0.1).abs() < 0.015);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let reg = BlendShapeRegistry::new(Box::new(FakeRenderer::new()));
        let mut warnings = Vec::new();
        let err = PhonemeSet::from_defs(&[def("A", 1.0), def("A", 1.0)], &reg, &mut warnings).unwrap_err();
        assert!(matches!(err, FaceError::DuplicateName { kind: "phoneme", .. }));
    }
}
