//! JSON weight trace of an engine run.
//!
//! One [`TraceFrame`] per tick records what the renderer was last told for
//! every written shape, the left eye's rotation, and the reaction notices
//! raised during the tick.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use emote_core::TickSummary;
use emote_types::{Quat, ReactionNotice};
use serde::Serialize;

use crate::error::EngineError;

/// A single tick of the trace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceFrame {
    /// Tick number.
    pub tick: u64,
    /// Face time in seconds.
    pub elapsed: f64,
    /// Whether speech was playing.
    pub speaking: bool,
    /// Last weight written to each shape, by name.
    pub weights: BTreeMap<String, f32>,
    /// Left eye rotation, once gaze has written one.
    pub eye: Option<Quat>,
    /// Notices raised during the tick.
    pub notices: Vec<ReactionNotice>,
}

/// The whole run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    /// Character name.
    pub character: String,
    /// Seconds per tick.
    pub dt: f32,
    /// Frames in tick order.
    pub frames: Vec<TraceFrame>,
}

impl Trace {
    /// Start an empty trace.
    pub const fn new(character: String, dt: f32) -> Self {
        Self {
            character,
            dt,
            frames: Vec::new(),
        }
    }

    /// Append the frame for `summary`.
    pub fn record(&mut self, summary: &TickSummary, weights: BTreeMap<String, f32>, eye: Option<Quat>) {
        self.frames.push(TraceFrame {
            tick: summary.tick,
            elapsed: summary.elapsed,
            speaking: summary.speaking,
            weights,
            eye,
            notices: summary.notices.clone(),
        });
    }

    /// Write the trace as pretty-printed JSON to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Io`] if the file cannot be created, or
    /// [`EngineError::Json`] if encoding fails.
    pub fn write_to(&self, path: &Path) -> Result<(), EngineError> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn summary(tick: u64) -> TickSummary {
        TickSummary {
            tick,
            elapsed: 0.02,
            notices: Vec::new(),
            active_emotions: 0,
            active_phonemes: 0,
            speaking: true,
        }
    }

    #[test]
    fn frames_serialize_with_named_weights() {
        let mut trace = Trace::new("Mira".to_owned(), 0.02);
        let mut weights = BTreeMap::new();
        weights.insert("Smile".to_owned(), 50.0);
        trace.record(&summary(1), weights, None);

        let json = serde_json::to_value(&trace).unwrap();
        assert_eq!(json["character"], "Mira");
        assert_eq!(json["frames"][0]["tick"], 1);
        assert_eq!(json["frames"][0]["speaking"], true);
        assert_eq!(json["frames"][0]["weights"]["Smile"], 50.0);
        assert!(json["frames"][0]["eye"].is_null());
    }

    #[test]
    fn write_to_missing_directory_fails_with_io() {
        let trace = Trace::new("Mira".to_owned(), 0.02);
        let result = trace.write_to(Path::new("/nonexistent-emote-dir/trace.json"));
        assert!(matches!(result, Err(EngineError::Io { .. })));
    }
}
