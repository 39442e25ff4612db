//! Headless host binary for the Emote facial animation engine.
//!
//! This is the main entry point that wires one face to headless
//! collaborators, plays a scripted encounter against it at the configured
//! tick rate, and optionally writes a JSON trace of every weight the face
//! produced.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `emote-config.yaml` (or `EMOTE_CONFIG`)
//! 3. Read run settings from the environment
//! 4. Create headless renderer, skeleton, and audio
//! 5. Build the face
//! 6. Subscribe a logging observer to reaction notices
//! 7. Run the tick loop with the scripted encounter
//! 8. Write the trace
//! 9. Log the result
//!
//! # Environment
//!
//! - `EMOTE_CONFIG` -- configuration path (default `emote-config.yaml`).
//! - `EMOTE_DURATION_SECS` -- face time to run for (default 7).
//! - `EMOTE_TRACE_PATH` -- where to write the JSON trace (no trace if unset).
//! - `RUST_LOG` -- log filter (default `info`).

mod error;
mod headless;
mod scenario;
mod trace;

use std::path::{Path, PathBuf};
use std::time::Duration;

use emote_core::{Collaborators, FaceConfig, ShapesModule};
use emote_types::{ActorId, ReactionNotice};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::headless::{HeadlessRenderer, HeadlessSkeleton, LEFT_EYE, SimulatedAudio};
use crate::scenario::Encounter;
use crate::trace::Trace;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "emote-config.yaml";

/// Default run length in seconds of face time.
const DEFAULT_DURATION_SECS: f64 = 7.0;

/// Application entry point for the Emote engine.
///
/// # Errors
///
/// Returns an error if configuration, face construction, a tick, or
/// writing the trace fails.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("emote-engine starting");

    // 2. Load configuration.
    let config = load_config()?;
    info!(
        character = %config.character.name,
        seed = ?config.character.seed,
        tick_interval_ms = config.timing.tick_interval_ms,
        emotions = config.emotions.len(),
        phonemes = config.phonemes.len(),
        clips = config.speech.clips.len(),
        reactions = config.reactions.len(),
        "Configuration loaded"
    );

    // 3. Run settings.
    let duration = duration_secs()?;
    let trace_path = std::env::var_os("EMOTE_TRACE_PATH").map(PathBuf::from);
    let tick_ms = config.timing.tick_interval_ms.max(1);
    #[allow(clippy::cast_precision_loss)]
    let dt = tick_ms as f32 / 1000.0;

    // 4. Create headless collaborators.
    let renderer = HeadlessRenderer::from_config(&config);
    let skeleton = HeadlessSkeleton::default();
    let audio = SimulatedAudio::from_config(&config);
    info!(
        shapes = renderer.shape_total(),
        clips = audio.clip_count(),
        "Headless collaborators ready"
    );

    // 5. Build the face.
    let mut module = ShapesModule::new(
        &config,
        Collaborators {
            renderer: Box::new(renderer.clone()),
            skeleton: Some(Box::new(skeleton.clone())),
            audio: Some(Box::new(audio.clone())),
            self_id: ActorId::new(),
        },
    )
    .map_err(EngineError::from)?;
    for warning in &module.report().warnings {
        warn!(%warning, "Face build warning");
    }

    // 6. Log every reaction notice as it is raised.
    module.subscribe(
        None,
        Box::new(|notice: &ReactionNotice| {
            info!(kind = ?notice.kind, reaction = %notice.reaction, other = %notice.event.other_id, "Reaction notice");
        }),
    );

    // 7. Run the tick loop.
    let mut encounter = Encounter::friendly_visit();
    let mut trace = Trace::new(config.character.name.clone(), dt);
    info!(duration, dt, visitor = %encounter.visitor(), "Entering tick loop");

    while module.clock().elapsed() < duration {
        audio.advance(dt);
        let summary = module.tick(dt).map_err(EngineError::from)?;

        for cue in encounter.due(summary.elapsed) {
            encounter.perform(cue, &mut module);
        }

        if trace_path.is_some() {
            trace.record(&summary, renderer.weights_by_name(), skeleton.rotation(LEFT_EYE));
        }

        tokio::time::sleep(Duration::from_millis(tick_ms)).await;
    }

    // 8. Write the trace.
    if let Some(path) = &trace_path {
        trace.write_to(path)?;
        info!(path = %path.display(), frames = trace.frames.len(), "Trace written");
    }

    // 9. Log results.
    info!(
        total_ticks = module.clock().tick(),
        elapsed = module.clock().elapsed(),
        encounter_finished = encounter.is_finished(),
        audio_playing = audio.playing().is_some(),
        "emote-engine shutdown complete"
    );
    Ok(())
}

/// Load the face configuration from `EMOTE_CONFIG` or `emote-config.yaml`.
///
/// Looks for the config file relative to the current working directory.
fn load_config() -> Result<FaceConfig, EngineError> {
    let configured = std::env::var_os("EMOTE_CONFIG").map(PathBuf::from);
    let config_path = configured
        .as_deref()
        .unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
    if config_path.exists() {
        let config = FaceConfig::from_file(config_path)?;
        Ok(config)
    } else {
        info!(path = %config_path.display(), "Config file not found, using defaults");
        Ok(FaceConfig::default())
    }
}

/// Read `EMOTE_DURATION_SECS`, falling back to the default run length.
fn duration_secs() -> Result<f64, EngineError> {
    std::env::var("EMOTE_DURATION_SECS").map_or(Ok(DEFAULT_DURATION_SECS), |raw| {
        parse_duration(&raw).ok_or(EngineError::Env {
            name: "EMOTE_DURATION_SECS",
            value: raw,
        })
    })
}

/// A positive, finite number of seconds.
fn parse_duration(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs > 0.0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use emote_types::NoticeKind;

    const CONFIG: &str = r"
character: { name: Mira, seed: 7 }
blend_shapes:
  scan_meshes: [0]
emotions:
  - name: Wave
    fade_in: 0.2
    fade_out: 0.2
    hold: { enter: 0.4, exit: 0.2 }
    shapes: [{ blend_shape: Smile }]
  - name: Talk
    vox: true
    axes: { joy: 1 }
    shapes: [{ blend_shape: Smile }]
phonemes:
  - name: AA
    shapes: [{ blend_shape: Jaw_Open }]
speech:
  clips:
    - { name: Hello, clip: 1 }
reactions:
  - name: Greet
    react_to: FriendOnly
    enter: { enabled: true, emotions: [Wave] }
    exit: { enabled: true, emotions: [Wave] }
";

    #[test]
    fn duration_must_be_positive_and_finite() {
        assert_eq!(parse_duration(" 2.5 "), Some(2.5));
        assert_eq!(parse_duration("0"), None);
        assert_eq!(parse_duration("-1"), None);
        assert_eq!(parse_duration("inf"), None);
        assert_eq!(parse_duration("soon"), None);
    }

    /// The scripted visit runs end to end against headless collaborators.
    #[test]
    fn friendly_visit_runs_headless() {
        let config = FaceConfig::parse(CONFIG).unwrap();
        let renderer = HeadlessRenderer::from_config(&config);
        let skeleton = HeadlessSkeleton::default();
        let audio = SimulatedAudio::from_config(&config);
        let mut module = ShapesModule::new(
            &config,
            Collaborators {
                renderer: Box::new(renderer.clone()),
                skeleton: Some(Box::new(skeleton.clone())),
                audio: Some(Box::new(audio.clone())),
                self_id: ActorId::new(),
            },
        )
        .unwrap();
        assert!(module.report().is_clean(), "{:?}", module.report());

        let dt = 0.02;
        let mut encounter = Encounter::friendly_visit();
        let mut trace = Trace::new("Mira".to_owned(), dt);
        let mut spoke = false;
        while module.clock().elapsed() < 7.0 {
            audio.advance(dt);
            let summary = module.tick(dt).unwrap();
            spoke |= summary.speaking;
            for cue in encounter.due(summary.elapsed) {
                encounter.perform(cue, &mut module);
            }
            trace.record(&summary, renderer.weights_by_name(), skeleton.rotation(LEFT_EYE));
        }

        assert!(encounter.is_finished());
        assert!(spoke);
        let kinds: Vec<NoticeKind> = trace
            .frames
            .iter()
            .flat_map(|frame| frame.notices.iter().map(|n| n.kind))
            .collect();
        assert_eq!(
            kinds,
            vec![
                NoticeKind::PreEnter,
                NoticeKind::PostEnter,
                NoticeKind::PreExit,
                NoticeKind::PostExit
            ]
        );
        assert!(trace.frames.iter().any(|f| f.weights.get("Jaw_Open").is_some_and(|w| *w > 0.0)));
        assert!(trace.frames.iter().any(|f| f.eye.is_some()));
    }
}
