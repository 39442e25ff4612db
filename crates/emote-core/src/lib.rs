//! Configuration, clock and per-tick facade for the Emote facial animation
//! engine.
//!
//! A host builds one [`ShapesModule`] per character from a [`FaceConfig`]
//! and its [`Collaborators`], forwards proximity events and playback
//! requests to it, and calls [`ShapesModule::tick`] once per frame.
//!
//! # Modules
//!
//! - [`clock`] -- Tick counter and elapsed time ([`FaceClock`]).
//! - [`config`] -- Configuration loading from `emote-config.yaml` into
//!   strongly-typed structs.
//! - [`module`] -- The [`ShapesModule`] facade and its public API.
//! - [`tick`] -- The per-tick update cycle ([`TickSummary`]).

pub mod clock;
pub mod config;
pub mod module;
pub mod tick;

// Re-export primary types at crate root for convenience.
pub use clock::{ClockError, FaceClock};
pub use config::{ConfigError, FaceConfig};
pub use module::{BuildReport, Collaborators, Lookup, ModuleError, ShapesModule};
pub use tick::TickSummary;
