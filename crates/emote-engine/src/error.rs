//! Error types for the Emote engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during engine startup and the tick loop.

/// Top-level error for the Emote engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: emote_core::ConfigError,
    },

    /// The face could not be built.
    #[error("module error: {source}")]
    Module {
        /// The underlying module error.
        #[from]
        source: emote_core::ModuleError,
    },

    /// The face clock rejected a tick.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: emote_core::ClockError,
    },

    /// Writing the weight trace failed.
    #[error("trace I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Serializing the weight trace failed.
    #[error("trace encoding error: {source}")]
    Json {
        /// The underlying JSON error.
        #[from]
        source: serde_json::Error,
    },

    /// An environment variable held an unusable value.
    #[error("invalid value for {name}: {value}")]
    Env {
        /// Variable name.
        name: &'static str,
        /// The rejected value.
        value: String,
    },
}
