//! Shared type definitions for the Emote facial animation engine.
//!
//! This crate is the single source of truth for identifiers, enumerations,
//! authoring definitions and event payloads used across the workspace.
//!
//! # Modules
//!
//! - [`ids`] -- Actor UUIDs and dense index ids for authored data
//! - [`enums`] -- Relationships, reaction filters, stages, notice kinds
//! - [`defs`] -- Serde authoring definitions (channels, clips, reactions)
//! - [`math`] -- The quaternion used by eye gaze
//! - [`structs`] -- Reaction event payloads

pub mod defs;
pub mod enums;
pub mod ids;
pub mod math;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use defs::{
    BlendShapeDef, BlinkDef, EmotionAxes, EmotionDef, GazeDef, HoldDef, PhonemeDef, ReactionDef,
    ShapeRefDef, SpeechClipDef, StageDef,
};
pub use enums::{BoneRole, NoticeKind, ReactTo, ReactionStage, Relationship, Sentiment};
pub use ids::{
    ActorId, BlendShapeId, BoneHandle, ClipHandle, EmotionId, MeshHandle, ModelId, PhonemeId,
    ReactionId, SpeechClipId,
};
pub use math::Quat;
pub use structs::{ReactionEvent, ReactionNotice};
