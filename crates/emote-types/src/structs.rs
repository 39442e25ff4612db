//! Event payloads exchanged between the engine and its host.

use serde::{Deserialize, Serialize};

use crate::enums::{NoticeKind, Relationship};
use crate::ids::{ActorId, ModelId, ReactionId};

/// Who triggered a reaction: the payload carried by every reaction notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReactionEvent {
    /// The reacting character.
    pub self_id: ActorId,
    /// The character that entered or left the zone.
    pub other_id: ActorId,
    /// Model of the other character.
    pub other_model_id: ModelId,
    /// Relationship of the other character to the reacting one.
    pub relationship: Relationship,
}

/// A notification raised around a reaction stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionNotice {
    /// Pre or post, enter or exit.
    pub kind: NoticeKind,
    /// The reaction the notice concerns.
    pub reaction: ReactionId,
    /// The bound actors.
    pub event: ReactionEvent,
}
