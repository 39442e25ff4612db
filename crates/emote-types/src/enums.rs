//! Enumeration types shared across the Emote workspace.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Social classification
// ---------------------------------------------------------------------------

/// Relationship of another actor relative to the reacting actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Relationship {
    /// An ally.
    Friend,
    /// Neither ally nor enemy.
    Neutral,
    /// An enemy.
    Foe,
}

/// Which relationships a reaction responds to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReactTo {
    /// Every relationship.
    #[default]
    Any,
    /// Friends and neutral actors.
    Friendly,
    /// Friends only.
    FriendOnly,
    /// Foes only.
    Foe,
    /// Neutral actors only.
    NeutralOnly,
    /// Never reacts.
    Nobody,
}

impl ReactTo {
    /// Whether an actor with the given relationship passes this filter.
    pub const fn accepts(self, relationship: Relationship) -> bool {
        match self {
            Self::Any => true,
            Self::Friendly => matches!(relationship, Relationship::Friend | Relationship::Neutral),
            Self::FriendOnly => matches!(relationship, Relationship::Friend),
            Self::Foe => matches!(relationship, Relationship::Foe),
            Self::NeutralOnly => matches!(relationship, Relationship::Neutral),
            Self::Nobody => false,
        }
    }
}

/// Sentiment expressed by an emotion, derived from its intensity axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sentiment {
    /// Warm or welcoming.
    Friendly,
    /// Aggressive or threatening.
    Hostile,
    /// Neither.
    Neutral,
}

// ---------------------------------------------------------------------------
// Reactions
// ---------------------------------------------------------------------------

/// Stage of a proximity reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ReactionStage {
    /// Another actor entered the zone.
    Enter,
    /// Another actor left the zone.
    Exit,
    /// Another actor remains in the zone. Declared but never triggered.
    Stay,
}

/// Kind of notification raised around a reaction stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoticeKind {
    /// Raised after an enter reaction binds, before anything plays.
    PreEnter,
    /// Raised once the enter reaction's emotion and speech have both finished.
    PostEnter,
    /// Raised after an exit reaction binds, before anything plays.
    PreExit,
    /// Raised once the exit reaction's emotion and speech have both finished.
    PostExit,
}

impl NoticeKind {
    /// The notice raised before playback of `stage`.
    ///
    /// Returns `None` for [`ReactionStage::Stay`], which has no trigger path.
    pub const fn pre(stage: ReactionStage) -> Option<Self> {
        match stage {
            ReactionStage::Enter => Some(Self::PreEnter),
            ReactionStage::Exit => Some(Self::PreExit),
            ReactionStage::Stay => None,
        }
    }

    /// The notice raised after playback of `stage` completes.
    pub const fn post(stage: ReactionStage) -> Option<Self> {
        match stage {
            ReactionStage::Enter => Some(Self::PostEnter),
            ReactionStage::Exit => Some(Self::PostExit),
            ReactionStage::Stay => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Skeleton
// ---------------------------------------------------------------------------

/// Semantic role of a bone the engine asks the host skeleton for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BoneRole {
    /// Head bone.
    Head,
    /// Left eye bone.
    LeftEye,
    /// Right eye bone.
    RightEye,
    /// Jaw bone.
    Jaw,
}
