//! Type-safe identifier wrappers.
//!
//! Actors (the characters that walk in and out of each other's proximity
//! zones) are identified by time-ordered UUIDs because they are minted by the
//! host at runtime. Everything that is authored ahead of time -- blend shapes,
//! channels, clips, reactions -- gets a dense index newtype instead, assigned
//! in declaration order when the configuration is built. Index ids double as
//! the "by index" addressing mode of the public playback API.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

/// Generates a dense `u32` index newtype for authored data.
macro_rules! define_index {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl $name {
            /// Return the position this id refers to in its owning list.
            ///
            /// Returns `None` only on targets where `u32` does not fit in
            /// `usize`.
            pub fn index(self) -> Option<usize> {
                usize::try_from(self.0).ok()
            }

            /// Build an id from a list position.
            ///
            /// Returns `None` if the position exceeds `u32::MAX`.
            pub fn from_index(index: usize) -> Option<Self> {
                u32::try_from(index).ok().map(Self)
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.0)
            }
        }
    };
}

define_id! {
    /// Unique identifier for a character taking part in proximity events.
    ActorId
}

define_index! {
    /// Identifier of a registered blend shape.
    BlendShapeId
}

define_index! {
    /// Identifier of an emotion channel.
    EmotionId
}

define_index! {
    /// Identifier of a phoneme (viseme) channel.
    PhonemeId
}

define_index! {
    /// Identifier of a speech audio clip definition.
    SpeechClipId
}

define_index! {
    /// Identifier of a reaction definition.
    ReactionId
}

define_index! {
    /// Identifier of a character model in the host's catalogue.
    ModelId
}

define_index! {
    /// Host handle of a skinned mesh carrying blend shapes.
    MeshHandle
}

define_index! {
    /// Host handle of a skeleton bone.
    BoneHandle
}

define_index! {
    /// Host handle of an audio clip asset.
    ClipHandle
}
