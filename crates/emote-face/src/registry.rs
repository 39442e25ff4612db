//! Blend-shape registry.
//!
//! Maps stable [`BlendShapeId`]s to renderable targets (mesh + shape index)
//! and keeps track of whether each target is still what it was registered
//! as. Every shape caches a hash of the name it had when registered; an
//! explicit [`revalidate`](BlendShapeRegistry::revalidate) pass compares the
//! hash against the live renderer and flags drift.
//!
//! The registry owns the [`ShapeRenderer`]: it is the only place weights are
//! written, so invalid targets can be filtered in one spot.

use std::collections::BTreeMap;

use emote_types::{BlendShapeDef, BlendShapeId, MeshHandle};
use tracing::{debug, warn};

use crate::collaborators::ShapeRenderer;

/// Highest weight a renderer accepts.
pub const MAX_SHAPE_WEIGHT: f32 = 100.0;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Stable 64-bit FNV-1a hash of a shape name.
pub fn name_hash(name: &str) -> u64 {
    name.bytes().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// A registered blend-shape target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlendShape {
    /// Stable id.
    pub id: BlendShapeId,
    /// Name the shape was registered under.
    pub name: String,
    /// Mesh carrying the shape.
    pub mesh: MeshHandle,
    /// Shape index on the mesh.
    pub index: u32,
    /// Hash of `name`, compared against the live shape name.
    pub name_hash: u64,
    /// The live shape at `index` still carries the registered name.
    pub is_valid: bool,
    /// A shape exists at `index` but under a different name.
    pub name_mismatch: bool,
}

/// Registry of every blend shape a character's channels may drive.
pub struct BlendShapeRegistry {
    shapes: Vec<BlendShape>,
    by_name: BTreeMap<String, BlendShapeId>,
    renderer: Box<dyn ShapeRenderer>,
}

impl core::fmt::Debug for BlendShapeRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BlendShapeRegistry")
            .field("shapes", &self.shapes)
            .finish_non_exhaustive()
    }
}

impl BlendShapeRegistry {
    /// Create an empty registry writing through `renderer`.
    pub fn new(renderer: Box<dyn ShapeRenderer>) -> Self {
        Self {
            shapes: Vec::new(),
            by_name: BTreeMap::new(),
            renderer,
        }
    }

    /// Register a shape under `name`. Re-registering a name returns the
    /// existing id unchanged.
    ///
    /// The shape is validated immediately against the renderer.
    pub fn register(&mut self, name: &str, mesh: MeshHandle, index: u32) -> Option<BlendShapeId> {
        if let Some(existing) = self.by_name.get(name) {
            return Some(*existing);
        }
        let id = BlendShapeId::from_index(self.shapes.len())?;
        let hash = name_hash(name);
        let live = self.renderer.shape_name(mesh, index);
        let is_valid = live.as_deref().is_some_and(|n| name_hash(n) == hash);
        if !is_valid {
            warn!(shape = name, %mesh, index, live = ?live, "Registered blend shape does not match renderer");
        }
        self.shapes.push(BlendShape {
            id,
            name: name.to_owned(),
            mesh,
            index,
            name_hash: hash,
            is_valid,
            name_mismatch: live.is_some() && !is_valid,
        });
        self.by_name.insert(name.to_owned(), id);
        Some(id)
    }

    /// Register every manual definition. Returns how many new shapes were added.
    pub fn register_defs(&mut self, defs: &[BlendShapeDef]) -> usize {
        let before = self.shapes.len();
        for def in defs {
            let _ = self.register(&def.name, def.mesh, def.index);
        }
        self.shapes.len().saturating_sub(before)
    }

    /// Register every shape on `mesh` under its live name.
    ///
    /// Names that are already registered are skipped. Returns how many new
    /// shapes were added.
    pub fn scan_mesh(&mut self, mesh: MeshHandle) -> usize {
        let count = self.renderer.shape_count(mesh);
        let before = self.shapes.len();
        for index in 0..count {
            let Some(name) = self.renderer.shape_name(mesh, index) else {
                continue;
            };
            if self.by_name.contains_key(&name) {
                continue;
            }
            let _ = self.register(&name, mesh, index);
        }
        let added = self.shapes.len().saturating_sub(before);
        debug!(%mesh, count, added, "Scanned mesh for blend shapes");
        added
    }

    /// Look up a shape by id.
    pub fn resolve(&self, id: BlendShapeId) -> Option<&BlendShape> {
        self.shapes.get(id.index()?)
    }

    /// Look up a shape id by registered name.
    pub fn find(&self, name: &str) -> Option<BlendShapeId> {
        self.by_name.get(name).copied()
    }

    /// Number of registered shapes.
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    /// Whether no shapes are registered.
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Iterate over all registered shapes.
    pub fn iter(&self) -> impl Iterator<Item = &BlendShape> {
        self.shapes.iter()
    }

    /// Read-only access to the renderer.
    pub fn renderer(&self) -> &dyn ShapeRenderer {
        self.renderer.as_ref()
    }

    /// Re-check every shape against the live renderer.
    ///
    /// A shape is valid when the live name at its index hashes to the cached
    /// hash. When it does not, the rest of the mesh is searched for a shape
    /// with the cached hash and the index is re-pointed if one is found.
    /// Returns how many shapes changed state (validity, mismatch flag, or
    /// index); a second call with no renderer change returns 0.
    pub fn revalidate(&mut self) -> usize {
        let mut changed: usize = 0;
        for shape in &mut self.shapes {
            let live = self.renderer.shape_name(shape.mesh, shape.index);
            let mut is_valid = live.as_deref().is_some_and(|n| name_hash(n) == shape.name_hash);
            let mut name_mismatch = live.is_some() && !is_valid;
            let mut index = shape.index;

            if !is_valid {
                let count = self.renderer.shape_count(shape.mesh);
                let relocated = (0..count).find(|&i| {
                    self.renderer
                        .shape_name(shape.mesh, i)
                        .is_some_and(|n| name_hash(&n) == shape.name_hash)
                });
                if let Some(new_index) = relocated {
                    debug!(shape = %shape.name, old = shape.index, new = new_index, "Blend shape moved");
                    index = new_index;
                    is_valid = true;
                    name_mismatch = false;
                }
            }

            if is_valid != shape.is_valid || name_mismatch != shape.name_mismatch || index != shape.index {
                if !is_valid {
                    warn!(shape = %shape.name, mesh = %shape.mesh, index = shape.index, name_mismatch, "Blend shape no longer valid");
                }
                shape.is_valid = is_valid;
                shape.name_mismatch = name_mismatch;
                shape.index = index;
                changed = changed.saturating_add(1);
            }
        }
        changed
    }

    /// Write `clamp(value, 0, 1) * max_weight` to the renderer.
    ///
    /// No-op for unknown or invalid shapes. `max_weight` is itself clamped to
    /// `[0, 100]`, so the renderer only ever sees weights in that range.
    pub fn apply_weight(&mut self, id: BlendShapeId, value: f32, max_weight: f32) {
        let Some(shape) = id.index().and_then(|i| self.shapes.get(i)) else {
            return;
        };
        if !shape.is_valid {
            return;
        }
        let value = if value.is_finite() { value.clamp(0.0, 1.0) } else { 0.0 };
        let max_weight = if max_weight.is_finite() {
            max_weight.clamp(0.0, MAX_SHAPE_WEIGHT)
        } else {
            0.0
        };
        self.renderer.set_shape_weight(shape.mesh, shape.index, value * max_weight);
    }
}
