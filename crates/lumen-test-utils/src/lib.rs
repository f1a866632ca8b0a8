//! Test utilities and mock worlds for Lumen development.
//!
//! [`MockWorld`] is an in-memory [`LightWorld`] whose geometry can be edited
//! through `&self`, so tests can keep an `Arc` to it while an engine holds
//! another. Light-update notifications are recorded, and optionally sent
//! down a channel for tests that consume them on another thread.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError, RwLock};

use crossbeam_channel::{Receiver, Sender};
use lumen_core::{BlockPos, LightLayer, LightWorld, SectionPos, VoxelLight};

/// One `on_light_update` call.
pub type LightUpdate = (LightLayer, SectionPos);

/// In-memory voxel world.
///
/// Every position not explicitly set reads as the fill voxel given at
/// construction ([`VoxelLight::AIR`] for [`MockWorld::new`]).
pub struct MockWorld {
    fill: VoxelLight,
    voxels: RwLock<HashMap<BlockPos, VoxelLight>>,
    unloaded: RwLock<HashSet<SectionPos>>,
    updates: Mutex<Vec<LightUpdate>>,
    notify: Option<Sender<LightUpdate>>,
}

impl MockWorld {
    /// An all-air world.
    pub fn new() -> Self {
        Self::filled(VoxelLight::AIR)
    }

    /// A world where unset positions read as `fill`.
    pub fn filled(fill: VoxelLight) -> Self {
        Self {
            fill,
            voxels: RwLock::new(HashMap::new()),
            unloaded: RwLock::new(HashSet::new()),
            updates: Mutex::new(Vec::new()),
            notify: None,
        }
    }

    /// An all-air world that also sends every light update to the returned
    /// receiver.
    pub fn with_notifications() -> (Self, Receiver<LightUpdate>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut world = Self::new();
        world.notify = Some(tx);
        (world, rx)
    }

    pub fn set_voxel(&self, pos: BlockPos, voxel: VoxelLight) {
        let mut voxels = self.voxels.write().unwrap_or_else(PoisonError::into_inner);
        if voxel == self.fill {
            voxels.remove(&pos);
        } else {
            voxels.insert(pos, voxel);
        }
    }

    pub fn set_emitter(&self, pos: BlockPos, emission: u8) {
        self.set_voxel(pos, VoxelLight::emitter(emission));
    }

    pub fn set_solid(&self, pos: BlockPos) {
        self.set_voxel(pos, VoxelLight::SOLID);
    }

    pub fn set_air(&self, pos: BlockPos) {
        self.set_voxel(pos, VoxelLight::AIR);
    }

    /// Set every position from `from` to `to` inclusive (axis-aligned box).
    pub fn fill_box(&self, from: BlockPos, to: BlockPos, voxel: VoxelLight) {
        for x in from.x.min(to.x)..=from.x.max(to.x) {
            for y in from.y.min(to.y)..=from.y.max(to.y) {
                for z in from.z.min(to.z)..=from.z.max(to.z) {
                    self.set_voxel(BlockPos::new(x, y, z), voxel);
                }
            }
        }
    }

    pub fn unload_section(&self, section: SectionPos) {
        self.unloaded
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(section);
    }

    /// Every light update recorded so far, in call order.
    pub fn light_updates(&self) -> Vec<LightUpdate> {
        self.updates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drain the recorded light updates.
    pub fn take_light_updates(&self) -> Vec<LightUpdate> {
        std::mem::take(&mut *self.updates.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Default for MockWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl LightWorld for MockWorld {
    fn voxel(&self, pos: BlockPos) -> VoxelLight {
        self.voxels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&pos)
            .copied()
            .unwrap_or(self.fill)
    }

    fn section_exists(&self, section: SectionPos) -> bool {
        !self
            .unloaded
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&section)
    }

    fn is_section_empty(&self, section: SectionPos) -> bool {
        if self.fill != VoxelLight::AIR {
            return false;
        }
        !self
            .voxels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .any(|pos| pos.section() == section)
    }

    fn on_light_update(&self, layer: LightLayer, section: SectionPos) {
        self.updates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((layer, section));
        if let Some(tx) = &self.notify {
            let _ = tx.send((layer, section));
        }
    }
}

/// Positions `start`, `start + step`, … (`len` of them) along one axis.
pub fn line(start: BlockPos, step: (i32, i32, i32), len: usize) -> Vec<BlockPos> {
    (0..len as i32)
        .map(|i| start.relative(step.0 * i, step.1 * i, step.2 * i))
        .collect()
}
