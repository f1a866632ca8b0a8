//! Benchmark scenes for the Lumen light engine.
//!
//! - [`tunnel_scene`]: solid world with a long air tunnel and one emitter
//! - [`scattered_emitters`]: deterministic emitter placement via seed
//! - [`open_scene`]: empty world with a square of data sections, for sky light

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::Arc;

use lumen_core::{BlockPos, LightWorld, SectionPos, VoxelLight, SECTION_SIZE};
use lumen_engine::{LevelLightEngine, LightConfig};
use lumen_test_utils::MockWorld;
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Mouth of the tunnel in [`tunnel_scene`]; holds the emitter.
pub const TUNNEL_MOUTH: BlockPos = BlockPos::new(0, 8, 8);

/// A solid world with an air tunnel of `len` voxels along +x from
/// [`TUNNEL_MOUTH`], lit by a 15-emitter at the mouth. Light is settled.
pub fn tunnel_scene(len: usize) -> (Arc<MockWorld>, LevelLightEngine) {
    let world = Arc::new(MockWorld::filled(VoxelLight::SOLID));
    for i in 0..len as i32 {
        world.set_air(TUNNEL_MOUTH.relative(i, 0, 0));
    }
    world.set_emitter(TUNNEL_MOUTH, 15);
    let mut engine = engine(&world, LightConfig::block_only());
    let sections = (len as i32 + SECTION_SIZE - 1) / SECTION_SIZE;
    for x in 0..sections.max(1) {
        engine.update_section_status(SectionPos::new(x, 0, 0), false);
    }
    settle(&mut engine);
    (world, engine)
}

/// `count` distinct voxel positions inside `section`, with emissions in
/// `1..=15`, drawn from a ChaCha8 stream seeded by `seed`.
pub fn scattered_emitters(section: SectionPos, count: usize, seed: u64) -> Vec<(BlockPos, u8)> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut out: Vec<(BlockPos, u8)> = Vec::with_capacity(count);
    while out.len() < count.min(4096) {
        let bits = rng.next_u32();
        let local = |shift: u32| ((bits >> shift) & 0xf) as i32;
        let pos = section.block(local(0), local(4), local(8));
        let emission = 1 + ((bits >> 12) % 15) as u8;
        if out.iter().all(|(p, _)| *p != pos) {
            out.push((pos, emission));
        }
    }
    out
}

/// An empty world with `side × side` data sections at y = 0 and nothing
/// settled yet.
pub fn open_scene(side: i32, config: LightConfig) -> (Arc<MockWorld>, LevelLightEngine) {
    let world = Arc::new(MockWorld::new());
    let mut engine = engine(&world, config);
    for x in 0..side {
        for z in 0..side {
            engine.update_section_status(SectionPos::new(x, 0, z), false);
        }
    }
    (world, engine)
}

/// Run until no light work remains.
pub fn settle(engine: &mut LevelLightEngine) {
    while engine.has_light_work() {
        engine.tick();
    }
}

fn engine(world: &Arc<MockWorld>, config: LightConfig) -> LevelLightEngine {
    let shared: Arc<dyn LightWorld> = world.clone();
    match LevelLightEngine::new(shared, &config) {
        Ok(engine) => engine,
        Err(e) => panic!("benchmark config rejected: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::LightLayer;

    #[test]
    fn emitters_are_deterministic_and_distinct() {
        let section = SectionPos::new(0, 0, 0);
        let a = scattered_emitters(section, 64, 7);
        assert_eq!(a, scattered_emitters(section, 64, 7));
        assert_ne!(a, scattered_emitters(section, 64, 8));
        for (i, (pos, emission)) in a.iter().enumerate() {
            assert_eq!(pos.section(), section);
            assert!((1..=15).contains(emission));
            assert!(a[i + 1..].iter().all(|(p, _)| p != pos));
        }
    }

    #[test]
    fn tunnel_is_lit() {
        let (_world, engine) = tunnel_scene(20);
        assert_eq!(engine.light_value(LightLayer::Block, TUNNEL_MOUTH), 15);
        assert_eq!(
            engine.light_value(LightLayer::Block, TUNNEL_MOUTH.relative(10, 0, 0)),
            5
        );
    }
}
