//! Integration test: block light propagation through edited geometry.
//!
//! Most scenarios use a solid world with a one-voxel air tunnel along +x,
//! so light values along the tunnel are easy to predict: `15 - distance`
//! from the emitter, minus any extra attenuation in the way.

use std::sync::Arc;

use lumen_core::{BlockPos, Direction, FaceMask, LightWorld, SectionPos, VoxelLight};
use lumen_engine::{BlockRules, LightConfig, LightEngine};
use lumen_test_utils::{line, MockWorld};

// ── Helpers ──────────────────────────────────────────────────────

const TUNNEL_LEN: usize = 20;

fn tunnel() -> Vec<BlockPos> {
    line(BlockPos::new(0, 8, 8), (1, 0, 0), TUNNEL_LEN)
}

/// Solid world, air tunnel, 15-emitter at the tunnel mouth, two data
/// sections.
fn tunnel_world() -> (Arc<MockWorld>, LightEngine<BlockRules>) {
    let world = Arc::new(MockWorld::filled(VoxelLight::SOLID));
    for pos in tunnel() {
        world.set_air(pos);
    }
    world.set_emitter(BlockPos::new(0, 8, 8), 15);
    let shared: Arc<dyn LightWorld> = world.clone();
    let mut engine = LightEngine::new(BlockRules, shared, &LightConfig::block_only()).unwrap();
    engine.update_section_status(SectionPos::new(0, 0, 0), false);
    engine.update_section_status(SectionPos::new(1, 0, 0), false);
    settle(&mut engine);
    (world, engine)
}

fn settle(engine: &mut LightEngine<BlockRules>) {
    engine.run_light_updates(usize::MAX);
    assert!(!engine.has_light_work());
}

fn tunnel_light(engine: &LightEngine<BlockRules>) -> Vec<u8> {
    tunnel().into_iter().map(|pos| engine.light_value(pos)).collect()
}

fn fading_from(start: usize, light: u8) -> Vec<u8> {
    (0..TUNNEL_LEN)
        .map(|i| {
            if i < start {
                0
            } else {
                light.saturating_sub((i - start) as u8)
            }
        })
        .collect()
}

// ── Scenarios ────────────────────────────────────────────────────

#[test]
fn chain_fades_one_level_per_voxel() {
    let (_world, engine) = tunnel_world();
    assert_eq!(tunnel_light(&engine), fading_from(0, 15));
    // Solid voxels next to the tunnel stay dark.
    assert_eq!(engine.light_value(BlockPos::new(1, 9, 8)), 0);
    assert_eq!(engine.light_value(BlockPos::new(1, 8, 7)), 0);
}

#[test]
fn removing_the_source_darkens_the_whole_chain() {
    let (world, mut engine) = tunnel_world();
    let source = BlockPos::new(0, 8, 8);
    world.set_air(source);
    engine.check_block(source);
    settle(&mut engine);
    assert!(tunnel_light(&engine).iter().all(|&light| light == 0));
}

#[test]
fn relighting_restores_the_original_values() {
    let (world, mut engine) = tunnel_world();
    let source = BlockPos::new(0, 8, 8);
    let before = tunnel_light(&engine);
    world.set_air(source);
    engine.check_block(source);
    settle(&mut engine);
    world.set_emitter(source, 15);
    engine.on_block_emission_increase(source, 15);
    settle(&mut engine);
    assert_eq!(tunnel_light(&engine), before);
}

#[test]
fn dimming_an_emitter_is_picked_up_by_check_block() {
    let (world, mut engine) = tunnel_world();
    let source = BlockPos::new(0, 8, 8);
    world.set_emitter(source, 9);
    engine.check_block(source);
    settle(&mut engine);
    assert_eq!(tunnel_light(&engine), fading_from(0, 9));
}

#[test]
fn occluder_cuts_the_chain_and_removal_heals_it() {
    let (world, mut engine) = tunnel_world();
    let wall = BlockPos::new(5, 8, 8);
    world.set_solid(wall);
    engine.check_block(wall);
    settle(&mut engine);
    let mut expected = fading_from(0, 15);
    for light in &mut expected[5..] {
        *light = 0;
    }
    assert_eq!(tunnel_light(&engine), expected);

    world.set_air(wall);
    engine.check_block(wall);
    settle(&mut engine);
    assert_eq!(tunnel_light(&engine), fading_from(0, 15));
}

#[test]
fn second_source_beyond_the_first_wins_where_brighter() {
    let (world, mut engine) = tunnel_world();
    let second = BlockPos::new(12, 8, 8);
    world.set_emitter(second, 10);
    engine.on_block_emission_increase(second, 10);
    settle(&mut engine);
    let light = tunnel_light(&engine);
    assert_eq!(light[6], 9);
    assert_eq!(light[8], 7);
    assert_eq!(light[10], 8);
    assert_eq!(light[12], 10);
    assert_eq!(light[19], 3);
}

#[test]
fn translucent_voxel_costs_its_opacity() {
    let (world, mut engine) = tunnel_world();
    let glass = BlockPos::new(3, 8, 8);
    world.set_voxel(glass, VoxelLight::translucent(3));
    engine.check_block(glass);
    settle(&mut engine);
    let light = tunnel_light(&engine);
    assert_eq!(light[2], 13);
    assert_eq!(light[3], 10);
    assert_eq!(light[4], 9);
    assert_eq!(light[12], 1);
    assert_eq!(light[13], 0);
}

#[test]
fn covered_face_blocks_light_in_one_direction() {
    let (world, mut engine) = tunnel_world();
    let slab = BlockPos::new(3, 8, 8);
    world.set_voxel(
        slab,
        VoxelLight {
            faces: FaceMask::of(Direction::East),
            ..VoxelLight::AIR
        },
    );
    engine.check_block(slab);
    settle(&mut engine);
    let light = tunnel_light(&engine);
    assert_eq!(light[3], 12);
    assert!(light[4..].iter().all(|&l| l == 0));
}

#[test]
fn light_crosses_section_borders() {
    let (_world, engine) = tunnel_world();
    // x = 15 is the last voxel of section 0; x = 16 the first of section 1.
    assert_eq!(engine.light_value(BlockPos::new(14, 8, 8)), 1);
    let world = Arc::new(MockWorld::new());
    world.set_emitter(BlockPos::new(15, 8, 8), 15);
    let shared: Arc<dyn LightWorld> = world.clone();
    let mut open = LightEngine::new(BlockRules, shared, &LightConfig::block_only()).unwrap();
    open.update_section_status(SectionPos::new(0, 0, 0), false);
    settle(&mut open);
    assert_eq!(open.light_value(BlockPos::new(16, 8, 8)), 14);
    assert_eq!(open.light_value(BlockPos::new(20, 8, 8)), 10);
}

// ── Properties ───────────────────────────────────────────────────

#[cfg(not(miri))]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Open-air light from scratch: the best of `emission - distance`.
    fn expected(emitters: &[(BlockPos, u8)], pos: BlockPos) -> u8 {
        emitters
            .iter()
            .map(|(e, emission)| {
                let distance = (e.x - pos.x).abs() + (e.y - pos.y).abs() + (e.z - pos.z).abs();
                i32::from(*emission).saturating_sub(distance).max(0) as u8
            })
            .max()
            .unwrap_or(0)
    }

    fn local() -> impl Strategy<Value = BlockPos> {
        (0i32..16, 0i32..16, 0i32..16).prop_map(|(x, y, z)| BlockPos::new(x, y, z))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(12))]

        #[test]
        fn incremental_edits_match_a_fresh_computation(
            edits in prop::collection::vec((local(), 0u8..16), 1..8),
            budget in 1usize..400,
        ) {
            let world = Arc::new(MockWorld::new());
            let shared: Arc<dyn LightWorld> = world.clone();
            let mut engine =
                LightEngine::new(BlockRules, shared, &LightConfig::block_only()).unwrap();
            engine.update_section_status(SectionPos::new(0, 0, 0), false);

            let mut emitters: Vec<(BlockPos, u8)> = Vec::new();
            for (pos, emission) in edits {
                emitters.retain(|(e, _)| *e != pos);
                if emission == 0 {
                    world.set_air(pos);
                } else {
                    world.set_emitter(pos, emission);
                    emitters.push((pos, emission));
                }
                engine.check_block(pos);
                while engine.has_light_work() {
                    let left = engine.run_light_updates(budget);
                    prop_assert!(left <= budget);
                }
            }

            let section = SectionPos::new(0, 0, 0);
            for y in 0..16 {
                for z in 0..16 {
                    for x in 0..16 {
                        let pos = section.block(x, y, z);
                        prop_assert_eq!(engine.light_value(pos), expected(&emitters, pos), "{}", pos);
                    }
                }
            }
        }
    }
}
