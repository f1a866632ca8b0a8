//! Integration test: readers on other threads only ever see settled light.
//!
//! The writer toggles an emitter and runs every cycle to completion, so
//! each publication is a converged state. A reader thread polls snapshots
//! the whole time and checks that every one it sees is internally
//! consistent.

use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, unbounded};
use lumen_core::{BlockPos, LightLayer, LightWorld, SectionPos};
use lumen_engine::{LevelLightEngine, LightConfig};
use lumen_test_utils::MockWorld;

const EMITTER: BlockPos = BlockPos::new(8, 8, 8);

#[test]
fn reader_thread_sees_only_converged_snapshots() {
    let world = Arc::new(MockWorld::new());
    let shared: Arc<dyn LightWorld> = world.clone();
    let mut engine = LevelLightEngine::new(shared, &LightConfig::block_only()).unwrap();
    engine.update_section_status(SectionPos::new(0, 0, 0), false);
    engine.run_updates(usize::MAX);

    let reader = engine.reader();
    let (stop_tx, stop_rx) = bounded::<()>(1);
    let observer = thread::spawn(move || {
        let block = reader.layer(LightLayer::Block).cloned().expect("block layer");
        let mut seen_lit = 0usize;
        let mut seen_dark = 0usize;
        loop {
            let snapshot = block.snapshot();
            let at = snapshot.light_value(LightLayer::Block, EMITTER);
            let next = snapshot.light_value(LightLayer::Block, EMITTER.relative(3, 0, 0));
            match at {
                15 => {
                    assert_eq!(next, 12);
                    seen_lit += 1;
                }
                0 => {
                    assert_eq!(next, 0);
                    seen_dark += 1;
                }
                other => panic!("half-propagated light {other}"),
            }
            if stop_rx.try_recv().is_ok() {
                return (seen_lit, seen_dark);
            }
        }
    });

    for _ in 0..20 {
        world.set_emitter(EMITTER, 15);
        engine.on_block_emission_increase(EMITTER, 15);
        engine.run_updates(usize::MAX);
        assert_eq!(engine.light_value(LightLayer::Block, EMITTER), 15);

        world.set_air(EMITTER);
        engine.check_block(EMITTER);
        engine.run_updates(usize::MAX);
        assert_eq!(engine.light_value(LightLayer::Block, EMITTER), 0);
    }
    stop_tx.send(()).unwrap();
    let (lit, dark) = observer.join().unwrap();
    assert!(lit + dark > 0);
}

#[test]
fn held_snapshot_is_isolated_from_later_writes() {
    let world = Arc::new(MockWorld::new());
    world.set_emitter(EMITTER, 15);
    let shared: Arc<dyn LightWorld> = world.clone();
    let mut engine = LevelLightEngine::new(shared, &LightConfig::block_only()).unwrap();
    engine.update_section_status(SectionPos::new(0, 0, 0), false);
    engine.run_updates(usize::MAX);

    let reader = engine.reader();
    let held = reader.layer(LightLayer::Block).map(|r| r.snapshot()).unwrap();
    let held_layer = engine
        .data_layer_data(LightLayer::Block, SectionPos::new(0, 0, 0))
        .unwrap();

    world.set_air(EMITTER);
    engine.check_block(EMITTER);
    engine.run_updates(usize::MAX);

    assert_eq!(held.light_value(LightLayer::Block, EMITTER), 15);
    assert_eq!(held_layer.get_at(EMITTER), 15);
    assert_eq!(reader.light_value(LightLayer::Block, EMITTER), 0);
}

#[test]
fn notifications_can_be_consumed_on_another_thread() {
    let (world, rx) = MockWorld::with_notifications();
    let world = Arc::new(world);
    world.set_emitter(EMITTER, 15);
    let shared: Arc<dyn LightWorld> = world.clone();
    let mut engine = LevelLightEngine::new(shared, &LightConfig::block_only()).unwrap();

    let (done_tx, done_rx) = unbounded();
    let consumer = thread::spawn(move || {
        let mut sections = Vec::new();
        while let Ok((layer, section)) = rx.recv() {
            assert_eq!(layer, LightLayer::Block);
            sections.push(section);
            if section == SectionPos::new(0, 0, 0) {
                done_tx.send(()).unwrap();
            }
        }
        sections
    });

    engine.update_section_status(SectionPos::new(0, 0, 0), false);
    engine.run_updates(usize::MAX);
    done_rx.recv().unwrap();
    drop(engine);
    drop(world);
    let sections = consumer.join().unwrap();
    assert!(sections.contains(&SectionPos::new(0, 0, 0)));
}
