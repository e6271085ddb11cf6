use std::collections::BTreeMap;
use std::sync::Arc;

use proptest::prelude::*;
use trile_blocks::BlockRegistry;
use trile_cull::{CullMaintainer, CullSettings, CullStrategy};
use trile_geom::{Column, Emplacement, Vec3};
use trile_runtime::{CancelToken, LimitTable};
use trile_view::{CameraFrame, ViewMotion, ViewTracker, Viewpoint, blend_forward};
use trile_world::{InstanceId, World};

const STONE: u16 = 0;
const GLASS: u16 = 1;

fn registry() -> Arc<BlockRegistry> {
    let reg = BlockRegistry::from_toml_str(
        r#"
        [[blocks]]
        name = "stone"
        id = 0

        [[blocks]]
        name = "glass"
        id = 1
        seethrough = true
    "#,
    )
    .unwrap();
    Arc::new(reg)
}

fn scattered_world(seed: u32) -> World {
    let size = Emplacement::new(12, 6, 12);
    let mut w = World::new(size, registry());
    let mut s = seed.wrapping_mul(2_654_435_761).max(1);
    for x in 0..size.x {
        for y in 0..size.y {
            for z in 0..size.z {
                s ^= s << 13;
                s ^= s >> 17;
                s ^= s << 5;
                match s % 7 {
                    0 | 1 => {
                        let _ = w.place(STONE, Emplacement::new(x, y, z));
                    }
                    2 => {
                        let _ = w.place(GLASS, Emplacement::new(x, y, z));
                    }
                    _ => {}
                }
            }
        }
    }
    w
}

fn table_for(world: &World, vp: Viewpoint) -> LimitTable {
    LimitTable::build(world.cells(), vp.axes().unwrap(), world.size(), &CancelToken::new()).unwrap()
}

fn ortho(vp: Viewpoint, center: Vec3) -> CameraFrame {
    CameraFrame::orthographic(vp, center, (3.0, 2.0))
}

fn viewed(m: &CullMaintainer) -> BTreeMap<InstanceId, Column> {
    m.viewed().iter().map(|(id, e)| (id, e.column)).collect()
}

#[test]
fn single_face_keeps_the_front_block_of_each_column() {
    let mut world = World::new(Emplacement::new(3, 1, 1), registry());
    let ids: Vec<_> = (0..3)
        .map(|x| world.place(STONE, Emplacement::new(x, 0, 0)).unwrap())
        .collect();
    let table = table_for(&world, Viewpoint::Left);
    let mut m = CullMaintainer::new(CullSettings::default());
    let mut tracker = ViewTracker::new();
    let frame = ortho(Viewpoint::Left, Vec3::new(0.0, 0.5, 0.5));
    let out = m.update(&world, &table, &frame, tracker.observe(&frame));
    assert_eq!(out.strategy, CullStrategy::SingleFaceFull);
    assert_eq!(out.added, vec![ids[0]]);
    assert_eq!(out.batch_changed, vec![(ids[0], STONE)]);
    assert_eq!(m.batches().total(), 1);

    world.remove(ids[0]).unwrap();
    let table = table_for(&world, Viewpoint::Left);
    let out = m.instance_removed(&world, &table, ids[0], Emplacement::new(0, 0, 0));
    assert_eq!(out.removed, vec![ids[0]]);
    assert_eq!(out.added, vec![ids[1]]);
    assert!(m.viewed().contains(ids[1]));
    assert!(!m.viewed().contains(ids[0]));

    assert_eq!(
        m.update(&world, &table, &frame, tracker.observe(&frame)).strategy,
        CullStrategy::None
    );
}

#[test]
fn remove_then_restore_round_trips_the_registry() {
    let mut world = scattered_world(17);
    let table = table_for(&world, Viewpoint::Front);
    let mut m = CullMaintainer::new(CullSettings::default());
    let frame = ortho(Viewpoint::Front, Vec3::new(6.0, 3.0, 0.0));
    m.update(&world, &table, &frame, ViewTracker::new().observe(&frame));
    let before = viewed(&m);
    let batched_before = m.batches().total();
    let id = *before.keys().next().unwrap();
    let at = world.instance(id).unwrap().emplacement();

    world.remove(id).unwrap();
    let table = table_for(&world, Viewpoint::Front);
    m.instance_removed(&world, &table, id, at);
    assert!(!m.viewed().contains(id));

    world.restore(id).unwrap();
    let table = table_for(&world, Viewpoint::Front);
    m.instance_added(&world, &table, id);
    assert_eq!(viewed(&m), before);
    assert_eq!(m.batches().total(), batched_before);
}

#[test]
fn hidden_instances_stay_viewed_without_a_batch_slot() {
    let mut world = scattered_world(3);
    let table = table_for(&world, Viewpoint::Back);
    let mut m = CullMaintainer::new(CullSettings::default());
    let frame = ortho(Viewpoint::Back, Vec3::new(5.0, 2.0, 0.0));
    m.update(&world, &table, &frame, ViewTracker::new().observe(&frame));
    let (id, entry) = m.viewed().iter().map(|(id, e)| (id, *e)).next().unwrap();
    assert!(m.batches().contains(entry.block, id));

    world.set_hidden(id, true).unwrap();
    let out = m.instance_hidden_changed(&world, id);
    assert!(out.batch_changed.is_empty());
    assert!(m.viewed().contains(id));
    assert!(!m.batches().contains(entry.block, id));
    assert_eq!(m.batched_block(id), None);

    world.set_hidden(id, false).unwrap();
    let out = m.instance_hidden_changed(&world, id);
    assert_eq!(out.batch_changed, vec![(id, entry.block)]);
    assert_eq!(m.batched_block(id), Some(entry.block));
}

#[test]
fn degenerate_viewport_keeps_previous_bounds() {
    let world = scattered_world(5);
    let table = table_for(&world, Viewpoint::Front);
    let mut m = CullMaintainer::new(CullSettings::default());
    let mut tracker = ViewTracker::new();
    let frame = ortho(Viewpoint::Front, Vec3::new(6.0, 3.0, 0.0));
    m.update(&world, &table, &frame, tracker.observe(&frame));
    let bounds = m.cull_bounds();
    let before = viewed(&m);

    let collapsed = CameraFrame::orthographic(Viewpoint::Front, Vec3::new(6.0, 3.0, 0.0), (0.0, 0.0));
    let out = m.update(&world, &table, &collapsed, tracker.observe(&collapsed));
    assert_eq!(out.strategy, CullStrategy::SingleFacePartial);
    assert!(out.is_empty());
    assert_eq!(m.cull_bounds(), bounds);
    assert_eq!(viewed(&m), before);
}

/// 4x4 stone wall in the z = 0 plane, settled on the Front viewpoint.
fn settled_wall() -> (World, CullMaintainer) {
    let mut world = World::new(Emplacement::new(4, 4, 4), registry());
    for x in 0..4 {
        for y in 0..4 {
            world.place(STONE, Emplacement::new(x, y, 0)).unwrap();
        }
    }
    let table = table_for(&world, Viewpoint::Front);
    let mut m = CullMaintainer::new(CullSettings::default());
    let frame = ortho(Viewpoint::Front, Vec3::new(2.0, 2.0, 4.0));
    m.update(&world, &table, &frame, ViewTracker::new().observe(&frame));
    assert_eq!(m.viewed().len(), 16);
    (world, m)
}

#[test]
fn degenerate_viewport_mid_rotation_keeps_previous_rows() {
    let (world, mut m) = settled_wall();
    let table = table_for(&world, Viewpoint::Front);
    let before = m.viewed().len();

    let collapsed = CameraFrame::orthographic(Viewpoint::Right, Vec3::new(2.0, 2.0, 2.0), (0.0, 0.0))
        .with_forward(blend_forward(Viewpoint::Front, Viewpoint::Right, 0.5));
    let motion = ViewMotion::Rotating {
        from: Viewpoint::Front,
        to: Viewpoint::Right,
    };
    let out = m.update(&world, &table, &collapsed, motion);
    assert_eq!(out.strategy, CullStrategy::TwoFaceFull);
    assert!(out.removed.is_empty());
    assert_eq!(m.viewed().len(), before);
    assert_eq!(m.batches().total(), before);
}

#[test]
fn degenerate_viewport_on_a_new_viewpoint_skips_the_pass() {
    let (world, mut m) = settled_wall();
    let bounds = m.cull_bounds();
    let before = viewed(&m);

    let table = table_for(&world, Viewpoint::Right);
    let collapsed = CameraFrame::orthographic(Viewpoint::Right, Vec3::new(2.0, 2.0, 2.0), (0.0, 0.0));
    let motion = ViewMotion::ViewpointChanged {
        from: Viewpoint::Front,
        to: Viewpoint::Right,
    };
    let out = m.update(&world, &table, &collapsed, motion);
    assert_eq!(out.strategy, CullStrategy::SingleFaceFull);
    assert!(out.is_empty());
    assert_eq!(m.cull_bounds(), bounds);
    assert_eq!(viewed(&m), before);
}

#[test]
fn degenerate_viewport_without_history_leaves_registry_alone() {
    let (world, _) = settled_wall();
    let table = table_for(&world, Viewpoint::Front);
    let mut m = CullMaintainer::new(CullSettings::default());
    let collapsed = CameraFrame::orthographic(Viewpoint::Right, Vec3::new(2.0, 2.0, 2.0), (0.0, 0.0));
    let motion = ViewMotion::Rotating {
        from: Viewpoint::Front,
        to: Viewpoint::Right,
    };
    assert!(m.update(&world, &table, &collapsed, motion).is_empty());
    assert!(m.viewed().is_empty());
}

#[test]
fn orbit_skips_interior_blocks_and_no_cull_keeps_them() {
    let mut world = World::new(Emplacement::new(3, 3, 3), registry());
    let mut center = None;
    for x in 0..3 {
        for y in 0..3 {
            for z in 0..3 {
                let id = world.place(STONE, Emplacement::new(x, y, z)).unwrap();
                if (x, y, z) == (1, 1, 1) {
                    center = Some(id);
                }
            }
        }
    }
    let center = center.unwrap();
    let table = LimitTable::empty();
    let mut m = CullMaintainer::new(CullSettings::default());
    let orbit = ortho(Viewpoint::Front, Vec3::new(1.5, 1.5, 1.5)).with_forward(Vec3::new(-1.0, -1.0, -1.0));
    let out = m.update(&world, &table, &orbit, ViewMotion::Orbit);
    assert_eq!(out.strategy, CullStrategy::TriFace);
    assert!(!m.viewed().contains(center));
    // Three camera-facing faces of the cube minus the hidden core.
    assert_eq!(m.viewed().len(), 19);

    let persp = CameraFrame::perspective(Vec3::new(0.0, 0.0, -1.0), Vec3::new(1.5, 1.5, 10.0), (4.0, 4.0));
    let out = m.update(&world, &table, &persp, ViewMotion::Perspective);
    assert_eq!(out.strategy, CullStrategy::NoCull);
    assert!(m.viewed().contains(center));
    assert_eq!(m.viewed().len(), 27);
}

#[test]
fn settings_fill_missing_keys_with_defaults() {
    let s: CullSettings = toml::from_str("column_margin = 3").unwrap();
    assert_eq!(s.column_margin, 3);
    assert_eq!(s.row_margin, CullSettings::default().row_margin);
}

fn arb_center() -> impl Strategy<Value = (i32, i32)> {
    (-2i32..14, -1i32..7)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    // Panning incrementally lands on the same registry as a fresh full pass
    #[test]
    fn single_face_partial_matches_full(
        seed in 1u32..1000,
        vp_index in 0usize..4,
        pans in proptest::collection::vec(arb_center(), 1..8),
    ) {
        let world = scattered_world(seed);
        let vp = Viewpoint::ORTHOGRAPHIC[vp_index];
        let axes = vp.axes().unwrap();
        let table = table_for(&world, vp);
        let at = |(u, v): (i32, i32)| {
            let e = axes.emplacement(Column::new(u, v), 0);
            ortho(vp, e.center())
        };

        let mut incremental = CullMaintainer::new(CullSettings::default());
        let mut tracker = ViewTracker::new();
        for p in &pans {
            let f = at(*p);
            incremental.update(&world, &table, &f, tracker.observe(&f));
        }

        let last = at(*pans.last().unwrap());
        let mut full = CullMaintainer::new(CullSettings::default());
        let out = full.update(&world, &table, &last, ViewTracker::new().observe(&last));
        prop_assert_eq!(out.strategy, CullStrategy::SingleFaceFull);
        prop_assert_eq!(viewed(&incremental), viewed(&full));
        prop_assert_eq!(incremental.batches().total(), full.batches().total());
    }

    // Row-band updates during a rotation match a fresh two-face pass
    #[test]
    fn two_face_partial_matches_full(
        seed in 1u32..1000,
        heights in proptest::collection::vec(-2i32..8, 1..6),
    ) {
        let world = scattered_world(seed);
        let table = table_for(&world, Viewpoint::Front);
        let (from, to) = (Viewpoint::Front, Viewpoint::Right);
        let turning = |y: i32| {
            ortho(to, Vec3::new(6.0, y as f32 + 0.5, 6.0)).with_forward(blend_forward(from, to, 0.5))
        };

        let mut incremental = CullMaintainer::new(CullSettings::default());
        let mut tracker = ViewTracker::new();
        let settled = ortho(from, Vec3::new(6.0, 3.0, 6.0));
        incremental.update(&world, &table, &settled, tracker.observe(&settled));
        for y in &heights {
            let f = turning(*y);
            incremental.update(&world, &table, &f, tracker.observe(&f));
        }

        let last = turning(*heights.last().unwrap());
        let mut full = CullMaintainer::new(CullSettings::default());
        let out = full.update(&world, &table, &last, ViewMotion::Rotating { from, to });
        prop_assert_eq!(out.strategy, CullStrategy::TwoFaceFull);
        prop_assert_eq!(viewed(&incremental), viewed(&full));
    }
}
