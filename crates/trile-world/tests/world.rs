use std::sync::Arc;

use proptest::prelude::*;
use trile_blocks::BlockRegistry;
use trile_geom::{Emplacement, Face, Vec3};
use trile_world::{World, WorldError};

const STONE: u16 = 0;
const VINE: u16 = 1;
const GLASS: u16 = 2;

fn registry() -> Arc<BlockRegistry> {
    let reg = BlockRegistry::from_toml_str(
        r#"
        [[blocks]]
        name = "stone"
        id = 0

        [[blocks]]
        name = "vine"
        id = 1
        actor = "vine"

        [[blocks]]
        name = "glass"
        id = 2
        seethrough = true
    "#,
    )
    .unwrap();
    Arc::new(reg)
}

fn world() -> World {
    World::new(Emplacement::new(8, 8, 8), registry())
}

#[test]
fn place_rejects_out_of_bounds_and_unknown_blocks() {
    let mut w = world();
    assert_eq!(
        w.place(STONE, Emplacement::new(8, 0, 0)),
        Err(WorldError::OutOfBounds(Emplacement::new(8, 0, 0)))
    );
    assert_eq!(
        w.place(99, Emplacement::new(0, 0, 0)),
        Err(WorldError::UnknownBlock(99))
    );
    assert!(w.is_empty());
}

#[test]
fn revision_advances_only_on_applied_edits() {
    let mut w = world();
    assert_eq!(w.rev(), 0);
    let id = w.place(STONE, Emplacement::new(0, 0, 0)).unwrap();
    let placed = w.rev();
    assert!(placed > 0);

    assert!(w.place(STONE, Emplacement::new(9, 0, 0)).is_err());
    assert!(w.restore(id).is_err());
    w.resize(Emplacement::new(8, 8, 8));
    assert_eq!(w.rev(), placed);

    w.set_hidden(id, true).unwrap();
    let hidden = w.rev();
    assert!(hidden > placed);
    w.remove(id).unwrap();
    assert!(w.rev() > hidden);
}

#[test]
fn overlap_requires_an_overlapable_block() {
    let mut w = world();
    let e = Emplacement::new(1, 1, 1);
    let stone = w.place(STONE, e).unwrap();
    assert_eq!(w.place(GLASS, e), Err(WorldError::CellOccupied(e)));
    let vine = w.place(VINE, e).unwrap();
    assert_eq!(w.place(VINE, e), Err(WorldError::CellFull(e)));
    let cell = w.cell(e).unwrap();
    assert_eq!(cell.primary(), stone);
    assert_eq!(cell.overlap(), Some(vine));
    assert_eq!(w.row(1).len(), 2);
}

#[test]
fn clearing_primary_promotes_overlap_and_restore_stacks_again() {
    let mut w = world();
    let e = Emplacement::new(2, 0, 3);
    let stone = w.place(STONE, e).unwrap();
    let vine = w.place(VINE, e).unwrap();
    assert_eq!(w.remove(stone), Ok(e));
    assert_eq!(w.cell(e).unwrap().primary(), vine);
    assert!(w.instance(stone).is_none());
    assert!(w.removed_instance(stone).is_some());
    assert_eq!(w.restore(stone), Ok(e));
    let ids: Vec<_> = w.instances_at(e).map(|i| i.id()).collect();
    assert_eq!(ids, vec![vine, stone]);
    assert_eq!(w.restore(stone), Err(WorldError::NotRemoved(stone)));
}

#[test]
fn destroyed_ids_go_stale() {
    let mut w = world();
    let e = Emplacement::new(0, 0, 0);
    let a = w.place(STONE, e).unwrap();
    assert_eq!(w.destroy(a), Ok(Some(e)));
    let b = w.place(STONE, e).unwrap();
    assert_eq!(a.index(), b.index());
    assert_ne!(a, b);
    assert!(w.instance(a).is_none());
    assert_eq!(w.remove(a), Err(WorldError::UnknownInstance(a)));
}

#[test]
fn set_position_tracks_cell_and_offset() {
    let mut w = world();
    let id = w.place(STONE, Emplacement::new(1, 1, 1)).unwrap();
    let (from, to) = w.set_position(id, Vec3::new(2.75, 1.5, 1.5)).unwrap();
    assert_eq!(from, Emplacement::new(1, 1, 1));
    assert_eq!(to, Emplacement::new(2, 1, 1));
    let inst = w.instance(id).unwrap();
    assert_eq!(inst.offset(), Vec3::new(0.25, 0.0, 0.0));
    assert!(inst.is_displaced());
    assert!(w.cell(to).unwrap().is_displaced());
    assert!(w.cell(from).is_none());

    w.move_to(id, Emplacement::new(2, 1, 1)).unwrap();
    assert!(!w.cell(to).unwrap().is_displaced());
    assert_eq!(
        w.set_position(id, Vec3::new(f32::NAN, 0.0, 0.0)),
        Err(WorldError::NonFinitePosition)
    );
}

#[test]
fn snapshots_are_isolated_from_later_edits() {
    let mut w = world();
    w.place(STONE, Emplacement::new(0, 0, 0)).unwrap();
    let snap = w.cells_snapshot();
    w.place(STONE, Emplacement::new(1, 0, 0)).unwrap();
    assert_eq!(snap.len(), 1);
    assert_eq!(w.cells().len(), 2);
}

#[test]
fn border_faces_and_corners() {
    let mut w = world();
    let a = Emplacement::new(3, 0, 3);
    w.place(STONE, a).unwrap();
    // Lone block: every face is exposed and it is a corner.
    assert!(Face::ALL.iter().all(|f| w.is_border_face(a, *f)));
    assert!(w.is_corner_block(a));

    w.place(STONE, a.step(Face::PosX)).unwrap();
    w.place(STONE, a.step(Face::NegX)).unwrap();
    assert!(!w.is_border_face(a, Face::PosX));
    assert!(!w.is_corner_block(a));

    // See-through neighbors never hide a face.
    let b = Emplacement::new(6, 6, 6);
    w.place(STONE, b).unwrap();
    w.place(GLASS, b.step(Face::PosZ)).unwrap();
    assert!(w.is_border_face(b, Face::PosZ));

    // Empty cells have no border faces.
    assert!(!w.is_border_face(Emplacement::new(7, 7, 7), Face::PosY));
}

#[derive(Clone, Debug)]
enum Op {
    Place(u16, (i32, i32, i32)),
    Remove(usize),
    Restore(usize),
    Destroy(usize),
    Move(usize, (i32, i32, i32)),
}

fn arb_cell() -> impl Strategy<Value = (i32, i32, i32)> {
    (0i32..4, 0i32..4, 0i32..4)
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (prop_oneof![Just(STONE), Just(VINE), Just(GLASS)], arb_cell()).prop_map(|(b, c)| Op::Place(b, c)),
        1 => any::<usize>().prop_map(Op::Remove),
        1 => any::<usize>().prop_map(Op::Restore),
        1 => any::<usize>().prop_map(Op::Destroy),
        1 => (any::<usize>(), arb_cell()).prop_map(|(i, c)| Op::Move(i, c)),
    ]
}

proptest! {
    // Cells, rows and the live count always agree with the instance slab
    #[test]
    fn grid_indices_stay_consistent(ops in proptest::collection::vec(arb_op(), 1..60)) {
        let mut w = World::new(Emplacement::new(4, 4, 4), registry());
        let mut ids = Vec::new();
        for op in ops {
            match op {
                Op::Place(b, c) => {
                    if let Ok(id) = w.place(b, c.into()) {
                        ids.push(id);
                    }
                }
                Op::Remove(i) if !ids.is_empty() => { let _ = w.remove(ids[i % ids.len()]); }
                Op::Restore(i) if !ids.is_empty() => { let _ = w.restore(ids[i % ids.len()]); }
                Op::Destroy(i) if !ids.is_empty() => { let _ = w.destroy(ids[i % ids.len()]); }
                Op::Move(i, c) if !ids.is_empty() => { let _ = w.move_to(ids[i % ids.len()], c.into()); }
                _ => {}
            }
        }
        let live: Vec<_> = w.instances().collect();
        prop_assert_eq!(live.len(), w.len());
        let in_cells: usize = w.cells().values().map(|c| c.len()).sum();
        prop_assert_eq!(in_cells, w.len());
        let in_rows: usize = w.rows_in(i32::MIN..=i32::MAX).map(|(_, r)| r.len()).sum();
        prop_assert_eq!(in_rows, w.len());
        for inst in live {
            let cell = w.cell(inst.emplacement()).unwrap();
            prop_assert!(cell.contains(inst.id()));
            prop_assert!(w.row(inst.emplacement().y).contains(&inst.id()));
        }
    }
}
