use hashbrown::{HashMap, HashSet};
use rayon::prelude::*;
use trile_blocks::BlockId;
use trile_geom::{Column, ColumnRect, Emplacement, Face, Vec3};
use trile_query::QueryEngine;
use trile_runtime::LimitTable;
use trile_view::{CameraFrame, ViewAxes, ViewMotion, Viewpoint};
use trile_world::{Instance, InstanceId, World};

use crate::batch::BatchSet;
use crate::settings::CullSettings;
use crate::viewed::{ViewedEntry, ViewedRegistry};
use crate::{CullOutcome, CullStrategy};

const FACE_EPS: f32 = 1.0e-3;

type Band = (i32, i32);

/// What the registry currently reflects.
#[derive(Clone, Debug, PartialEq)]
enum Mode {
    Idle,
    SingleFace { axes: ViewAxes, rect: ColumnRect },
    TwoFace { from: Viewpoint, to: Viewpoint, band: Band },
    TriFace { faces: Vec<Face>, band: Band },
    NoCull { band: Band },
}

fn band_of(frame: &CameraFrame, margin: f32) -> Band {
    let r = frame.vertical_band(margin);
    (*r.start(), *r.end())
}

/// Rows within `height` of the camera's center.
fn band_around(frame: &CameraFrame, height: f32) -> Band {
    let y = frame.center.y;
    if !y.is_finite() || !height.is_finite() {
        return (1, 0);
    }
    ((y - height).floor() as i32, (y + height).floor() as i32)
}

fn in_band(band: Band, y: i32) -> bool {
    y >= band.0 && y <= band.1
}

/// Column an instance is registered under. Free modes key by the settled
/// viewpoint when there is one.
fn key_column(axes: Option<&ViewAxes>, e: Emplacement) -> Column {
    match axes {
        Some(a) => a.column(e),
        None => Column::new(e.x, e.y),
    }
}

/// Faces whose outward normal points back at a camera looking along `forward`.
fn faces_toward(forward: Vec3) -> Vec<Face> {
    Face::ALL
        .into_iter()
        .filter(|f| f.normal().dot(-forward) > FACE_EPS)
        .collect()
}

fn shows_border(world: &World, inst: &Instance, faces: &[Face]) -> bool {
    inst.is_enabled()
        && (inst.skips_culling()
            || faces
                .iter()
                .any(|f| world.is_border_face(inst.emplacement(), *f)))
}

/// Keeps the viewed registry and block batches in step with the camera and
/// with single-instance edits.
pub struct CullMaintainer {
    settings: CullSettings,
    viewed: ViewedRegistry,
    batches: BatchSet,
    mode: Mode,
    key_axes: Option<ViewAxes>,
    strategy: CullStrategy,
    /// Last usable viewport, with the axes its columns are keyed by.
    last_rect: Option<(ViewAxes, ColumnRect)>,
    /// Last usable vertical band, whatever strategy produced it.
    last_band: Option<Band>,
    dirty: bool,
}

impl CullMaintainer {
    pub fn new(settings: CullSettings) -> Self {
        Self {
            settings,
            viewed: ViewedRegistry::default(),
            batches: BatchSet::default(),
            mode: Mode::Idle,
            key_axes: None,
            strategy: CullStrategy::None,
            last_rect: None,
            last_band: None,
            dirty: false,
        }
    }

    pub fn settings(&self) -> &CullSettings {
        &self.settings
    }

    pub fn viewed(&self) -> &ViewedRegistry {
        &self.viewed
    }

    pub fn batches(&self) -> &BatchSet {
        &self.batches
    }

    /// Strategy used by the last frame that did work.
    pub fn strategy(&self) -> CullStrategy {
        self.strategy
    }

    /// Columns materialized by the single-face strategies.
    pub fn cull_bounds(&self) -> Option<ColumnRect> {
        match &self.mode {
            Mode::SingleFace { rect, .. } => Some(*rect),
            _ => None,
        }
    }

    /// Force the next frame through a full strategy.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    fn choose(&self, frame: &CameraFrame, motion: ViewMotion) -> CullStrategy {
        let dirty = self.dirty;
        match motion {
            ViewMotion::Still if !dirty => CullStrategy::None,
            ViewMotion::Still => match &self.mode {
                Mode::SingleFace { .. } => CullStrategy::SingleFaceFull,
                Mode::TwoFace { .. } => CullStrategy::TwoFaceFull,
                Mode::TriFace { .. } => CullStrategy::TriFace,
                Mode::NoCull { .. } => CullStrategy::NoCull,
                Mode::Idle if frame.is_orthographic() => CullStrategy::SingleFaceFull,
                Mode::Idle => CullStrategy::NoCull,
            },
            ViewMotion::Pan => match &self.mode {
                Mode::SingleFace { axes, .. }
                    if !dirty && frame.viewpoint.axes().as_ref() == Some(axes) =>
                {
                    CullStrategy::SingleFacePartial
                }
                _ => CullStrategy::SingleFaceFull,
            },
            ViewMotion::ViewpointChanged { .. } => CullStrategy::SingleFaceFull,
            ViewMotion::Rotating { from, to } => match &self.mode {
                Mode::TwoFace { from: f, to: t, .. } if !dirty && *f == from && *t == to => {
                    CullStrategy::TwoFacePartial
                }
                _ => CullStrategy::TwoFaceFull,
            },
            ViewMotion::Orbit => CullStrategy::TriFace,
            ViewMotion::Perspective => CullStrategy::NoCull,
        }
    }

    /// Per-frame entry point.
    pub fn update(
        &mut self,
        world: &World,
        table: &LimitTable,
        frame: &CameraFrame,
        motion: ViewMotion,
    ) -> CullOutcome {
        let mut strategy = self.choose(frame, motion);
        let mut out = CullOutcome::new(strategy);
        if strategy == CullStrategy::None {
            return out;
        }
        if strategy.is_single_face() && frame.viewpoint.axes().is_none() {
            strategy = CullStrategy::NoCull;
            out.strategy = strategy;
        }
        if strategy != self.strategy {
            log::debug!(target: "cull", "strategy {:?} -> {:?}", self.strategy, strategy);
        }
        if let Some(axes) = frame.viewpoint.axes() {
            self.key_axes = Some(axes);
        }
        let ran = match strategy {
            CullStrategy::None => true,
            CullStrategy::SingleFaceFull | CullStrategy::SingleFacePartial => {
                self.single_face(world, table, frame, strategy, &mut out)
            }
            CullStrategy::TwoFaceFull | CullStrategy::TwoFacePartial => {
                let (from, to) = match (motion, &self.mode) {
                    (ViewMotion::Rotating { from, to }, _) => (from, to),
                    (_, Mode::TwoFace { from, to, .. }) => (*from, *to),
                    _ => (frame.viewpoint, frame.viewpoint),
                };
                self.two_face(world, frame, from, to, strategy, &mut out)
            }
            CullStrategy::TriFace => self.tri_face(world, frame, &mut out),
            CullStrategy::NoCull => self.no_cull(world, frame, &mut out),
        };
        self.strategy = strategy;
        // A skipped pass leaves the registry as it was, so a pending full
        // pass is still owed.
        if ran {
            self.dirty = false;
        }
        out
    }

    /// `band`, or the last usable band when the frame gives none.
    fn usable_band(&mut self, frame: &CameraFrame, band: Band) -> Option<Band> {
        if band.0 <= band.1 {
            self.last_band = Some(band);
            return Some(band);
        }
        match self.last_band {
            Some(prev) => {
                log::warn!(target: "cull", "degenerate viewport {:?}; keeping rows {:?}", frame.half_extent, prev);
                Some(prev)
            }
            None => {
                log::warn!(target: "cull", "degenerate viewport {:?} with no previous rows", frame.half_extent);
                None
            }
        }
    }

    // --- strategies ---

    fn single_face(
        &mut self,
        world: &World,
        table: &LimitTable,
        frame: &CameraFrame,
        strategy: CullStrategy,
        out: &mut CullOutcome,
    ) -> bool {
        let Some(axes) = frame.viewpoint.axes() else {
            return false;
        };
        let mut rect = frame.visible_columns(&axes, self.settings.column_margin);
        if rect.is_empty() {
            match self.last_rect {
                Some((prev_axes, prev)) if prev_axes == axes => {
                    log::warn!(target: "cull", "degenerate viewport {:?}; keeping {:?}", frame.half_extent, prev);
                    rect = prev;
                }
                Some((prev_axes, _)) => {
                    log::warn!(
                        target: "cull",
                        "degenerate viewport {:?}; previous bounds are {:?} columns, skipping",
                        frame.half_extent,
                        prev_axes.viewpoint
                    );
                    return false;
                }
                None => {
                    log::warn!(target: "cull", "degenerate viewport {:?} with no previous bounds", frame.half_extent);
                    return false;
                }
            }
        }
        self.last_rect = Some((axes, rect));
        self.last_band = Some((rect.min.v, rect.max.v));
        let size = world.size();
        let bounds = ColumnRect::new(
            Column::new(0, 0),
            Column::new(size.axis(axes.side) - 1, size.y - 1),
        );
        let rect = rect.intersect(&bounds);
        let engine = QueryEngine::new(world, table, frame.viewpoint);

        if let (CullStrategy::SingleFacePartial, Mode::SingleFace { rect: old, .. }) =
            (strategy, &self.mode)
        {
            let old = *old;
            let leaving: Vec<Column> = old.difference(&rect).collect();
            for column in leaving {
                let ids = self.viewed.column(column).to_vec();
                for id in ids {
                    self.unregister(id, out);
                }
            }
            for column in rect.difference(&old) {
                for id in engine.column_visibility(column) {
                    self.register(world, id, column, out);
                }
            }
            log::trace!(target: "cull", "single-face partial {:?} -> {:?}", old, rect);
        } else {
            let mut target = HashMap::new();
            for column in rect.iter() {
                for id in engine.column_visibility(column) {
                    target.insert(id, column);
                }
            }
            self.reconcile(world, target, out);
        }
        self.mode = Mode::SingleFace { axes, rect };
        true
    }

    fn two_face(
        &mut self,
        world: &World,
        frame: &CameraFrame,
        from: Viewpoint,
        to: Viewpoint,
        strategy: CullStrategy,
        out: &mut CullOutcome,
    ) -> bool {
        let faces: Vec<Face> = [from.facing_face(), to.facing_face()]
            .into_iter()
            .flatten()
            .collect();
        let Some(band) = self.usable_band(frame, band_of(frame, self.settings.row_margin as f32)) else {
            return false;
        };
        let keep = |inst: &Instance| shows_border(world, inst, &faces);

        match (&self.mode, strategy) {
            (Mode::TwoFace { band: old, .. }, CullStrategy::TwoFacePartial) => {
                let old = *old;
                for y in old.0..=old.1 {
                    if in_band(band, y) {
                        continue;
                    }
                    for id in world.row(y) {
                        self.unregister(*id, out);
                    }
                }
                for y in band.0..=band.1 {
                    if in_band(old, y) {
                        continue;
                    }
                    for id in world.row(y) {
                        if let Some(inst) = world.instance(*id) {
                            if keep(inst) {
                                let column = key_column(self.key_axes.as_ref(), inst.emplacement());
                                self.register(world, *id, column, out);
                            }
                        }
                    }
                }
            }
            _ => {
                let mut target = HashMap::new();
                for (_, ids) in world.rows_in(band.0..=band.1) {
                    for inst in ids.iter().filter_map(|id| world.instance(*id)) {
                        if keep(inst) {
                            let column = key_column(self.key_axes.as_ref(), inst.emplacement());
                            target.insert(inst.id(), column);
                        }
                    }
                }
                self.reconcile(world, target, out);
            }
        }
        self.mode = Mode::TwoFace { from, to, band };
        true
    }

    fn tri_face(&mut self, world: &World, frame: &CameraFrame, out: &mut CullOutcome) -> bool {
        let faces = faces_toward(frame.forward);
        let Some(band) = self.usable_band(frame, band_around(frame, self.settings.tri_face_height)) else {
            return false;
        };
        let axes = self.key_axes;
        let target: HashMap<InstanceId, Column> = world
            .slots()
            .par_iter()
            .filter_map(|s| s.live())
            .filter(|inst| in_band(band, inst.emplacement().y))
            .filter(|inst| shows_border(world, inst, &faces))
            .map(|inst| (inst.id(), key_column(axes.as_ref(), inst.emplacement())))
            .collect::<Vec<_>>()
            .into_iter()
            .collect();
        self.reconcile(world, target, out);
        self.mode = Mode::TriFace { faces, band };
        true
    }

    fn no_cull(&mut self, world: &World, frame: &CameraFrame, out: &mut CullOutcome) -> bool {
        let Some(band) = self.usable_band(frame, band_around(frame, self.settings.no_cull_height)) else {
            return false;
        };
        let ids: Vec<InstanceId> = world
            .rows_in(band.0..=band.1)
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect();
        let axes = self.key_axes;
        let target: HashMap<InstanceId, Column> = ids
            .par_iter()
            .filter_map(|id| world.instance(*id))
            .filter(|inst| inst.is_enabled())
            .map(|inst| (inst.id(), key_column(axes.as_ref(), inst.emplacement())))
            .collect::<Vec<_>>()
            .into_iter()
            .collect();
        self.reconcile(world, target, out);
        self.mode = Mode::NoCull { band };
        true
    }

    // --- registry plumbing ---

    fn reconcile(&mut self, world: &World, target: HashMap<InstanceId, Column>, out: &mut CullOutcome) {
        let stale: Vec<InstanceId> = self
            .viewed
            .ids()
            .filter(|id| !target.contains_key(id))
            .collect();
        for id in stale {
            self.unregister(id, out);
        }
        for (id, column) in target {
            if self.viewed.contains(id) {
                self.viewed.rekey(id, column);
            } else {
                self.register(world, id, column, out);
            }
        }
    }

    fn register(&mut self, world: &World, id: InstanceId, column: Column, out: &mut CullOutcome) {
        let Some(inst) = world.instance(id) else {
            return;
        };
        let block = inst.block();
        let batched = !inst.is_hidden();
        let entry = ViewedEntry {
            column,
            block,
            batched,
        };
        if !self.viewed.insert(id, entry) {
            return;
        }
        out.added.push(id);
        if batched && self.batches.insert(block, id) {
            out.batch_changed.push((id, block));
        }
    }

    fn unregister(&mut self, id: InstanceId, out: &mut CullOutcome) {
        let Some(entry) = self.viewed.remove(id) else {
            return;
        };
        if entry.batched {
            self.batches.remove(entry.block, id);
        }
        out.removed.push(id);
    }

    /// Column key when the current free-mode strategy keeps this instance.
    fn wants(&self, world: &World, inst: &Instance) -> Option<Column> {
        let e = inst.emplacement();
        match &self.mode {
            // Single-face edits are handled per column.
            Mode::Idle | Mode::SingleFace { .. } => None,
            Mode::TwoFace { from, to, band } => {
                let faces: Vec<Face> = [from.facing_face(), to.facing_face()]
                    .into_iter()
                    .flatten()
                    .collect();
                (in_band(*band, e.y) && shows_border(world, inst, &faces))
                    .then(|| key_column(self.key_axes.as_ref(), e))
            }
            Mode::TriFace { faces, band } => (in_band(*band, e.y) && shows_border(world, inst, faces))
                .then(|| key_column(self.key_axes.as_ref(), e)),
            Mode::NoCull { band } => (in_band(*band, e.y) && inst.is_enabled())
                .then(|| key_column(self.key_axes.as_ref(), e)),
        }
    }

    /// Re-evaluate everything an edit at `e` can affect: its screen column in
    /// single-face mode, otherwise the cell and its six neighbors.
    fn refresh_around(&mut self, world: &World, table: &LimitTable, e: Emplacement, out: &mut CullOutcome) {
        if let Mode::SingleFace { axes, rect } = &self.mode {
            let (axes, rect) = (*axes, *rect);
            let column = axes.column(e);
            if !rect.contains(column) {
                return;
            }
            let keep: HashSet<InstanceId> = QueryEngine::new(world, table, axes.viewpoint)
                .column_visibility(column)
                .into_iter()
                .collect();
            let registered = self.viewed.column(column).to_vec();
            for id in registered {
                if !keep.contains(&id) {
                    self.unregister(id, out);
                }
            }
            for id in keep {
                self.register(world, id, column, out);
            }
            return;
        }
        let cells = std::iter::once(e).chain(Face::ALL.into_iter().map(|f| e.step(f)));
        let ids: Vec<InstanceId> = cells
            .flat_map(|c| world.instances_at(c).map(Instance::id).collect::<Vec<_>>())
            .collect();
        for id in ids {
            let Some(inst) = world.instance(id) else {
                continue;
            };
            match self.wants(world, inst) {
                Some(column) if self.viewed.contains(id) => self.viewed.rekey(id, column),
                Some(column) => self.register(world, id, column, out),
                None => self.unregister(id, out),
            }
        }
    }

    // --- single-instance hooks ---

    /// A new or restored instance appeared on the grid.
    pub fn instance_added(&mut self, world: &World, table: &LimitTable, id: InstanceId) -> CullOutcome {
        let mut out = CullOutcome::new(self.strategy);
        if let Some(e) = world.instance(id).map(Instance::emplacement) {
            self.refresh_around(world, table, e, &mut out);
        }
        out
    }

    /// An instance left the grid from `at`, whether removed or destroyed.
    pub fn instance_removed(
        &mut self,
        world: &World,
        table: &LimitTable,
        id: InstanceId,
        at: Emplacement,
    ) -> CullOutcome {
        let mut out = CullOutcome::new(self.strategy);
        self.unregister(id, &mut out);
        self.refresh_around(world, table, at, &mut out);
        out
    }

    pub fn instance_moved(
        &mut self,
        world: &World,
        table: &LimitTable,
        id: InstanceId,
        from: Emplacement,
    ) -> CullOutcome {
        let mut out = CullOutcome::new(self.strategy);
        self.unregister(id, &mut out);
        self.refresh_around(world, table, from, &mut out);
        if let Some(to) = world.instance(id).map(Instance::emplacement) {
            self.refresh_around(world, table, to, &mut out);
        }
        out
    }

    /// Re-evaluate one instance in place, e.g. after it was enabled or disabled.
    pub fn instance_changed(&mut self, world: &World, table: &LimitTable, id: InstanceId) -> CullOutcome {
        self.instance_added(world, table, id)
    }

    /// Hidden instances stay registered but give up their batch slot.
    pub fn instance_hidden_changed(&mut self, world: &World, id: InstanceId) -> CullOutcome {
        let mut out = CullOutcome::new(self.strategy);
        let (Some(inst), Some(entry)) = (world.instance(id), self.viewed.get(id).copied()) else {
            return out;
        };
        let want = !inst.is_hidden();
        if want == entry.batched {
            return out;
        }
        if want {
            if self.batches.insert(entry.block, id) {
                out.batch_changed.push((id, entry.block));
            }
        } else {
            self.batches.remove(entry.block, id);
        }
        self.viewed.set_batched(id, want);
        log::trace!(target: "cull", "{} batched={}", id, want);
        out
    }

    /// Batched block of a viewed instance.
    pub fn batched_block(&self, id: InstanceId) -> Option<BlockId> {
        self.viewed.get(id).filter(|e| e.batched).map(|e| e.block)
    }
}
