use std::cmp::Ordering;

use trile_blocks::Classification;
use trile_geom::{Axis, Column, Emplacement, Vec3};
use trile_runtime::{Limit, LimitTable, compute_column};
use trile_view::{ViewAxes, Viewpoint};
use trile_world::{Instance, InstanceId, World};

use crate::{NearestTriles, QueryOptions};

/// One column taking part in a query, with the raw depth range to scan.
#[derive(Clone, Copy, Debug)]
struct ScanColumn {
    column: Column,
    lo: i32,
    hi: i32,
}

#[derive(Clone, Copy, Debug)]
struct Candidate {
    id: InstanceId,
    depth: f32,
    class: Classification,
}

/// Read-only resolver over a world and a limit table for one viewpoint.
///
/// The table may be stale or built for a different viewpoint; lookups only
/// trust it when its axes and size match, and otherwise scan the full depth.
pub struct QueryEngine<'a> {
    world: &'a World,
    table: &'a LimitTable,
    axes: Option<ViewAxes>,
    trusted: bool,
}

impl<'a> QueryEngine<'a> {
    pub fn new(world: &'a World, table: &'a LimitTable, viewpoint: Viewpoint) -> Self {
        let axes = viewpoint.axes();
        let trusted = axes
            .as_ref()
            .is_some_and(|a| table.matches(a, world.size()));
        Self {
            world,
            table,
            axes,
            trusted,
        }
    }

    pub fn axes(&self) -> Option<ViewAxes> {
        self.axes
    }

    /// Whether lookups use the cached limits.
    pub fn uses_limits(&self) -> bool {
        self.trusted
    }

    fn depth_len(&self, axes: &ViewAxes) -> i32 {
        self.world.size().axis(axes.depth)
    }

    fn in_screen(&self, axes: &ViewAxes, column: Column) -> bool {
        let size = self.world.size();
        column.u >= 0 && column.v >= 0 && column.u < size.axis(axes.side) && column.v < size.y
    }

    fn limit(&self, axes: &ViewAxes, column: Column) -> Option<Limit> {
        if self.trusted {
            self.table.get(column)
        } else {
            compute_column(self.world.cells(), axes, self.world.size(), column)
        }
    }

    /// Columns the point may straddle: the base column, then the neighbors on
    /// the sides of the cell the point leans toward.
    fn scan_columns(&self, axes: &ViewAxes, position: Vec3, simple: bool) -> Vec<ScanColumn> {
        let base = axes.column_at(position);
        let mut columns = vec![base];
        if !simple {
            let (u, v) = axes.screen(position);
            let du = if u - u.floor() < 0.5 { -1 } else { 1 };
            let dv = if v - v.floor() < 0.5 { -1 } else { 1 };
            columns.extend([base.offset(du, 0), base.offset(0, dv), base.offset(du, dv)]);
        }
        let full = (0, self.depth_len(axes) - 1);
        let mut out = Vec::with_capacity(columns.len());
        for (i, column) in columns.into_iter().enumerate() {
            if !self.in_screen(axes, column) {
                continue;
            }
            let (lo, hi) = if self.trusted {
                match self.table.get(column) {
                    // Grid-aligned neighbors cannot cover the point.
                    Some(l) if i > 0 && !l.displaced => continue,
                    Some(l) => (l.start, l.end),
                    None => full,
                }
            } else {
                full
            };
            out.push(ScanColumn { column, lo, hi });
        }
        out
    }

    /// Nearest surface and deep instances covering `position` on screen.
    ///
    /// The depth coordinate of `position` is ignored. Out-of-range positions
    /// and the perspective viewpoint resolve to nothing.
    pub fn nearest_trile(&self, position: Vec3, options: QueryOptions) -> NearestTriles {
        let Some(axes) = self.axes else {
            return NearestTriles::default();
        };
        if !position.is_finite() || !self.in_screen(&axes, axes.column_at(position)) {
            return NearestTriles::default();
        }
        let columns = self.scan_columns(&axes, position, options.simple);
        let Some(lo) = columns.iter().map(|c| c.lo).min() else {
            return NearestTriles::default();
        };
        let hi = columns.iter().map(|c| c.hi).max().unwrap_or(lo);
        let (su, sv) = axes.screen(position);
        let walk = if options.background {
            axes.far_to_near(lo, hi)
        } else {
            axes.near_to_far(lo, hi)
        };

        let mut out = NearestTriles::default();
        let mut batch: Vec<Candidate> = Vec::with_capacity(4);
        for d in walk {
            batch.clear();
            for sc in columns.iter().filter(|c| d >= c.lo && d <= c.hi) {
                let e = axes.emplacement(sc.column, d);
                for inst in self.world.instances_at(e) {
                    if !inst.is_enabled() || inst.classification() == Classification::Immaterial {
                        continue;
                    }
                    if !inst.bounds().contains_on(axes.side, su, Axis::Y, sv) {
                        continue;
                    }
                    batch.push(Candidate {
                        id: inst.id(),
                        depth: axes.view_depth(inst.position()),
                        class: inst.classification(),
                    });
                }
            }
            if batch.is_empty() {
                continue;
            }
            // Stable: equal depths keep base column and primary first.
            if options.background {
                batch.sort_by(|a, b| b.depth.partial_cmp(&a.depth).unwrap_or(Ordering::Equal));
            } else {
                batch.sort_by(|a, b| a.depth.partial_cmp(&b.depth).unwrap_or(Ordering::Equal));
            }
            for c in &batch {
                if out.surface.is_none() && c.class.is_surface() {
                    out.surface = Some(c.id);
                }
                if c.class.is_opaque() {
                    out.deep = Some(c.id);
                    return out;
                }
            }
        }
        out
    }

    /// Query the center of a column, without straddling.
    pub fn nearest_trile_in(&self, column: Column, background: bool) -> NearestTriles {
        let Some(axes) = self.axes else {
            return NearestTriles::default();
        };
        let p = axes.emplacement(column, 0).center();
        self.nearest_trile(
            p,
            QueryOptions {
                background,
                simple: true,
            },
        )
    }

    /// Enabled instance whose true bounds contain `position`.
    ///
    /// The containing cell is checked first, then the neighbors the point
    /// leans toward when they hold displaced instances.
    pub fn actual_instance_at(&self, position: Vec3) -> Option<&'a Instance> {
        if !position.is_finite() {
            return None;
        }
        let e = Emplacement::containing(position);
        if !self.world.contains(e) {
            return None;
        }
        let world = self.world;
        let hit = |cell: Emplacement| {
            world
                .instances_at(cell)
                .find(|i| i.is_enabled() && i.bounds().contains(position))
        };
        if let Some(inst) = hit(e) {
            return Some(inst);
        }
        let lean = |v: f32| if v - v.floor() < 0.5 { -1 } else { 1 };
        let (sx, sy, sz) = (lean(position.x), lean(position.y), lean(position.z));
        for dx in [0, sx] {
            for dy in [0, sy] {
                for dz in [0, sz] {
                    if (dx, dy, dz) == (0, 0, 0) {
                        continue;
                    }
                    let n = e.offset(dx, dy, dz);
                    if world.cell(n).is_some_and(|c| c.is_displaced()) {
                        if let Some(inst) = hit(n) {
                            return Some(inst);
                        }
                    }
                }
            }
        }
        None
    }

    /// Instances a renderer must keep for one column, nearest first.
    ///
    /// Stops after the first grid-aligned occluder unless the column holds a
    /// displaced instance, in which case every enabled instance is kept.
    pub fn column_visibility(&self, column: Column) -> Vec<InstanceId> {
        let Some(axes) = self.axes else {
            return Vec::new();
        };
        let Some(limit) = self.limit(&axes, column) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for d in axes.near_to_far(limit.start, limit.end) {
            let e = axes.emplacement(column, d);
            let mut occluded = false;
            for inst in self.world.instances_at(e) {
                if !inst.is_enabled() {
                    continue;
                }
                out.push(inst.id());
                if !limit.displaced
                    && inst.occludes()
                    && !inst.is_displaced()
                    && !inst.is_hidden()
                {
                    occluded = true;
                }
            }
            if occluded {
                break;
            }
        }
        out
    }
}
