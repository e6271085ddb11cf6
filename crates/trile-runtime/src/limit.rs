use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use hashbrown::HashMap;
use trile_geom::{Column, Emplacement};
use trile_view::ViewAxes;
use trile_world::CellMap;

/// Occupied depth range of one screen-space column.
///
/// `start` and `end` are the smallest and largest raw depth coordinates of an
/// occupied cell, inclusive. Use [`ViewAxes::near_to_far`] to walk them from
/// the camera outward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Limit {
    pub start: i32,
    pub end: i32,
    /// Some cell in the column holds an instance off its grid position.
    pub displaced: bool,
}

impl Limit {
    #[inline]
    pub fn contains(&self, depth: i32) -> bool {
        depth >= self.start && depth <= self.end
    }

    /// Smallest range covering both.
    #[inline]
    pub fn union(self, other: Limit) -> Limit {
        Limit {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            displaced: self.displaced || other.displaced,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        (self.end - self.start + 1).max(0) as usize
    }
}

/// Cooperative cancellation flag shared between the requester and a job.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Every non-empty column's [`Limit`] for one viewpoint and world size.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LimitTable {
    axes: Option<ViewAxes>,
    size: Emplacement,
    limits: HashMap<Column, Limit>,
}

impl LimitTable {
    /// Table with no axes; every lookup misses.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Scan every column of the world bounds. Returns `None` when `cancel`
    /// fires, checked once per column.
    pub fn build(
        cells: &CellMap,
        axes: ViewAxes,
        size: Emplacement,
        cancel: &CancelToken,
    ) -> Option<Self> {
        let side_len = size.axis(axes.side);
        let mut limits = HashMap::new();
        for v in 0..size.y {
            for u in 0..side_len {
                if cancel.is_cancelled() {
                    return None;
                }
                let column = Column::new(u, v);
                if let Some(limit) = compute_column(cells, &axes, size, column) {
                    limits.insert(column, limit);
                }
            }
        }
        Some(Self {
            axes: Some(axes),
            size,
            limits,
        })
    }

    #[inline]
    pub fn axes(&self) -> Option<ViewAxes> {
        self.axes
    }

    #[inline]
    pub fn size(&self) -> Emplacement {
        self.size
    }

    /// Built for `axes` over a world of `size`.
    #[inline]
    pub fn matches(&self, axes: &ViewAxes, size: Emplacement) -> bool {
        self.axes.as_ref() == Some(axes) && self.size == size
    }

    #[inline]
    pub fn get(&self, column: Column) -> Option<Limit> {
        self.limits.get(&column).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.limits.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.limits.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Column, Limit)> + '_ {
        self.limits.iter().map(|(c, l)| (*c, *l))
    }

    /// Recompute one column in place. Returns the new value.
    pub(crate) fn patch(&mut self, cells: &CellMap, column: Column) -> Option<Limit> {
        let axes = self.axes?;
        let limit = compute_column(cells, &axes, self.size, column);
        self.set(column, limit);
        limit
    }

    pub(crate) fn set(&mut self, column: Column, limit: Option<Limit>) {
        match limit {
            Some(l) => {
                self.limits.insert(column, l);
            }
            None => {
                self.limits.remove(&column);
            }
        }
    }
}

/// Scan one column's depth range inside the world bounds.
pub fn compute_column(
    cells: &CellMap,
    axes: &ViewAxes,
    size: Emplacement,
    column: Column,
) -> Option<Limit> {
    if column.u < 0 || column.v < 0 || column.u >= size.axis(axes.side) || column.v >= size.y {
        return None;
    }
    let mut out: Option<Limit> = None;
    for d in 0..size.axis(axes.depth) {
        let Some(cell) = cells.get(&axes.emplacement(column, d)) else {
            continue;
        };
        let displaced = cell.is_displaced();
        out = Some(match out {
            None => Limit {
                start: d,
                end: d,
                displaced,
            },
            Some(l) => Limit {
                start: l.start,
                end: d,
                displaced: l.displaced || displaced,
            },
        });
    }
    out
}
