use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use hashbrown::HashMap;
use trile_geom::{Column, Emplacement};
use trile_view::ViewAxes;
use trile_world::CellMap;

use crate::limit::{CancelToken, Limit, LimitTable, compute_column};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LimitCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub published: u64,
    pub cancelled: u64,
    pub patches: u64,
    pub columns: usize,
}

/// Rebuild requested but not yet published.
#[derive(Debug)]
pub(crate) struct Pending {
    pub generation: u64,
    pub axes: ViewAxes,
    pub size: Emplacement,
    pub token: CancelToken,
    /// Columns patched after the job's snapshot was taken.
    pub overrides: HashMap<Column, Option<Limit>>,
}

#[derive(Debug, Default)]
pub(crate) struct PublishState {
    pub generation: u64,
    pub pending: Option<Pending>,
}

/// Published table plus the bookkeeping shared with the rebuild worker.
///
/// The table is only ever replaced whole or patched through copy-on-write, so
/// a reader's snapshot is always one consistent table.
pub(crate) struct ColumnCache {
    table: RwLock<Arc<LimitTable>>,
    publish: Mutex<PublishState>,
    hits: AtomicU64,
    misses: AtomicU64,
    published: AtomicU64,
    cancelled: AtomicU64,
    patches: AtomicU64,
}

impl ColumnCache {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(Arc::new(LimitTable::empty())),
            publish: Mutex::new(PublishState::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            published: AtomicU64::new(0),
            cancelled: AtomicU64::new(0),
            patches: AtomicU64::new(0),
        }
    }

    pub fn lock_publish(&self) -> MutexGuard<'_, PublishState> {
        self.publish.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> Arc<LimitTable> {
        let guard = self.table.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    pub fn get(&self, column: Column) -> Option<Limit> {
        let out = self
            .table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(column);
        if out.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        out
    }

    /// Swap in a whole table. Caller holds the publish lock.
    pub fn replace(&self, table: LimitTable) {
        let mut guard = self.table.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(table);
    }

    /// Recompute the column containing `e` in the published table and, when a
    /// rebuild is pending, record it for the table being built.
    pub fn patch(&self, cells: &CellMap, e: Emplacement) {
        let mut state = self.lock_publish();
        if let Some(p) = state.pending.as_mut() {
            let column = p.axes.column(e);
            let limit = compute_column(cells, &p.axes, p.size, column);
            p.overrides.insert(column, limit);
        }
        let mut guard = self.table.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(axes) = guard.axes() {
            let column = axes.column(e);
            let limit = Arc::make_mut(&mut guard).patch(cells, column);
            log::trace!(target: "limits", "patch {:?} -> {:?}", column, limit);
        }
        drop(guard);
        drop(state);
        self.patches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn note_published(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn note_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> LimitCacheStats {
        LimitCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            patches: self.patches.load(Ordering::Relaxed),
            columns: self.table.read().map(|t| t.len()).unwrap_or(0),
        }
    }
}
