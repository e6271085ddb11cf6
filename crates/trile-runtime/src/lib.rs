//! Screen-space limit cache and the background worker that rebuilds it.
#![forbid(unsafe_code)]

mod column_cache;
mod limit;

use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, unbounded};
use hashbrown::HashMap;
use rayon::{ThreadPool, ThreadPoolBuilder};
use trile_geom::{Column, Emplacement};
use trile_view::{ViewAxes, Viewpoint};
use trile_world::{CellMap, World};

use crate::column_cache::{ColumnCache, Pending};

pub use column_cache::LimitCacheStats;
pub use limit::{CancelToken, Limit, LimitTable, compute_column};

#[derive(Debug)]
struct RebuildJob {
    generation: u64,
    axes: ViewAxes,
    size: Emplacement,
    cells: Arc<CellMap>,
    token: CancelToken,
}

/// Result of one rebuild job as seen by the foreground.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RebuildOutcome {
    pub generation: u64,
    pub viewpoint: Viewpoint,
    /// False when superseded or cancelled; the previous table stays current.
    pub published: bool,
    pub columns: usize,
    pub elapsed_ms: u32,
}

fn run_rebuild(job: RebuildJob, cache: &ColumnCache, tx: &Sender<RebuildOutcome>) {
    let t0 = Instant::now();
    let RebuildJob {
        generation,
        axes,
        size,
        cells,
        token,
    } = job;
    let built = if token.is_cancelled() {
        None
    } else {
        LimitTable::build(&cells, axes, size, &token)
    };
    drop(cells);
    let mut columns = 0;
    let published = match built {
        Some(mut table) => {
            let mut state = cache.lock_publish();
            let current = state.generation == generation && !token.is_cancelled();
            if current {
                if let Some(p) = state.pending.take() {
                    for (column, limit) in p.overrides {
                        table.set(column, limit);
                    }
                }
                columns = table.len();
                cache.replace(table);
            }
            current
        }
        None => false,
    };
    let elapsed_ms = t0.elapsed().as_millis().min(u128::from(u32::MAX)) as u32;
    if published {
        cache.note_published();
        log::debug!(
            target: "limits",
            "rebuild gen={} {:?} published columns={} in {}ms",
            generation,
            axes.viewpoint,
            columns,
            elapsed_ms
        );
    } else {
        cache.note_cancelled();
        log::trace!(target: "limits", "rebuild gen={} superseded", generation);
    }
    let _ = tx.send(RebuildOutcome {
        generation,
        viewpoint: axes.viewpoint,
        published,
        columns,
        elapsed_ms,
    });
}

/// Limit cache for the active viewpoint.
///
/// Full rebuilds run on one background thread against a snapshot of the
/// world's cell map. At most one rebuild is live: a new request cancels the
/// previous one. Single-column patches run synchronously on the caller.
pub struct LimitCache {
    cache: Arc<ColumnCache>,
    job_tx: Sender<RebuildJob>,
    done_rx: Receiver<RebuildOutcome>,
    _pool: ThreadPool,
    finished: Vec<RebuildOutcome>,
}

impl LimitCache {
    pub fn new() -> Result<Self, rayon::ThreadPoolBuildError> {
        let (job_tx, job_rx) = unbounded::<RebuildJob>();
        let (done_tx, done_rx) = unbounded::<RebuildOutcome>();
        let cache = Arc::new(ColumnCache::new());
        let pool = ThreadPoolBuilder::new()
            .num_threads(1)
            .thread_name(|i| format!("trile-limits-{i}"))
            .build()?;
        {
            let cache = Arc::clone(&cache);
            pool.spawn(move || {
                while let Ok(mut job) = job_rx.recv() {
                    // Restart on the newest request rather than queueing.
                    for newer in job_rx.try_iter() {
                        let stale = std::mem::replace(&mut job, newer);
                        stale.token.cancel();
                        run_rebuild(stale, &cache, &done_tx);
                    }
                    run_rebuild(job, &cache, &done_tx);
                }
            });
        }
        Ok(Self {
            cache,
            job_tx,
            done_rx,
            _pool: pool,
            finished: Vec::new(),
        })
    }

    /// Schedule a full rebuild for `viewpoint` and cancel any rebuild in
    /// flight. Returns the new generation.
    ///
    /// A perspective viewpoint has no columns; the table is cleared at once.
    pub fn invalidate(&mut self, world: &World, viewpoint: Viewpoint) -> u64 {
        let mut state = self.cache.lock_publish();
        state.generation += 1;
        let generation = state.generation;
        if let Some(old) = state.pending.take() {
            old.token.cancel();
        }
        let Some(axes) = viewpoint.axes() else {
            self.cache.replace(LimitTable::empty());
            drop(state);
            self.finished.push(RebuildOutcome {
                generation,
                viewpoint,
                published: true,
                columns: 0,
                elapsed_ms: 0,
            });
            return generation;
        };
        let token = CancelToken::new();
        state.pending = Some(Pending {
            generation,
            axes,
            size: world.size(),
            token: token.clone(),
            overrides: HashMap::new(),
        });
        drop(state);
        let job = RebuildJob {
            generation,
            axes,
            size: world.size(),
            cells: world.cells_snapshot(),
            token,
        };
        if self.job_tx.send(job).is_err() {
            log::warn!(target: "limits", "rebuild worker gone; building gen={} inline", generation);
            self.rebuild_inline(world, axes, generation);
        }
        log::debug!(target: "limits", "invalidate gen={} {:?}", generation, viewpoint);
        generation
    }

    fn rebuild_inline(&mut self, world: &World, axes: ViewAxes, generation: u64) {
        let (tx, rx) = unbounded();
        let job = RebuildJob {
            generation,
            axes,
            size: world.size(),
            cells: world.cells_snapshot(),
            token: CancelToken::new(),
        };
        run_rebuild(job, &self.cache, &tx);
        self.finished.extend(rx.try_iter());
    }

    /// Recompute the column holding `e` synchronously.
    pub fn invalidate_column(&self, world: &World, e: Emplacement) {
        self.cache.patch(world.cells(), e);
    }

    /// Block until the latest requested rebuild has been published.
    pub fn wait_for_rebuild(&mut self) {
        loop {
            let pending = self.cache.lock_publish().pending.is_some();
            if !pending {
                break;
            }
            match self.done_rx.recv() {
                Ok(outcome) => self.finished.push(outcome),
                Err(_) => {
                    log::warn!(target: "limits", "rebuild worker disconnected while waiting");
                    break;
                }
            }
        }
    }

    /// Rebuild outcomes received since the last call, oldest first.
    pub fn drain_finished(&mut self) -> Vec<RebuildOutcome> {
        self.finished.extend(self.done_rx.try_iter());
        std::mem::take(&mut self.finished)
    }

    pub fn is_rebuilding(&self) -> bool {
        self.cache.lock_publish().pending.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.cache.lock_publish().generation
    }

    /// Current table. Holds no lock after returning.
    pub fn snapshot(&self) -> Arc<LimitTable> {
        self.cache.snapshot()
    }

    pub fn get(&self, column: Column) -> Option<Limit> {
        self.cache.get(column)
    }

    pub fn stats(&self) -> LimitCacheStats {
        self.cache.stats()
    }
}

impl Drop for LimitCache {
    fn drop(&mut self) {
        if let Some(p) = self.cache.lock_publish().pending.take() {
            p.token.cancel();
        }
    }
}
