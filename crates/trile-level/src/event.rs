use std::collections::{BTreeMap, VecDeque};

use trile_blocks::BlockId;
use trile_view::Viewpoint;
use trile_world::InstanceId;

/// Notifications for the renderer and gameplay code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LevelEvent {
    /// A background limit rebuild was published.
    CacheInvalidated { generation: u64 },
    /// A removed instance is back on the grid under its old id.
    InstanceRestored { id: InstanceId },
    /// The instance gained a slot in its block's batch.
    BatchChanged { id: InstanceId, block: BlockId },
    ViewpointChanged { from: Viewpoint, to: Viewpoint },
}

#[derive(Clone, Debug, PartialEq)]
pub struct EventEnvelope<E> {
    pub id: u64,
    pub tick: u64,
    pub kind: E,
}

/// Tick-bucketed FIFO. Events become ready once their tick is reached.
#[derive(Debug)]
pub struct EventQueue<E> {
    by_tick: BTreeMap<u64, VecDeque<EventEnvelope<E>>>,
    now: u64,
    next_id: u64,
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self {
            by_tick: BTreeMap::new(),
            now: 0,
            next_id: 1,
        }
    }
}

impl<E> EventQueue<E> {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn now(&self) -> u64 {
        self.now
    }

    #[inline]
    fn alloc_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);
        id
    }

    pub fn emit_now(&mut self, kind: E) -> u64 {
        self.emit_at(self.now, kind)
    }

    pub fn emit_at(&mut self, tick: u64, kind: E) -> u64 {
        let id = self.alloc_id();
        let env = EventEnvelope { id, tick, kind };
        self.by_tick.entry(tick).or_default().push_back(env);
        id
    }

    pub fn emit_after(&mut self, delta: u64, kind: E) -> u64 {
        self.emit_at(self.now.saturating_add(delta), kind)
    }

    /// Oldest event whose tick has been reached, including ones left over
    /// from earlier ticks.
    pub fn pop_ready(&mut self) -> Option<EventEnvelope<E>> {
        let mut entry = self.by_tick.first_entry()?;
        if *entry.key() > self.now {
            return None;
        }
        let env = entry.get_mut().pop_front();
        if entry.get().is_empty() {
            entry.remove();
        }
        env
    }

    pub fn advance_tick(&mut self) {
        self.now = self.now.wrapping_add(1);
    }

    /// Events waiting, ready or not.
    pub fn len(&self) -> usize {
        self.by_tick.values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_tick.is_empty()
    }
}
