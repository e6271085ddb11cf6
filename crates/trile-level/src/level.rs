use trile_blocks::BlockId;
use trile_cull::{CullMaintainer, CullOutcome, CullSettings};
use trile_geom::{Column, Emplacement, Face, Vec3};
use trile_query::{NearestTriles, QueryEngine, QueryOptions};
use trile_runtime::{LimitCache, RebuildOutcome};
use trile_view::{CameraFrame, ViewMotion, ViewTracker, Viewpoint};
use trile_world::{Instance, InstanceId, World, WorldError};

use crate::error::LevelError;
use crate::event::{EventEnvelope, EventQueue, LevelEvent};

/// Owns the world and everything derived from it.
///
/// Every edit goes through here so the affected limit columns and the cull
/// state are patched before the call returns.
pub struct Level {
    world: World,
    limits: LimitCache,
    cull: CullMaintainer,
    tracker: ViewTracker,
    events: EventQueue<LevelEvent>,
    viewpoint: Viewpoint,
    limits_for: Option<Viewpoint>,
}

impl Level {
    pub fn new(world: World, settings: CullSettings) -> Result<Self, LevelError> {
        let limits = LimitCache::new()?;
        log::debug!(target: "level", "level {:?} with {} instances", world.size(), world.len());
        Ok(Self {
            world,
            limits,
            cull: CullMaintainer::new(settings),
            tracker: ViewTracker::new(),
            events: EventQueue::new(),
            viewpoint: Viewpoint::Front,
            limits_for: None,
        })
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn limits(&self) -> &LimitCache {
        &self.limits
    }

    pub fn cull(&self) -> &CullMaintainer {
        &self.cull
    }

    /// Viewpoint of the last frame.
    pub fn viewpoint(&self) -> Viewpoint {
        self.viewpoint
    }

    pub fn instance(&self, id: InstanceId) -> Option<&Instance> {
        self.world.instance(id)
    }

    fn publish(&mut self, out: CullOutcome) -> CullOutcome {
        for (id, block) in &out.batch_changed {
            self.events.emit_now(LevelEvent::BatchChanged { id: *id, block: *block });
        }
        out
    }

    fn collect_rebuilds(&mut self) {
        for RebuildOutcome {
            generation,
            published,
            ..
        } in self.limits.drain_finished()
        {
            if published {
                self.events.emit_now(LevelEvent::CacheInvalidated { generation });
            }
        }
    }

    // --- world editing ---

    pub fn place(&mut self, block: BlockId, e: Emplacement) -> Result<InstanceId, WorldError> {
        let id = self.world.place(block, e)?;
        self.limits.invalidate_column(&self.world, e);
        let table = self.limits.snapshot();
        let out = self.cull.instance_added(&self.world, &table, id);
        self.publish(out);
        Ok(id)
    }

    /// Clear an instance from the grid; `restore` can bring it back.
    pub fn remove(&mut self, id: InstanceId) -> Result<Emplacement, WorldError> {
        let at = self.world.remove(id)?;
        self.limits.invalidate_column(&self.world, at);
        let table = self.limits.snapshot();
        let out = self.cull.instance_removed(&self.world, &table, id, at);
        self.publish(out);
        Ok(at)
    }

    pub fn restore(&mut self, id: InstanceId) -> Result<Emplacement, WorldError> {
        let e = self.world.restore(id)?;
        self.limits.invalidate_column(&self.world, e);
        let table = self.limits.snapshot();
        let out = self.cull.instance_added(&self.world, &table, id);
        self.publish(out);
        self.events.emit_now(LevelEvent::InstanceRestored { id });
        Ok(e)
    }

    pub fn destroy(&mut self, id: InstanceId) -> Result<(), WorldError> {
        let Some(at) = self.world.destroy(id)? else {
            return Ok(());
        };
        self.limits.invalidate_column(&self.world, at);
        let table = self.limits.snapshot();
        let out = self.cull.instance_removed(&self.world, &table, id, at);
        self.publish(out);
        Ok(())
    }

    /// Snap an instance onto another cell. Returns where it came from.
    pub fn move_instance(&mut self, id: InstanceId, to: Emplacement) -> Result<Emplacement, WorldError> {
        let from = self.world.move_to(id, to)?;
        self.after_move(id, from, to);
        Ok(from)
    }

    pub fn set_position(
        &mut self,
        id: InstanceId,
        position: Vec3,
    ) -> Result<(Emplacement, Emplacement), WorldError> {
        let (from, to) = self.world.set_position(id, position)?;
        self.after_move(id, from, to);
        Ok((from, to))
    }

    fn after_move(&mut self, id: InstanceId, from: Emplacement, to: Emplacement) {
        self.limits.invalidate_column(&self.world, from);
        if to != from {
            self.limits.invalidate_column(&self.world, to);
        }
        let table = self.limits.snapshot();
        let out = self.cull.instance_moved(&self.world, &table, id, from);
        self.publish(out);
    }

    pub fn set_hidden(&mut self, id: InstanceId, hidden: bool) -> Result<(), WorldError> {
        self.world.set_hidden(id, hidden)?;
        let table = self.limits.snapshot();
        let mut out = self.cull.instance_hidden_changed(&self.world, id);
        out.merge(self.cull.instance_changed(&self.world, &table, id));
        self.publish(out);
        Ok(())
    }

    pub fn set_enabled(&mut self, id: InstanceId, enabled: bool) -> Result<(), WorldError> {
        let e = self.world.set_enabled(id, enabled)?;
        self.refresh(id, e);
        Ok(())
    }

    pub fn set_skip_culling(&mut self, id: InstanceId, skip: bool) -> Result<(), WorldError> {
        let e = self.world.set_skip_culling(id, skip)?;
        self.refresh(id, e);
        Ok(())
    }

    fn refresh(&mut self, id: InstanceId, e: Emplacement) {
        self.limits.invalidate_column(&self.world, e);
        let table = self.limits.snapshot();
        let out = self.cull.instance_changed(&self.world, &table, id);
        self.publish(out);
    }

    /// New world bounds. Limits are rebuilt and the next frame runs a full cull.
    pub fn resize(&mut self, size: Emplacement) {
        self.world.resize(size);
        self.cull.mark_dirty();
        if let Some(vp) = self.limits_for {
            self.limits.invalidate(&self.world, vp);
        }
    }

    // --- per frame ---

    /// Classify the camera motion, keep the limits on the settled viewpoint
    /// and bring the cull state up to date.
    pub fn frame(&mut self, frame: &CameraFrame) -> CullOutcome {
        self.events.advance_tick();
        let motion = self.tracker.observe(frame);
        if let ViewMotion::ViewpointChanged { from, to } = motion {
            if from != to {
                self.events.emit_now(LevelEvent::ViewpointChanged { from, to });
            }
            if self.limits_for != Some(to) {
                let generation = self.limits.invalidate(&self.world, to);
                log::debug!(target: "level", "settled on {:?}; limits gen={}", to, generation);
                self.limits_for = Some(to);
            }
        }
        self.viewpoint = frame.viewpoint;
        self.collect_rebuilds();
        let table = self.limits.snapshot();
        let out = self.cull.update(&self.world, &table, frame, motion);
        self.publish(out)
    }

    /// Join the in-flight limit rebuild, if any.
    pub fn wait_for_invalidation(&mut self) {
        self.limits.wait_for_rebuild();
        self.collect_rebuilds();
    }

    pub fn drain_events(&mut self) -> Vec<EventEnvelope<LevelEvent>> {
        std::iter::from_fn(|| self.events.pop_ready()).collect()
    }

    // --- gameplay queries ---

    pub fn nearest_trile(&self, position: Vec3, options: QueryOptions) -> NearestTriles {
        let table = self.limits.snapshot();
        QueryEngine::new(&self.world, &table, self.viewpoint).nearest_trile(position, options)
    }

    pub fn nearest_trile_in(&self, column: Column, background: bool) -> NearestTriles {
        let table = self.limits.snapshot();
        QueryEngine::new(&self.world, &table, self.viewpoint).nearest_trile_in(column, background)
    }

    /// Instance whose true bounds contain `position`.
    pub fn actual_instance_at(&self, position: Vec3) -> Option<InstanceId> {
        let table = self.limits.snapshot();
        QueryEngine::new(&self.world, &table, self.viewpoint)
            .actual_instance_at(position)
            .map(Instance::id)
    }

    pub fn is_border_face(&self, e: Emplacement, face: Face) -> bool {
        self.world.is_border_face(e, face)
    }

    pub fn is_corner_block(&self, e: Emplacement) -> bool {
        self.world.is_corner_block(e)
    }
}
