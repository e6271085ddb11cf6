use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::sync::Arc;

use hashbrown::HashMap;
use trile_blocks::{BlockId, BlockRegistry, Classification};
use trile_geom::{Emplacement, Face, Vec3};

use crate::cell::{CellRemoval, CellStack};
use crate::error::WorldError;
use crate::instance::{Instance, InstanceId};

pub type CellMap = HashMap<Emplacement, CellStack>;

#[derive(Clone, Debug)]
pub enum Slot {
    Vacant { generation: u32 },
    Live(Instance),
    /// Cleared from the grid but restorable under the same id.
    Removed(Instance),
}

impl Slot {
    #[inline]
    pub fn live(&self) -> Option<&Instance> {
        match self {
            Slot::Live(inst) => Some(inst),
            _ => None,
        }
    }
}

#[derive(Default, Debug, Clone, Copy)]
pub struct WorldStats {
    pub live: usize,
    pub removed: usize,
    pub cells: usize,
    pub overlapped_cells: usize,
    pub displaced_cells: usize,
    pub rows: usize,
}

/// Sparse grid of block instances. Sole owner of instance and cell state.
#[derive(Clone, Debug)]
pub struct World {
    size: Emplacement,
    registry: Arc<BlockRegistry>,
    // Copy-on-write so background scans can hold a snapshot while edits continue.
    cells: Arc<CellMap>,
    slots: Vec<Slot>,
    free: Vec<u32>,
    rows: BTreeMap<i32, Vec<InstanceId>>,
    live: usize,
    rev: u64,
}

impl World {
    pub fn new(size: Emplacement, registry: Arc<BlockRegistry>) -> Self {
        Self {
            size,
            registry,
            cells: Arc::new(CellMap::new()),
            slots: Vec::new(),
            free: Vec::new(),
            rows: BTreeMap::new(),
            live: 0,
            rev: 0,
        }
    }

    #[inline]
    pub fn size(&self) -> Emplacement {
        self.size
    }

    #[inline]
    pub fn registry(&self) -> &Arc<BlockRegistry> {
        &self.registry
    }

    /// Monotonic revision, bumped by every mutation.
    #[inline]
    pub fn rev(&self) -> u64 {
        self.rev
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    #[inline]
    pub fn contains(&self, e: Emplacement) -> bool {
        e.within(self.size)
    }

    #[inline]
    pub fn cells(&self) -> &CellMap {
        &self.cells
    }

    /// Shared handle on the current cell map; later edits do not affect it.
    #[inline]
    pub fn cells_snapshot(&self) -> Arc<CellMap> {
        Arc::clone(&self.cells)
    }

    #[inline]
    pub fn cell(&self, e: Emplacement) -> Option<&CellStack> {
        self.cells.get(&e)
    }

    #[inline]
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn instance(&self, id: InstanceId) -> Option<&Instance> {
        match self.slots.get(id.index()) {
            Some(Slot::Live(inst)) if inst.id() == id => Some(inst),
            _ => None,
        }
    }

    pub fn removed_instance(&self, id: InstanceId) -> Option<&Instance> {
        match self.slots.get(id.index()) {
            Some(Slot::Removed(inst)) if inst.id() == id => Some(inst),
            _ => None,
        }
    }

    pub fn instances(&self) -> impl Iterator<Item = &Instance> {
        self.slots.iter().filter_map(Slot::live)
    }

    /// Live instances in a cell, primary first. Stale ids are skipped.
    pub fn instances_at(&self, e: Emplacement) -> impl Iterator<Item = &Instance> {
        self.cells
            .get(&e)
            .into_iter()
            .flat_map(|cell| cell.iter())
            .filter_map(|id| self.instance(id))
    }

    pub fn row(&self, y: i32) -> &[InstanceId] {
        self.rows.get(&y).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Non-empty rows in `range`, lowest first. An inverted range is empty.
    pub fn rows_in(&self, range: RangeInclusive<i32>) -> impl Iterator<Item = (i32, &[InstanceId])> {
        (range.start() <= range.end())
            .then(|| self.rows.range(range))
            .into_iter()
            .flatten()
            .map(|(y, ids)| (*y, ids.as_slice()))
    }

    pub fn stats(&self) -> WorldStats {
        WorldStats {
            live: self.live,
            removed: self
                .slots
                .iter()
                .filter(|s| matches!(s, Slot::Removed(_)))
                .count(),
            cells: self.cells.len(),
            overlapped_cells: self.cells.values().filter(|c| c.is_full()).count(),
            displaced_cells: self.cells.values().filter(|c| c.is_displaced()).count(),
            rows: self.rows.len(),
        }
    }

    // --- mutation ---

    pub fn place(&mut self, block: BlockId, e: Emplacement) -> Result<InstanceId, WorldError> {
        let registry = Arc::clone(&self.registry);
        let ty = registry.get(block).ok_or(WorldError::UnknownBlock(block))?;
        if !self.contains(e) {
            return Err(WorldError::OutOfBounds(e));
        }
        self.check_attach(ty.classification, e)?;
        let id = self.alloc_id();
        self.slots[id.index()] = Slot::Live(Instance::new(id, ty, e));
        self.attach(id, e);
        self.live += 1;
        let rev = self.bump();
        log::trace!(target: "world", "place {} block={} at {:?} rev={}", id, block, e, rev);
        Ok(id)
    }

    /// Clear an instance from the grid. Its overlap, if any, becomes primary.
    pub fn remove(&mut self, id: InstanceId) -> Result<Emplacement, WorldError> {
        let e = self
            .instance(id)
            .map(Instance::emplacement)
            .ok_or(WorldError::UnknownInstance(id))?;
        self.detach(id, e);
        let slot = &mut self.slots[id.index()];
        if let Slot::Live(inst) = std::mem::replace(slot, Slot::Vacant { generation: 0 }) {
            *slot = Slot::Removed(inst);
        }
        self.live -= 1;
        let rev = self.bump();
        log::trace!(target: "world", "remove {} at {:?} rev={}", id, e, rev);
        Ok(e)
    }

    /// Put a removed instance back at its last emplacement under the same id.
    pub fn restore(&mut self, id: InstanceId) -> Result<Emplacement, WorldError> {
        let inst = match self.slots.get(id.index()) {
            Some(Slot::Removed(inst)) if inst.id() == id => inst,
            Some(Slot::Live(inst)) if inst.id() == id => return Err(WorldError::NotRemoved(id)),
            _ => return Err(WorldError::UnknownInstance(id)),
        };
        let (e, class) = (inst.emplacement(), inst.classification());
        if !self.contains(e) {
            return Err(WorldError::OutOfBounds(e));
        }
        self.check_attach(class, e)?;
        let slot = &mut self.slots[id.index()];
        if let Slot::Removed(inst) = std::mem::replace(slot, Slot::Vacant { generation: 0 }) {
            *slot = Slot::Live(inst);
        }
        self.attach(id, e);
        self.live += 1;
        let rev = self.bump();
        log::trace!(target: "world", "restore {} at {:?} rev={}", id, e, rev);
        Ok(e)
    }

    /// Free the slot for good. Returns the emplacement if the instance was on the grid.
    pub fn destroy(&mut self, id: InstanceId) -> Result<Option<Emplacement>, WorldError> {
        let was_live = match self.slots.get(id.index()) {
            Some(Slot::Live(inst)) if inst.id() == id => Some(inst.emplacement()),
            Some(Slot::Removed(inst)) if inst.id() == id => None,
            _ => return Err(WorldError::UnknownInstance(id)),
        };
        if let Some(e) = was_live {
            self.detach(id, e);
            self.live -= 1;
        }
        self.slots[id.index()] = Slot::Vacant {
            generation: id.generation().wrapping_add(1),
        };
        self.free.push(id.index() as u32);
        self.bump();
        Ok(was_live)
    }

    /// Move to another cell, snapping back onto the grid. Returns the previous emplacement.
    pub fn move_to(&mut self, id: InstanceId, to: Emplacement) -> Result<Emplacement, WorldError> {
        let from = self
            .instance(id)
            .map(Instance::emplacement)
            .ok_or(WorldError::UnknownInstance(id))?;
        self.relocate(id, from, to)?;
        if let Some(Slot::Live(inst)) = self.slots.get_mut(id.index()) {
            inst.offset = Vec3::ZERO;
        }
        self.refresh_displaced(to);
        self.bump();
        Ok(from)
    }

    /// Set the true position; the emplacement follows the containing cell and the
    /// remainder is kept as an offset. Returns `(from, to)` emplacements.
    pub fn set_position(
        &mut self,
        id: InstanceId,
        position: Vec3,
    ) -> Result<(Emplacement, Emplacement), WorldError> {
        if !position.is_finite() {
            return Err(WorldError::NonFinitePosition);
        }
        let from = self
            .instance(id)
            .map(Instance::emplacement)
            .ok_or(WorldError::UnknownInstance(id))?;
        let to = Emplacement::containing(position);
        self.relocate(id, from, to)?;
        if let Some(Slot::Live(inst)) = self.slots.get_mut(id.index()) {
            inst.offset = position - to.center();
        }
        self.refresh_displaced(to);
        self.bump();
        Ok((from, to))
    }

    pub fn set_enabled(&mut self, id: InstanceId, enabled: bool) -> Result<Emplacement, WorldError> {
        self.update(id, |inst| inst.enabled = enabled)
    }

    pub fn set_hidden(&mut self, id: InstanceId, hidden: bool) -> Result<Emplacement, WorldError> {
        self.update(id, |inst| inst.hidden = hidden)
    }

    pub fn set_skip_culling(&mut self, id: InstanceId, skip: bool) -> Result<Emplacement, WorldError> {
        let e = self.update(id, |inst| inst.skip_culling = skip)?;
        self.refresh_displaced(e);
        Ok(e)
    }

    /// Change the world bounds. Instances outside the new bounds stay in place
    /// but are unreachable by bounded queries.
    pub fn resize(&mut self, size: Emplacement) {
        if size != self.size {
            log::debug!(target: "world", "resize {:?} -> {:?}", self.size, size);
            self.size = size;
            self.bump();
        }
    }

    // --- predicates ---

    /// Cell holds an enabled, grid-aligned instance that hides what is behind it.
    pub fn occluder_at(&self, e: Emplacement) -> bool {
        self.instances_at(e)
            .any(|inst| inst.is_enabled() && inst.occludes() && !inst.is_displaced())
    }

    /// Face of an occupied cell whose neighbor does not cover it.
    pub fn is_border_face(&self, e: Emplacement, face: Face) -> bool {
        self.cells.contains_key(&e) && !self.occluder_at(e.step(face))
    }

    /// Occupied cell exposed on two perpendicular horizontal faces, so it is seen
    /// from two adjacent viewpoints.
    pub fn is_corner_block(&self, e: Emplacement) -> bool {
        if !self.cells.contains_key(&e) {
            return false;
        }
        let x_exposed = [Face::PosX, Face::NegX]
            .into_iter()
            .any(|f| self.is_border_face(e, f));
        let z_exposed = [Face::PosZ, Face::NegZ]
            .into_iter()
            .any(|f| self.is_border_face(e, f));
        x_exposed && z_exposed
    }

    // --- internals ---

    fn bump(&mut self) -> u64 {
        self.rev = self.rev.wrapping_add(1).max(1);
        self.rev
    }

    fn alloc_id(&mut self) -> InstanceId {
        if let Some(index) = self.free.pop() {
            let generation = match self.slots[index as usize] {
                Slot::Vacant { generation } => generation,
                _ => 0,
            };
            return InstanceId::new(index, generation);
        }
        self.slots.push(Slot::Vacant { generation: 0 });
        InstanceId::new((self.slots.len() - 1) as u32, 0)
    }

    fn check_attach(&self, class: Classification, e: Emplacement) -> Result<(), WorldError> {
        let Some(cell) = self.cells.get(&e) else {
            return Ok(());
        };
        if cell.is_full() {
            return Err(WorldError::CellFull(e));
        }
        let resident = self
            .instance(cell.primary())
            .map(|i| i.classification().can_overlap())
            .unwrap_or(true);
        if class.can_overlap() || resident {
            Ok(())
        } else {
            Err(WorldError::CellOccupied(e))
        }
    }

    fn attach(&mut self, id: InstanceId, e: Emplacement) {
        let cells = Arc::make_mut(&mut self.cells);
        match cells.get_mut(&e) {
            Some(cell) => {
                let pushed = cell.push(id);
                debug_assert!(pushed, "attach past check_attach");
            }
            None => {
                cells.insert(e, CellStack::new(id));
            }
        }
        self.rows.entry(e.y).or_default().push(id);
        self.refresh_displaced(e);
    }

    fn detach(&mut self, id: InstanceId, e: Emplacement) {
        let cells = Arc::make_mut(&mut self.cells);
        let outcome = cells
            .get_mut(&e)
            .map(|cell| cell.remove(id))
            .unwrap_or(CellRemoval::Missing);
        match outcome {
            CellRemoval::Emptied => {
                cells.remove(&e);
            }
            CellRemoval::Kept => {}
            CellRemoval::Missing => {
                log::warn!(target: "world", "detach {} from {:?}: not in cell", id, e);
            }
        }
        if outcome == CellRemoval::Kept {
            self.refresh_displaced(e);
        }
        if let Some(row) = self.rows.get_mut(&e.y) {
            row.retain(|r| *r != id);
            if row.is_empty() {
                self.rows.remove(&e.y);
            }
        }
    }

    fn relocate(&mut self, id: InstanceId, from: Emplacement, to: Emplacement) -> Result<(), WorldError> {
        if from == to {
            return Ok(());
        }
        if !self.contains(to) {
            return Err(WorldError::OutOfBounds(to));
        }
        if let Some(class) = self.instance(id).map(Instance::classification) {
            self.check_attach(class, to)?;
        }
        self.detach(id, from);
        if let Some(Slot::Live(inst)) = self.slots.get_mut(id.index()) {
            inst.emplacement = to;
        }
        self.attach(id, to);
        log::trace!(target: "world", "move {} {:?} -> {:?}", id, from, to);
        Ok(())
    }

    fn update(&mut self, id: InstanceId, f: impl FnOnce(&mut Instance)) -> Result<Emplacement, WorldError> {
        match self.slots.get_mut(id.index()) {
            Some(Slot::Live(inst)) if inst.id() == id => {
                f(inst);
                let e = inst.emplacement();
                self.bump();
                Ok(e)
            }
            _ => Err(WorldError::UnknownInstance(id)),
        }
    }

    fn refresh_displaced(&mut self, e: Emplacement) {
        let displaced = self.instances_at(e).any(Instance::is_displaced);
        let current = self.cells.get(&e).map(CellStack::is_displaced);
        if current.is_some_and(|d| d != displaced) {
            if let Some(cell) = Arc::make_mut(&mut self.cells).get_mut(&e) {
                cell.set_displaced(displaced);
            }
        }
    }
}
