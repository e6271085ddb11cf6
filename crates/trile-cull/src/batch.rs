use hashbrown::HashMap;
use trile_blocks::BlockId;
use trile_world::InstanceId;

/// Instances of one block type drawn together. Order is not stable.
#[derive(Clone, Debug, Default)]
pub struct InstanceBatch {
    members: Vec<InstanceId>,
    index: HashMap<InstanceId, usize>,
}

impl InstanceBatch {
    pub fn insert(&mut self, id: InstanceId) -> bool {
        if self.index.contains_key(&id) {
            return false;
        }
        self.index.insert(id, self.members.len());
        self.members.push(id);
        true
    }

    pub fn remove(&mut self, id: InstanceId) -> bool {
        let Some(i) = self.index.remove(&id) else {
            return false;
        };
        self.members.swap_remove(i);
        if let Some(moved) = self.members.get(i) {
            self.index.insert(*moved, i);
        }
        true
    }

    #[inline]
    pub fn contains(&self, id: InstanceId) -> bool {
        self.index.contains_key(&id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[InstanceId] {
        &self.members
    }
}

/// Per-block render batches.
#[derive(Clone, Debug, Default)]
pub struct BatchSet {
    batches: HashMap<BlockId, InstanceBatch>,
}

impl BatchSet {
    pub fn insert(&mut self, block: BlockId, id: InstanceId) -> bool {
        self.batches.entry(block).or_default().insert(id)
    }

    pub fn remove(&mut self, block: BlockId, id: InstanceId) -> bool {
        let Some(batch) = self.batches.get_mut(&block) else {
            return false;
        };
        let removed = batch.remove(id);
        if batch.is_empty() {
            self.batches.remove(&block);
        }
        removed
    }

    pub fn get(&self, block: BlockId) -> Option<&InstanceBatch> {
        self.batches.get(&block)
    }

    pub fn contains(&self, block: BlockId, id: InstanceId) -> bool {
        self.batches.get(&block).is_some_and(|b| b.contains(id))
    }

    /// Instances across all batches.
    pub fn total(&self) -> usize {
        self.batches.values().map(InstanceBatch::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BlockId, &InstanceBatch)> {
        self.batches.iter().map(|(b, batch)| (*b, batch))
    }
}
