use hashbrown::HashMap;
use trile_blocks::BlockId;
use trile_geom::Column;
use trile_world::InstanceId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ViewedEntry {
    pub column: Column,
    pub block: BlockId,
    /// Holds a slot in its block's batch; false while hidden.
    pub batched: bool,
}

/// Instances currently counted as visible, indexed both ways.
#[derive(Clone, Debug, Default)]
pub struct ViewedRegistry {
    by_column: HashMap<Column, Vec<InstanceId>>,
    entries: HashMap<InstanceId, ViewedEntry>,
}

impl ViewedRegistry {
    pub fn insert(&mut self, id: InstanceId, entry: ViewedEntry) -> bool {
        if self.entries.contains_key(&id) {
            return false;
        }
        self.by_column.entry(entry.column).or_default().push(id);
        self.entries.insert(id, entry);
        true
    }

    pub fn remove(&mut self, id: InstanceId) -> Option<ViewedEntry> {
        let entry = self.entries.remove(&id)?;
        self.unlink(id, entry.column);
        Some(entry)
    }

    /// Move an entry to another column key without touching its batch slot.
    pub fn rekey(&mut self, id: InstanceId, column: Column) {
        let Some(old) = self.entries.get(&id).map(|e| e.column) else {
            return;
        };
        if old == column {
            return;
        }
        self.unlink(id, old);
        self.by_column.entry(column).or_default().push(id);
        if let Some(e) = self.entries.get_mut(&id) {
            e.column = column;
        }
    }

    fn unlink(&mut self, id: InstanceId, column: Column) {
        if let Some(ids) = self.by_column.get_mut(&column) {
            ids.retain(|i| *i != id);
            if ids.is_empty() {
                self.by_column.remove(&column);
            }
        }
    }

    pub(crate) fn set_batched(&mut self, id: InstanceId, batched: bool) {
        if let Some(e) = self.entries.get_mut(&id) {
            e.batched = batched;
        }
    }

    #[inline]
    pub fn get(&self, id: InstanceId) -> Option<&ViewedEntry> {
        self.entries.get(&id)
    }

    #[inline]
    pub fn contains(&self, id: InstanceId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn column(&self, column: Column) -> &[InstanceId] {
        self.by_column.get(&column).map(Vec::as_slice).unwrap_or(&[])
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = InstanceId> + '_ {
        self.entries.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (InstanceId, &ViewedEntry)> {
        self.entries.iter().map(|(id, e)| (*id, e))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use trile_blocks::BlockRegistry;
    use trile_geom::Emplacement;
    use trile_world::World;

    use super::*;

    #[test]
    fn rekey_keeps_both_indices_in_step() {
        let reg = BlockRegistry::from_toml_str("[[blocks]]\nname = \"a\"").unwrap();
        let mut world = World::new(Emplacement::new(2, 1, 1), Arc::new(reg));
        let id = world.place(0, Emplacement::new(0, 0, 0)).unwrap();

        let mut viewed = ViewedRegistry::default();
        let entry = ViewedEntry {
            column: Column::new(0, 0),
            block: 0,
            batched: true,
        };
        assert!(viewed.insert(id, entry));
        assert!(!viewed.insert(id, entry));
        viewed.rekey(id, Column::new(3, 0));
        assert!(viewed.column(Column::new(0, 0)).is_empty());
        assert_eq!(viewed.column(Column::new(3, 0)), &[id]);
        assert_eq!(viewed.remove(id).map(|e| e.column), Some(Column::new(3, 0)));
        assert!(viewed.is_empty());
    }
}
