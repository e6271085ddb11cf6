use crate::instance::InstanceId;

/// Instances sharing one emplacement: a primary and at most one overlap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellStack {
    primary: InstanceId,
    overlap: Option<InstanceId>,
    displaced: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CellRemoval {
    Missing,
    Emptied,
    Kept,
}

impl CellStack {
    #[inline]
    pub(crate) fn new(primary: InstanceId) -> Self {
        Self {
            primary,
            overlap: None,
            displaced: false,
        }
    }

    #[inline]
    pub fn primary(&self) -> InstanceId {
        self.primary
    }

    #[inline]
    pub fn overlap(&self) -> Option<InstanceId> {
        self.overlap
    }

    /// Some instance in this cell sits off its grid position.
    #[inline]
    pub fn is_displaced(&self) -> bool {
        self.displaced
    }

    #[inline]
    pub fn len(&self) -> usize {
        1 + usize::from(self.overlap.is_some())
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.overlap.is_some()
    }

    #[inline]
    pub fn contains(&self, id: InstanceId) -> bool {
        self.primary == id || self.overlap == Some(id)
    }

    /// Primary first, then the overlap.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = InstanceId> + '_ {
        std::iter::once(self.primary).chain(self.overlap)
    }

    #[inline]
    pub(crate) fn push(&mut self, id: InstanceId) -> bool {
        if self.overlap.is_some() {
            return false;
        }
        self.overlap = Some(id);
        true
    }

    /// Removing the primary promotes the overlap.
    pub(crate) fn remove(&mut self, id: InstanceId) -> CellRemoval {
        if self.primary == id {
            match self.overlap.take() {
                Some(next) => {
                    self.primary = next;
                    CellRemoval::Kept
                }
                None => CellRemoval::Emptied,
            }
        } else if self.overlap == Some(id) {
            self.overlap = None;
            CellRemoval::Kept
        } else {
            CellRemoval::Missing
        }
    }

    #[inline]
    pub(crate) fn set_displaced(&mut self, displaced: bool) {
        self.displaced = displaced;
    }
}
