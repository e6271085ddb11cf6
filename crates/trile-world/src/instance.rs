use std::fmt;

use trile_blocks::{BlockId, BlockType, Classification};
use trile_geom::{Aabb, Emplacement, Vec3};

/// Generational handle into the world's instance slab.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId {
    index: u32,
    generation: u32,
}

impl InstanceId {
    #[inline]
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    #[inline]
    pub fn index(self) -> usize {
        self.index as usize
    }

    #[inline]
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// A block placed at an emplacement.
#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    id: InstanceId,
    block: BlockId,
    classification: Classification,
    occludes: bool,
    block_no_cull: bool,
    pub(crate) emplacement: Emplacement,
    pub(crate) offset: Vec3,
    pub(crate) enabled: bool,
    pub(crate) hidden: bool,
    pub(crate) skip_culling: bool,
}

impl Instance {
    pub(crate) fn new(id: InstanceId, ty: &BlockType, emplacement: Emplacement) -> Self {
        Self {
            id,
            block: ty.id,
            classification: ty.classification,
            occludes: ty.occludes(),
            block_no_cull: ty.no_cull,
            emplacement,
            offset: Vec3::ZERO,
            enabled: true,
            hidden: false,
            skip_culling: false,
        }
    }

    #[inline]
    pub fn id(&self) -> InstanceId {
        self.id
    }

    #[inline]
    pub fn block(&self) -> BlockId {
        self.block
    }

    #[inline]
    pub fn classification(&self) -> Classification {
        self.classification
    }

    #[inline]
    pub fn occludes(&self) -> bool {
        self.occludes
    }

    #[inline]
    pub fn emplacement(&self) -> Emplacement {
        self.emplacement
    }

    /// Residual offset of the true position from the cell center.
    #[inline]
    pub fn offset(&self) -> Vec3 {
        self.offset
    }

    #[inline]
    pub fn position(&self) -> Vec3 {
        self.emplacement.center() + self.offset
    }

    #[inline]
    pub fn bounds(&self) -> Aabb {
        Aabb::from_center_size(self.position(), Vec3::ONE)
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Kept in render batches regardless of occlusion.
    #[inline]
    pub fn skips_culling(&self) -> bool {
        self.skip_culling || self.block_no_cull
    }

    /// True position no longer matches the grid cell.
    #[inline]
    pub fn is_displaced(&self) -> bool {
        self.skip_culling || self.offset != Vec3::ZERO
    }
}
