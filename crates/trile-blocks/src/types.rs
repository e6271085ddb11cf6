use serde::{Deserialize, Serialize};

pub type BlockId = u16;

/// Gameplay role of a block as authored in level data.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorType {
    #[default]
    None,
    Ladder,
    Vine,
    Sign,
    Door,
    Fence,
    Hole,
    Water,
    Checkpoint,
    Pickup,
    Crystal,
    Bomb,
    PushSwitch,
    Spring,
}

impl ActorType {
    #[inline]
    fn default_classification(self) -> Classification {
        match self {
            ActorType::Hole | ActorType::Water | ActorType::Checkpoint | ActorType::Pickup => {
                Classification::Immaterial
            }
            ActorType::Ladder | ActorType::Vine | ActorType::Sign => Classification::Overlapable,
            ActorType::Door | ActorType::Fence | ActorType::Crystal => Classification::Thin,
            ActorType::None | ActorType::Bomb | ActorType::PushSwitch | ActorType::Spring => {
                Classification::Solid
            }
        }
    }
}

/// Material behavior of a block with respect to depth queries.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Collides and fully hides whatever is behind it.
    #[default]
    Solid,
    /// Collides but does not count as opaque.
    Thin,
    /// Ignored by depth queries.
    Immaterial,
    /// Like `Thin`, and may share a cell with another instance.
    Overlapable,
}

impl Classification {
    /// Eligible as the nearest "surface" hit.
    #[inline]
    pub fn is_surface(self) -> bool {
        !matches!(self, Classification::Immaterial)
    }

    /// Eligible as the nearest "deep" hit.
    #[inline]
    pub fn is_opaque(self) -> bool {
        matches!(self, Classification::Solid)
    }

    #[inline]
    pub fn can_overlap(self) -> bool {
        matches!(self, Classification::Overlapable)
    }

    pub(crate) fn compile(
        actor: ActorType,
        immaterial: Option<bool>,
        thin: Option<bool>,
        seethrough: bool,
    ) -> Classification {
        if immaterial == Some(true) {
            return Classification::Immaterial;
        }
        let base = actor.default_classification();
        match base {
            Classification::Solid if thin == Some(true) || seethrough => Classification::Thin,
            Classification::Thin if thin == Some(false) => Classification::Solid,
            Classification::Immaterial if immaterial == Some(false) => Classification::Solid,
            other => other,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BlockType {
    pub id: BlockId,
    pub name: String,
    pub actor: ActorType,
    pub classification: Classification,
    pub seethrough: bool,
    pub no_cull: bool,
}

impl BlockType {
    /// Hides whatever lies behind it along the view axis.
    #[inline]
    pub fn occludes(&self) -> bool {
        self.classification.is_opaque() && !self.seethrough
    }
}
