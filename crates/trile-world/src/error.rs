use std::fmt;

use trile_blocks::BlockId;
use trile_geom::Emplacement;

use crate::instance::InstanceId;

#[derive(Debug, Clone, PartialEq)]
pub enum WorldError {
    OutOfBounds(Emplacement),
    /// The cell already holds a primary and an overlap.
    CellFull(Emplacement),
    /// The cell is taken and neither block may overlap the other.
    CellOccupied(Emplacement),
    UnknownBlock(BlockId),
    UnknownInstance(InstanceId),
    /// `restore` on an instance that is not in the removed state.
    NotRemoved(InstanceId),
    NonFinitePosition,
}

impl fmt::Display for WorldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorldError::OutOfBounds(e) => {
                write!(f, "emplacement ({}, {}, {}) is outside the world", e.x, e.y, e.z)
            }
            WorldError::CellFull(e) => {
                write!(f, "cell ({}, {}, {}) already holds an overlap", e.x, e.y, e.z)
            }
            WorldError::CellOccupied(e) => write!(
                f,
                "cell ({}, {}, {}) is occupied by a block that cannot be overlapped",
                e.x, e.y, e.z
            ),
            WorldError::UnknownBlock(id) => write!(f, "unknown block id {}", id),
            WorldError::UnknownInstance(id) => write!(f, "unknown instance {}", id),
            WorldError::NotRemoved(id) => write!(f, "instance {} is not removed", id),
            WorldError::NonFinitePosition => write!(f, "position is not finite"),
        }
    }
}

impl std::error::Error for WorldError {}
