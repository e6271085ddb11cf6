use crate::Vec3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// One of the six faces of a unit cell, named by its outward normal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Face {
    PosX,
    NegX,
    PosY,
    NegY,
    PosZ,
    NegZ,
}

impl Face {
    pub const ALL: [Face; 6] = [
        Face::PosX,
        Face::NegX,
        Face::PosY,
        Face::NegY,
        Face::PosZ,
        Face::NegZ,
    ];

    pub const HORIZONTAL: [Face; 4] = [Face::PosX, Face::NegX, Face::PosZ, Face::NegZ];

    #[inline]
    pub fn axis(self) -> Axis {
        match self {
            Face::PosX | Face::NegX => Axis::X,
            Face::PosY | Face::NegY => Axis::Y,
            Face::PosZ | Face::NegZ => Axis::Z,
        }
    }

    #[inline]
    pub fn sign(self) -> i32 {
        match self {
            Face::PosX | Face::PosY | Face::PosZ => 1,
            Face::NegX | Face::NegY | Face::NegZ => -1,
        }
    }

    #[inline]
    pub fn opposite(self) -> Face {
        match self {
            Face::PosX => Face::NegX,
            Face::NegX => Face::PosX,
            Face::PosY => Face::NegY,
            Face::NegY => Face::PosY,
            Face::PosZ => Face::NegZ,
            Face::NegZ => Face::PosZ,
        }
    }

    #[inline]
    pub fn normal(self) -> Vec3 {
        let s = self.sign() as f32;
        match self.axis() {
            Axis::X => Vec3::new(s, 0.0, 0.0),
            Axis::Y => Vec3::new(0.0, s, 0.0),
            Axis::Z => Vec3::new(0.0, 0.0, s),
        }
    }

    #[inline]
    pub fn from_axis(axis: Axis, sign: i32) -> Face {
        match (axis, sign >= 0) {
            (Axis::X, true) => Face::PosX,
            (Axis::X, false) => Face::NegX,
            (Axis::Y, true) => Face::PosY,
            (Axis::Y, false) => Face::NegY,
            (Axis::Z, true) => Face::PosZ,
            (Axis::Z, false) => Face::NegZ,
        }
    }
}

/// Integer grid cell coordinate. Cell `(x, y, z)` spans `[x, x + 1)` on each axis.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct Emplacement {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Emplacement {
    #[inline]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Cell containing `p`.
    #[inline]
    pub fn containing(p: Vec3) -> Self {
        Self::new(p.x.floor() as i32, p.y.floor() as i32, p.z.floor() as i32)
    }

    #[inline]
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    #[inline]
    pub fn step(self, face: Face) -> Self {
        self.with_axis(face.axis(), self.axis(face.axis()) + face.sign())
    }

    #[inline]
    pub fn axis(self, axis: Axis) -> i32 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    #[inline]
    pub fn with_axis(self, axis: Axis, v: i32) -> Self {
        match axis {
            Axis::X => Self { x: v, ..self },
            Axis::Y => Self { y: v, ..self },
            Axis::Z => Self { z: v, ..self },
        }
    }

    #[inline]
    pub fn center(self) -> Vec3 {
        Vec3::new(
            self.x as f32 + 0.5,
            self.y as f32 + 0.5,
            self.z as f32 + 0.5,
        )
    }

    /// Componentwise `0 <= c < size`.
    #[inline]
    pub fn within(self, size: Emplacement) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.z >= 0
            && self.x < size.x
            && self.y < size.y
            && self.z < size.z
    }
}

impl From<(i32, i32, i32)> for Emplacement {
    fn from(value: (i32, i32, i32)) -> Self {
        Self::new(value.0, value.1, value.2)
    }
}

impl From<Emplacement> for (i32, i32, i32) {
    fn from(value: Emplacement) -> Self {
        (value.x, value.y, value.z)
    }
}

/// Screen-space column key: `u` is the horizontal screen axis, `v` is height.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(test, derive(proptest_derive::Arbitrary))]
pub struct Column {
    pub u: i32,
    pub v: i32,
}

impl Column {
    #[inline]
    pub const fn new(u: i32, v: i32) -> Self {
        Self { u, v }
    }

    #[inline]
    pub fn offset(self, du: i32, dv: i32) -> Self {
        Self::new(self.u + du, self.v + dv)
    }
}

/// Inclusive rectangle of columns. Empty when `min` exceeds `max` on either axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ColumnRect {
    pub min: Column,
    pub max: Column,
}

impl ColumnRect {
    #[inline]
    pub const fn new(min: Column, max: Column) -> Self {
        Self { min, max }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.u > self.max.u || self.min.v > self.max.v
    }

    #[inline]
    pub fn width(&self) -> i32 {
        (self.max.u - self.min.u + 1).max(0)
    }

    #[inline]
    pub fn height(&self) -> i32 {
        (self.max.v - self.min.v + 1).max(0)
    }

    #[inline]
    pub fn area(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    #[inline]
    pub fn contains(&self, c: Column) -> bool {
        c.u >= self.min.u && c.u <= self.max.u && c.v >= self.min.v && c.v <= self.max.v
    }

    pub fn intersect(&self, other: &ColumnRect) -> ColumnRect {
        ColumnRect::new(
            Column::new(self.min.u.max(other.min.u), self.min.v.max(other.min.v)),
            Column::new(self.max.u.min(other.max.u), self.max.v.min(other.max.v)),
        )
    }

    /// Columns in `self` that are not in `other`.
    pub fn difference<'a>(&'a self, other: &'a ColumnRect) -> impl Iterator<Item = Column> + 'a {
        self.iter().filter(move |c| !other.contains(*c))
    }

    #[inline]
    pub fn iter(&self) -> ColumnRectIter {
        ColumnRectIter {
            rect: *self,
            next: if self.is_empty() { None } else { Some(self.min) },
        }
    }
}

/// Row-major walk over a [`ColumnRect`].
#[derive(Clone, Debug)]
pub struct ColumnRectIter {
    rect: ColumnRect,
    next: Option<Column>,
}

impl Iterator for ColumnRectIter {
    type Item = Column;

    fn next(&mut self) -> Option<Column> {
        let cur = self.next?;
        self.next = if cur.u < self.rect.max.u {
            Some(Column::new(cur.u + 1, cur.v))
        } else if cur.v < self.rect.max.v {
            Some(Column::new(self.rect.min.u, cur.v + 1))
        } else {
            None
        };
        Some(cur)
    }
}
