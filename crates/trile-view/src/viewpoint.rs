use serde::{Deserialize, Serialize};
use trile_geom::{Axis, Column, Emplacement, Face, Vec3};

/// Discrete camera orientation. The four orthographic viewpoints look along
/// a horizontal grid axis; `Perspective` is the free mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Viewpoint {
    Front,
    Right,
    Back,
    Left,
    Perspective,
}

impl Viewpoint {
    /// Clockwise rotation order.
    pub const ORTHOGRAPHIC: [Viewpoint; 4] = [
        Viewpoint::Front,
        Viewpoint::Right,
        Viewpoint::Back,
        Viewpoint::Left,
    ];

    #[inline]
    pub fn is_orthographic(self) -> bool {
        self != Viewpoint::Perspective
    }

    pub fn axes(self) -> Option<ViewAxes> {
        let (depth, depth_sign, side, right_sign) = match self {
            Viewpoint::Front => (Axis::Z, -1, Axis::X, 1),
            Viewpoint::Right => (Axis::X, -1, Axis::Z, -1),
            Viewpoint::Back => (Axis::Z, 1, Axis::X, -1),
            Viewpoint::Left => (Axis::X, 1, Axis::Z, 1),
            Viewpoint::Perspective => return None,
        };
        Some(ViewAxes {
            viewpoint: self,
            depth,
            depth_sign,
            side,
            right_sign,
        })
    }

    pub fn forward(self) -> Option<Vec3> {
        self.axes().map(|a| a.forward())
    }

    fn index(self) -> Option<usize> {
        Self::ORTHOGRAPHIC.iter().position(|v| *v == self)
    }

    /// Step through the rotation order; positive is clockwise.
    pub fn rotated(self, steps: i32) -> Viewpoint {
        match self.index() {
            Some(i) => Self::ORTHOGRAPHIC[(i as i32 + steps).rem_euclid(4) as usize],
            None => self,
        }
    }

    /// Face of a block that points at the camera.
    pub fn facing_face(self) -> Option<Face> {
        self.axes().map(|a| a.facing_face())
    }

    /// One quarter turn apart.
    pub fn is_adjacent(self, other: Viewpoint) -> bool {
        match (self.index(), other.index()) {
            (Some(a), Some(b)) => (a as i32 - b as i32).rem_euclid(4) % 2 == 1,
            _ => false,
        }
    }
}

/// Screen-space axes of an orthographic viewpoint.
///
/// Columns are keyed by the raw world coordinate on the side axis and the
/// height `y`; depth is the raw coordinate on the forward axis. `depth_sign`
/// is the sign of the forward direction on that axis, so larger
/// `depth * depth_sign` is farther from the camera.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ViewAxes {
    pub viewpoint: Viewpoint,
    pub depth: Axis,
    pub depth_sign: i32,
    pub side: Axis,
    pub right_sign: i32,
}

impl ViewAxes {
    #[inline]
    pub fn forward(&self) -> Vec3 {
        axis_vec(self.depth, self.depth_sign as f32)
    }

    #[inline]
    pub fn right(&self) -> Vec3 {
        axis_vec(self.side, self.right_sign as f32)
    }

    #[inline]
    pub fn facing_face(&self) -> Face {
        Face::from_axis(self.depth, -self.depth_sign)
    }

    #[inline]
    pub fn column(&self, e: Emplacement) -> Column {
        Column::new(e.axis(self.side), e.y)
    }

    #[inline]
    pub fn depth_of(&self, e: Emplacement) -> i32 {
        e.axis(self.depth)
    }

    #[inline]
    pub fn emplacement(&self, column: Column, depth: i32) -> Emplacement {
        Emplacement::new(0, column.v, 0)
            .with_axis(self.side, column.u)
            .with_axis(self.depth, depth)
    }

    /// Column under a world position.
    #[inline]
    pub fn column_at(&self, p: Vec3) -> Column {
        Column::new(p.axis(self.side).floor() as i32, p.y.floor() as i32)
    }

    /// Raw screen coordinates: side axis, then height.
    #[inline]
    pub fn screen(&self, p: Vec3) -> (f32, f32) {
        (p.axis(self.side), p.y)
    }

    /// Distance along the view direction. Smaller is nearer the camera.
    #[inline]
    pub fn view_depth(&self, p: Vec3) -> f32 {
        p.axis(self.depth) * self.depth_sign as f32
    }

    /// Walk the inclusive raw range `[lo, hi]` from the camera outward.
    pub fn near_to_far(&self, lo: i32, hi: i32) -> DepthWalk {
        if self.depth_sign > 0 {
            DepthWalk::new(lo, hi, 1)
        } else {
            DepthWalk::new(hi, lo, -1)
        }
    }

    pub fn far_to_near(&self, lo: i32, hi: i32) -> DepthWalk {
        if self.depth_sign > 0 {
            DepthWalk::new(hi, lo, -1)
        } else {
            DepthWalk::new(lo, hi, 1)
        }
    }
}

fn axis_vec(axis: Axis, s: f32) -> Vec3 {
    match axis {
        Axis::X => Vec3::new(s, 0.0, 0.0),
        Axis::Y => Vec3::new(0.0, s, 0.0),
        Axis::Z => Vec3::new(0.0, 0.0, s),
    }
}

/// Inclusive walk over raw depths in one direction.
#[derive(Clone, Debug)]
pub struct DepthWalk {
    next: Option<i32>,
    last: i32,
    step: i32,
}

impl DepthWalk {
    fn new(first: i32, last: i32, step: i32) -> Self {
        let empty = (last - first) * step < 0;
        Self {
            next: if empty { None } else { Some(first) },
            last,
            step,
        }
    }
}

impl Iterator for DepthWalk {
    type Item = i32;

    fn next(&mut self) -> Option<i32> {
        let cur = self.next?;
        self.next = if cur == self.last {
            None
        } else {
            Some(cur + self.step)
        };
        Some(cur)
    }
}
