use std::ops::RangeInclusive;

use trile_geom::{Column, ColumnRect, Vec3};

use crate::viewpoint::{ViewAxes, Viewpoint};

/// Largest viewport, in columns, accepted before it is treated as degenerate.
pub const MAX_VIEW_COLUMNS: usize = 1 << 22;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Projection {
    Orthographic,
    Perspective,
}

/// Camera pose handed over by the camera collaborator once per frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraFrame {
    /// Target viewpoint. During a rotation this is already the destination.
    pub viewpoint: Viewpoint,
    /// Actual look direction, which lags behind `viewpoint` while rotating.
    pub forward: Vec3,
    /// World point at the middle of the screen.
    pub center: Vec3,
    /// Half the visible width and height in world units.
    pub half_extent: (f32, f32),
    pub projection: Projection,
}

impl CameraFrame {
    pub fn orthographic(viewpoint: Viewpoint, center: Vec3, half_extent: (f32, f32)) -> Self {
        let forward = viewpoint.forward().unwrap_or(Vec3::new(0.0, 0.0, -1.0));
        Self {
            viewpoint,
            forward,
            center,
            half_extent,
            projection: Projection::Orthographic,
        }
    }

    pub fn perspective(forward: Vec3, center: Vec3, half_extent: (f32, f32)) -> Self {
        Self {
            viewpoint: Viewpoint::Perspective,
            forward,
            center,
            half_extent,
            projection: Projection::Perspective,
        }
    }

    pub fn with_forward(mut self, forward: Vec3) -> Self {
        self.forward = forward;
        self
    }

    pub fn is_orthographic(&self) -> bool {
        self.projection == Projection::Orthographic && self.viewpoint.is_orthographic()
    }

    fn extent_ok(&self) -> bool {
        let (w, h) = self.half_extent;
        w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0 && self.center.is_finite()
    }

    /// Columns covered by the viewport under `axes`, grown by `margin` on
    /// every side. Empty when the extent is unusable or absurdly large.
    pub fn visible_columns(&self, axes: &ViewAxes, margin: i32) -> ColumnRect {
        let empty = ColumnRect::new(Column::new(0, 0), Column::new(-1, -1));
        if !self.extent_ok() {
            return empty;
        }
        let (cu, cv) = axes.screen(self.center);
        let (w, h) = self.half_extent;
        let m = margin.max(0) as f64;
        let approx = (2.0 * w as f64 + 2.0 * m + 2.0) * (2.0 * h as f64 + 2.0 * m + 2.0);
        if approx > MAX_VIEW_COLUMNS as f64 || cu.abs().max(cv.abs()) > 1.0e9 {
            return empty;
        }
        ColumnRect::new(
            Column::new(
                (cu - w).floor() as i32 - margin,
                (cv - h).floor() as i32 - margin,
            ),
            Column::new(
                (cu + w).floor() as i32 + margin,
                (cv + h).floor() as i32 + margin,
            ),
        )
    }

    /// Rows within `margin` of the viewport's vertical extent.
    pub fn vertical_band(&self, margin: f32) -> RangeInclusive<i32> {
        if !self.extent_ok() {
            return 1..=0;
        }
        let h = self.half_extent.1 + margin.max(0.0);
        let lo = (self.center.y - h).floor() as i32;
        let hi = (self.center.y + h).floor() as i32;
        lo..=hi
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visible_columns_cover_the_viewport() {
        let f = CameraFrame::orthographic(Viewpoint::Front, Vec3::new(4.5, 2.0, 0.0), (2.0, 1.0));
        let axes = Viewpoint::Front.axes().unwrap();
        let r = f.visible_columns(&axes, 0);
        assert_eq!(r.min, Column::new(2, 1));
        assert_eq!(r.max, Column::new(6, 3));
        let r = f.visible_columns(&axes, 1);
        assert_eq!(r.min, Column::new(1, 0));
    }

    #[test]
    fn degenerate_extent_yields_empty_rect() {
        let axes = Viewpoint::Right.axes().unwrap();
        let f = CameraFrame::orthographic(Viewpoint::Right, Vec3::ZERO, (0.0, 3.0));
        assert!(f.visible_columns(&axes, 2).is_empty());
        let f = CameraFrame::orthographic(Viewpoint::Right, Vec3::ZERO, (f32::INFINITY, 3.0));
        assert!(f.visible_columns(&axes, 0).is_empty());
        let f = CameraFrame::orthographic(Viewpoint::Right, Vec3::ZERO, (1.0e6, 1.0e6));
        assert!(f.visible_columns(&axes, 0).is_empty());
        assert!(f.vertical_band(0.0).contains(&0));
    }
}
