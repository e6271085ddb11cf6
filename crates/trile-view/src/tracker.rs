use trile_geom::Vec3;

use crate::frame::CameraFrame;
use crate::viewpoint::Viewpoint;

const ALIGN_EPS: f32 = 1.0e-3;

/// How the camera moved since the previous observed frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewMotion {
    Still,
    /// Same orthographic viewpoint, viewport moved or zoomed.
    Pan,
    /// Settled on a different orthographic viewpoint. The first settled frame
    /// reports `from == to`.
    ViewpointChanged { from: Viewpoint, to: Viewpoint },
    /// Turning between two adjacent orthographic viewpoints.
    Rotating { from: Viewpoint, to: Viewpoint },
    /// Orthographic but not horizontal or not between adjacent viewpoints.
    Orbit,
    Perspective,
}

impl ViewMotion {
    pub fn is_still(self) -> bool {
        self == ViewMotion::Still
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Heading {
    Aligned,
    Between(Viewpoint),
    Free,
}

fn heading(frame: &CameraFrame) -> Heading {
    let len = frame.forward.length();
    if !frame.forward.is_finite() || len <= f32::EPSILON {
        return Heading::Free;
    }
    let f = frame.forward / len;
    let Some(target) = frame.viewpoint.forward() else {
        return Heading::Free;
    };
    if f.dot(target) >= 1.0 - ALIGN_EPS {
        return Heading::Aligned;
    }
    if f.y.abs() > ALIGN_EPS || f.dot(target) <= ALIGN_EPS {
        return Heading::Free;
    }
    [frame.viewpoint.rotated(1), frame.viewpoint.rotated(-1)]
        .into_iter()
        .filter_map(|vp| vp.forward().map(|fw| (vp, f.dot(fw))))
        .filter(|(_, d)| *d > ALIGN_EPS)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(vp, _)| Heading::Between(vp))
        .unwrap_or(Heading::Free)
}

/// Classifies each frame against the previous one.
#[derive(Default, Debug)]
pub struct ViewTracker {
    previous: Option<CameraFrame>,
    settled: Option<Viewpoint>,
}

impl ViewTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last orthographic viewpoint the camera came to rest on.
    pub fn settled(&self) -> Option<Viewpoint> {
        self.settled
    }

    pub fn observe(&mut self, frame: &CameraFrame) -> ViewMotion {
        let same = self.previous.as_ref() == Some(frame);
        let motion = if same {
            ViewMotion::Still
        } else if !frame.is_orthographic() {
            ViewMotion::Perspective
        } else {
            match heading(frame) {
                Heading::Aligned => match self.settled {
                    Some(v) if v == frame.viewpoint => ViewMotion::Pan,
                    Some(from) => ViewMotion::ViewpointChanged {
                        from,
                        to: frame.viewpoint,
                    },
                    None => ViewMotion::ViewpointChanged {
                        from: frame.viewpoint,
                        to: frame.viewpoint,
                    },
                },
                Heading::Between(from) => ViewMotion::Rotating {
                    from,
                    to: frame.viewpoint,
                },
                Heading::Free => ViewMotion::Orbit,
            }
        };
        if frame.is_orthographic() && heading(frame) == Heading::Aligned {
            self.settled = Some(frame.viewpoint);
        }
        if !matches!(motion, ViewMotion::Still | ViewMotion::Pan) {
            log::debug!(target: "view", "motion {:?}", motion);
        }
        self.previous = Some(*frame);
        motion
    }

    /// Forget history so the next frame is treated as a fresh viewpoint.
    pub fn reset(&mut self) {
        self.previous = None;
        self.settled = None;
    }
}

/// Forward vector turned `t` of the way from `from` to `to` around +Y.
pub fn blend_forward(from: Viewpoint, to: Viewpoint, t: f32) -> Vec3 {
    match (from.forward(), to.forward()) {
        (Some(a), Some(b)) => a.lerp(b, t.clamp(0.0, 1.0)).normalized(),
        (_, Some(b)) => b,
        (Some(a), None) => a,
        (None, None) => Vec3::new(0.0, 0.0, -1.0),
    }
}
