use serde::Deserialize;
use trile_geom::Vec3;
use trile_view::{CameraFrame, Viewpoint, blend_forward};

/// Scripted camera for headless runs, read from the `[camera]` table.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct CameraScript {
    pub viewpoint: Viewpoint,
    pub center: [f32; 3],
    pub half_extent: [f32; 2],
    pub steps: Vec<CameraStep>,
}

impl Default for CameraScript {
    fn default() -> Self {
        Self {
            viewpoint: Viewpoint::Front,
            center: [24.0, 12.0, 24.0],
            half_extent: [16.0, 9.0],
            steps: Vec::new(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CameraStep {
    Hold { frames: u32 },
    Pan { to: [f32; 3], frames: u32 },
    Zoom { half_extent: [f32; 2], frames: u32 },
    /// Quarter turns; positive follows Front, Right, Back, Left.
    Rotate { turns: i32, frames: u32 },
    /// Tilt down by `pitch` degrees and back.
    Orbit { pitch: f32, frames: u32 },
    /// Dolly back under a perspective projection.
    Perspective { frames: u32 },
}

fn vec3(a: [f32; 3]) -> Vec3 {
    Vec3::new(a[0], a[1], a[2])
}

impl CameraScript {
    /// Expand the script into one frame per tick, starting settled on
    /// `viewpoint`.
    pub fn frames(&self) -> Vec<CameraFrame> {
        let mut vp = if self.viewpoint.is_orthographic() {
            self.viewpoint
        } else {
            Viewpoint::Front
        };
        let mut center = vec3(self.center);
        let mut half = (self.half_extent[0], self.half_extent[1]);
        let mut out = vec![CameraFrame::orthographic(vp, center, half)];

        for step in &self.steps {
            match *step {
                CameraStep::Hold { frames } => {
                    for _ in 0..frames {
                        out.push(CameraFrame::orthographic(vp, center, half));
                    }
                }
                CameraStep::Pan { to, frames } => {
                    let (from, to) = (center, vec3(to));
                    let n = frames.max(1);
                    for i in 1..=n {
                        let c = from.lerp(to, i as f32 / n as f32);
                        out.push(CameraFrame::orthographic(vp, c, half));
                    }
                    center = to;
                }
                CameraStep::Zoom { half_extent, frames } => {
                    let (w0, h0) = half;
                    let [w1, h1] = half_extent;
                    let n = frames.max(1);
                    for i in 1..=n {
                        let t = i as f32 / n as f32;
                        let h = (w0 + (w1 - w0) * t, h0 + (h1 - h0) * t);
                        out.push(CameraFrame::orthographic(vp, center, h));
                    }
                    half = (w1, h1);
                }
                CameraStep::Rotate { turns, frames } => {
                    let quarters = turns.unsigned_abs().max(1);
                    let per = (frames / quarters).max(1);
                    for _ in 0..turns.unsigned_abs() {
                        let next = vp.rotated(turns.signum());
                        for i in 1..per {
                            let fwd = blend_forward(vp, next, i as f32 / per as f32);
                            out.push(CameraFrame::orthographic(next, center, half).with_forward(fwd));
                        }
                        out.push(CameraFrame::orthographic(next, center, half));
                        vp = next;
                    }
                }
                CameraStep::Orbit { pitch, frames } => {
                    let base = vp.forward().unwrap_or(Vec3::new(0.0, 0.0, -1.0));
                    let n = frames.max(2);
                    for i in 1..n {
                        let a = pitch.to_radians() * (std::f32::consts::PI * i as f32 / n as f32).sin();
                        let fwd = (base * a.cos() + Vec3::new(0.0, -a.sin(), 0.0)).normalized();
                        out.push(CameraFrame::orthographic(vp, center, half).with_forward(fwd));
                    }
                    out.push(CameraFrame::orthographic(vp, center, half));
                }
                CameraStep::Perspective { frames } => {
                    let fwd = vp.forward().unwrap_or(Vec3::new(0.0, 0.0, -1.0));
                    for i in 0..frames {
                        let eye = center - fwd * (8.0 + i as f32);
                        out.push(CameraFrame::perspective(fwd, eye, half));
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trile_view::{ViewMotion, ViewTracker};

    fn script(steps: Vec<CameraStep>) -> CameraScript {
        CameraScript {
            steps,
            ..CameraScript::default()
        }
    }

    #[test]
    fn rotation_passes_through_rotating_and_settles() {
        let frames = script(vec![CameraStep::Rotate { turns: 2, frames: 8 }]).frames();
        assert_eq!(frames.len(), 1 + 8);
        let mut tracker = ViewTracker::new();
        let motions: Vec<_> = frames.iter().map(|f| tracker.observe(f)).collect();
        assert!(matches!(
            motions[1],
            ViewMotion::Rotating {
                from: Viewpoint::Front,
                to: Viewpoint::Right
            }
        ));
        assert_eq!(
            motions[4],
            ViewMotion::ViewpointChanged {
                from: Viewpoint::Front,
                to: Viewpoint::Right
            }
        );
        assert_eq!(tracker.settled(), Some(Viewpoint::Back));
    }

    #[test]
    fn orbit_returns_to_the_viewpoint() {
        let frames = script(vec![CameraStep::Orbit { pitch: 30.0, frames: 6 }]).frames();
        let mut tracker = ViewTracker::new();
        let motions: Vec<_> = frames.iter().map(|f| tracker.observe(f)).collect();
        assert!(motions[1..6].iter().all(|m| *m == ViewMotion::Orbit));
        assert_eq!(motions.last(), Some(&ViewMotion::Pan));
    }

    #[test]
    fn pan_and_hold() {
        let frames = script(vec![
            CameraStep::Pan {
                to: [30.0, 12.0, 24.0],
                frames: 3,
            },
            CameraStep::Hold { frames: 2 },
            CameraStep::Perspective { frames: 2 },
        ])
        .frames();
        assert_eq!(frames.len(), 1 + 3 + 2 + 2);
        assert_eq!(frames[3].center, Vec3::new(30.0, 12.0, 24.0));
        assert_eq!(frames[4], frames[5]);
        assert!(!frames[6].is_orthographic());
    }
}
