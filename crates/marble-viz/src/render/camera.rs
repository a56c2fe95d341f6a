//! Pinhole projection from world space to nannou window coordinates
//! (origin at the window center, y up, pixels).

use glam::{Vec2, Vec3};

const NEAR: f32 = 0.1;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    /// Vertical field of view, radians
    pub fov_y: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, 22.0),
            fov_y: 60f32.to_radians(),
        }
    }
}

impl Camera {
    /// Pixels per world unit at unit depth for a viewport `height` pixels tall
    pub fn focal(&self, height: f32) -> f32 {
        (height * 0.5) / (self.fov_y * 0.5).tan()
    }

    /// Screen position and pixels-per-unit at that depth. `None` behind the
    /// near plane.
    pub fn project(&self, point: Vec3, height: f32) -> Option<(Vec2, f32)> {
        let depth = self.eye.z - point.z;
        if depth <= NEAR {
            return None;
        }
        let scale = self.focal(height) / depth;
        let offset = point - self.eye;
        Some((Vec2::new(offset.x, offset.y) * scale, scale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_projects_to_origin() {
        let cam = Camera::default();
        let (p, _) = cam.project(Vec3::ZERO, 720.0).unwrap();
        assert_eq!(p, Vec2::ZERO);
    }

    #[test]
    fn test_frustum_edge_hits_window_edge() {
        let cam = Camera::default();
        let half_height = 22.0 * (30f32.to_radians()).tan();
        let (p, _) = cam.project(Vec3::new(0.0, half_height, 0.0), 720.0).unwrap();
        assert!((p.y - 360.0).abs() < 1e-2);
    }

    #[test]
    fn test_closer_is_larger() {
        let cam = Camera::default();
        let (_, far) = cam.project(Vec3::new(0.0, 0.0, -5.0), 720.0).unwrap();
        let (_, near) = cam.project(Vec3::new(0.0, 0.0, 5.0), 720.0).unwrap();
        assert!(near > far);
        assert!(cam.project(Vec3::new(0.0, 0.0, 30.0), 720.0).is_none());
    }
}
