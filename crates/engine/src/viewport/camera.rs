use glam::{Mat4, Vec2, Vec3, Vec4};

use super::picking::{Aabb, Ray};
use crate::state::settings::CameraSettings;

/// Pitch limit in degrees, either side of the horizon
pub const MAX_PITCH_DEGREES: f32 = 80.0;

/// Orbit camera for the room viewport
#[derive(Clone, Debug)]
pub struct OrbitCamera {
    /// Horizontal rotation angle (radians)
    pub yaw: f32,
    /// Vertical rotation angle (radians)
    pub pitch: f32,
    /// Distance from target
    pub distance: f32,
    /// Camera target point
    pub target: Vec3,
    /// Vertical field of view (radians)
    pub fov: f32,
    settings: CameraSettings,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new(CameraSettings::default())
    }
}

impl OrbitCamera {
    pub fn new(settings: CameraSettings) -> Self {
        let distance = 6.0_f32.clamp(settings.min_distance, settings.max_distance);
        Self {
            yaw: 0.6,
            pitch: 0.4,
            distance,
            target: Vec3::ZERO,
            fov: settings.fov_degrees.to_radians(),
            settings,
        }
    }

    pub fn settings(&self) -> &CameraSettings {
        &self.settings
    }

    /// Orbit by a pointer drag of `(dx, dy)` pixels.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        let k = self.settings.orbit_gain;
        let limit = MAX_PITCH_DEGREES.to_radians();
        self.yaw += dx * k;
        self.pitch = (self.pitch - dy * k).clamp(-limit, limit);
    }

    /// Move toward the target by `delta` pixels of pinch (or wheel units).
    pub fn zoom(&mut self, delta: f32) {
        self.distance = (self.distance - delta * self.settings.zoom_gain)
            .clamp(self.settings.min_distance, self.settings.max_distance);
    }

    /// Slide the target opposite to a two-pointer midpoint motion.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        let right = self.right_vector();
        let up = self.up_vector();
        let offset = (right * dx + up * dy) * self.settings.pan_gain;
        self.target -= offset;
    }

    /// Look at the center of `bounds` from a distance proportional to its
    /// largest extent.
    pub fn frame(&mut self, bounds: &Aabb) {
        self.target = bounds.center();
        self.distance = (bounds.max_extent() * self.settings.framing_factor)
            .clamp(self.settings.min_distance, self.settings.max_distance);
    }

    /// Camera position in world space
    pub fn eye_position(&self) -> Vec3 {
        let cy = self.yaw.cos();
        let sy = self.yaw.sin();
        let cp = self.pitch.cos();
        let sp = self.pitch.sin();

        self.target
            + Vec3::new(
                self.distance * cp * sy,
                self.distance * sp,
                self.distance * cp * cy,
            )
    }

    /// View matrix (world -> camera)
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye_position(), self.target, Vec3::Y)
    }

    /// Projection matrix (camera -> clip)
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        let far = (self.settings.max_distance * 4.0).max(200.0);
        Mat4::perspective_rh_gl(self.fov, aspect, 0.05, far)
    }

    /// Combined view-projection matrix
    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }

    fn right_vector(&self) -> Vec3 {
        let fwd = (self.target - self.eye_position()).normalize_or_zero();
        fwd.cross(Vec3::Y).normalize_or_zero()
    }

    fn up_vector(&self) -> Vec3 {
        let fwd = (self.target - self.eye_position()).normalize_or_zero();
        let right = self.right_vector();
        right.cross(fwd).normalize_or_zero()
    }

    /// Project a world point to viewport pixels; `None` when behind the camera.
    pub fn project(&self, point: Vec3, size: Vec2) -> Option<Vec2> {
        let vp = self.view_projection(size.x / size.y);
        let p = vp * point.extend(1.0);
        if p.w <= 0.0 {
            return None;
        }
        let ndc = p.truncate() / p.w;
        Some(Vec2::new(
            (ndc.x + 1.0) * 0.5 * size.x,
            (1.0 - ndc.y) * 0.5 * size.y,
        ))
    }

    /// Cast a ray from a viewport pixel (origin top-left) into the scene.
    pub fn screen_ray(&self, screen_pos: Vec2, size: Vec2) -> Ray {
        let aspect = size.x / size.y;

        // Screen → NDC
        let ndc_x = screen_pos.x / size.x * 2.0 - 1.0;
        let ndc_y = 1.0 - screen_pos.y / size.y * 2.0;

        // Inverse view-projection
        let vp_inv = self.view_projection(aspect).inverse();

        // Unproject near and far points
        let near_world = vp_inv * Vec4::new(ndc_x, ndc_y, -1.0, 1.0);
        let far_world = vp_inv * Vec4::new(ndc_x, ndc_y, 1.0, 1.0);

        let near = near_world.truncate() / near_world.w;
        let far = far_world.truncate() / far_world.w;

        Ray {
            origin: self.eye_position(),
            direction: (far - near).normalize_or_zero(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eye_position_spherical() {
        let mut cam = OrbitCamera::default();
        cam.yaw = 0.0;
        cam.pitch = 0.0;
        cam.distance = 5.0;
        assert!(cam.eye_position().abs_diff_eq(Vec3::new(0.0, 0.0, 5.0), 1e-5));

        cam.yaw = std::f32::consts::FRAC_PI_2;
        assert!(cam.eye_position().abs_diff_eq(Vec3::new(5.0, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn test_pitch_clamped() {
        let mut cam = OrbitCamera::default();
        cam.rotate(0.0, -100_000.0);
        assert!((cam.pitch - 80f32.to_radians()).abs() < 1e-6);
        cam.rotate(0.0, 100_000.0);
        assert!((cam.pitch + 80f32.to_radians()).abs() < 1e-6);
    }

    #[test]
    fn test_rotate_gains() {
        let mut cam = OrbitCamera::default();
        let (yaw, pitch) = (cam.yaw, cam.pitch);
        cam.rotate(10.0, 4.0);
        assert!((cam.yaw - (yaw + 0.05)).abs() < 1e-6);
        assert!((cam.pitch - (pitch - 0.02)).abs() < 1e-6);
    }

    #[test]
    fn test_zoom_clamped() {
        let mut cam = OrbitCamera::default();
        cam.distance = 6.0;
        cam.zoom(100.0);
        assert!((cam.distance - 5.0).abs() < 1e-5);
        cam.zoom(1e6);
        assert_eq!(cam.distance, 0.5);
        cam.zoom(-1e6);
        assert_eq!(cam.distance, 50.0);
    }

    #[test]
    fn test_pan_moves_against_drag() {
        let mut cam = OrbitCamera::default();
        cam.yaw = 0.0;
        cam.pitch = 0.0;
        cam.pan(100.0, 0.0);
        // looking down -Z, right is +X; target moves left
        assert!(cam.target.abs_diff_eq(Vec3::new(-0.2, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn test_frame_distance() {
        let mut cam = OrbitCamera::default();
        cam.frame(&Aabb::new(Vec3::new(-2.0, 0.0, -1.0), Vec3::new(2.0, 2.5, 1.0)));
        assert_eq!(cam.target, Vec3::new(0.0, 1.25, 0.0));
        assert!((cam.distance - 6.0).abs() < 1e-6);

        let settings = CameraSettings {
            max_distance: 5.0,
            ..Default::default()
        };
        let mut tight = OrbitCamera::new(settings);
        tight.frame(&Aabb::new(Vec3::ZERO, Vec3::splat(4.0)));
        assert_eq!(tight.distance, 5.0);
    }

    #[test]
    fn test_center_ray_hits_target() {
        let cam = OrbitCamera::default();
        let size = Vec2::new(800.0, 600.0);
        let ray = cam.screen_ray(size * 0.5, size);
        let to_target = (cam.target - ray.origin).normalize();
        assert!(ray.direction.abs_diff_eq(to_target, 1e-4));
    }

    #[test]
    fn test_project_inverts_screen_ray() {
        let cam = OrbitCamera::default();
        let size = Vec2::new(640.0, 480.0);
        let pixel = Vec2::new(100.0, 380.0);
        let ray = cam.screen_ray(pixel, size);
        let point = ray.origin + ray.direction * 3.0;
        let back = cam.project(point, size).unwrap();
        assert!(back.abs_diff_eq(pixel, 0.05), "{back:?}");
    }
}
