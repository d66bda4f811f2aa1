use super::camera_utils::{Camera, CameraUniform};
use crate::config::CameraConfig;
use cgmath::*;

/// Orthographic camera orbiting a target point.
///
/// The frustum keeps its vertical extent fixed; the horizontal extent follows
/// the viewport aspect ratio. `zoom` divides all four extents.
#[derive(Debug, Clone, Copy)]
pub struct OrthographicCamera {
    pub distance: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub eye: Vector3<f32>,
    pub target: Vector3<f32>,
    pub up: Vector3<f32>,
    pub bounds: OrbitCameraBounds,
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
    pub znear: f32,
    pub zfar: f32,
    pub zoom: f32,
    pub uniform: CameraUniform,
    home: CameraPose,
}

/// Orbit parameters the camera returns to on reset
#[derive(Debug, Clone, Copy)]
struct CameraPose {
    distance: f32,
    pitch: f32,
    yaw: f32,
    target: Vector3<f32>,
    zoom: f32,
}

impl Camera for OrthographicCamera {
    fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(
            Point3::from_vec(self.eye),
            Point3::from_vec(self.target),
            self.up,
        )
    }

    fn projection_matrix(&self) -> Matrix4<f32> {
        let zoom = self.zoom.max(f32::EPSILON);
        ortho(
            self.left / zoom,
            self.right / zoom,
            self.bottom / zoom,
            self.top / zoom,
            self.znear,
            self.zfar,
        )
    }

    fn eye(&self) -> Vector3<f32> {
        self.eye
    }
}

impl OrthographicCamera {
    /// Create a camera whose frustum spans `frustum_size` vertically
    pub fn new(frustum_size: f32, aspect: f32, znear: f32, zfar: f32) -> Self {
        let half = frustum_size / 2.0;
        let target = Vector3::zero();
        let mut camera = Self {
            distance: 10.0,
            pitch: 0.0,
            yaw: 0.0,
            eye: Vector3::zero(), // Will be auto-calculted in `update()` nevertheless.
            target,
            up: Vector3::unit_y(),
            bounds: OrbitCameraBounds::default(),
            left: -half * aspect,
            right: half * aspect,
            top: half,
            bottom: -half,
            znear,
            zfar,
            zoom: 1.0,
            uniform: CameraUniform::default(),
            home: CameraPose {
                distance: 10.0,
                pitch: 0.0,
                yaw: 0.0,
                target,
                zoom: 1.0,
            },
        };
        camera.update();
        camera
    }

    /// Build the session camera from configuration
    pub fn from_config(config: &CameraConfig, aspect: f32) -> Self {
        let mut camera = Self::new(config.frustum_size, aspect, config.near, config.far);
        camera.zoom = config.zoom;
        camera.look_from(config.position, config.target);
        camera.home = camera.pose();
        camera
    }

    /// Place the eye at `position` looking at `target`, converting to orbit parameters
    pub fn look_from(&mut self, position: Vector3<f32>, target: Vector3<f32>) {
        let offset = position - target;
        let distance = offset.magnitude();
        if distance <= f32::EPSILON {
            return;
        }

        self.target = target;
        self.distance = distance;
        self.yaw = offset.x.atan2(offset.z);
        self.pitch = (offset.y / distance)
            .asin()
            .clamp(self.bounds.min_pitch, self.bounds.max_pitch);
        self.update();
    }

    pub fn reset_to_default(&mut self) {
        let home = self.home;
        self.distance = home.distance;
        self.pitch = home.pitch;
        self.yaw = home.yaw;
        self.target = home.target;
        self.zoom = home.zoom;

        self.update(); // Recalculate eye position
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom.clamp(self.bounds.min_zoom, self.bounds.max_zoom);
    }

    /// Scale zoom multiplicatively so each wheel notch feels the same at any level
    pub fn add_zoom(&mut self, delta: f32) {
        self.set_zoom(self.zoom * (1.0 + delta));
    }

    pub fn set_pitch(&mut self, pitch: f32) {
        self.pitch = pitch.clamp(self.bounds.min_pitch, self.bounds.max_pitch);
        self.update();
    }

    pub fn add_pitch(&mut self, delta: f32) {
        self.set_pitch(self.pitch + delta);
    }

    pub fn set_yaw(&mut self, yaw: f32) {
        self.yaw = yaw;
        self.update();
    }

    pub fn add_yaw(&mut self, delta: f32) {
        self.set_yaw(self.yaw + delta);
    }

    /// Pans the camera relative to the current view direction
    /// delta.0 = horizontal pan (left/right relative to camera view)
    /// delta.1 = vertical pan (up/down relative to camera view)
    pub fn pan(&mut self, delta: (f32, f32)) {
        let forward = (self.target - self.eye).normalize();
        let right = forward.cross(self.up).normalize();
        let up = right.cross(forward).normalize();

        // Visible height shrinks with zoom, so pan less when zoomed in
        let pan_scale = (self.top - self.bottom) / self.zoom.max(f32::EPSILON);

        let movement = right * delta.0 * pan_scale + up * delta.1 * pan_scale;
        self.eye += movement;
        self.target += movement;
    }

    /// Recompute the horizontal extent for a new viewport; top/bottom stay put
    pub fn resize_projection(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        let aspect = width as f32 / height as f32;
        self.left = self.bottom * aspect;
        self.right = self.top * aspect;
    }

    pub fn update_view_proj(&mut self) {
        self.uniform.view_position = [self.eye.x, self.eye.y, self.eye.z, 1.0];
        self.uniform.view_proj = self.build_view_projection_matrix().into();
    }

    fn pose(&self) -> CameraPose {
        CameraPose {
            distance: self.distance,
            pitch: self.pitch,
            yaw: self.yaw,
            target: self.target,
            zoom: self.zoom,
        }
    }

    /// Updates the camera after changing `distance`, `pitch` or `yaw`.
    fn update(&mut self) {
        self.eye =
            calculate_cartesian_eye_position(self.pitch, self.yaw, self.distance, self.target);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OrbitCameraBounds {
    pub min_pitch: f32,
    pub max_pitch: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
}

impl Default for OrbitCameraBounds {
    fn default() -> Self {
        Self {
            // Stay clear of the poles where look_at degenerates with a Y up vector
            min_pitch: -std::f32::consts::FRAC_PI_2 + 1e-3,
            max_pitch: std::f32::consts::FRAC_PI_2 - 1e-3,
            min_zoom: 0.1,
            max_zoom: 50.0,
        }
    }
}

fn calculate_cartesian_eye_position(
    pitch: f32,
    yaw: f32,
    distance: f32,
    target: Vector3<f32>,
) -> Vector3<f32> {
    Vector3::new(
        distance * yaw.sin() * pitch.cos(),
        distance * pitch.sin(),
        distance * yaw.cos() * pitch.cos(),
    ) + target
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vector3<f32>, b: Vector3<f32>) -> bool {
        (a - b).magnitude() < 1e-4
    }

    #[test]
    fn test_resize_keeps_vertical_extent() {
        let mut camera = OrthographicCamera::new(3.0, 1.0, 0.1, 1000.0);

        for (width, height) in [(1920, 1080), (600, 900), (1000, 1000), (3, 1)] {
            camera.resize_projection(width, height);
            let aspect = width as f32 / height as f32;

            assert_eq!(camera.top, 1.5);
            assert_eq!(camera.bottom, -1.5);
            assert!(((camera.right - camera.left) - 3.0 * aspect).abs() < 1e-5);
            assert!((camera.left + camera.right).abs() < 1e-6);
        }
    }

    #[test]
    fn test_zero_sized_resize_is_ignored() {
        let mut camera = OrthographicCamera::new(3.0, 2.0, 0.1, 1000.0);
        camera.resize_projection(0, 500);
        assert_eq!(camera.left, -3.0);
        assert_eq!(camera.right, 3.0);
    }

    #[test]
    fn test_look_from_round_trips_position() {
        let mut camera = OrthographicCamera::new(3.0, 1.0, 0.1, 1000.0);
        camera.look_from(Vector3::new(2.0, 2.0, 2.0), Vector3::zero());

        assert!(approx(camera.eye, Vector3::new(2.0, 2.0, 2.0)));
        assert!((camera.distance - 12.0_f32.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn test_reset_returns_home() {
        let config = CameraConfig::default();
        let mut camera = OrthographicCamera::from_config(&config, 1.5);

        camera.add_yaw(0.7);
        camera.add_pitch(-0.3);
        camera.add_zoom(0.5);
        camera.pan((0.2, 0.1));
        camera.reset_to_default();

        assert!(approx(camera.eye, config.position));
        assert_eq!(camera.zoom, config.zoom);
    }

    #[test]
    fn test_zoom_shrinks_visible_extent() {
        let mut camera = OrthographicCamera::new(3.0, 1.0, 0.1, 1000.0);
        camera.set_zoom(2.0);

        let proj = camera.projection_matrix();
        // ortho maps `top / zoom` to clip y = 1
        let clip = proj * Vector4::new(0.0, 0.75, -1.0, 1.0);
        assert!((clip.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_pitch_is_clamped() {
        let mut camera = OrthographicCamera::new(3.0, 1.0, 0.1, 1000.0);
        camera.set_pitch(10.0);
        assert!(camera.pitch < std::f32::consts::FRAC_PI_2);
    }
}
