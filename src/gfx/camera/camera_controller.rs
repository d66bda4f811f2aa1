use log::debug;

use super::ortho_camera::OrthographicCamera;

/// Turns pointer drags and wheel input into orbit, pan and zoom.
///
/// Left drag orbits, shift + drag pans, the wheel zooms. While disabled every
/// input is ignored, which is how the manipulator keeps the view still during
/// a handle drag.
pub struct CameraController {
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    enabled: bool,
    is_shift_held: bool,
    is_mouse_pressed: bool,
    last_pointer: Option<(f32, f32)>,
}

impl CameraController {
    pub fn new(rotate_speed: f32, zoom_speed: f32) -> Self {
        Self {
            rotate_speed,
            zoom_speed,
            pan_speed: 0.002,
            enabled: true,
            is_shift_held: false,
            is_mouse_pressed: false,
            last_pointer: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable camera interaction. Disabling drops any drag in progress.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            debug!("Camera interaction {}", if enabled { "enabled" } else { "disabled" });
        }
        self.enabled = enabled;
        if !enabled {
            self.is_mouse_pressed = false;
            self.last_pointer = None;
        }
    }

    pub fn set_shift_held(&mut self, held: bool) {
        self.is_shift_held = held;
    }

    pub fn pointer_pressed(&mut self, position: (f32, f32)) {
        if !self.enabled {
            return;
        }
        self.is_mouse_pressed = true;
        self.last_pointer = Some(position);
    }

    pub fn pointer_released(&mut self) {
        self.is_mouse_pressed = false;
        self.last_pointer = None;
    }

    /// Apply pointer motion to the camera. Returns true when the camera moved.
    pub fn pointer_moved(&mut self, position: (f32, f32), camera: &mut OrthographicCamera) -> bool {
        if !self.enabled || !self.is_mouse_pressed {
            return false;
        }
        let Some(last) = self.last_pointer.replace(position) else {
            return false;
        };

        let delta = (position.0 - last.0, position.1 - last.1);
        if delta == (0.0, 0.0) {
            return false;
        }

        if self.is_shift_held {
            // SHIFT + DRAG = PAN (move focus point)
            camera.pan((-delta.0 * self.pan_speed, delta.1 * self.pan_speed));
        } else {
            // NORMAL DRAG = ROTATE (orbit around focus)
            camera.add_yaw(-delta.0 * self.rotate_speed);
            camera.add_pitch(delta.1 * self.rotate_speed);
        }
        true
    }

    /// Apply a wheel delta in lines; positive zooms in. Returns true when the camera changed.
    pub fn scroll(&mut self, lines: f32, camera: &mut OrthographicCamera) -> bool {
        if !self.enabled || lines == 0.0 {
            return false;
        }
        camera.add_zoom(lines * self.zoom_speed);
        true
    }

    /// Returns true if currently panning
    pub fn is_panning(&self) -> bool {
        self.is_mouse_pressed && self.is_shift_held
    }

    /// Returns true if currently rotating
    pub fn is_rotating(&self) -> bool {
        self.is_mouse_pressed && !self.is_shift_held
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> OrthographicCamera {
        OrthographicCamera::new(3.0, 1.0, 0.1, 1000.0)
    }

    #[test]
    fn test_drag_orbits() {
        let mut camera = camera();
        let mut controller = CameraController::new(0.01, 0.1);
        let yaw = camera.yaw;

        controller.pointer_pressed((100.0, 100.0));
        assert!(controller.is_rotating());
        assert!(controller.pointer_moved((150.0, 100.0), &mut camera));
        assert!((camera.yaw - (yaw - 0.5)).abs() < 1e-6);
    }

    #[test]
    fn test_shift_drag_pans() {
        let mut camera = camera();
        let mut controller = CameraController::new(0.01, 0.1);
        let target = camera.target;

        controller.set_shift_held(true);
        controller.pointer_pressed((0.0, 0.0));
        assert!(controller.is_panning());
        controller.pointer_moved((10.0, 0.0), &mut camera);
        assert_ne!(camera.target, target);
    }

    #[test]
    fn test_disabled_controller_ignores_input() {
        let mut camera = camera();
        let mut controller = CameraController::new(0.01, 0.1);
        let (yaw, zoom) = (camera.yaw, camera.zoom);

        controller.pointer_pressed((0.0, 0.0));
        controller.set_enabled(false);
        assert!(!controller.pointer_moved((40.0, 40.0), &mut camera));
        assert!(!controller.scroll(1.0, &mut camera));
        assert_eq!(camera.yaw, yaw);
        assert_eq!(camera.zoom, zoom);

        // A fresh press is needed once re-enabled
        controller.set_enabled(true);
        assert!(!controller.pointer_moved((80.0, 80.0), &mut camera));
    }

    #[test]
    fn test_scroll_zooms_in() {
        let mut camera = camera();
        let mut controller = CameraController::new(0.01, 0.1);
        assert!(controller.scroll(1.0, &mut camera));
        assert!(camera.zoom > 1.0);
    }
}
