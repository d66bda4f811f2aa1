use cgmath::{Matrix4, SquareMatrix, Vector3};

use super::{camera_controller::CameraController, ortho_camera::OrthographicCamera};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.5,
    0.0, 0.0, 0.0, 1.0,
);

/// Pairs the scene camera with the input controller that drives it
pub struct CameraManager {
    pub camera: OrthographicCamera,
    pub controller: CameraController,
}

impl CameraManager {
    pub fn new(camera: OrthographicCamera, controller: CameraController) -> Self {
        Self { camera, controller }
    }

    /// Get the view projection matrix from the camera
    pub fn get_view_proj_matrix(&self) -> cgmath::Matrix4<f32> {
        self.camera.build_view_projection_matrix()
    }
}

/// Anything the picker can cast rays through.
///
/// Matrices use the OpenGL clip convention (depth in [-1, 1]); the wgpu depth
/// remap is applied only when building the GPU matrix.
pub trait Camera {
    fn view_matrix(&self) -> Matrix4<f32>;

    fn projection_matrix(&self) -> Matrix4<f32>;

    fn eye(&self) -> Vector3<f32>;

    fn build_view_projection_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * self.projection_matrix() * self.view_matrix()
    }
}

/// Size of the drawable area in physical pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn aspect(&self) -> f32 {
        self.width / self.height
    }

    /// Convert pixel coordinates to normalized device coordinates.
    ///
    /// Both axes land in [-1, 1]; y is flipped because screen rows grow
    /// downward.
    pub fn to_ndc(&self, x: f32, y: f32) -> (f32, f32) {
        ((2.0 * x) / self.width - 1.0, 1.0 - (2.0 * y) / self.height)
    }
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable, Debug)]
pub struct CameraUniform {
    /// The eye position of the camera in homogenous coordinates.
    ///
    /// Homogenous coordinates are used to fullfill the 16 byte alignment requirement.
    pub view_position: [f32; 4],

    /// Contains the view projection matrix.
    pub view_proj: [[f32; 4]; 4],
}

impl Default for CameraUniform {
    /// Creates a default [CameraUniform].
    fn default() -> Self {
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::<f32>::identity().into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ndc_corners() {
        let viewport = Viewport::new(800.0, 600.0);

        assert_eq!(viewport.to_ndc(0.0, 0.0), (-1.0, 1.0));
        assert_eq!(viewport.to_ndc(800.0, 600.0), (1.0, -1.0));
        assert_eq!(viewport.to_ndc(400.0, 300.0), (0.0, 0.0));
    }

    #[test]
    fn test_empty_viewport() {
        assert!(Viewport::new(0.0, 600.0).is_empty());
        assert!(!Viewport::new(1.0, 1.0).is_empty());
    }
}
