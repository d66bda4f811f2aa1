pub mod camera_controller;
pub mod camera_utils;
pub mod ortho_camera;

// Re-export main types
pub use camera_controller::CameraController;
pub use camera_utils::{Camera, CameraManager, CameraUniform, Viewport};
pub use ortho_camera::OrthographicCamera;
