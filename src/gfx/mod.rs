//! # Graphics Module
//!
//! Everything between a mesh file and pixels on screen.
//!
//! ## Architecture Overview
//!
//! - **Geometry** ([`geometry`]) - Immutable triangle meshes and primitives
//! - **Loader** ([`loader`]) - Background STL fetch and decode
//! - **Scene** ([`scene`]) - Socketable registry and the single movable object
//! - **Picking** ([`picking`]) - Screen-to-ray conversion and ray/mesh intersection
//! - **Gizmos** ([`gizmos`]) - The snapped translation manipulator
//! - **Camera** ([`camera`]) - Orthographic orbit camera and its controller
//! - **Rendering** ([`rendering`]) - wgpu pipelines and frame submission
//! - **Resources** ([`resources`]) - Materials, uniforms and depth buffers
//!
//! Only [`rendering`] and [`resources`] touch the GPU. The other modules are
//! plain data and run headless, which is how the tests drive them.

pub mod camera;
pub mod geometry;
pub mod gizmos;
pub mod loader;
pub mod picking;
pub mod rendering;
pub mod resources;
pub mod scene;

// Re-export commonly used types
pub use camera::OrthographicCamera;
pub use rendering::render_engine::RenderEngine;
