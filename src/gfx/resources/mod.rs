// src/gfx/resources/mod.rs
//! GPU resource management
//!
//! Handles depth buffers, uniform bind groups, mesh buffers and materials.

pub mod global_bindings;
pub mod material;
pub mod object_bindings;
pub mod texture_resource;

// Re-export main types
pub use global_bindings::{update_global_ubo, GlobalBindings, GlobalUBO, GlobalUBOContent, LightConfig};
pub use material::{Material, MaterialUniform};
pub use object_bindings::{GpuMesh, ObjectBindings, ObjectSlot, ObjectUniform};
pub use texture_resource::TextureResource;
