//! Global uniform bindings for camera and lighting
//!
//! Everything here is shared by every draw in a frame and bound at slot 0 of
//! both render pipelines.

use cgmath::{InnerSpace, Vector3};

use crate::{
    config::DisplayConfig,
    gfx::camera::camera_utils::CameraUniform,
    wgpu_utils::{
        binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
        binding_types,
        uniform_buffer::UniformBuffer,
    },
};

/// Global uniform buffer content
///
/// MUST match the `Globals` struct in `shader.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GlobalUBOContent {
    pub view_proj: [[f32; 4]; 4],
    pub view_position: [f32; 4],
    /// Unit direction towards the light in xyz, intensity in w
    pub light_direction: [f32; 4],
    /// Ambient light colour, w unused
    pub ambient: [f32; 4],
}

/// Directional light plus ambient term
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LightConfig {
    pub direction: Vector3<f32>,
    pub intensity: f32,
    pub ambient: [f32; 3],
}

impl Default for LightConfig {
    fn default() -> Self {
        Self::from(&DisplayConfig::default())
    }
}

impl From<&DisplayConfig> for LightConfig {
    fn from(display: &DisplayConfig) -> Self {
        Self {
            direction: display.light_direction,
            intensity: display.light_intensity,
            ambient: display.ambient,
        }
    }
}

impl GlobalUBOContent {
    pub fn new(camera: &CameraUniform, light: &LightConfig) -> Self {
        let direction = if light.direction.magnitude2() > 0.0 {
            light.direction.normalize()
        } else {
            Vector3::unit_y()
        };

        Self {
            view_proj: camera.view_proj,
            view_position: camera.view_position,
            light_direction: [direction.x, direction.y, direction.z, light.intensity],
            ambient: [light.ambient[0], light.ambient[1], light.ambient[2], 0.0],
        }
    }
}

/// Type alias for the global uniform buffer
pub type GlobalUBO = UniformBuffer<GlobalUBOContent>;

/// Updates the global uniform buffer with camera and light data
pub fn update_global_ubo(
    ubo: &mut GlobalUBO,
    queue: &wgpu::Queue,
    camera: &CameraUniform,
    light: &LightConfig,
) {
    ubo.update_content(queue, GlobalUBOContent::new(camera, light));
}

/// Bind group layout and bind group for the global uniforms
pub struct GlobalBindings {
    bind_group_layout: BindGroupLayoutWithDesc,
    bind_group: wgpu::BindGroup,
}

impl GlobalBindings {
    pub fn new(device: &wgpu::Device, ubo: &GlobalUBO) -> Self {
        let bind_group_layout = BindGroupLayoutBuilder::new()
            .next_binding_rendering(binding_types::uniform())
            .create(device, "Globals Bind Group Layout");

        let bind_group = BindGroupBuilder::new(&bind_group_layout)
            .resource(ubo.binding_resource())
            .create(device, "Globals Bind Group");

        GlobalBindings {
            bind_group_layout,
            bind_group,
        }
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout.layout
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}
