//! Per-object GPU resources
//!
//! Each drawable gets its own [`ObjectUniform`] buffer and bind group at slot 1.
//! Mesh buffers are uploaded once per geometry and shared between objects.

use cgmath::{Matrix, Matrix4, SquareMatrix};
use wgpu::util::DeviceExt;

use crate::{
    gfx::{geometry::MeshGeometry, resources::material::Material, scene::vertex::Vertex3D},
    wgpu_utils::{
        binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
        binding_types,
        uniform_buffer::UniformBuffer,
    },
};

use super::material::MaterialUniform;

/// MUST match the `Object` struct in `shader.wgsl`
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObjectUniform {
    pub model: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
    pub material: MaterialUniform,
}

impl ObjectUniform {
    pub fn new(model: Matrix4<f32>, material: &Material) -> Self {
        let normal_matrix = model
            .invert()
            .map(|inverse| inverse.transpose())
            .unwrap_or_else(Matrix4::identity);

        Self {
            model: model.into(),
            normal_matrix: normal_matrix.into(),
            material: material.to_uniform(),
        }
    }
}

/// Layout shared by every object bind group
pub struct ObjectBindings {
    layout: BindGroupLayoutWithDesc,
}

impl ObjectBindings {
    pub fn new(device: &wgpu::Device) -> Self {
        let layout = BindGroupLayoutBuilder::new()
            .next_binding_rendering(binding_types::uniform())
            .create(device, "Object Bind Group Layout");
        Self { layout }
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout.layout
    }

    pub fn create_slot(&self, device: &wgpu::Device, label: &str, content: ObjectUniform) -> ObjectSlot {
        let ubo = UniformBuffer::new_with_data(device, &content);
        let bind_group = BindGroupBuilder::new(&self.layout)
            .resource(ubo.binding_resource())
            .create(device, label);
        ObjectSlot { ubo, bind_group }
    }
}

/// Uniform buffer and bind group for one drawable
pub struct ObjectSlot {
    ubo: UniformBuffer<ObjectUniform>,
    bind_group: wgpu::BindGroup,
}

impl ObjectSlot {
    pub fn update(&mut self, queue: &wgpu::Queue, content: ObjectUniform) {
        self.ubo.update_content(queue, content);
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

/// Vertex and index buffers for an uploaded mesh
pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

impl GpuMesh {
    pub fn upload(device: &wgpu::Device, label: &str, geometry: &MeshGeometry) -> Self {
        let vertices: Vec<Vertex3D> = geometry.to_vertices();
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Vertex Buffer", label)),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Index Buffer", label)),
            contents: bytemuck::cast_slice(geometry.indices()),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: geometry.indices().len() as u32,
        }
    }

    pub fn draw<'a>(&'a self, render_pass: &mut wgpu::RenderPass<'a>) {
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::Vector4;

    #[test]
    fn test_uniform_size_matches_shader() {
        assert_eq!(std::mem::size_of::<ObjectUniform>(), 160);
    }

    #[test]
    fn test_normal_matrix_undoes_non_uniform_scale() {
        let model = Matrix4::from_nonuniform_scale(2.0, 1.0, 1.0);
        let uniform = ObjectUniform::new(model, &Material::default());
        let normal_matrix = Matrix4::from(uniform.normal_matrix);

        let n = normal_matrix * Vector4::new(1.0, 0.0, 0.0, 0.0);
        assert!((n.x - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_singular_model_uses_identity_normals() {
        let model = Matrix4::from_scale(0.0);
        let uniform = ObjectUniform::new(model, &Material::implant());
        let expected: [[f32; 4]; 4] = Matrix4::<f32>::identity().into();
        assert_eq!(uniform.normal_matrix, expected);
        assert_eq!(uniform.material, Material::implant().to_uniform());
    }
}
