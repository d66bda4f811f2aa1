//! WGPU-based rendering engine for the viewer
//!
//! Owns the surface, device and every GPU resource. The [`Scene`] stays a pure
//! model; the engine mirrors it into per-object buffers keyed by [`ObjectId`]
//! each time [`RenderEngine::sync_scene`] runs.

use std::{collections::HashMap, sync::Arc};

use anyhow::Context;
use cgmath::Matrix4;
use log::{debug, info};
use wgpu::{util::DeviceExt, Device, TextureFormat};

use crate::{
    config::DisplayConfig,
    gfx::{
        camera::camera_utils::CameraUniform,
        geometry::{generate_box, generate_grid_lines},
        gizmos::TranslateGizmo,
        resources::{
            global_bindings::{update_global_ubo, GlobalBindings, GlobalUBO, LightConfig},
            material::{hex_to_rgb, Material},
            object_bindings::{GpuMesh, ObjectBindings, ObjectSlot, ObjectUniform},
            texture_resource::TextureResource,
        },
        scene::{ObjectId, Scene},
    },
};

use super::pipeline_manager::{PipelineConfig, PipelineManager};

const MESH_PIPELINE: &str = "Mesh";
const GRID_PIPELINE: &str = "Grid";

struct GpuObject {
    mesh: GpuMesh,
    slot: ObjectSlot,
    visible: bool,
}

struct GridResources {
    vertex_buffer: wgpu::Buffer,
    vertex_count: u32,
    slot: ObjectSlot,
}

/// Core rendering engine managing GPU resources and draw calls
pub struct RenderEngine {
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    config: wgpu::SurfaceConfiguration,
    depth_texture: TextureResource,
    format: TextureFormat,
    pipeline_manager: PipelineManager,
    global_ubo: GlobalUBO,
    global_bindings: GlobalBindings,
    object_bindings: ObjectBindings,
    light_config: LightConfig,
    clear_color: wgpu::Color,

    objects: HashMap<ObjectId, GpuObject>,
    grid: GridResources,
    handle_mesh: GpuMesh,
    handle_slots: Vec<ObjectSlot>,
    handles_visible: bool,
}

impl RenderEngine {
    /// Creates a new render engine for the given window
    ///
    /// # Arguments
    /// * `window` - Window surface target for rendering
    /// * `width` - Initial surface width in pixels
    /// * `height` - Initial surface height in pixels
    /// * `display` - Grid, light and clear colour settings
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
        display: &DisplayConfig,
    ) -> anyhow::Result<RenderEngine> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .context("Failed to create surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("Failed to request adapter")?;
        info!("Using adapter {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("WGPU Device"),
                required_features: wgpu::Features::default(),
                required_limits: wgpu::Limits {
                    max_texture_dimension_2d: 4096,
                    ..wgpu::Limits::downlevel_defaults()
                },
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("Failed to request a device")?;

        let surface_capabilities = surface.get_capabilities(&adapter);
        let format = surface_capabilities
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_capabilities.formats.first().copied())
            .context("Surface reports no supported formats")?;
        let alpha_mode = surface_capabilities
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_texture =
            TextureResource::create_depth_texture(&device, &config, "depth_texture");

        let light_config = LightConfig::from(display);
        let global_ubo = GlobalUBO::new(&device);
        let global_bindings = GlobalBindings::new(&device, &global_ubo);
        let object_bindings = ObjectBindings::new(&device);

        let grid = Self::create_grid(&device, &object_bindings, display);
        let handle_mesh = GpuMesh::upload(&device, "Handle", &generate_box([0.5, 0.5, 0.5]));
        let handle_slots = (0..3)
            .map(|i| {
                object_bindings.create_slot(
                    &device,
                    &format!("Handle {} Bind Group", i),
                    ObjectUniform::new(Matrix4::from_scale(0.0), &Material::default()),
                )
            })
            .collect();

        let device_handle: Arc<Device> = device.into();
        let queue_handle: Arc<wgpu::Queue> = queue.into();
        let mut pipeline_manager = PipelineManager::new(device_handle.clone());

        pipeline_manager.load_shader("shader", include_str!("shader.wgsl"));

        let layouts = vec![
            global_bindings.bind_group_layout().clone(),
            object_bindings.bind_group_layout().clone(),
        ];

        // STL winding is not reliable, the fragment shader flips back faces
        pipeline_manager.register_pipeline(
            MESH_PIPELINE,
            PipelineConfig::default()
                .with_label("MESH")
                .with_shader("shader")
                .with_cull_mode(None)
                .with_color_format(format)
                .with_depth_stencil(TextureResource::DEPTH_FORMAT, true)
                .with_bind_group_layouts(layouts.clone()),
        );

        pipeline_manager.register_pipeline(
            GRID_PIPELINE,
            PipelineConfig::default()
                .with_label("GRID")
                .with_shader("shader")
                .with_entry_points("vs_line", "fs_line")
                .with_primitive_topology(wgpu::PrimitiveTopology::LineList)
                .with_cull_mode(None)
                .with_color_format(format)
                .with_depth_stencil(TextureResource::DEPTH_FORMAT, true)
                .with_bind_group_layouts(layouts),
        );

        pipeline_manager
            .create_all_pipelines()
            .map_err(|errors| anyhow::anyhow!(errors.join("; ")))?;

        let [r, g, b] = display.clear_color;

        Ok(RenderEngine {
            surface,
            device: device_handle,
            queue: queue_handle,
            config,
            depth_texture,
            format,
            pipeline_manager,
            global_ubo,
            global_bindings,
            object_bindings,
            light_config,
            clear_color: wgpu::Color { r, g, b, a: 1.0 },
            objects: HashMap::new(),
            grid,
            handle_mesh,
            handle_slots,
            handles_visible: false,
        })
    }

    fn create_grid(
        device: &wgpu::Device,
        object_bindings: &ObjectBindings,
        display: &DisplayConfig,
    ) -> GridResources {
        let vertices = generate_grid_lines(
            display.grid_size,
            display.grid_divisions,
            hex_to_rgb(display.grid_center_color),
            hex_to_rgb(display.grid_color),
        );
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Grid Vertex Buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let slot = object_bindings.create_slot(
            device,
            "Grid Bind Group",
            ObjectUniform::new(Matrix4::from_scale(1.0), &Material::default()),
        );

        GridResources {
            vertex_buffer,
            vertex_count: vertices.len() as u32,
            slot,
        }
    }

    /// Mirrors `scene` and the manipulator handles into GPU buffers
    ///
    /// Objects seen for the first time get their mesh uploaded; objects no
    /// longer in the scene have their resources released.
    pub fn sync_scene(&mut self, scene: &Scene, manipulator: &TranslateGizmo) {
        for object in scene.objects() {
            let content = ObjectUniform::new(object.model_matrix(), &object.material);
            match self.objects.get_mut(&object.id) {
                Some(gpu) => {
                    gpu.slot.update(&self.queue, content);
                    gpu.visible = object.visible;
                }
                None => {
                    debug!("Uploading '{}' ({})", object.name, object.id);
                    let mesh = GpuMesh::upload(&self.device, &object.name, &object.geometry);
                    let slot = self.object_bindings.create_slot(
                        &self.device,
                        &format!("{} Bind Group", object.name),
                        content,
                    );
                    self.objects.insert(
                        object.id,
                        GpuObject {
                            mesh,
                            slot,
                            visible: object.visible,
                        },
                    );
                }
            }
        }
        self.objects.retain(|id, _| scene.object(*id).is_some());

        let target = manipulator.target().and_then(|id| scene.object(id));
        self.handles_visible = target.is_some();
        if let Some(object) = target {
            for ((axis, transform), slot) in manipulator
                .handle_transforms(object)
                .into_iter()
                .zip(self.handle_slots.iter_mut())
            {
                let material = Material::handle(axis.color());
                slot.update(&self.queue, ObjectUniform::new(transform, &material));
            }
        }
    }

    /// Updates camera and light uniforms for the next frame
    pub fn update(&mut self, camera_uniform: CameraUniform) {
        update_global_ubo(
            &mut self.global_ubo,
            &self.queue,
            &camera_uniform,
            &self.light_config,
        );
    }

    /// Renders a frame with an optional UI overlay
    ///
    /// The scene and grid are drawn first, then the manipulator handles over
    /// a cleared depth buffer so they stay visible, then the UI.
    pub fn render_frame<F>(&mut self, ui_callback: Option<F>) -> Result<(), wgpu::SurfaceError>
    where
        F: FnOnce(&wgpu::Device, &wgpu::Queue, &mut wgpu::CommandEncoder, &wgpu::TextureView),
    {
        let surface_texture = self.surface.get_current_texture()?;
        let surface_texture_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Main Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface_texture_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_bind_group(0, self.global_bindings.bind_group(), &[]);

            if let Some(pipeline) = self.pipeline_manager.get_pipeline(GRID_PIPELINE) {
                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(1, self.grid.slot.bind_group(), &[]);
                render_pass.set_vertex_buffer(0, self.grid.vertex_buffer.slice(..));
                render_pass.draw(0..self.grid.vertex_count, 0..1);
            }

            if let Some(pipeline) = self.pipeline_manager.get_pipeline(MESH_PIPELINE) {
                render_pass.set_pipeline(pipeline);
                for gpu in self.objects.values().filter(|gpu| gpu.visible) {
                    render_pass.set_bind_group(1, gpu.slot.bind_group(), &[]);
                    gpu.mesh.draw(&mut render_pass);
                }
            }
        }

        if self.handles_visible {
            let mut handle_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Manipulator Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &surface_texture_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            if let Some(pipeline) = self.pipeline_manager.get_pipeline(MESH_PIPELINE) {
                handle_pass.set_pipeline(pipeline);
                handle_pass.set_bind_group(0, self.global_bindings.bind_group(), &[]);
                for slot in &self.handle_slots {
                    handle_pass.set_bind_group(1, slot.bind_group(), &[]);
                    self.handle_mesh.draw(&mut handle_pass);
                }
            }
        }

        if let Some(ui_callback) = ui_callback {
            ui_callback(
                &self.device,
                &self.queue,
                &mut encoder,
                &surface_texture_view,
            );
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
        Ok(())
    }

    /// Resizes the surface and recreates the depth buffer
    ///
    /// Zero-sized requests (minimised windows) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_texture =
            TextureResource::create_depth_texture(&self.device, &self.config, "depth_texture");
    }

    /// Reconfigures the surface at its current size after it was lost
    pub fn reconfigure(&mut self) {
        self.resize(self.config.width, self.config.height);
    }

    /// Returns current surface dimensions
    pub fn get_surface_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Returns the surface texture format
    ///
    /// Used for creating compatible render targets and UI systems.
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Number of scene objects with GPU resources
    pub fn resident_objects(&self) -> usize {
        self.objects.len()
    }
}
