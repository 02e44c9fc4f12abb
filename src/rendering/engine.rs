use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use image::DynamicImage;
use tracing::{debug, info};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::assets::{ModelData, Texture};
use crate::config::SceneSettings;
use crate::rendering::camera::{CameraUniform, OrthographicCamera};
use crate::rendering::light::Lighting;
use crate::rendering::mesh::{GpuMesh, InstanceRaw, Vertex};
use crate::utils::logging::{handle_wgpu_result, log_adapter_info};
use crate::world::registry::{ModelId, VisualKind, VisualObject, VisualObjectRegistry};

const INITIAL_INSTANCE_CAPACITY: usize = 128;

/// Instances sharing one mesh, drawn with a single call.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawBatch {
    pub kind: VisualKind,
    pub instances: Range<u32>,
}

/// Group visuals by mesh into one contiguous instance list.
pub fn batch_instances<'a>(visuals: impl Iterator<Item = &'a VisualObject>) -> (Vec<InstanceRaw>, Vec<DrawBatch>) {
    let mut by_kind: HashMap<VisualKind, Vec<InstanceRaw>> = HashMap::new();
    for visual in visuals {
        by_kind.entry(visual.kind).or_default().push(InstanceRaw::from_visual(visual));
    }

    let mut instances = Vec::new();
    let mut batches = Vec::with_capacity(by_kind.len());
    for (kind, group) in by_kind {
        let start = instances.len() as u32;
        instances.extend(group);
        batches.push(DrawBatch {
            kind,
            instances: start..instances.len() as u32,
        });
    }
    (instances, batches)
}

pub struct RenderEngine {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    clear_color: wgpu::Color,
    render_pipeline: wgpu::RenderPipeline,
    depth_texture: Texture,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    texture_bind_group_layout: wgpu::BindGroupLayout,
    texture_bind_group: wgpu::BindGroup,
    light_bind_group: wgpu::BindGroup,
    cube_mesh: GpuMesh,
    models: HashMap<ModelId, GpuMesh>,
    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
}

impl RenderEngine {
    pub async fn new(window: Arc<Window>, settings: &SceneSettings) -> anyhow::Result<Self> {
        info!("Initializing WGPU render engine");

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = handle_wgpu_result(instance.create_surface(Arc::clone(&window)), "create_surface")
            .context("Failed to create surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| anyhow!("Failed to find an appropriate adapter"))?;
        log_adapter_info(&adapter);

        let (device, queue) = handle_wgpu_result(
            adapter
                .request_device(
                    &wgpu::DeviceDescriptor {
                        label: Some("cubefall device"),
                        required_features: wgpu::Features::empty(),
                        required_limits: wgpu::Limits::default(),
                        memory_hints: wgpu::MemoryHints::default(),
                    },
                    None,
                )
                .await,
            "request_device",
        )
        .context("Failed to create device")?;

        let size = window.inner_size();
        let capabilities = surface.get_capabilities(&adapter);
        let format = capabilities
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| capabilities.formats.first().copied())
            .ok_or_else(|| anyhow!("Surface reports no supported formats"))?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: if settings.rendering.vsync_enabled {
                wgpu::PresentMode::Fifo
            } else {
                wgpu::PresentMode::AutoNoVsync
            },
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        info!("Configuring surface {}x{} with format {:?}", config.width, config.height, config.format);
        surface.configure(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/shader.wgsl").into()),
        });

        let camera_uniform = CameraUniform::from_camera(&OrthographicCamera::new(config.width, config.height));
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[camera_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let camera_bind_group_layout = uniform_layout(&device, "camera_bind_group_layout", wgpu::ShaderStages::VERTEX);
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        let texture_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
            label: Some("texture_bind_group_layout"),
        });
        // White until the cube texture arrives
        let placeholder = Texture::solid(&device, &queue, [255, 255, 255, 255], "placeholder");
        let texture_bind_group = texture_bind_group(&device, &texture_bind_group_layout, &placeholder);

        let lighting = Lighting::from_settings(&settings.rendering, settings.assets.texture_repeat);
        let light_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Light Uniform Buffer"),
            contents: bytemuck::cast_slice(&[lighting.to_uniform()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let light_bind_group_layout = uniform_layout(
            &device,
            "light_bind_group_layout",
            wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        );
        let light_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &light_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: light_buffer.as_entire_binding(),
            }],
            label: Some("light_bind_group"),
        });

        let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Render Pipeline Layout"),
            bind_group_layouts: &[&camera_bind_group_layout, &texture_bind_group_layout, &light_bind_group_layout],
            push_constant_ranges: &[],
        });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Render Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::desc(), InstanceRaw::desc()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                // Loaded models do not promise a consistent winding
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: Texture::DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        });
        info!("Render pipeline created");

        let depth_texture = Texture::create_depth_texture(&device, config.width, config.height);
        let cube_mesh = GpuMesh::cube(&device);
        let instance_buffer = create_instance_buffer(&device, INITIAL_INSTANCE_CAPACITY);
        let [r, g, b, a] = settings.rendering.clear_color;

        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            size,
            clear_color: wgpu::Color { r, g, b, a },
            render_pipeline,
            depth_texture,
            camera_buffer,
            camera_bind_group,
            texture_bind_group_layout,
            texture_bind_group,
            light_bind_group,
            cube_mesh,
            models: HashMap::new(),
            instance_buffer,
            instance_capacity: INITIAL_INSTANCE_CAPACITY,
        })
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.depth_texture = Texture::create_depth_texture(&self.device, new_size.width, new_size.height);
            debug!("Surface resized to {}x{}", new_size.width, new_size.height);
        }
    }

    /// Reconfigure the surface at its current size after it was lost.
    pub fn reconfigure(&mut self) {
        self.resize(self.size);
    }

    pub fn set_cube_texture(&mut self, img: &DynamicImage) {
        let texture = Texture::from_image(&self.device, &self.queue, img, Some("cube texture"));
        self.texture_bind_group = texture_bind_group(&self.device, &self.texture_bind_group_layout, &texture);
        info!("Cube texture uploaded");
    }

    pub fn upload_model(&mut self, model: ModelId, data: &ModelData) {
        let mesh = GpuMesh::from_model(&self.device, &format!("Model {}", model.0), data);
        self.models.insert(model, mesh);
        info!("Model {} uploaded ({} triangles)", model.0, data.triangle_count());
    }

    fn ensure_instance_capacity(&mut self, needed: usize) {
        if needed <= self.instance_capacity {
            return;
        }
        self.instance_capacity = needed.next_power_of_two();
        self.instance_buffer = create_instance_buffer(&self.device, self.instance_capacity);
        debug!("Instance buffer grown to {}", self.instance_capacity);
    }

    pub fn render(&mut self, registry: &VisualObjectRegistry, camera: &OrthographicCamera) -> Result<(), wgpu::SurfaceError> {
        let (instances, batches) = batch_instances(registry.visuals());
        self.ensure_instance_capacity(instances.len());
        if !instances.is_empty() {
            self.queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&instances));
        }
        self.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[CameraUniform::from_camera(camera)]),
        );

        let frame = self.surface.get_current_texture()?;
        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
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
            render_pass.set_pipeline(&self.render_pipeline);
            render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
            render_pass.set_bind_group(1, &self.texture_bind_group, &[]);
            render_pass.set_bind_group(2, &self.light_bind_group, &[]);
            render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));

            for batch in &batches {
                let mesh = match batch.kind {
                    VisualKind::Cube => &self.cube_mesh,
                    VisualKind::Model(model) => match self.models.get(&model) {
                        Some(mesh) => mesh,
                        None => continue,
                    },
                };
                render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..mesh.num_indices, 0, batch.instances.clone());
            }
        }
        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }
}

fn uniform_layout(device: &wgpu::Device, label: &str, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some(label),
    })
}

fn texture_bind_group(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, texture: &Texture) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&texture.sampler),
            },
        ],
        label: Some("texture_bind_group"),
    })
}

fn create_instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Instance Buffer"),
        size: (capacity * std::mem::size_of::<InstanceRaw>()) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::math::Transform;
    use crate::world::registry::VisualDesc;
    use glam::Vec3;

    #[test]
    fn test_batches_group_by_mesh() {
        let mut registry = VisualObjectRegistry::new();
        for x in [0.0, 10.0, 20.0] {
            registry.insert_unpaired(VisualDesc::cube(Transform::from_position(Vec3::new(x, 0.0, 0.0)), 150.0));
        }
        registry.insert_unpaired(VisualDesc::model(ModelId(0), Transform::IDENTITY, 100.0, Vec3::ONE));

        let (instances, mut batches) = batch_instances(registry.visuals());
        assert_eq!(instances.len(), 4);
        assert_eq!(batches.len(), 2);

        batches.sort_by_key(|b| b.instances.len());
        assert_eq!(batches[0].kind, VisualKind::Model(ModelId(0)));
        assert_eq!(batches[1].kind, VisualKind::Cube);
        assert_eq!(batches[1].instances.len(), 3);
    }

    #[test]
    fn test_empty_registry_draws_nothing() {
        let registry = VisualObjectRegistry::new();
        let (instances, batches) = batch_instances(registry.visuals());
        assert!(instances.is_empty());
        assert!(batches.is_empty());
    }
}
