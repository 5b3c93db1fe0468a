use crate::assets::LoadedTexture;
use crate::config::WindowConfig;
use glam::Mat4;
use std::sync::Arc;
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Fullscreen, Window};

// egui
use egui_wgpu::{Renderer as EguiRenderer, ScreenDescriptor};

const CLEAR_COLOR: wgpu::Color = wgpu::Color { r: 0.07, g: 0.07, b: 0.07, a: 1.0 };

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Globals {
    view_proj: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    pos: [f32; 3],
    uv: [f32; 2],
}

/// Per-instance payload for the stage batch: model matrix, uv rect into
/// the sprite texture (zero-area means flat tint), and tint color.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceData {
    pub model: [[f32; 4]; 4],
    pub uv_rect: [f32; 4],
    pub tint: [f32; 4],
}

struct GeometryBuffers {
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
    index_count: u32,
    instance: Option<wgpu::Buffer>,
    instance_capacity: usize,
}

pub struct Renderer {
    surface: Option<wgpu::Surface<'static>>,
    device: Option<wgpu::Device>,
    queue: Option<wgpu::Queue>,
    config: Option<wgpu::SurfaceConfiguration>,
    size: PhysicalSize<u32>,
    window: Option<Arc<Window>>,
    title: String,
    fullscreen: bool,
    present_mode: wgpu::PresentMode,

    pipeline: Option<wgpu::RenderPipeline>,
    globals_buf: Option<wgpu::Buffer>,
    globals_bg: Option<wgpu::BindGroup>,
    texture_bgl: Option<wgpu::BindGroupLayout>,
    texture_bg: Option<wgpu::BindGroup>,
    sampler: Option<wgpu::Sampler>,
    quad: Option<GeometryBuffers>,
    cube: Option<GeometryBuffers>,
}

impl Renderer {
    pub fn new(window: &WindowConfig) -> Self {
        Self {
            surface: None,
            device: None,
            queue: None,
            config: None,
            size: PhysicalSize::new(window.width.max(1), window.height.max(1)),
            window: None,
            title: window.title.clone(),
            fullscreen: window.fullscreen,
            present_mode: if window.vsync {
                wgpu::PresentMode::AutoVsync
            } else {
                wgpu::PresentMode::AutoNoVsync
            },
            pipeline: None,
            globals_buf: None,
            globals_bg: None,
            texture_bgl: None,
            texture_bg: None,
            sampler: None,
            quad: None,
            cube: None,
        }
    }

    pub fn ensure_window(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let mut attributes =
            Window::default_attributes().with_title(self.title.clone()).with_inner_size(self.size);
        if self.fullscreen {
            attributes = attributes.with_fullscreen(Some(Fullscreen::Borderless(None)));
        }
        let window = Arc::new(event_loop.create_window(attributes).expect("Failed to create window"));
        pollster::block_on(self.init_wgpu(&window));
        self.init_pipeline();
        self.window = Some(window);
    }

    fn choose_surface_format(formats: &[wgpu::TextureFormat]) -> wgpu::TextureFormat {
        formats.iter().copied().find(|f| f.is_srgb()).unwrap_or(formats[0])
    }

    async fn init_wgpu(&mut self, window: &Arc<Window>) {
        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(window.clone()).expect("surface");
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .expect("adapter");
        let required_limits = wgpu::Limits::downlevel_webgl2_defaults().using_resolution(adapter.limits());
        let device_desc = wgpu::DeviceDescriptor {
            label: Some("Device"),
            required_features: wgpu::Features::empty(),
            required_limits,
            experimental_features: wgpu::ExperimentalFeatures::default(),
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::default(),
        };
        let (device, queue) = adapter.request_device(&device_desc).await.expect("device");

        let caps = surface.get_capabilities(&adapter);
        let format = Self::choose_surface_format(&caps.formats);
        let size = window.inner_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: self.present_mode,
            alpha_mode: caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        self.size = size;
        self.surface = Some(surface);
        self.device = Some(device);
        self.queue = Some(queue);
        self.config = Some(config);
    }

    fn init_pipeline(&mut self) {
        let device = self.device.as_ref().unwrap();

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Stage Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../assets/shaders/stage_batch.wgsl").into()),
        });

        let globals_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Globals BGL"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let globals_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Globals Buffer"),
            size: std::mem::size_of::<Globals>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let globals_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Globals BG"),
            layout: &globals_bgl,
            entries: &[wgpu::BindGroupEntry { binding: 0, resource: globals_buf.as_entire_binding() }],
        });

        let texture_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Sprite Texture BGL"),
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
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Sprite Sampler"),
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let quad_vertices: [Vertex; 4] = [
            Vertex { pos: [-0.5, 0.5, 0.0], uv: [0.0, 0.0] },
            Vertex { pos: [0.5, 0.5, 0.0], uv: [1.0, 0.0] },
            Vertex { pos: [0.5, -0.5, 0.0], uv: [1.0, 1.0] },
            Vertex { pos: [-0.5, -0.5, 0.0], uv: [0.0, 1.0] },
        ];
        let quad_indices: [u16; 6] = [0, 1, 2, 0, 2, 3];

        let cube_vertices: Vec<Vertex> = [
            [-0.5, -0.5, -0.5],
            [0.5, -0.5, -0.5],
            [0.5, 0.5, -0.5],
            [-0.5, 0.5, -0.5],
            [-0.5, -0.5, 0.5],
            [0.5, -0.5, 0.5],
            [0.5, 0.5, 0.5],
            [-0.5, 0.5, 0.5],
        ]
        .into_iter()
        .map(|pos| Vertex { pos, uv: [0.0, 0.0] })
        .collect();
        let cube_indices: [u16; 36] = [
            0, 1, 2, 0, 2, 3, // back
            4, 6, 5, 4, 7, 6, // front
            0, 3, 7, 0, 7, 4, // left
            1, 5, 6, 1, 6, 2, // right
            3, 2, 6, 3, 6, 7, // top
            0, 4, 5, 0, 5, 1, // bottom
        ];

        let quad = GeometryBuffers {
            vertex: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Quad VB"),
                contents: bytemuck::cast_slice(&quad_vertices),
                usage: wgpu::BufferUsages::VERTEX,
            }),
            index: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Quad IB"),
                contents: bytemuck::cast_slice(&quad_indices),
                usage: wgpu::BufferUsages::INDEX,
            }),
            index_count: quad_indices.len() as u32,
            instance: None,
            instance_capacity: 0,
        };
        let cube = GeometryBuffers {
            vertex: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Cube VB"),
                contents: bytemuck::cast_slice(&cube_vertices),
                usage: wgpu::BufferUsages::VERTEX,
            }),
            index: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Cube IB"),
                contents: bytemuck::cast_slice(&cube_indices),
                usage: wgpu::BufferUsages::INDEX,
            }),
            index_count: cube_indices.len() as u32,
            instance: None,
            instance_capacity: 0,
        };

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Stage Pipeline Layout"),
            bind_group_layouts: &[&globals_bgl, &texture_bgl],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Stage Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<Vertex>() as u64,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &[
                            wgpu::VertexAttribute {
                                shader_location: 0,
                                format: wgpu::VertexFormat::Float32x3,
                                offset: 0,
                            },
                            wgpu::VertexAttribute {
                                shader_location: 1,
                                format: wgpu::VertexFormat::Float32x2,
                                offset: 12,
                            },
                        ],
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: std::mem::size_of::<InstanceData>() as u64,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &[
                            wgpu::VertexAttribute {
                                shader_location: 2,
                                format: wgpu::VertexFormat::Float32x4,
                                offset: 0,
                            },
                            wgpu::VertexAttribute {
                                shader_location: 3,
                                format: wgpu::VertexFormat::Float32x4,
                                offset: 16,
                            },
                            wgpu::VertexAttribute {
                                shader_location: 4,
                                format: wgpu::VertexFormat::Float32x4,
                                offset: 32,
                            },
                            wgpu::VertexAttribute {
                                shader_location: 5,
                                format: wgpu::VertexFormat::Float32x4,
                                offset: 48,
                            },
                            wgpu::VertexAttribute {
                                shader_location: 6,
                                format: wgpu::VertexFormat::Float32x4,
                                offset: 64,
                            },
                            wgpu::VertexAttribute {
                                shader_location: 7,
                                format: wgpu::VertexFormat::Float32x4,
                                offset: 80,
                            },
                        ],
                    },
                ],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.config.as_ref().unwrap().format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        self.pipeline = Some(pipeline);
        self.globals_buf = Some(globals_buf);
        self.globals_bg = Some(globals_bg);
        self.texture_bgl = Some(texture_bgl);
        self.sampler = Some(sampler);
        self.quad = Some(quad);
        self.cube = Some(cube);

        // Flat white until the sprite texture arrives.
        self.upload_texture(1, 1, &[255, 255, 255, 255]);
    }

    /// Installs the decoded sprite texture; instances with a non-empty uv
    /// rect start sampling it on the next frame.
    pub fn set_sprite_texture(&mut self, texture: &LoadedTexture) {
        self.upload_texture(texture.width, texture.height, &texture.rgba);
    }

    fn upload_texture(&mut self, width: u32, height: u32, rgba: &[u8]) {
        let (Some(device), Some(queue), Some(bgl), Some(sampler)) =
            (&self.device, &self.queue, &self.texture_bgl, &self.sampler)
        else {
            return;
        };
        let size = wgpu::Extent3d { width, height, depth_or_array_layers: 1 };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Sprite Texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.texture_bg = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Sprite Texture BG"),
            layout: bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::Sampler(sampler) },
            ],
        }));
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn window(&self) -> Option<&Window> {
        self.window.as_deref()
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.as_ref().unwrap().format
    }

    pub fn device(&self) -> &wgpu::Device {
        self.device.as_ref().unwrap()
    }

    pub fn queue(&self) -> &wgpu::Queue {
        self.queue.as_ref().unwrap()
    }

    pub fn pixels_per_point(&self) -> f32 {
        1.0
    }

    pub fn is_ready(&self) -> bool {
        self.surface.is_some()
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.size = new_size;
        if new_size.width > 0 && new_size.height > 0 {
            if let (Some(surface), Some(device), Some(config)) =
                (&self.surface, &self.device, &mut self.config)
            {
                config.width = new_size.width;
                config.height = new_size.height;
                surface.configure(device, config);
            }
        }
    }

    fn ensure_instances(
        device: &wgpu::Device,
        geometry: &mut GeometryBuffers,
        count: usize,
    ) {
        if geometry.instance_capacity >= count && geometry.instance.is_some() {
            return;
        }
        let mut new_cap = geometry.instance_capacity.max(64);
        while new_cap < count {
            new_cap *= 2;
        }
        geometry.instance = Some(device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Instance Buffer"),
            size: (new_cap * std::mem::size_of::<InstanceData>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        geometry.instance_capacity = new_cap;
    }

    /// One frame: scene pass (quads then cubes) followed by the egui
    /// overlay pass.
    pub fn render(
        &mut self,
        quads: &[InstanceData],
        cubes: &[InstanceData],
        view_proj: Mat4,
        egui: Option<(&mut EguiRenderer, &[egui::ClippedPrimitive], &ScreenDescriptor)>,
    ) -> Result<(), wgpu::SurfaceError> {
        if self.surface.is_none() {
            return Ok(());
        }
        {
            let queue = self.queue.as_ref().unwrap();
            queue.write_buffer(
                self.globals_buf.as_ref().unwrap(),
                0,
                bytemuck::bytes_of(&Globals { view_proj: view_proj.to_cols_array_2d() }),
            );
        }
        {
            let device = self.device.as_ref().unwrap();
            Self::ensure_instances(device, self.quad.as_mut().unwrap(), quads.len());
            Self::ensure_instances(device, self.cube.as_mut().unwrap(), cubes.len());
            let queue = self.queue.as_ref().unwrap();
            if !quads.is_empty() {
                queue.write_buffer(
                    self.quad.as_ref().unwrap().instance.as_ref().unwrap(),
                    0,
                    bytemuck::cast_slice(quads),
                );
            }
            if !cubes.is_empty() {
                queue.write_buffer(
                    self.cube.as_ref().unwrap().instance.as_ref().unwrap(),
                    0,
                    bytemuck::cast_slice(cubes),
                );
            }
        }

        let surface = self.surface.as_ref().unwrap();
        let device = self.device.as_ref().unwrap();
        let queue = self.queue.as_ref().unwrap();

        let frame = surface.get_current_texture()?;
        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("Encoder") });

        let mut egui = egui;
        let mut extra_cmd = match &mut egui {
            Some((painter, jobs, screen)) => {
                painter.update_buffers(device, queue, &mut encoder, jobs, screen)
            }
            None => Vec::new(),
        };

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Stage Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(self.pipeline.as_ref().unwrap());
            pass.set_bind_group(0, self.globals_bg.as_ref().unwrap(), &[]);
            pass.set_bind_group(1, self.texture_bg.as_ref().unwrap(), &[]);
            for (geometry, instances) in
                [(self.cube.as_ref().unwrap(), cubes), (self.quad.as_ref().unwrap(), quads)]
            {
                if instances.is_empty() {
                    continue;
                }
                pass.set_vertex_buffer(0, geometry.vertex.slice(..));
                pass.set_vertex_buffer(1, geometry.instance.as_ref().unwrap().slice(..));
                pass.set_index_buffer(geometry.index.slice(..), wgpu::IndexFormat::Uint16);
                pass.draw_indexed(0..geometry.index_count, 0, 0..(instances.len() as u32));
            }
        }

        if let Some((painter, jobs, screen)) = egui {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Overlay Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations { load: wgpu::LoadOp::Load, store: wgpu::StoreOp::Store },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            let pass = unsafe {
                std::mem::transmute::<&mut wgpu::RenderPass<'_>, &mut wgpu::RenderPass<'static>>(
                    &mut pass,
                )
            };
            painter.render(pass, jobs, screen);
        }

        extra_cmd.push(encoder.finish());
        queue.submit(extra_cmd.into_iter());
        frame.present();
        Ok(())
    }
}
