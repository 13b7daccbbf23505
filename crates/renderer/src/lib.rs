//! Renderer: wgpu init, depth buffer, and one textured mesh drawn per frame.
//! wgpu = 23.x, winit = 0.30.x

pub mod gpu_mesh;
pub mod gpu_texture;
pub mod shader;

use std::sync::Arc;

use asset::{Aabb, Mesh, TextureData, TextureError};
use bytemuck::{Pod, Zeroable};
use corelib::{Mat4, camera::Camera, orientation::Orientation};
use thiserror::Error;
use wgpu::{
    BindGroup, BindGroupLayout, BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingType,
    BlendState, Buffer, BufferBindingType, BufferUsages, ColorTargetState, ColorWrites,
    CommandEncoderDescriptor, DepthBiasState, DepthStencilState, Device, DeviceDescriptor,
    Extent3d, Features, FragmentState, Instance, InstanceDescriptor, Limits, LoadOp, Operations,
    PipelineLayoutDescriptor, PowerPreference, PresentMode, Queue, RenderPassColorAttachment,
    RenderPassDescriptor, RenderPipeline, RenderPipelineDescriptor, SamplerBindingType,
    ShaderStages, StoreOp, Surface, SurfaceConfiguration, SurfaceError, TextureDescriptor,
    TextureDimension, TextureFormat, TextureSampleType, TextureUsages, TextureView,
    TextureViewDescriptor, TextureViewDimension, VertexState, util::DeviceExt,
};
use winit::{dpi::PhysicalSize, window::Window};

pub use gpu_mesh::{GpuMesh, VERTEX_LAYOUT, checked_draw_range, draw_range};
pub use gpu_texture::{GpuTexture, check_dimensions};
pub use shader::{CompiledStage, ShaderError, ShaderProgram, Stage};

const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;
const FALLBACK_TEXTURE_SIZE: u32 = 64;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to create surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),
    #[error("no suitable GPU adapter for backends {0:?}")]
    NoAdapter(wgpu::Backends),
    #[error("failed to request device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
    #[error("mesh has no triangles to draw")]
    EmptyMesh,
    #[error("mesh has {0} indices, more than a u32 draw range allows")]
    MeshTooLarge(usize),
    #[error("{buffer} buffer needs {size} bytes, device allows {max}")]
    BufferTooLarge {
        buffer: &'static str,
        size: u64,
        max: u64,
    },
    #[error("texture is {width}x{height}, device allows at most {max} per side")]
    TextureTooLarge { width: u32, height: u32, max: u32 },
    #[error(transparent)]
    Texture(#[from] TextureError),
    #[error(transparent)]
    Shader(#[from] ShaderError),
}

/// CPU-side content handed to the renderer once at start-up.
pub struct SceneAssets {
    pub mesh: Mesh,
    pub texture: TextureData,
    pub program: ShaderProgram,
}

/// Camera UBO (16-byte aligned).
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct CameraUniform {
    pub mvp: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new(camera: &Camera, model: Mat4) -> Self {
        Self {
            mvp: (camera.proj_view() * model).to_cols_array_2d(),
            model: model.to_cols_array_2d(),
        }
    }
}

/// Camera distance that keeps a mesh with these bounds in view while it
/// rotates about the origin.
pub fn framing_distance(bounds: Option<Aabb>) -> f32 {
    let radius = bounds
        .map(|b| {
            let far = |lo: f32, hi: f32| lo.abs().max(hi.abs());
            let x = far(b.min[0], b.max[0]);
            let y = far(b.min[1], b.max[1]);
            let z = far(b.min[2], b.max[2]);
            (x * x + y * y + z * z).sqrt()
        })
        .unwrap_or(1.0);
    (2.5 * radius).max(2.0)
}

pub struct GpuState {
    // Surface
    surface: Surface<'static>,
    surface_config: SurfaceConfiguration,

    // Device/queue
    device: Device,
    queue: Queue,

    // Pipeline & geometry
    pipeline: RenderPipeline,
    mesh: GpuMesh,

    // Camera
    camera: Camera,
    camera_bg: BindGroup,
    camera_buf: Buffer,

    // Texture
    texture_bg: BindGroup,
    _texture: GpuTexture,

    // Depth
    depth_view: TextureView,

    // Size cache
    width: u32,
    height: u32,
}

impl GpuState {
    /// Create GPU state bound to an `Arc<Window>` and upload the scene.
    pub async fn new(
        window: Arc<Window>,
        backends: wgpu::Backends,
        scene: &SceneAssets,
    ) -> Result<Self, RenderError> {
        let PhysicalSize { width, height } = window.inner_size();
        let width = width.max(1);
        let height = height.max(1);

        // Instance & surface
        let instance = Instance::new(InstanceDescriptor {
            backends,
            ..Default::default()
        });
        let surface: Surface<'static> = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter(backends))?;
        let info = adapter.get_info();
        log::info!(
            "Adapter: {} ({:?}, {:?}), driver {} {}",
            info.name,
            info.backend,
            info.device_type,
            info.driver,
            info.driver_info
        );

        let (device, queue) = adapter
            .request_device(
                &DeviceDescriptor {
                    label: Some("Trisoup Device"),
                    required_features: Features::empty(),
                    required_limits: Limits::downlevel_webgl2_defaults()
                        .using_resolution(adapter.limits()),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        // Surface format (prefer sRGB)
        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or(RenderError::NoSurfaceFormat)?;
        log::info!("Surface format: {:?}", surface_format);

        // Configure surface
        let surface_config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: PresentMode::AutoVsync,
            alpha_mode: caps.alpha_modes.first().copied().unwrap_or_default(),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        // Depth texture
        let depth_view = create_depth_view(&device, &surface_config);

        // ==== Shaders ====
        let vertex_module = scene.program.vertex().create_module(&device);
        let fragment_module = scene.program.fragment().create_module(&device);

        // ==== Camera BGL/BG ====
        let camera_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Camera BGL"),
            entries: &[BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::VERTEX,
                ty: BindingType::Buffer {
                    ty: BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<CameraUniform>() as u64,
                    ),
                },
                count: None,
            }],
        });

        // ==== Geometry ====
        let (mesh, bounds) = match GpuMesh::upload(&device, &scene.mesh) {
            Ok(mesh) => (mesh, scene.mesh.bounding_box().ok()),
            Err(e) => {
                log::error!("Cannot upload mesh: {e}; drawing a triangle instead");
                let triangle = Mesh::triangle();
                (
                    GpuMesh::upload(&device, &triangle)?,
                    triangle.bounding_box().ok(),
                )
            }
        };

        let camera = Camera::looking_at_origin(
            framing_distance(bounds),
            width as f32 / height as f32,
        );
        let camera_init = CameraUniform::new(&camera, Mat4::IDENTITY);
        let camera_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera UBO"),
            contents: bytemuck::bytes_of(&camera_init),
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        });
        let camera_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera BG"),
            layout: &camera_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buf.as_entire_binding(),
            }],
        });

        // ==== Texture BGL/BG ====
        let texture = match GpuTexture::upload(&device, &queue, &scene.texture) {
            Ok(texture) => texture,
            Err(e) => {
                log::error!("Cannot upload texture: {e}; using a checkerboard");
                let checker = TextureData::create_test_texture(FALLBACK_TEXTURE_SIZE);
                GpuTexture::upload(&device, &queue, &checker)?
            }
        };
        let texture_bgl = create_texture_bgl(&device);
        let texture_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Texture BG"),
            layout: &texture_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(texture.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(texture.sampler()),
                },
            ],
        });

        // ==== Pipeline ====
        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("Mesh PipelineLayout"),
            bind_group_layouts: &[&camera_bgl, &texture_bgl],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("Mesh Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: VertexState {
                module: &vertex_module,
                entry_point: Some(scene.program.vertex().entry_point()),
                buffers: &[VERTEX_LAYOUT],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(FragmentState {
                module: &fragment_module,
                entry_point: Some(scene.program.fragment().entry_point()),
                targets: &[Some(ColorTargetState {
                    format: surface_format,
                    blend: Some(BlendState::REPLACE),
                    write_mask: ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            // Generated boxes do not wind every face the same way.
            primitive: wgpu::PrimitiveState {
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Ok(Self {
            surface,
            surface_config,
            device,
            queue,
            pipeline,
            mesh,
            camera,
            camera_bg,
            camera_buf,
            texture_bg,
            _texture: texture,
            depth_view,
            width,
            height,
        })
    }

    /// Resize: reconfigure surface & recreate depth view.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.surface_config.width = self.width;
        self.surface_config.height = self.height;
        self.surface.configure(&self.device, &self.surface_config);
        self.depth_view = create_depth_view(&self.device, &self.surface_config);
        self.camera = self
            .camera
            .with_aspect(self.width as f32 / self.height as f32);
    }

    /// Render one frame: update MVP, clear, draw the mesh.
    pub fn render(&mut self, orientation: &Orientation) -> Result<(), SurfaceError> {
        let cam = CameraUniform::new(&self.camera, orientation.matrix());
        self.queue
            .write_buffer(&self.camera_buf, 0, bytemuck::bytes_of(&cam));

        // --- frame & pass
        let frame = self.surface.get_current_texture()?;
        let view = frame.texture.create_view(&Default::default());

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("MainEncoder"),
            });

        {
            let mut rpass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("MainPass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(wgpu::Color {
                            r: 0.3,
                            g: 0.3,
                            b: 0.3,
                            a: 1.0,
                        }),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            rpass.set_pipeline(&self.pipeline);
            rpass.set_bind_group(0, &self.camera_bg, &[]);
            rpass.set_bind_group(1, &self.texture_bg, &[]);
            self.mesh.draw(&mut rpass);
        }

        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }

    pub fn is_surface_lost(err: &SurfaceError) -> bool {
        matches!(err, SurfaceError::Lost | SurfaceError::Outdated)
    }

    pub fn recreate_surface(&mut self) {
        self.resize(self.width, self.height);
    }
}

fn create_texture_bgl(device: &Device) -> BindGroupLayout {
    device.create_bind_group_layout(&BindGroupLayoutDescriptor {
        label: Some("Texture BGL"),
        entries: &[
            BindGroupLayoutEntry {
                binding: 0,
                visibility: ShaderStages::FRAGMENT,
                ty: BindingType::Texture {
                    sample_type: TextureSampleType::Float { filterable: true },
                    view_dimension: TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
            BindGroupLayoutEntry {
                binding: 1,
                visibility: ShaderStages::FRAGMENT,
                ty: BindingType::Sampler(SamplerBindingType::Filtering),
                count: None,
            },
        ],
    })
}

/// Create a depth texture view matching the surface config.
fn create_depth_view(device: &Device, sc: &SurfaceConfiguration) -> TextureView {
    let tex = device.create_texture(&TextureDescriptor {
        label: Some("DepthTex"),
        size: Extent3d {
            width: sc.width.max(1),
            height: sc.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    tex.create_view(&TextureViewDescriptor::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use corelib::{Vec3, Vec4};

    #[test]
    fn camera_uniform_is_two_column_major_matrices() {
        assert_eq!(std::mem::size_of::<CameraUniform>(), 128);

        let camera = Camera::looking_at_origin(4.0, 1.0);
        let model = Orientation::new(0.7, -0.2).matrix();
        let uniform = CameraUniform::new(&camera, model);

        assert_eq!(Mat4::from_cols_array_2d(&uniform.model), model);
        let mvp = Mat4::from_cols_array_2d(&uniform.mvp);
        let expected = camera.proj_view() * model;
        assert!(mvp.abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn origin_lands_in_the_middle_of_the_depth_range() {
        let camera = Camera::looking_at_origin(framing_distance(None), 16.0 / 9.0);
        let uniform = CameraUniform::new(&camera, Mat4::IDENTITY);
        let clip = Mat4::from_cols_array_2d(&uniform.mvp) * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip / clip.w;
        assert!(ndc.x.abs() < 1e-6 && ndc.y.abs() < 1e-6);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn framing_distance_grows_with_the_mesh() {
        assert_eq!(framing_distance(None), 2.5);
        let small = Mesh::triangle().bounding_box().ok();
        let big = Mesh::cuboid(5.0, 5.0, 5.0).bounding_box().ok();
        assert!(framing_distance(big) > framing_distance(small));

        // Every corner of the box stays in front of the camera.
        let d = framing_distance(big);
        let corner = Vec3::splat(5.0).length();
        assert!(d - corner > 0.1);
    }
}
