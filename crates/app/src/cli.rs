//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum GpuBackend {
    #[default]
    Auto,
    #[value(alias = "vk")]
    Vulkan,
    #[value(alias = "d3d12")]
    Dx12,
    #[value(alias = "mtl")]
    Metal,
    #[value(alias = "opengl", alias = "gles")]
    Gl,
}

impl GpuBackend {
    pub fn backends(self) -> wgpu::Backends {
        match self {
            GpuBackend::Auto => wgpu::Backends::all(),
            GpuBackend::Vulkan => wgpu::Backends::VULKAN,
            GpuBackend::Dx12 => wgpu::Backends::DX12,
            GpuBackend::Metal => wgpu::Backends::METAL,
            GpuBackend::Gl => wgpu::Backends::GL,
        }
    }
}

/// Built-in shape used when no model file is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Shape {
    Triangle,
    #[value(alias = "cube")]
    Box,
    #[default]
    Sphere,
}

#[derive(Debug, Parser)]
#[command(name = "trisoup", version, about = "View a triangle mesh with a texture and shaders", long_about = None)]
pub struct Args {
    /// Graphics backend.
    #[arg(long, value_enum, default_value_t = GpuBackend::Auto)]
    pub gpu_backend: GpuBackend,

    /// Show frame time and FPS in the window title.
    #[arg(long)]
    pub show_fps: bool,

    /// Window size as WIDTHxHEIGHT.
    #[arg(long, value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Window width, overrides --size.
    #[arg(long)]
    pub width: Option<u32>,

    /// Window height, overrides --size.
    #[arg(long)]
    pub height: Option<u32>,

    /// Shape to generate when no --model is given.
    #[arg(long, value_enum, default_value_t = Shape::Sphere)]
    pub shape: Shape,

    /// Wavefront OBJ file to load instead of a generated shape.
    #[arg(long)]
    pub model: Option<PathBuf>,

    /// Sphere radius.
    #[arg(long, default_value_t = 1.0)]
    pub radius: f32,

    /// Sphere segment count (clamped to at least 2).
    #[arg(long, default_value_t = 32)]
    pub segments: u32,

    /// Box half-extents as X,Y,Z.
    #[arg(long, value_parser = parse_box_size, default_value = "1,1,1")]
    pub box_size: [f32; 3],

    /// Uncompressed 24/32-bit TGA texture. A checkerboard is used otherwise.
    #[arg(long)]
    pub texture: Option<PathBuf>,

    /// WGSL vertex shader file.
    #[arg(long, requires = "fragment_shader")]
    pub vertex_shader: Option<PathBuf>,

    /// WGSL fragment shader file.
    #[arg(long, requires = "vertex_shader")]
    pub fragment_shader: Option<PathBuf>,

    /// Model spin around the vertical axis, radians per second.
    #[arg(long, default_value_t = 0.6, allow_negative_numbers = true)]
    pub spin: f32,

    /// Log vertex/triangle counts and bounds of the mesh.
    #[arg(long)]
    pub info: bool,

    /// Log every vertex and triangle (needs RUST_LOG=debug).
    #[arg(long)]
    pub dump_mesh: bool,
}

impl Args {
    /// Window size after applying --size, --width and --height (default 1280x720).
    pub fn window_size(&self) -> (u32, u32) {
        let (w, h) = self.size.unwrap_or((1280, 720));
        (self.width.unwrap_or(w).max(1), self.height.unwrap_or(h).max(1))
    }
}

fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let w = w.trim().parse().map_err(|e| format!("bad width '{w}': {e}"))?;
    let h = h.trim().parse().map_err(|e| format!("bad height '{h}': {e}"))?;
    Ok((w, h))
}

fn parse_box_size(s: &str) -> Result<[f32; 3], String> {
    let parts: Vec<&str> = s.split(',').collect();
    let &[x, y, z] = parts.as_slice() else {
        return Err(format!("expected X,Y,Z, got '{s}'"));
    };
    let parse = |v: &str| {
        v.trim()
            .parse::<f32>()
            .map_err(|e| format!("bad box size '{v}': {e}"))
    };
    Ok([parse(x)?, parse(y)?, parse(z)?])
}
