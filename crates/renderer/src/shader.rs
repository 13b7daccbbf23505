//! Shader programs: one vertex and one fragment WGSL stage.
//!
//! Each stage is compiled on its own (parsed and validated), then the pair is
//! linked: both entry points must exist and every `@location` the fragment
//! stage reads must be written by the vertex stage. Failures carry the
//! compiler's human-readable diagnostic text.

use std::{
    collections::BTreeSet,
    fmt, fs,
    path::{Path, PathBuf},
};

use naga::valid::{Capabilities, ValidationFlags, Validator};
use thiserror::Error;

const BUILTIN_VERTEX: &str = include_str!("shaders/vertex.wgsl");
const BUILTIN_FRAGMENT: &str = include_str!("shaders/fragment.wgsl");

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Vertex,
    Fragment,
}

impl Stage {
    fn naga(self) -> naga::ShaderStage {
        match self {
            Stage::Vertex => naga::ShaderStage::Vertex,
            Stage::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Vertex => "vertex",
            Stage::Fragment => "fragment",
        })
    }
}

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("could not read {stage} shader file {}: {source}", .path.display())]
    Io {
        stage: Stage,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{stage} shader compile error ('{label}'):\n{log}")]
    Compile {
        stage: Stage,
        label: String,
        log: String,
    },
    #[error("shader program linker error:\n{0}")]
    Link(String),
}

/// A parsed and validated shader stage.
#[derive(Debug)]
pub struct CompiledStage {
    stage: Stage,
    label: String,
    source: String,
    entry_point: String,
    module: naga::Module,
}

impl CompiledStage {
    pub fn compile(
        stage: Stage,
        label: impl Into<String>,
        source: impl Into<String>,
    ) -> Result<Self, ShaderError> {
        let label = label.into();
        let source = source.into();
        let compile_error = |log: String| ShaderError::Compile {
            stage,
            label: label.clone(),
            log,
        };

        let module = naga::front::wgsl::parse_str(&source)
            .map_err(|e| compile_error(e.emit_to_string(&source)))?;
        Validator::new(ValidationFlags::all(), Capabilities::default())
            .validate(&module)
            .map_err(|e| compile_error(e.emit_to_string(&source)))?;

        Ok(Self {
            stage,
            label,
            source,
            entry_point: String::new(),
            module,
        })
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Entry point chosen at link time.
    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    fn find_entry_point(&self) -> Result<&naga::EntryPoint, ShaderError> {
        self.module
            .entry_points
            .iter()
            .find(|ep| ep.stage == self.stage.naga())
            .ok_or_else(|| {
                ShaderError::Link(format!(
                    "'{}' has no @{} entry point",
                    self.label, self.stage
                ))
            })
    }

    /// Create the device-side module for this stage.
    pub fn create_module(&self, device: &wgpu::Device) -> wgpu::ShaderModule {
        device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&self.label),
            source: wgpu::ShaderSource::Wgsl(self.source.as_str().into()),
        })
    }
}

/// A linked vertex + fragment pair.
#[derive(Debug)]
pub struct ShaderProgram {
    vertex: CompiledStage,
    fragment: CompiledStage,
}

impl ShaderProgram {
    /// Read, compile and link two WGSL files.
    pub fn from_files(
        vertex_path: impl AsRef<Path>,
        fragment_path: impl AsRef<Path>,
    ) -> Result<Self, ShaderError> {
        let vertex_path = vertex_path.as_ref();
        let fragment_path = fragment_path.as_ref();
        let vertex = CompiledStage::compile(
            Stage::Vertex,
            vertex_path.display().to_string(),
            read_stage(Stage::Vertex, vertex_path)?,
        )?;
        let fragment = CompiledStage::compile(
            Stage::Fragment,
            fragment_path.display().to_string(),
            read_stage(Stage::Fragment, fragment_path)?,
        )?;
        let program = Self::link(vertex, fragment)?;
        log::info!(
            "Linked shader program {:?} + {:?}",
            vertex_path,
            fragment_path
        );
        Ok(program)
    }

    /// Compile and link two in-memory WGSL sources.
    pub fn from_sources(vertex: &str, fragment: &str) -> Result<Self, ShaderError> {
        Self::link(
            CompiledStage::compile(Stage::Vertex, "vertex", vertex)?,
            CompiledStage::compile(Stage::Fragment, "fragment", fragment)?,
        )
    }

    /// The shaders shipped with the renderer.
    pub fn builtin() -> Result<Self, ShaderError> {
        Self::link(
            CompiledStage::compile(Stage::Vertex, "builtin vertex.wgsl", BUILTIN_VERTEX)?,
            CompiledStage::compile(Stage::Fragment, "builtin fragment.wgsl", BUILTIN_FRAGMENT)?,
        )
    }

    pub fn link(
        mut vertex: CompiledStage,
        mut fragment: CompiledStage,
    ) -> Result<Self, ShaderError> {
        if vertex.stage != Stage::Vertex || fragment.stage != Stage::Fragment {
            return Err(ShaderError::Link(format!(
                "expected a vertex and a fragment stage, got {} and {}",
                vertex.stage, fragment.stage
            )));
        }

        let vs_entry = vertex.find_entry_point()?;
        let fs_entry = fragment.find_entry_point()?;

        let written: BTreeSet<u32> = vs_entry
            .function
            .result
            .iter()
            .flat_map(|r| locations(&vertex.module, r.binding.as_ref(), r.ty))
            .collect();
        let read: BTreeSet<u32> = fs_entry
            .function
            .arguments
            .iter()
            .flat_map(|a| locations(&fragment.module, a.binding.as_ref(), a.ty))
            .collect();
        let missing: Vec<u32> = read.difference(&written).copied().collect();
        if !missing.is_empty() {
            return Err(ShaderError::Link(format!(
                "fragment entry point '{}' reads location(s) {:?} that vertex entry point '{}' does not write",
                fs_entry.name, missing, vs_entry.name
            )));
        }

        let vs_name = vs_entry.name.clone();
        let fs_name = fs_entry.name.clone();
        vertex.entry_point = vs_name;
        fragment.entry_point = fs_name;
        Ok(Self { vertex, fragment })
    }

    pub fn vertex(&self) -> &CompiledStage {
        &self.vertex
    }

    pub fn fragment(&self) -> &CompiledStage {
        &self.fragment
    }
}

fn read_stage(stage: Stage, path: &Path) -> Result<String, ShaderError> {
    fs::read_to_string(path).map_err(|source| ShaderError::Io {
        stage,
        path: path.to_path_buf(),
        source,
    })
}

/// User-defined `@location`s carried by an entry point argument or result,
/// looking through struct members.
fn locations(
    module: &naga::Module,
    binding: Option<&naga::Binding>,
    ty: naga::Handle<naga::Type>,
) -> Vec<u32> {
    match binding {
        Some(naga::Binding::Location { location, .. }) => vec![*location],
        Some(naga::Binding::BuiltIn(_)) => Vec::new(),
        None => match &module.types[ty].inner {
            naga::TypeInner::Struct { members, .. } => members
                .iter()
                .filter_map(|m| match &m.binding {
                    Some(naga::Binding::Location { location, .. }) => Some(*location),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        },
    }
}
