//! CPU-side mesh representation shared by generators and loaders.

use std::fmt;

use bytemuck::{Pod, Zeroable};
use thiserror::Error;

/// Vertex with position/normal/uv, interleaved as `x y z nx ny nz s t`.
///
/// Normals are not required to be unit length and texture coordinates
/// are not wrapped.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl MeshVertex {
    pub const fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// Three indices into the vertex array of the owning mesh.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct Triangle(pub [u32; 3]);

impl Triangle {
    pub const fn new(a: u32, b: u32, c: u32) -> Self {
        Self([a, b, c])
    }
}

impl From<[u32; 3]> for Triangle {
    fn from(indices: [u32; 3]) -> Self {
        Self(indices)
    }
}

/// Axis-aligned extents of a mesh's vertex positions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl Aabb {
    pub fn size(&self) -> [f32; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MeshError {
    #[error("mesh has no vertices")]
    Empty,
    #[error("triangle {triangle} references vertex {index}, but the mesh has {vertex_count} vertices")]
    IndexOutOfBounds {
        triangle: usize,
        index: u32,
        vertex_count: usize,
    },
    #[error("mesh would need {0} vertices, more than a 32-bit index can address")]
    TooManyVertices(usize),
}

/// Indexed triangle mesh. Both arrays are owned exclusively and are only
/// ever replaced as a whole.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    vertices: Vec<MeshVertex>,
    triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a mesh, validating every triangle against the vertex count.
    pub fn from_parts(
        vertices: Vec<MeshVertex>,
        triangles: Vec<Triangle>,
    ) -> Result<Self, MeshError> {
        let mut mesh = Self::new();
        mesh.replace(vertices, triangles)?;
        Ok(mesh)
    }

    /// Overwrite all content. On error the mesh is left untouched.
    pub fn replace(
        &mut self,
        vertices: Vec<MeshVertex>,
        triangles: Vec<Triangle>,
    ) -> Result<(), MeshError> {
        if u32::try_from(vertices.len()).is_err() {
            return Err(MeshError::TooManyVertices(vertices.len()));
        }
        let vertex_count = vertices.len();
        for (triangle, tri) in triangles.iter().enumerate() {
            if let Some(&index) = tri.0.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(MeshError::IndexOutOfBounds {
                    triangle,
                    index,
                    vertex_count,
                });
            }
        }

        self.set_arrays(vertices, triangles);
        Ok(())
    }

    /// Install arrays whose indices are already known to be in range.
    pub(crate) fn set_arrays(&mut self, vertices: Vec<MeshVertex>, triangles: Vec<Triangle>) {
        debug_assert!(
            triangles
                .iter()
                .flat_map(|t| t.0)
                .all(|i| (i as usize) < vertices.len())
        );
        self.vertices = vertices;
        self.triangles = triangles;
    }

    /// Drop all vertices and triangles.
    pub fn clear(&mut self) {
        self.vertices = Vec::new();
        self.triangles = Vec::new();
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    #[inline]
    pub fn index_count(&self) -> usize {
        self.triangles.len() * 3
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.triangles.is_empty()
    }

    pub fn vertices(&self) -> &[MeshVertex] {
        &self.vertices
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Triangles as a flat index list, ready for an index buffer.
    pub fn indices(&self) -> &[u32] {
        bytemuck::cast_slice(&self.triangles)
    }

    /// Component-wise min/max over all vertex positions.
    pub fn bounding_box(&self) -> Result<Aabb, MeshError> {
        let (first, rest) = self.vertices.split_first().ok_or(MeshError::Empty)?;
        let mut aabb = Aabb {
            min: first.position,
            max: first.position,
        };
        for v in rest {
            for axis in 0..3 {
                aabb.min[axis] = aabb.min[axis].min(v.position[axis]);
                aabb.max[axis] = aabb.max[axis].max(v.position[axis]);
            }
        }
        Ok(aabb)
    }

    pub fn info(&self) -> MeshInfo {
        MeshInfo {
            vertices: self.vertex_count(),
            triangles: self.triangle_count(),
            bounds: self.bounding_box().ok(),
        }
    }

    /// Dump every vertex position and triangle at debug level.
    pub fn log_contents(&self) {
        log::debug!("Mesh vertex data:");
        for (i, v) in self.vertices.iter().enumerate() {
            let [x, y, z] = v.position;
            log::debug!("{i}: {x:8.2} {y:8.2} {z:8.2}");
        }
        log::debug!("Mesh triangle data:");
        for (i, Triangle([a, b, c])) in self.triangles.iter().enumerate() {
            log::debug!("{i}: {a} {b} {c}");
        }
    }
}

/// Counts and extents of a mesh, formatted as a short report.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeshInfo {
    pub vertices: usize,
    pub triangles: usize,
    pub bounds: Option<Aabb>,
}

impl fmt::Display for MeshInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "vertices : {}", self.vertices)?;
        write!(f, "triangles: {}", self.triangles)?;
        if let Some(Aabb { min, max }) = self.bounds {
            for (axis, name) in ["x", "y", "z"].iter().enumerate() {
                write!(f, "\n{name}min: {:8.2}", min[axis])?;
                write!(f, "\n{name}max: {:8.2}", max[axis])?;
            }
        }
        Ok(())
    }
}
