//! Device-side copy of a [`Mesh`]: one interleaved vertex buffer and one
//! u32 index buffer, drawn as an indexed triangle list.

use std::ops::Range;

use asset::{Mesh, MeshVertex};
use wgpu::{
    Buffer, BufferUsages, Device, Limits, VertexBufferLayout, VertexStepMode, util::DeviceExt,
};

use crate::RenderError;

/// Attribute slots 0 = position, 1 = normal, 2 = texture coordinate.
pub const VERTEX_LAYOUT: VertexBufferLayout<'static> = VertexBufferLayout {
    array_stride: std::mem::size_of::<MeshVertex>() as u64,
    step_mode: VertexStepMode::Vertex,
    attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2],
};

/// Index range covering every triangle of `mesh`.
pub fn draw_range(mesh: &Mesh) -> Result<Range<u32>, RenderError> {
    if mesh.is_empty() {
        return Err(RenderError::EmptyMesh);
    }
    let count = u32::try_from(mesh.index_count())
        .map_err(|_| RenderError::MeshTooLarge(mesh.index_count()))?;
    Ok(0..count)
}

/// [`draw_range`], also checking both buffers against the device's
/// `max_buffer_size`.
pub fn checked_draw_range(mesh: &Mesh, limits: &Limits) -> Result<Range<u32>, RenderError> {
    let range = draw_range(mesh)?;
    let max = limits.max_buffer_size;
    let vertex_bytes = (mesh.vertex_count() as u64)
        .saturating_mul(std::mem::size_of::<MeshVertex>() as u64);
    let index_bytes = u64::from(range.end).saturating_mul(4);
    for (buffer, size) in [("vertex", vertex_bytes), ("index", index_bytes)] {
        if size > max {
            return Err(RenderError::BufferTooLarge { buffer, size, max });
        }
    }
    Ok(range)
}

pub struct GpuMesh {
    vertex_buf: Buffer,
    index_buf: Buffer,
    indices: Range<u32>,
}

impl GpuMesh {
    pub fn upload(device: &Device, mesh: &Mesh) -> Result<Self, RenderError> {
        let indices = checked_draw_range(mesh, &device.limits())?;
        let vertex_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh VB"),
            contents: bytemuck::cast_slice(mesh.vertices()),
            usage: BufferUsages::VERTEX,
        });
        let index_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh IB"),
            contents: bytemuck::cast_slice(mesh.indices()),
            usage: BufferUsages::INDEX,
        });
        log::debug!(
            "Uploaded mesh: {} vertices, {} triangles",
            mesh.vertex_count(),
            mesh.triangle_count()
        );
        Ok(Self {
            vertex_buf,
            index_buf,
            indices,
        })
    }

    pub fn index_count(&self) -> u32 {
        self.indices.end
    }

    /// Record the draw for every triangle. Pipeline and bind groups must
    /// already be set on `rpass`.
    pub fn draw(&self, rpass: &mut wgpu::RenderPass<'_>) {
        rpass.set_vertex_buffer(0, self.vertex_buf.slice(..));
        rpass.set_index_buffer(self.index_buf.slice(..), wgpu::IndexFormat::Uint32);
        rpass.draw_indexed(self.indices.clone(), 0, 0..1);
    }
}

impl Drop for GpuMesh {
    fn drop(&mut self) {
        self.vertex_buf.destroy();
        self.index_buf.destroy();
    }
}

#[cfg(test)]
mod tests {
    use asset::Triangle;

    use super::*;

    #[test]
    fn layout_matches_vertex_struct() {
        assert_eq!(VERTEX_LAYOUT.array_stride, 32);
        let offsets: Vec<_> = VERTEX_LAYOUT
            .attributes
            .iter()
            .map(|a| (a.shader_location, a.offset))
            .collect();
        assert_eq!(offsets, vec![(0, 0), (1, 12), (2, 24)]);
    }

    #[test]
    fn draw_range_covers_all_triangles() {
        assert_eq!(draw_range(&Mesh::triangle()).unwrap(), 0..3);
        assert_eq!(draw_range(&Mesh::cuboid(1.0, 1.0, 1.0)).unwrap(), 0..36);
        let sphere = Mesh::sphere(1.0, 8).unwrap();
        assert_eq!(
            draw_range(&sphere).unwrap().end as usize,
            3 * sphere.triangle_count()
        );
    }

    #[test]
    fn buffers_over_the_device_limit_are_rejected() {
        let sphere = Mesh::sphere(1.0, 8).unwrap();
        let vertex_bytes = 32 * sphere.vertex_count() as u64;
        let limits = |max_buffer_size| Limits {
            max_buffer_size,
            ..Limits::downlevel_webgl2_defaults()
        };

        assert_eq!(
            checked_draw_range(&sphere, &limits(vertex_bytes)).unwrap(),
            draw_range(&sphere).unwrap()
        );
        match checked_draw_range(&sphere, &limits(vertex_bytes - 1)) {
            Err(RenderError::BufferTooLarge { buffer, size, max }) => {
                assert_eq!(buffer, "vertex");
                assert_eq!(size, vertex_bytes);
                assert_eq!(max, vertex_bytes - 1);
            }
            other => panic!("unexpected {other:?}"),
        }

        // One triangle drawn many times: the index buffer is the larger one.
        let repeated = Mesh::from_parts(
            Mesh::triangle().vertices().to_vec(),
            vec![Triangle::new(0, 1, 2); 100],
        )
        .unwrap();
        let index_bytes = 4 * repeated.index_count() as u64;
        assert!(index_bytes > 32 * repeated.vertex_count() as u64);
        assert!(matches!(
            checked_draw_range(&repeated, &limits(index_bytes - 1)),
            Err(RenderError::BufferTooLarge { buffer: "index", .. })
        ));
    }

    #[test]
    fn empty_mesh_is_not_drawable() {
        assert!(matches!(draw_range(&Mesh::new()), Err(RenderError::EmptyMesh)));
    }
}
