//! Procedural geometry: a single triangle, an 8-corner box and a UV sphere.
//!
//! All generators produce the interleaved position/normal/uv layout of
//! [`MeshVertex`]. The sphere uses +Z as "up" in object space.

use std::f64::consts::PI;

use crate::mesh::{Mesh, MeshError, MeshVertex, Triangle};

/// Normal shared by every box corner. Per-face normals would need the
/// corners split into 24 vertices.
pub const BOX_PLACEHOLDER_NORMAL: [f32; 3] = [0.0, 0.0, 1.0];

const BOX_TRIANGLES: [[u32; 3]; 12] = [
    [0, 3, 1],
    [0, 2, 3],
    [1, 4, 0],
    [1, 5, 4],
    [4, 2, 0],
    [4, 6, 2],
    [1, 3, 7],
    [1, 7, 5],
    [7, 2, 6],
    [7, 3, 2],
    [4, 5, 7],
    [4, 7, 6],
];

/// Vertex and triangle counts of a sphere with the given segment count.
///
/// Returns `(vertices, triangles)`, or `None` when either count does not
/// fit in `usize`.
pub fn sphere_counts(segments: u32) -> Option<(usize, usize)> {
    let vsegs = segments.max(2) as usize;
    let hsegs = vsegs.checked_mul(2)?;
    let vertices = (vsegs - 1)
        .checked_mul(hsegs.checked_add(1)?)?
        .checked_add(2)?;
    let triangles = (vsegs - 2)
        .checked_mul(hsegs)?
        .checked_mul(2)?
        .checked_add(hsegs.checked_mul(2)?)?;
    Some((vertices, triangles))
}

impl Mesh {
    /// One triangle in the z=0 plane facing +Z.
    pub fn triangle() -> Self {
        let mut mesh = Self::new();
        mesh.create_triangle();
        mesh
    }

    /// Box spanning `±xsize`, `±ysize`, `±zsize` around the origin.
    pub fn cuboid(xsize: f32, ysize: f32, zsize: f32) -> Self {
        let mut mesh = Self::new();
        mesh.create_box(xsize, ysize, zsize);
        mesh
    }

    /// UV sphere; `segments` below 2 is raised to 2.
    pub fn sphere(radius: f32, segments: u32) -> Result<Self, MeshError> {
        let mut mesh = Self::new();
        mesh.create_sphere(radius, segments)?;
        Ok(mesh)
    }

    pub fn create_triangle(&mut self) {
        let normal = [0.0, 0.0, 1.0];
        self.set_arrays(
            vec![
                MeshVertex::new([-1.0, -1.0, 0.0], normal, [0.0, 0.0]),
                MeshVertex::new([1.0, -1.0, 0.0], normal, [1.0, 0.0]),
                MeshVertex::new([0.0, 1.0, 0.0], normal, [0.5, 1.0]),
            ],
            vec![Triangle::new(0, 1, 2)],
        );
    }

    /// Corner `k` takes its x sign from bit 0, y from bit 1 and z from
    /// bit 2 of `k`. All corners share [`BOX_PLACEHOLDER_NORMAL`] and uv
    /// `(0, 0)`.
    pub fn create_box(&mut self, xsize: f32, ysize: f32, zsize: f32) {
        let signed = |bit: bool, size: f32| if bit { size } else { -size };
        let vertices = (0..8u32)
            .map(|k| {
                MeshVertex::new(
                    [
                        signed(k & 1 != 0, xsize),
                        signed(k & 2 != 0, ysize),
                        signed(k & 4 != 0, zsize),
                    ],
                    BOX_PLACEHOLDER_NORMAL,
                    [0.0, 0.0],
                )
            })
            .collect();
        let triangles = BOX_TRIANGLES.iter().copied().map(Triangle).collect();
        self.set_arrays(vertices, triangles);
    }

    /// Rebuild as a sphere of `max(segments, 2)` latitude bands and twice as
    /// many longitude segments. Each latitude ring repeats its first vertex
    /// at the texture seam.
    pub fn create_sphere(&mut self, radius: f32, segments: u32) -> Result<(), MeshError> {
        let (nverts, ntris) =
            sphere_counts(segments).ok_or(MeshError::TooManyVertices(usize::MAX))?;
        let last = u32::try_from(nverts - 1).map_err(|_| MeshError::TooManyVertices(nverts))?;
        let vsegs = segments.max(2) as usize;
        let hsegs = vsegs * 2;

        let mut vertices = Vec::with_capacity(nverts);
        vertices.push(MeshVertex::new(
            [0.0, 0.0, radius],
            [0.0, 0.0, 1.0],
            [0.5, 1.0],
        ));
        for j in 0..vsegs - 1 {
            let theta = (j + 1) as f64 / vsegs as f64 * PI;
            let z = theta.cos() as f32;
            let ring = theta.sin() as f32;
            for i in 0..=hsegs {
                let phi = i as f64 / hsegs as f64 * 2.0 * PI;
                let x = ring * phi.cos() as f32;
                let y = ring * phi.sin() as f32;
                vertices.push(MeshVertex::new(
                    [radius * x, radius * y, radius * z],
                    [x, y, z],
                    [i as f32 / hsegs as f32, 1.0 - (j + 1) as f32 / vsegs as f32],
                ));
            }
        }
        vertices.push(MeshVertex::new(
            [0.0, 0.0, -radius],
            [0.0, 0.0, -1.0],
            [0.5, 0.0],
        ));

        // Index arithmetic below stays under `last`, which fits in u32.
        let hsegs = hsegs as u32;
        let mut triangles = Vec::with_capacity(ntris);
        for i in 0..hsegs {
            triangles.push(Triangle::new(0, 1 + i, 2 + i));
        }
        for j in 0..vsegs as u32 - 2 {
            for i in 0..hsegs {
                let i0 = 1 + j * (hsegs + 1) + i;
                triangles.push(Triangle::new(i0, i0 + hsegs + 1, i0 + 1));
                triangles.push(Triangle::new(i0 + 1, i0 + hsegs + 1, i0 + hsegs + 2));
            }
        }
        for i in 0..hsegs {
            triangles.push(Triangle::new(last, last - 1 - i, last - 2 - i));
        }

        debug_assert_eq!(vertices.len(), nverts);
        debug_assert_eq!(triangles.len(), ntris);
        self.set_arrays(vertices, triangles);
        Ok(())
    }
}
