//! # Mesh Geometry
//!
//! This module holds the in-memory triangle mesh representation every other
//! component consumes: the loader produces it, the picker intersects it and
//! the renderer uploads it. Geometry is immutable once built and is shared
//! between scene objects through `Arc`.
//!
//! ## Usage
//!
//! ```rust
//! use socket_viewer::gfx::geometry::{generate_box, MeshGeometry};
//!
//! let cube = generate_box([0.5, 0.5, 0.5]);
//! assert_eq!(cube.triangle_count(), 12);
//!
//! let tri = MeshGeometry::from_indexed(
//!     vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
//!     vec![0, 1, 2],
//! ).unwrap();
//! assert_eq!(tri.face_normal(0).z, 1.0);
//! ```

pub mod primitives;

pub use primitives::*;

use cgmath::{InnerSpace, Vector3, Zero};
use thiserror::Error;

use crate::gfx::{picking::Aabb, scene::vertex::Vertex3D};

/// Reasons a set of positions and indices cannot form a mesh
#[derive(Error, Debug, PartialEq)]
pub enum GeometryError {
    #[error("index count {0} is not a multiple of three")]
    NotTriangulated(usize),

    #[error("index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },

    #[error("vertex {0} has a non-finite coordinate")]
    NonFinite(usize),
}

/// Sphere enclosing every vertex of a mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vector3<f32>,
    pub radius: f32,
}

/// Indexed triangle mesh with derived normals and bounds
#[derive(Debug, Clone)]
pub struct MeshGeometry {
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    indices: Vec<u32>,
    face_normals: Vec<Vector3<f32>>,
    bounds: Aabb,
    bounding_sphere: BoundingSphere,
}

impl MeshGeometry {
    /// Build a mesh from vertex positions and triangle indices.
    ///
    /// Face normals come from the triangle winding (counter-clockwise is
    /// front facing); per-vertex normals are the area-weighted average of
    /// the faces sharing the vertex.
    pub fn from_indexed(
        positions: Vec<[f32; 3]>,
        indices: Vec<u32>,
    ) -> Result<Self, GeometryError> {
        if indices.len() % 3 != 0 {
            return Err(GeometryError::NotTriangulated(indices.len()));
        }
        if let Some(i) = positions
            .iter()
            .position(|p| p.iter().any(|c| !c.is_finite()))
        {
            return Err(GeometryError::NonFinite(i));
        }
        if let Some(&index) = indices.iter().find(|&&i| i as usize >= positions.len()) {
            return Err(GeometryError::IndexOutOfRange {
                index,
                vertex_count: positions.len(),
            });
        }

        let (face_normals, normals) = compute_normals(&positions, &indices);
        let bounds = Aabb::from_vertices(&positions);
        let bounding_sphere = compute_bounding_sphere(&positions, &bounds);

        Ok(Self {
            positions,
            normals,
            indices,
            face_normals,
            bounds,
            bounding_sphere,
        })
    }

    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    pub fn normals(&self) -> &[[f32; 3]] {
        &self.normals
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Get the number of vertices in this geometry
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Get the number of triangles in this geometry
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Corner positions of triangle `index`
    pub fn triangle(&self, index: usize) -> [Vector3<f32>; 3] {
        let tri = &self.indices[index * 3..index * 3 + 3];
        [
            Vector3::from(self.positions[tri[0] as usize]),
            Vector3::from(self.positions[tri[1] as usize]),
            Vector3::from(self.positions[tri[2] as usize]),
        ]
    }

    /// Unit geometric normal of triangle `index` (zero for degenerate faces)
    pub fn face_normal(&self, index: usize) -> Vector3<f32> {
        self.face_normals[index]
    }

    /// Local-space axis-aligned bounds
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Local-space bounding sphere, centred on the bounds' midpoint
    pub fn bounding_sphere(&self) -> BoundingSphere {
        self.bounding_sphere
    }

    /// Convert to the interleaved vertex format used by the renderer
    pub fn to_vertices(&self) -> Vec<Vertex3D> {
        self.positions
            .iter()
            .zip(&self.normals)
            .map(|(&position, &normal)| Vertex3D { position, normal })
            .collect()
    }
}

fn compute_normals(positions: &[[f32; 3]], indices: &[u32]) -> (Vec<Vector3<f32>>, Vec<[f32; 3]>) {
    let mut accumulated = vec![Vector3::zero(); positions.len()];
    let mut face_normals = Vec::with_capacity(indices.len() / 3);

    for triangle in indices.chunks_exact(3) {
        let v0 = Vector3::from(positions[triangle[0] as usize]);
        let v1 = Vector3::from(positions[triangle[1] as usize]);
        let v2 = Vector3::from(positions[triangle[2] as usize]);

        // Cross product length is twice the area, which gives the weighting for free
        let weighted = (v1 - v0).cross(v2 - v0);
        for &vertex_idx in triangle {
            accumulated[vertex_idx as usize] += weighted;
        }

        let length = weighted.magnitude();
        face_normals.push(if length > f32::EPSILON {
            weighted / length
        } else {
            Vector3::zero()
        });
    }

    let normals = accumulated
        .into_iter()
        .map(|n| {
            let length = n.magnitude();
            if length > f32::EPSILON {
                (n / length).into()
            } else {
                [0.0, 1.0, 0.0]
            }
        })
        .collect();

    (face_normals, normals)
}

fn compute_bounding_sphere(positions: &[[f32; 3]], bounds: &Aabb) -> BoundingSphere {
    let center = (bounds.min + bounds.max) * 0.5;
    let radius_sq = positions
        .iter()
        .map(|p| (Vector3::from(*p) - center).magnitude2())
        .fold(0.0_f32, f32::max);

    BoundingSphere {
        center,
        radius: radius_sq.sqrt(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_indices() {
        let positions = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];

        assert_eq!(
            MeshGeometry::from_indexed(positions.clone(), vec![0, 1]).unwrap_err(),
            GeometryError::NotTriangulated(2)
        );
        assert_eq!(
            MeshGeometry::from_indexed(positions, vec![0, 1, 3]).unwrap_err(),
            GeometryError::IndexOutOfRange {
                index: 3,
                vertex_count: 3
            }
        );
    }

    #[test]
    fn test_rejects_non_finite_vertices() {
        let positions = vec![[0.0, 0.0, 0.0], [f32::NAN, 0.0, 0.0], [0.0, 1.0, 0.0]];
        assert_eq!(
            MeshGeometry::from_indexed(positions, vec![0, 1, 2]).unwrap_err(),
            GeometryError::NonFinite(1)
        );
    }

    #[test]
    fn test_vertex_normals_follow_winding() {
        let tri = MeshGeometry::from_indexed(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            vec![0, 1, 2],
        )
        .unwrap();

        for normal in tri.normals() {
            assert_eq!(*normal, [0.0, 0.0, 1.0]);
        }
        assert_eq!(tri.face_normal(0), Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_bounding_sphere_of_box() {
        let cube = generate_box([1.0, 2.0, 2.0]);
        let sphere = cube.bounding_sphere();

        assert!(sphere.center.magnitude() < 1e-6);
        assert!((sphere.radius - 3.0).abs() < 1e-5);
        assert_eq!(cube.bounds().max, Vector3::new(1.0, 2.0, 2.0));
    }
}
