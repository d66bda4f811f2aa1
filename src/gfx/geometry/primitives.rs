//! # Primitive Shape Generation
//!
//! Procedural meshes used for the manipulator handles, the ground grid and
//! as fixtures in tests. All shapes wind counter-clockwise when seen from
//! outside, so derived normals point outward.

use super::MeshGeometry;
use crate::gfx::scene::vertex::Vertex3D;
use std::f32::consts::PI;

/// Generate an axis-aligned box centred at the origin
///
/// Each face has its own four vertices so the derived normals stay flat.
pub fn generate_box(half_extents: [f32; 3]) -> MeshGeometry {
    let [x, y, z] = half_extents;

    let positions = vec![
        // Front face
        [-x, -y,  z], [ x, -y,  z], [ x,  y,  z], [-x,  y,  z],
        // Back face
        [-x, -y, -z], [-x,  y, -z], [ x,  y, -z], [ x, -y, -z],
        // Left face
        [-x, -y, -z], [-x, -y,  z], [-x,  y,  z], [-x,  y, -z],
        // Right face
        [ x, -y,  z], [ x, -y, -z], [ x,  y, -z], [ x,  y,  z],
        // Top face
        [-x,  y,  z], [ x,  y,  z], [ x,  y, -z], [-x,  y, -z],
        // Bottom face
        [-x, -y, -z], [ x, -y, -z], [ x, -y,  z], [-x, -y,  z],
    ];

    let indices = (0..6u32)
        .flat_map(|face| {
            let base = face * 4;
            [base, base + 1, base + 2, base + 2, base + 3, base]
        })
        .collect();

    MeshGeometry::from_indexed(positions, indices).expect("box indices are in range")
}

/// Generate a UV sphere of the given radius centred at the origin
///
/// # Arguments
/// * `radius` - Sphere radius
/// * `longitude_segments` - Number of vertical segments (longitude lines)
/// * `latitude_segments` - Number of horizontal segments (latitude lines)
pub fn generate_sphere(radius: f32, longitude_segments: u32, latitude_segments: u32) -> MeshGeometry {
    let long_segs = longitude_segments.max(3);
    let lat_segs = latitude_segments.max(2);

    let mut positions = Vec::with_capacity(((lat_segs + 1) * (long_segs + 1)) as usize);
    for lat in 0..=lat_segs {
        let theta = lat as f32 * PI / lat_segs as f32; // 0 to PI
        let (sin_theta, cos_theta) = theta.sin_cos();

        for long in 0..=long_segs {
            let phi = long as f32 * 2.0 * PI / long_segs as f32; // 0 to 2*PI
            let (sin_phi, cos_phi) = phi.sin_cos();

            positions.push([
                radius * sin_theta * cos_phi,
                radius * cos_theta,
                radius * sin_theta * sin_phi,
            ]);
        }
    }

    let mut indices = Vec::with_capacity((lat_segs * long_segs * 6) as usize);
    for lat in 0..lat_segs {
        for long in 0..long_segs {
            let first = lat * (long_segs + 1) + long;
            let second = first + long_segs + 1;

            indices.extend_from_slice(&[first, first + 1, second]);
            indices.extend_from_slice(&[second, first + 1, second + 1]);
        }
    }

    MeshGeometry::from_indexed(positions, indices).expect("sphere indices are in range")
}

/// Generate a square plane in the XZ plane facing +Y
///
/// # Arguments
/// * `size` - Edge length of the plane
/// * `segments` - Number of subdivisions along each edge
pub fn generate_plane(size: f32, segments: u32) -> MeshGeometry {
    let segs = segments.max(1);

    let mut positions = Vec::with_capacity(((segs + 1) * (segs + 1)) as usize);
    for row in 0..=segs {
        let pos_z = (row as f32 / segs as f32 - 0.5) * size;
        for col in 0..=segs {
            let pos_x = (col as f32 / segs as f32 - 0.5) * size;
            positions.push([pos_x, 0.0, pos_z]);
        }
    }

    let mut indices = Vec::with_capacity((segs * segs * 6) as usize);
    for row in 0..segs {
        for col in 0..segs {
            let i = row * (segs + 1) + col;
            let next_row = i + segs + 1;

            indices.extend_from_slice(&[i, next_row, i + 1]);
            indices.extend_from_slice(&[next_row, next_row + 1, i + 1]);
        }
    }

    MeshGeometry::from_indexed(positions, indices).expect("plane indices are in range")
}

/// Line-list vertices for a ground grid on the XZ plane
///
/// The `normal` slot of each vertex carries its RGB colour; the two centre
/// lines use `center_color`, every other line `grid_color`.
pub fn generate_grid_lines(
    size: f32,
    divisions: u32,
    center_color: [f32; 3],
    grid_color: [f32; 3],
) -> Vec<Vertex3D> {
    let divisions = divisions.max(1);
    let step = size / divisions as f32;
    let half = size / 2.0;
    let center = divisions / 2;
    let mid = divisions as f32 / 2.0;

    let mut vertices = Vec::with_capacity(((divisions + 1) * 4) as usize);
    for i in 0..=divisions {
        let k = (i as f32 - mid) * step;
        let color = if divisions % 2 == 0 && i == center {
            center_color
        } else {
            grid_color
        };

        vertices.push(Vertex3D { position: [-half, 0.0, k], normal: color });
        vertices.push(Vertex3D { position: [half, 0.0, k], normal: color });
        vertices.push(Vertex3D { position: [k, 0.0, -half], normal: color });
        vertices.push(Vertex3D { position: [k, 0.0, half], normal: color });
    }

    vertices
}
