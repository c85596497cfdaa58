//! Mesh generation utilities for CPU-side mesh creation
//! Following DOP principles - pure functions that generate or inspect mesh data

use super::mesh_data::{MeshData, Vertex};
use crate::bounds::{aabb_expand_point, aabb_empty, AABB};
use crate::error::{EngineError, EngineResult};
use cgmath::{InnerSpace, Point3, Vector3};

// ============================================================================
// GENERATION
// ============================================================================

/// Unit cube with shared corners
/// Returns 8 vertices and 12 triangles (36 indices)
pub fn create_cube_mesh() -> MeshData {
    let positions = [
        [0.0, 0.0, 0.0], // 0: left, bottom, back
        [1.0, 0.0, 0.0], // 1: right, bottom, back
        [1.0, 1.0, 0.0], // 2: right, top, back
        [0.0, 1.0, 0.0], // 3: left, top, back
        [0.0, 0.0, 1.0], // 4: left, bottom, front
        [1.0, 0.0, 1.0], // 5: right, bottom, front
        [1.0, 1.0, 1.0], // 6: right, top, front
        [0.0, 1.0, 1.0], // 7: left, top, front
    ];

    let vertices = positions
        .iter()
        .map(|&position| Vertex {
            position,
            normal: normalize_array([
                position[0] - 0.5,
                position[1] - 0.5,
                position[2] - 0.5,
            ]),
            ..Default::default()
        })
        .collect();

    // Face corners listed clockwise seen from outside
    let faces: [[u32; 4]; 6] = [
        [1, 5, 6, 2], // +X
        [4, 0, 3, 7], // -X
        [3, 2, 6, 7], // +Y
        [4, 5, 1, 0], // -Y
        [5, 4, 7, 6], // +Z
        [0, 1, 2, 3], // -Z
    ];

    // Emit counter-clockwise so face normals point outward
    let mut indices = Vec::with_capacity(36);
    for face in faces.iter() {
        indices.extend_from_slice(&[face[0], face[2], face[1]]);
        indices.extend_from_slice(&[face[0], face[3], face[2]]);
    }

    MeshData { vertices, indices }
}

/// Connected strip of `triangle_count` triangles in the XY plane
/// Triangle i uses vertices (i, i+1, i+2) with alternating winding
pub fn create_strip_mesh(triangle_count: u32) -> MeshData {
    let vertex_count = triangle_count + 2;
    let vertices = (0..vertex_count)
        .map(|i| Vertex {
            position: [(i / 2) as f32, (i % 2) as f32, 0.0],
            normal: [0.0, 0.0, -1.0],
            uv: [(i / 2) as f32 / vertex_count as f32, (i % 2) as f32],
            ..Default::default()
        })
        .collect();

    let mut indices = Vec::with_capacity(triangle_count as usize * 3);
    for i in 0..triangle_count {
        if i % 2 == 0 {
            indices.extend_from_slice(&[i, i + 1, i + 2]);
        } else {
            indices.extend_from_slice(&[i + 1, i, i + 2]);
        }
    }

    MeshData { vertices, indices }
}

/// Flat grid of `columns` x `rows` quads spanning `size` on X and Z
pub fn create_grid_mesh(columns: u32, rows: u32, size: f32) -> MeshData {
    let columns = columns.max(1);
    let rows = rows.max(1);

    let mut vertices = Vec::with_capacity(((columns + 1) * (rows + 1)) as usize);
    for z in 0..=rows {
        for x in 0..=columns {
            let u = x as f32 / columns as f32;
            let v = z as f32 / rows as f32;
            vertices.push(Vertex {
                position: [u * size, 0.0, v * size],
                normal: [0.0, 1.0, 0.0],
                uv: [u, v],
                ..Default::default()
            });
        }
    }

    let stride = columns + 1;
    let mut indices = Vec::with_capacity((columns * rows * 6) as usize);
    for z in 0..rows {
        for x in 0..columns {
            let i0 = z * stride + x;
            let i1 = i0 + 1;
            let i2 = i0 + stride;
            let i3 = i2 + 1;
            indices.extend_from_slice(&[i0, i2, i1]);
            indices.extend_from_slice(&[i1, i2, i3]);
        }
    }

    MeshData { vertices, indices }
}

/// UV sphere centered on the origin
pub fn create_sphere_mesh(segments: u32, rings: u32, radius: f32) -> MeshData {
    let segments = segments.max(3);
    let rings = rings.max(2);

    let mut vertices = Vec::with_capacity(((segments + 1) * (rings + 1)) as usize);
    for ring in 0..=rings {
        let v = ring as f32 / rings as f32;
        let phi = v * std::f32::consts::PI;
        for segment in 0..=segments {
            let u = segment as f32 / segments as f32;
            let theta = u * std::f32::consts::TAU;
            let normal = [phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin()];
            vertices.push(Vertex {
                position: [normal[0] * radius, normal[1] * radius, normal[2] * radius],
                normal,
                uv: [u, v],
                ..Default::default()
            });
        }
    }

    let stride = segments + 1;
    let mut indices = Vec::with_capacity((segments * rings * 6) as usize);
    for ring in 0..rings {
        for segment in 0..segments {
            let i0 = ring * stride + segment;
            let i1 = i0 + 1;
            let i2 = i0 + stride;
            let i3 = i2 + 1;
            // Triangles touching a pole have zero area
            indices.extend_from_slice(&[i0, i1, i2]);
            indices.extend_from_slice(&[i1, i3, i2]);
        }
    }

    MeshData { vertices, indices }
}

/// Copy of `mesh` moved by `offset`
pub fn translate_mesh(mesh: &MeshData, offset: Vector3<f32>) -> MeshData {
    let vertices = mesh
        .vertices
        .iter()
        .map(|vertex| {
            let mut moved = *vertex;
            moved.position[0] += offset.x;
            moved.position[1] += offset.y;
            moved.position[2] += offset.z;
            moved
        })
        .collect();

    MeshData {
        vertices,
        indices: mesh.indices.clone(),
    }
}

// ============================================================================
// QUERIES
// ============================================================================

/// Vertex position as a point
pub fn vertex_position(vertex: &Vertex) -> Point3<f32> {
    Point3::new(vertex.position[0], vertex.position[1], vertex.position[2])
}

/// Number of triangles described by the index buffer
pub fn triangle_count(mesh: &MeshData) -> usize {
    mesh.indices.len() / 3
}

/// Bounding box of every vertex in the mesh
pub fn mesh_bounds(vertices: &[Vertex]) -> AABB {
    let mut aabb = aabb_empty();
    for vertex in vertices {
        aabb_expand_point(&mut aabb, vertex_position(vertex));
    }
    aabb
}

/// Unit face normal, or zero for a degenerate triangle
pub fn face_normal(a: Point3<f32>, b: Point3<f32>, c: Point3<f32>) -> Vector3<f32> {
    let cross = (b - a).cross(c - a);
    let length = cross.magnitude();
    if length > f32::EPSILON {
        cross / length
    } else {
        Vector3::new(0.0, 0.0, 0.0)
    }
}

/// True when the triangle repeats a vertex index
pub fn is_degenerate(triangle: [u32; 3]) -> bool {
    triangle[0] == triangle[1] || triangle[1] == triangle[2] || triangle[0] == triangle[2]
}

/// Check the index buffer against the vertex count
pub fn validate_mesh(mesh: &MeshData) -> EngineResult<()> {
    validate_indices(mesh.vertices.len(), &mesh.indices)
}

/// Index buffer must describe whole triangles over existing vertices
pub fn validate_indices(vertex_count: usize, indices: &[u32]) -> EngineResult<()> {
    if indices.len() % 3 != 0 {
        return Err(EngineError::InvalidMesh {
            reason: format!(
                "index count {} is not a multiple of 3",
                indices.len()
            ),
        });
    }

    if let Some(&index) = indices.iter().find(|&&index| index as usize >= vertex_count) {
        return Err(EngineError::IndexOutOfRange {
            index,
            vertex_count,
        });
    }

    Ok(())
}

/// Area-weighted smooth normals from the triangle list
pub fn recompute_normals(vertices: &mut [Vertex], indices: &[u32]) {
    let mut accumulated = vec![Vector3::new(0.0f32, 0.0, 0.0); vertices.len()];

    for chunk in indices.chunks_exact(3) {
        let a = vertex_position(&vertices[chunk[0] as usize]);
        let b = vertex_position(&vertices[chunk[1] as usize]);
        let c = vertex_position(&vertices[chunk[2] as usize]);
        let normal = (b - a).cross(c - a);
        for &index in chunk {
            accumulated[index as usize] += normal;
        }
    }

    for (vertex, normal) in vertices.iter_mut().zip(accumulated) {
        if normal.magnitude() > f32::EPSILON {
            vertex.normal = normal.normalize().into();
        }
    }
}

fn normalize_array(v: [f32; 3]) -> [f32; 3] {
    let length = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    if length > 0.0 {
        [v[0] / length, v[1] / length, v[2] / length]
    } else {
        v
    }
}
