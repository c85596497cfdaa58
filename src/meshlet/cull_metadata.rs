//! Per-meshlet cull metadata
//!
//! Bounding boxes are quantized to an 8-bit grid relative to the owning
//! mesh's bounds. The normal cone axis is octahedral-encoded into two i8
//! values; the cone angle stores `-sin(half_angle)` scaled to i8, or the
//! not-cullable sentinel when the normals spread past 90 degrees.

use super::clusterer_data::Meshlet;
use super::mesh_data::Vertex;
use super::mesh_utils::{face_normal, vertex_position};
use super::packer_data::PackedMeshletGeometry;
use super::packer_operations::{descriptor_primitives, descriptor_vertices};
use crate::bounds::{aabb_empty, aabb_expand_point, aabb_extent, create_aabb, AABB};
use crate::constants::culling::{CONE_NOT_CULLABLE, CONE_SCALE, GRID_LAST};
use bytemuck::{Pod, Zeroable};
use cgmath::{InnerSpace, Point3, Vector2, Vector3};
use static_assertions::const_assert_eq;

/// Quantized bounds and normal cone of one meshlet
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct MeshletCullData {
    /// Grid cell of the box minimum, relative to the mesh bounds
    pub bbox_min: [u8; 3],
    pub bbox_max: [u8; 3],
    /// Octahedral cone axis scaled by 127
    pub cone_octant: [i8; 2],
    /// -sin(half angle) * 127, or 127 when not cullable
    pub cone_angle: i8,
    pub _padding: [u8; 3],
}

const_assert_eq!(std::mem::size_of::<MeshletCullData>(), 12);

// ============================================================================
// OCTAHEDRAL ENCODING
// ============================================================================

fn sign_not_zero(value: f32) -> f32 {
    if value >= 0.0 {
        1.0
    } else {
        -1.0
    }
}

/// Project a unit vector onto the octahedron, unfolded into [-1, 1]^2
pub fn octahedral_encode(normal: Vector3<f32>) -> Vector2<f32> {
    let l1 = normal.x.abs() + normal.y.abs() + normal.z.abs();
    if l1 <= f32::EPSILON {
        return Vector2::new(0.0, 0.0);
    }

    let p = Vector2::new(normal.x / l1, normal.y / l1);
    if normal.z < 0.0 {
        Vector2::new(
            (1.0 - p.y.abs()) * sign_not_zero(p.x),
            (1.0 - p.x.abs()) * sign_not_zero(p.y),
        )
    } else {
        p
    }
}

/// Inverse of `octahedral_encode`, normalized
pub fn octahedral_decode(encoded: Vector2<f32>) -> Vector3<f32> {
    let mut v = Vector3::new(
        encoded.x,
        encoded.y,
        1.0 - encoded.x.abs() - encoded.y.abs(),
    );
    if v.z < 0.0 {
        let x = v.x;
        v.x = (1.0 - v.y.abs()) * sign_not_zero(x);
        v.y = (1.0 - x.abs()) * sign_not_zero(v.y);
    }
    v.normalize()
}

fn quantized_to_unit(octant: [i8; 2]) -> Vector2<f32> {
    Vector2::new(octant[0] as f32 / CONE_SCALE, octant[1] as f32 / CONE_SCALE)
}

/// Quantize an axis to i8 octahedral coordinates
///
/// Tries the four floor/ceil neighbors and keeps the one whose decoded
/// direction lies closest to `normal`.
pub fn quantize_cone_axis(normal: Vector3<f32>) -> [i8; 2] {
    let encoded = octahedral_encode(normal) * CONE_SCALE;
    let xs = [encoded.x.floor(), encoded.x.ceil()];
    let ys = [encoded.y.floor(), encoded.y.ceil()];

    let mut best = [0i8; 2];
    let mut best_dot = f32::NEG_INFINITY;
    for &x in &xs {
        for &y in &ys {
            let candidate = [
                x.clamp(-CONE_SCALE, CONE_SCALE) as i8,
                y.clamp(-CONE_SCALE, CONE_SCALE) as i8,
            ];
            let dot = octahedral_decode(quantized_to_unit(candidate)).dot(normal);
            if dot > best_dot {
                best_dot = dot;
                best = candidate;
            }
        }
    }
    best
}

// ============================================================================
// GENERATION
// ============================================================================

/// Object-space bounds of the vertices a meshlet references
pub fn meshlet_float_bounds(vertices: &[Vertex], meshlet: &Meshlet) -> AABB {
    let mut bounds = aabb_empty();
    for &index in &meshlet.vertices {
        aabb_expand_point(&mut bounds, vertex_position(&vertices[index as usize]));
    }
    bounds
}

/// Cull data for a set of triangles given as global vertex indices
pub fn compute_cull_data(
    vertices: &[Vertex],
    triangles: &[[u32; 3]],
    object_bounds: &AABB,
) -> MeshletCullData {
    let mut bounds = aabb_empty();
    let mut normals = Vec::with_capacity(triangles.len());
    let mut average = Vector3::new(0.0f32, 0.0, 0.0);

    for triangle in triangles {
        let a = vertex_position(&vertices[triangle[0] as usize]);
        let b = vertex_position(&vertices[triangle[1] as usize]);
        let c = vertex_position(&vertices[triangle[2] as usize]);
        aabb_expand_point(&mut bounds, a);
        aabb_expand_point(&mut bounds, b);
        aabb_expand_point(&mut bounds, c);

        let normal = face_normal(a, b, c);
        average += normal;
        normals.push(normal);
    }

    let (bbox_min, bbox_max) = quantize_bounds(&bounds, object_bounds);

    let length = average.magnitude();
    let axis = if length > f32::EPSILON {
        average / length
    } else {
        Vector3::new(0.0, 0.0, 0.0)
    };

    let cone_octant = quantize_cone_axis(axis);
    let decoded = octahedral_decode(quantized_to_unit(cone_octant));

    let mut min_dot = normals
        .iter()
        .map(|normal| normal.dot(decoded))
        .fold(1.0f32, f32::min);
    // Absorb quantization error
    min_dot = (min_dot - 1.0 / CONE_SCALE).max(-1.0);

    let cone_angle = if min_dot > 0.0 {
        let angle = -min_dot.acos().sin();
        (angle * CONE_SCALE).clamp(-CONE_SCALE, CONE_SCALE) as i8
    } else {
        CONE_NOT_CULLABLE
    };

    MeshletCullData {
        bbox_min,
        bbox_max,
        cone_octant,
        cone_angle,
        _padding: [0; 3],
    }
}

/// Snap a box to the grid spanned by the object bounds
pub fn quantize_bounds(bounds: &AABB, object_bounds: &AABB) -> ([u8; 3], [u8; 3]) {
    let extent = safe_extent(object_bounds);
    let mut grid_min = [0u8; 3];
    let mut grid_max = [0u8; 3];

    for axis in 0..3 {
        let low = (bounds.min[axis] - object_bounds.min[axis]) / extent[axis];
        let high = (bounds.max[axis] - object_bounds.min[axis]) / extent[axis];
        let scale = GRID_LAST as f32;
        grid_min[axis] = ((low * scale).trunc() as i32).clamp(0, GRID_LAST - 1) as u8;
        grid_max[axis] = ((high * scale).ceil() as i32).clamp(0, GRID_LAST) as u8;
    }

    (grid_min, grid_max)
}

/// Flat meshes have a zero extent on some axis; treat it as 1
fn safe_extent(object_bounds: &AABB) -> Vector3<f32> {
    let extent = aabb_extent(object_bounds);
    Vector3::new(
        if extent.x < f32::EPSILON { 1.0 } else { extent.x },
        if extent.y < f32::EPSILON { 1.0 } else { extent.y },
        if extent.z < f32::EPSILON { 1.0 } else { extent.z },
    )
}

/// Fill the cull field of every descriptor in a packed buffer
pub fn build_cull_metadata(
    geometry: &mut PackedMeshletGeometry,
    vertices: &[Vertex],
    object_bounds: &AABB,
) {
    let mut culls = Vec::with_capacity(geometry.descriptors.len());

    for descriptor in &geometry.descriptors {
        let local = descriptor_vertices(geometry, descriptor);
        let triangles: Vec<[u32; 3]> = descriptor_primitives(geometry, descriptor)
            .into_iter()
            .map(|p| {
                [
                    local[p[0] as usize],
                    local[p[1] as usize],
                    local[p[2] as usize],
                ]
            })
            .collect();
        culls.push(compute_cull_data(vertices, &triangles, object_bounds));
    }

    for (descriptor, cull) in geometry.descriptors.iter_mut().zip(culls) {
        descriptor.cull = cull;
    }

    log::debug!(
        "[build_cull_metadata] Computed cull data for {} meshlets",
        geometry.descriptors.len()
    );
}

// ============================================================================
// DECODING
// ============================================================================

/// Grid bounds back to object space; always contains the exact box
pub fn decode_cull_bounds(cull: &MeshletCullData, object_bounds: &AABB) -> AABB {
    let extent = safe_extent(object_bounds);
    let scale = GRID_LAST as f32;
    let decode = |cell: [u8; 3]| {
        Point3::new(
            object_bounds.min.x + cell[0] as f32 / scale * extent.x,
            object_bounds.min.y + cell[1] as f32 / scale * extent.y,
            object_bounds.min.z + cell[2] as f32 / scale * extent.z,
        )
    };
    create_aabb(decode(cull.bbox_min), decode(cull.bbox_max))
}

/// Unit cone axis
pub fn decode_cone_axis(cull: &MeshletCullData) -> Vector3<f32> {
    octahedral_decode(quantized_to_unit(cull.cone_octant))
}

/// Negative cone angles mark meshlets whose normals fit within 90 degrees
pub fn is_backface_cullable(cull: &MeshletCullData) -> bool {
    cull.cone_angle < 0
}

/// True when every triangle in the meshlet faces away from `eye`
pub fn is_cone_backfacing(cull: &MeshletCullData, meshlet_center: Point3<f32>, eye: Point3<f32>) -> bool {
    if !is_backface_cullable(cull) {
        return false;
    }

    let to_eye = eye - meshlet_center;
    if to_eye.magnitude2() <= f32::EPSILON {
        return false;
    }

    to_eye.normalize().dot(decode_cone_axis(cull)) < cull.cone_angle as f32 / CONE_SCALE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::aabb_contains;
    use crate::meshlet::clusterer_data::MeshletConfig;
    use crate::meshlet::clusterer_operations::cluster_meshlets;
    use crate::meshlet::mesh_utils::{create_cube_mesh, create_grid_mesh, create_sphere_mesh, mesh_bounds};
    use crate::meshlet::packer_data::PackingConfig;
    use crate::meshlet::packer_operations::pack_meshlets;

    fn packed(mesh: &crate::meshlet::mesh_data::MeshData) -> PackedMeshletGeometry {
        let meshlets =
            cluster_meshlets(&mesh.vertices, &mesh.indices, &MeshletConfig::default()).unwrap();
        let mut geometry = pack_meshlets(&meshlets, &PackingConfig::default()).geometry;
        build_cull_metadata(&mut geometry, &mesh.vertices, &mesh_bounds(&mesh.vertices));
        geometry
    }

    #[test]
    fn test_octahedral_round_trip_axes() {
        let axes = [
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, -1.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
            Vector3::new(0.0, 0.0, -1.0),
            Vector3::new(1.0, 1.0, -1.0).normalize(),
        ];
        for axis in axes {
            let decoded = octahedral_decode(octahedral_encode(axis));
            assert!((decoded - axis).magnitude() < 1e-5, "{:?}", axis);

            let quantized = octahedral_decode(quantized_to_unit(quantize_cone_axis(axis)));
            assert!(quantized.dot(axis) > 0.999);
        }
    }

    #[test]
    fn test_flat_grid_is_cullable() {
        let grid = create_grid_mesh(4, 4, 2.0);
        let geometry = packed(&grid);
        let cull = geometry.descriptors[0].cull;
        assert!(is_backface_cullable(&cull));
        assert!(decode_cone_axis(&cull).y > 0.99);

        let center = Point3::new(0.0, 0.0, 0.0);
        assert!(is_cone_backfacing(&cull, center, Point3::new(0.0, -5.0, 0.0)));
        assert!(!is_cone_backfacing(&cull, center, Point3::new(0.0, 5.0, 0.0)));
    }

    #[test]
    fn test_closed_cube_is_not_cullable() {
        let cube = create_cube_mesh();
        let geometry = packed(&cube);
        let cull = geometry.descriptors[0].cull;
        assert_eq!(cull.cone_angle, CONE_NOT_CULLABLE);
        assert!(!is_cone_backfacing(&cull, Point3::new(0.5, 0.5, 0.5), Point3::new(9.0, 0.0, 0.0)));
    }

    #[test]
    fn test_decoded_bounds_contain_exact_bounds() {
        let sphere = create_sphere_mesh(32, 16, 3.0);
        let object_bounds = mesh_bounds(&sphere.vertices);
        let meshlets =
            cluster_meshlets(&sphere.vertices, &sphere.indices, &MeshletConfig::default()).unwrap();
        let geometry = packed(&sphere);

        for (meshlet, descriptor) in meshlets.iter().zip(&geometry.descriptors) {
            let exact = meshlet_float_bounds(&sphere.vertices, meshlet);
            let decoded = decode_cull_bounds(&descriptor.cull, &object_bounds);
            let slack = create_aabb(
                decoded.min - Vector3::new(1e-4, 1e-4, 1e-4),
                decoded.max + Vector3::new(1e-4, 1e-4, 1e-4),
            );
            assert!(aabb_contains(&slack, &exact));
            for axis in 0..3 {
                assert!(descriptor.cull.bbox_min[axis] <= descriptor.cull.bbox_max[axis]);
            }
        }
    }

    #[test]
    fn test_flat_object_bounds_do_not_divide_by_zero() {
        let flat = create_aabb(Point3::new(0.0, 0.0, 0.0), Point3::new(4.0, 0.0, 4.0));
        let (low, high) = quantize_bounds(&flat, &flat);
        assert_eq!(low, [0, 0, 0]);
        assert_eq!(high, [255, 0, 255]);
    }
}
