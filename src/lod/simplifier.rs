/// Mesh Simplification
///
/// The LOD chain only needs (vertices, indices, error) back from a
/// simplifier, so it talks to one through the `MeshSimplifier` trait.
/// `QuadricSimplifier` is the in-crate implementation: greedy edge
/// collapse ordered by quadric error, with boundary-preserving planes and
/// a normal flip check.

use crate::bounds::aabb_diagonal_length;
use crate::error::{invalid_config, EngineResult};
use crate::meshlet::mesh_data::Vertex;
use crate::meshlet::mesh_utils::{is_degenerate, mesh_bounds, recompute_normals, validate_indices};
use bit_vec::BitVec;
use cgmath::{InnerSpace, Matrix4, Vector3, Vector4, Zero};
use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Weight of the planes pinning open borders in place
const BOUNDARY_WEIGHT: f64 = 10.0;

/// Simplifier output
#[derive(Debug, Clone, PartialEq)]
pub struct SimplifiedMesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    /// Approximate world-space deviation introduced by this step
    pub error: f32,
}

/// External simplification collaborator
pub trait MeshSimplifier: Send + Sync {
    /// Reduce toward `target_index_count` indices without exceeding
    /// `max_error`, given relative to the mesh's bounding diagonal
    fn simplify(
        &self,
        vertices: &[Vertex],
        indices: &[u32],
        target_index_count: usize,
        max_error: f32,
    ) -> EngineResult<SimplifiedMesh>;
}

/// Quadric error metric edge-collapse simplifier
#[derive(Debug, Clone, Copy, Default)]
pub struct QuadricSimplifier;

impl MeshSimplifier for QuadricSimplifier {
    fn simplify(
        &self,
        vertices: &[Vertex],
        indices: &[u32],
        target_index_count: usize,
        max_error: f32,
    ) -> EngineResult<SimplifiedMesh> {
        simplify_quadric(vertices, indices, target_index_count, max_error)
    }
}

// ============================================================================
// COLLAPSE STATE
// ============================================================================

#[derive(Debug, Clone)]
struct CollapseCandidate {
    keep: u32,
    remove: u32,
    error: f64,
    target: Vector3<f64>,
    versions: (u32, u32),
}

impl PartialEq for CollapseCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CollapseCandidate {}

impl PartialOrd for CollapseCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CollapseCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap behavior
        other.error.total_cmp(&self.error)
    }
}

struct CollapseState {
    positions: Vec<Vector3<f64>>,
    quadrics: Vec<Matrix4<f64>>,
    faces: Vec<[u32; 3]>,
    face_removed: BitVec,
    vertex_faces: Vec<Vec<u32>>,
    vertex_removed: BitVec,
    /// Bumped whenever a vertex moves or disappears; stale candidates are skipped
    versions: Vec<u32>,
    live_faces: usize,
}

fn plane_quadric(normal: Vector3<f64>, d: f64, weight: f64) -> Matrix4<f64> {
    let (a, b, c) = (normal.x, normal.y, normal.z);
    Matrix4::new(
        a * a, a * b, a * c, a * d,
        a * b, b * b, b * c, b * d,
        a * c, b * c, c * c, c * d,
        a * d, b * d, c * d, d * d,
    ) * weight
}

fn quadric_error(quadric: &Matrix4<f64>, position: Vector3<f64>) -> f64 {
    let v = Vector4::new(position.x, position.y, position.z, 1.0);
    v.dot(*quadric * v).abs()
}

fn face_plane(positions: &[Vector3<f64>], face: [u32; 3]) -> Option<(Vector3<f64>, f64)> {
    let a = positions[face[0] as usize];
    let b = positions[face[1] as usize];
    let c = positions[face[2] as usize];
    let cross = (b - a).cross(c - a);
    let length = cross.magnitude();
    if length <= f64::EPSILON {
        return None;
    }
    let normal = cross / length;
    Some((normal, -normal.dot(a)))
}

fn order_edge(v0: u32, v1: u32) -> (u32, u32) {
    if v0 < v1 {
        (v0, v1)
    } else {
        (v1, v0)
    }
}

fn build_collapse_state(vertices: &[Vertex], indices: &[u32]) -> (CollapseState, Vec<(u32, u32)>) {
    let positions: Vec<Vector3<f64>> = vertices
        .iter()
        .map(|v| Vector3::new(v.position[0] as f64, v.position[1] as f64, v.position[2] as f64))
        .collect();
    let mut quadrics = vec![Matrix4::zero(); vertices.len()];
    let mut faces = Vec::with_capacity(indices.len() / 3);
    let mut vertex_faces = vec![Vec::new(); vertices.len()];
    let mut edge_use: FxHashMap<(u32, u32), u32> = FxHashMap::default();

    for chunk in indices.chunks_exact(3) {
        let face = [chunk[0], chunk[1], chunk[2]];
        if is_degenerate(face) {
            continue;
        }

        let face_index = faces.len() as u32;
        for &v in &face {
            vertex_faces[v as usize].push(face_index);
        }
        for edge in 0..3 {
            *edge_use
                .entry(order_edge(face[edge], face[(edge + 1) % 3]))
                .or_default() += 1;
        }

        if let Some((normal, d)) = face_plane(&positions, face) {
            let quadric = plane_quadric(normal, d, 1.0);
            for &v in &face {
                quadrics[v as usize] = quadrics[v as usize] + quadric;
            }
        }
        faces.push(face);
    }

    // Open borders get a perpendicular plane so they keep their outline
    for &face in &faces {
        let Some((normal, _)) = face_plane(&positions, face) else {
            continue;
        };
        for edge in 0..3 {
            let (a, b) = (face[edge], face[(edge + 1) % 3]);
            if edge_use.get(&order_edge(a, b)) != Some(&1) {
                continue;
            }
            let pa = positions[a as usize];
            let perpendicular = (positions[b as usize] - pa).cross(normal);
            let length = perpendicular.magnitude();
            if length <= f64::EPSILON {
                continue;
            }
            let m = perpendicular / length;
            let quadric = plane_quadric(m, -m.dot(pa), BOUNDARY_WEIGHT);
            quadrics[a as usize] = quadrics[a as usize] + quadric;
            quadrics[b as usize] = quadrics[b as usize] + quadric;
        }
    }

    let mut edges: Vec<(u32, u32)> = edge_use.into_keys().collect();
    edges.sort_unstable();

    let live_faces = faces.len();
    let state = CollapseState {
        positions,
        quadrics,
        face_removed: BitVec::from_elem(faces.len(), false),
        faces,
        vertex_faces,
        vertex_removed: BitVec::from_elem(vertices.len(), false),
        versions: vec![0; vertices.len()],
        live_faces,
    };
    (state, edges)
}

fn compute_candidate(state: &CollapseState, keep: u32, remove: u32) -> CollapseCandidate {
    let quadric = state.quadrics[keep as usize] + state.quadrics[remove as usize];
    let p0 = state.positions[keep as usize];
    let p1 = state.positions[remove as usize];

    let mut target = p0;
    let mut error = quadric_error(&quadric, p0);
    for option in [p1, (p0 + p1) * 0.5] {
        let option_error = quadric_error(&quadric, option);
        if option_error < error {
            error = option_error;
            target = option;
        }
    }

    CollapseCandidate {
        keep,
        remove,
        error,
        target,
        versions: (state.versions[keep as usize], state.versions[remove as usize]),
    }
}

fn is_stale(state: &CollapseState, candidate: &CollapseCandidate) -> bool {
    state.vertex_removed[candidate.keep as usize]
        || state.vertex_removed[candidate.remove as usize]
        || state.versions[candidate.keep as usize] != candidate.versions.0
        || state.versions[candidate.remove as usize] != candidate.versions.1
}

/// Would moving both endpoints to the target turn any surviving face over
fn collapse_flips_face(state: &CollapseState, candidate: &CollapseCandidate) -> bool {
    for moving in [candidate.keep, candidate.remove] {
        for &face_index in &state.vertex_faces[moving as usize] {
            if state.face_removed[face_index as usize] {
                continue;
            }
            let face = state.faces[face_index as usize];
            if face.contains(&candidate.keep) && face.contains(&candidate.remove) {
                continue;
            }

            let old: Vec<Vector3<f64>> = face.iter().map(|&v| state.positions[v as usize]).collect();
            let new: Vec<Vector3<f64>> = face
                .iter()
                .zip(&old)
                .map(|(&v, &p)| if v == moving { candidate.target } else { p })
                .collect();

            let old_normal = (old[1] - old[0]).cross(old[2] - old[0]);
            if old_normal.magnitude2() <= f64::EPSILON * f64::EPSILON {
                continue;
            }
            let new_normal = (new[1] - new[0]).cross(new[2] - new[0]);
            if new_normal.dot(old_normal) <= 0.0 {
                return true;
            }
        }
    }
    false
}

fn collapse_edge(state: &mut CollapseState, candidate: &CollapseCandidate) {
    let keep = candidate.keep as usize;
    let remove = candidate.remove as usize;

    state.positions[keep] = candidate.target;
    state.quadrics[keep] = state.quadrics[keep] + state.quadrics[remove];
    state.vertex_removed.set(remove, true);
    state.versions[keep] += 1;
    state.versions[remove] += 1;

    let moved = std::mem::take(&mut state.vertex_faces[remove]);
    for face_index in moved {
        if state.face_removed[face_index as usize] {
            continue;
        }
        let face = &mut state.faces[face_index as usize];
        for v in face.iter_mut() {
            if *v == candidate.remove {
                *v = candidate.keep;
            }
        }
        if is_degenerate(*face) {
            state.face_removed.set(face_index as usize, true);
            state.live_faces -= 1;
        } else {
            state.vertex_faces[keep].push(face_index);
        }
    }
}

fn live_neighbors(state: &CollapseState, vertex: u32) -> Vec<u32> {
    let mut neighbors: Vec<u32> = state.vertex_faces[vertex as usize]
        .iter()
        .filter(|&&f| !state.face_removed[f as usize])
        .flat_map(|&f| state.faces[f as usize])
        .filter(|&v| v != vertex)
        .collect();
    neighbors.sort_unstable();
    neighbors.dedup();
    neighbors
}

fn build_simplified_mesh(state: &CollapseState, vertices: &[Vertex], error: f32) -> SimplifiedMesh {
    let mut remap = vec![u32::MAX; vertices.len()];
    let mut out_vertices = Vec::new();
    let mut out_indices = Vec::with_capacity(state.live_faces * 3);

    for (face_index, face) in state.faces.iter().enumerate() {
        if state.face_removed[face_index] {
            continue;
        }
        for &v in face {
            let slot = v as usize;
            if remap[slot] == u32::MAX {
                remap[slot] = out_vertices.len() as u32;
                let p = state.positions[slot];
                let mut vertex = vertices[slot];
                vertex.position = [p.x as f32, p.y as f32, p.z as f32];
                out_vertices.push(vertex);
            }
            out_indices.push(remap[slot]);
        }
    }

    recompute_normals(&mut out_vertices, &out_indices);

    SimplifiedMesh {
        vertices: out_vertices,
        indices: out_indices,
        error,
    }
}

// ============================================================================
// SIMPLIFICATION
// ============================================================================

/// Collapse edges cheapest first until the target or the error limit is hit
pub fn simplify_quadric(
    vertices: &[Vertex],
    indices: &[u32],
    target_index_count: usize,
    max_error: f32,
) -> EngineResult<SimplifiedMesh> {
    validate_indices(vertices.len(), indices)?;
    if !max_error.is_finite() || max_error < 0.0 {
        return Err(invalid_config(
            "lod.max_error",
            max_error,
            "must be a finite non-negative number",
        ));
    }

    let (mut state, edges) = build_collapse_state(vertices, indices);
    let target_triangles = target_index_count / 3;
    let extent = (aabb_diagonal_length(&mesh_bounds(vertices)) as f64).max(f64::EPSILON);
    let error_limit = (max_error as f64 * extent).powi(2);

    let mut queue: BinaryHeap<CollapseCandidate> = edges
        .iter()
        .map(|&(v0, v1)| compute_candidate(&state, v0, v1))
        .collect();

    let mut worst = 0.0f64;
    let mut collapses = 0usize;
    while state.live_faces > target_triangles {
        let Some(candidate) = queue.pop() else {
            break;
        };
        if is_stale(&state, &candidate) {
            continue;
        }
        if candidate.error > error_limit {
            break;
        }
        if collapse_flips_face(&state, &candidate) {
            continue;
        }

        worst = worst.max(candidate.error);
        collapse_edge(&mut state, &candidate);
        collapses += 1;

        for neighbor in live_neighbors(&state, candidate.keep) {
            queue.push(compute_candidate(&state, candidate.keep, neighbor));
        }
    }

    log::debug!(
        "[simplify_quadric] {} -> {} triangles after {} collapses (target {})",
        indices.len() / 3,
        state.live_faces,
        collapses,
        target_triangles
    );

    Ok(build_simplified_mesh(&state, vertices, worst.sqrt() as f32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meshlet::mesh_utils::{create_grid_mesh, create_sphere_mesh, validate_indices};

    #[test]
    fn test_flat_grid_reduces_without_error() {
        let grid = create_grid_mesh(16, 16, 8.0);
        let target = grid.indices.len() / 2;
        let result = QuadricSimplifier
            .simplify(&grid.vertices, &grid.indices, target, 1.0)
            .unwrap();

        assert!(result.indices.len() <= grid.indices.len() * 3 / 4);
        assert!(!result.indices.is_empty());
        assert!(result.error < 1e-3);
        validate_indices(result.vertices.len(), &result.indices).unwrap();
        assert!(result.vertices.iter().all(|v| v.position[1].abs() < 1e-5));
    }

    #[test]
    fn test_sphere_reports_error() {
        let sphere = create_sphere_mesh(24, 16, 2.0);
        let target = (sphere.indices.len() / 3) * 55 / 100 * 3;
        let result = QuadricSimplifier
            .simplify(&sphere.vertices, &sphere.indices, target, 1.0)
            .unwrap();

        assert!(result.indices.len() < sphere.indices.len());
        assert!(result.error > 0.0);
        assert!(result.error < 2.0);
    }

    #[test]
    fn test_target_above_count_keeps_mesh() {
        let grid = create_grid_mesh(4, 4, 1.0);
        let result = QuadricSimplifier
            .simplify(&grid.vertices, &grid.indices, grid.indices.len(), 1.0)
            .unwrap();
        assert_eq!(result.indices.len(), grid.indices.len());
        assert_eq!(result.error, 0.0);
    }

    #[test]
    fn test_zero_error_budget_blocks_curved_collapses() {
        let sphere = create_sphere_mesh(16, 8, 1.0);
        let result = QuadricSimplifier
            .simplify(&sphere.vertices, &sphere.indices, 0, 0.0)
            .unwrap();
        assert!(result.error < 1e-3);
        assert!(!result.indices.is_empty());
    }

    #[test]
    fn test_rejects_bad_input() {
        let grid = create_grid_mesh(2, 2, 1.0);
        assert!(QuadricSimplifier.simplify(&grid.vertices, &[0, 1, 99], 0, 1.0).is_err());
        assert!(QuadricSimplifier
            .simplify(&grid.vertices, &grid.indices, 0, f32::NAN)
            .is_err());
    }
}
