//! Vertex-to-triangle incidence in compressed sparse row layout
//!
//! `triangle_data[offsets[v]..offsets[v] + triangles_per_vertex[v]]` lists every
//! triangle that references vertex `v`, in ascending triangle order.

use super::mesh_utils::validate_indices;
use crate::error::EngineResult;

/// CSR adjacency - pure data
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdjacencyData {
    /// Number of triangles referencing each vertex
    pub triangles_per_vertex: Vec<u32>,
    /// Start of each vertex's run in `triangle_data`
    pub offsets: Vec<u32>,
    /// Flattened triangle ids, 3 * triangle_count entries
    pub triangle_data: Vec<u32>,
}

/// Build incidence lists from an index buffer
///
/// Runs in O(indices). The only failure is a malformed buffer.
pub fn build_adjacency(vertex_count: usize, indices: &[u32]) -> EngineResult<AdjacencyData> {
    validate_indices(vertex_count, indices)?;

    let mut triangles_per_vertex = vec![0u32; vertex_count];
    for &index in indices {
        triangles_per_vertex[index as usize] += 1;
    }

    let mut offsets = Vec::with_capacity(vertex_count);
    let mut running = 0u32;
    for &count in &triangles_per_vertex {
        offsets.push(running);
        running += count;
    }

    // Fill each run through a moving cursor
    let mut cursor = offsets.clone();
    let mut triangle_data = vec![0u32; indices.len()];
    for (triangle, chunk) in indices.chunks_exact(3).enumerate() {
        for &index in chunk {
            let slot = &mut cursor[index as usize];
            triangle_data[*slot as usize] = triangle as u32;
            *slot += 1;
        }
    }

    log::debug!(
        "[build_adjacency] {} vertices, {} triangles",
        vertex_count,
        indices.len() / 3
    );

    Ok(AdjacencyData {
        triangles_per_vertex,
        offsets,
        triangle_data,
    })
}

/// Triangles incident to `vertex`
pub fn vertex_triangles(adjacency: &AdjacencyData, vertex: u32) -> &[u32] {
    let v = vertex as usize;
    match (adjacency.offsets.get(v), adjacency.triangles_per_vertex.get(v)) {
        (Some(&start), Some(&count)) => {
            &adjacency.triangle_data[start as usize..(start + count) as usize]
        }
        _ => &[],
    }
}

/// Triangles sharing at least one edge with `triangle`
///
/// A triangle referencing the same vertex twice is still treated by its
/// distinct edges. Output is sorted and free of duplicates.
pub fn edge_neighbors(adjacency: &AdjacencyData, indices: &[u32], triangle: u32) -> Vec<u32> {
    let base = triangle as usize * 3;
    let corners = [indices[base], indices[base + 1], indices[base + 2]];
    let mut neighbors = Vec::with_capacity(3);

    for edge in 0..3 {
        let a = corners[edge];
        let b = corners[(edge + 1) % 3];
        if a == b {
            continue;
        }

        for &other in vertex_triangles(adjacency, a) {
            if other == triangle {
                continue;
            }
            let other_base = other as usize * 3;
            if indices[other_base..other_base + 3].contains(&b) {
                neighbors.push(other);
            }
        }
    }

    neighbors.sort_unstable();
    neighbors.dedup();
    neighbors
}
