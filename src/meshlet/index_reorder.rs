//! Vertex cache aware triangle reordering
//!
//! Linear-time "Tipsify" from Sander et al., "Fast Triangle Reordering for
//! Vertex Locality and Reduced Overdraw". Fans are emitted around a current
//! vertex; the next fanning vertex is the most recently cached neighbor that
//! will still be resident after its remaining triangles are emitted.

use super::adjacency::{build_adjacency, vertex_triangles};
use crate::error::EngineResult;
use bit_vec::BitVec;

/// Reorder an index buffer for post-transform cache reuse
///
/// The output holds the same triangles, each with its original winding.
pub fn tipsify_indices(
    vertex_count: usize,
    indices: &[u32],
    cache_size: u32,
) -> EngineResult<Vec<u32>> {
    let adjacency = build_adjacency(vertex_count, indices)?;
    let triangle_total = indices.len() / 3;
    if triangle_total == 0 {
        return Ok(Vec::new());
    }

    let cache_size = cache_size as i64;
    let mut live_triangles: Vec<i64> = adjacency
        .triangles_per_vertex
        .iter()
        .map(|&count| count as i64)
        .collect();
    let mut cache_stamps = vec![0i64; vertex_count];
    let mut dead_ends: Vec<u32> = Vec::new();
    let mut emitted = BitVec::from_elem(triangle_total, false);
    let mut output = Vec::with_capacity(indices.len());

    let mut stamp = cache_size + 1;
    let mut cursor = 1usize;
    let mut current = Some(0u32);

    while let Some(vertex) = current {
        let mut one_ring = Vec::new();

        for &triangle in vertex_triangles(&adjacency, vertex) {
            let slot = triangle as usize;
            if emitted[slot] {
                continue;
            }

            let corners = &indices[slot * 3..slot * 3 + 3];
            output.extend_from_slice(corners);
            for &corner in corners {
                dead_ends.push(corner);
                one_ring.push(corner);
                live_triangles[corner as usize] -= 1;

                let c = corner as usize;
                if stamp - cache_stamps[c] > cache_size {
                    cache_stamps[c] = stamp;
                    stamp += 1;
                }
            }
            emitted.set(slot, true);
        }

        current = next_fanning_vertex(
            &one_ring,
            &live_triangles,
            &cache_stamps,
            stamp,
            cache_size,
        )
        .or_else(|| skip_dead_end(&mut dead_ends, &live_triangles, &mut cursor));
    }

    log::debug!(
        "[tipsify_indices] Reordered {} triangles with cache size {}",
        triangle_total,
        cache_size
    );

    Ok(output)
}

/// Best candidate among the vertices touched by the last fan
fn next_fanning_vertex(
    one_ring: &[u32],
    live_triangles: &[i64],
    cache_stamps: &[i64],
    stamp: i64,
    cache_size: i64,
) -> Option<u32> {
    let mut best = None;
    let mut best_priority = -1i64;

    for &candidate in one_ring {
        let c = candidate as usize;
        if live_triangles[c] <= 0 {
            continue;
        }

        // Stays in cache after its fan is emitted
        let age = stamp - cache_stamps[c];
        let priority = if age + 2 * live_triangles[c] <= cache_size {
            age
        } else {
            0
        };

        if priority > best_priority {
            best_priority = priority;
            best = Some(candidate);
        }
    }

    best
}

/// Recently used vertex with live triangles, else the next one in index order
fn skip_dead_end(dead_ends: &mut Vec<u32>, live_triangles: &[i64], cursor: &mut usize) -> Option<u32> {
    while let Some(candidate) = dead_ends.pop() {
        if live_triangles[candidate as usize] > 0 {
            return Some(candidate);
        }
    }

    while *cursor < live_triangles.len() {
        if live_triangles[*cursor] > 0 {
            return Some(*cursor as u32);
        }
        *cursor += 1;
    }

    None
}

/// Average cache miss ratio (misses per triangle) under a FIFO cache
pub fn average_cache_miss_ratio(indices: &[u32], cache_size: u32) -> f32 {
    let triangle_total = indices.len() / 3;
    if triangle_total == 0 {
        return 0.0;
    }

    let mut fifo: std::collections::VecDeque<u32> = std::collections::VecDeque::new();
    let mut misses = 0usize;
    for &index in indices {
        if fifo.contains(&index) {
            continue;
        }
        misses += 1;
        fifo.push_back(index);
        if fifo.len() > cache_size as usize {
            fifo.pop_front();
        }
    }

    misses as f32 / triangle_total as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meshlet::mesh_utils::{create_cube_mesh, create_grid_mesh};
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    fn sorted_triangles(indices: &[u32]) -> Vec<[u32; 3]> {
        let mut triangles: Vec<[u32; 3]> = indices
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect();
        triangles.sort_unstable();
        triangles
    }

    #[test]
    fn test_output_is_a_permutation() {
        let grid = create_grid_mesh(10, 10, 5.0);
        let reordered = tipsify_indices(grid.vertices.len(), &grid.indices, 16).unwrap();
        assert_eq!(sorted_triangles(&reordered), sorted_triangles(&grid.indices));

        let cube = create_cube_mesh();
        let reordered = tipsify_indices(cube.vertices.len(), &cube.indices, 8).unwrap();
        assert_eq!(sorted_triangles(&reordered), sorted_triangles(&cube.indices));
    }

    #[test]
    fn test_shuffled_grid_gets_fewer_misses() {
        let grid = create_grid_mesh(24, 24, 12.0);
        let mut triangles: Vec<[u32; 3]> = grid
            .indices
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect();
        let mut rng = rand::rngs::StdRng::seed_from_u64(3);
        triangles.shuffle(&mut rng);
        let shuffled: Vec<u32> = triangles.into_iter().flatten().collect();

        let reordered = tipsify_indices(grid.vertices.len(), &shuffled, 16).unwrap();
        assert!(
            average_cache_miss_ratio(&reordered, 16) < average_cache_miss_ratio(&shuffled, 16)
        );
    }

    #[test]
    fn test_unused_vertices_and_empty_input() {
        // Vertex 0 has no triangles; the cursor scan finds the rest
        let indices = [1, 2, 3, 3, 2, 4];
        let reordered = tipsify_indices(5, &indices, 16).unwrap();
        assert_eq!(sorted_triangles(&reordered), sorted_triangles(&indices));
        assert!(tipsify_indices(0, &[], 16).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_buffer_is_an_error() {
        assert!(tipsify_indices(3, &[0, 1, 7], 16).is_err());
    }
}
