//! Meshlet clusterer operations - Pure DOP functions
//!
//! Greedy bounded bin packing: one cluster grows through edge-adjacent
//! triangles until the next candidate would break a limit, then it is
//! flushed and growth restarts from the rejected triangle.

use super::adjacency::{build_adjacency, edge_neighbors, AdjacencyData};
use super::clusterer_data::{ClusterTriangle, Meshlet, MeshletCache, MeshletConfig, TriangleOrdering};
use super::index_reorder::tipsify_indices;
use super::mesh_data::Vertex;
use super::mesh_utils::{is_degenerate, vertex_position};
use crate::bounds::{aabb_expand_point, aabb_empty, aabb_extent};
use crate::constants::meshlet::{MAX_PRIMITIVES_LIMIT, MAX_VERTICES_LIMIT};
use crate::error::{invalid_config, EngineResult};
use bit_vec::BitVec;
use cgmath::Point3;
use std::collections::VecDeque;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Limits must leave room for at least one triangle and fit u8 local indices
pub fn validate_meshlet_config(config: &MeshletConfig) -> EngineResult<()> {
    if config.max_vertices < 3 || config.max_vertices > MAX_VERTICES_LIMIT {
        return Err(invalid_config(
            "meshlet.max_vertices",
            config.max_vertices,
            "must be within 3..=256",
        ));
    }

    if config.max_primitives < 1 || config.max_primitives > MAX_PRIMITIVES_LIMIT {
        return Err(invalid_config(
            "meshlet.max_primitives",
            config.max_primitives,
            "must be within 1..=255",
        ));
    }

    if config.reorder_for_cache && config.cache_size < 3 {
        return Err(invalid_config(
            "meshlet.cache_size",
            config.cache_size,
            "must hold at least one triangle",
        ));
    }

    Ok(())
}

// ============================================================================
// TRIANGLE SETUP
// ============================================================================

/// Triangles with their edge neighbors and centroids
pub fn build_cluster_triangles(
    vertices: &[Vertex],
    indices: &[u32],
    adjacency: &AdjacencyData,
) -> Vec<ClusterTriangle> {
    indices
        .chunks_exact(3)
        .enumerate()
        .map(|(triangle, chunk)| {
            let a = vertex_position(&vertices[chunk[0] as usize]);
            let b = vertex_position(&vertices[chunk[1] as usize]);
            let c = vertex_position(&vertices[chunk[2] as usize]);
            ClusterTriangle {
                indices: [chunk[0], chunk[1], chunk[2]],
                neighbors: edge_neighbors(adjacency, indices, triangle as u32),
                centroid: Point3::new(
                    (a.x + b.x + c.x) / 3.0,
                    (a.y + b.y + c.y) / 3.0,
                    (a.z + b.z + c.z) / 3.0,
                ),
            }
        })
        .collect()
}

/// Order in which the re-seed scan visits triangles
pub fn seed_order(triangles: &[ClusterTriangle], ordering: TriangleOrdering) -> Vec<u32> {
    let mut order: Vec<u32> = (0..triangles.len() as u32).collect();

    if ordering == TriangleOrdering::CentroidSorted && !triangles.is_empty() {
        let mut bounds = aabb_empty();
        for triangle in triangles {
            aabb_expand_point(&mut bounds, triangle.centroid);
        }
        let extent = aabb_extent(&bounds);
        let axis = if extent.x >= extent.y && extent.x >= extent.z {
            0
        } else if extent.y >= extent.z {
            1
        } else {
            2
        };

        order.sort_by(|&a, &b| {
            let ca = triangles[a as usize].centroid;
            let cb = triangles[b as usize].centroid;
            ca[axis].total_cmp(&cb[axis])
        });
    }

    order
}

// ============================================================================
// CLUSTERING
// ============================================================================

/// Partition an indexed mesh into meshlets
///
/// Every non-degenerate triangle lands in exactly one meshlet; triangles
/// that repeat a vertex index are skipped.
pub fn cluster_meshlets(
    vertices: &[Vertex],
    indices: &[u32],
    config: &MeshletConfig,
) -> EngineResult<Vec<Meshlet>> {
    validate_meshlet_config(config)?;

    if config.reorder_for_cache {
        let reordered = tipsify_indices(vertices.len(), indices, config.cache_size)?;
        let adjacency = build_adjacency(vertices.len(), &reordered)?;
        let triangles = build_cluster_triangles(vertices, &reordered, &adjacency);
        return Ok(cluster_triangles(&triangles, config));
    }

    let adjacency = build_adjacency(vertices.len(), indices)?;
    let triangles = build_cluster_triangles(vertices, indices, &adjacency);
    Ok(cluster_triangles(&triangles, config))
}

/// Greedy frontier growth over prepared triangles
pub fn cluster_triangles(triangles: &[ClusterTriangle], config: &MeshletConfig) -> Vec<Meshlet> {
    let order = seed_order(triangles, config.ordering);
    let mut consumed = BitVec::from_elem(triangles.len(), false);
    let mut frontier: VecDeque<u32> = VecDeque::new();
    let mut cache = MeshletCache::default();
    let mut meshlets = Vec::new();
    let mut cursor = 0usize;
    let mut skipped = 0usize;

    loop {
        let candidate = match frontier.pop_front() {
            Some(candidate) => candidate,
            None => {
                // Frontier exhausted: re-seed from the next unconsumed triangle
                while cursor < order.len() && consumed[order[cursor] as usize] {
                    cursor += 1;
                }
                match order.get(cursor) {
                    Some(&seed) => {
                        frontier.push_back(seed);
                        continue;
                    }
                    None => break,
                }
            }
        };

        let slot = candidate as usize;
        if consumed[slot] {
            continue;
        }

        let triangle = &triangles[slot];
        if is_degenerate(triangle.indices) {
            consumed.set(slot, true);
            skipped += 1;
            continue;
        }

        if cannot_insert(&cache, triangle.indices, config) {
            assert!(
                !cache.primitives.is_empty(),
                "a single triangle must always fit an empty meshlet"
            );
            flush_cache(&mut cache, &mut meshlets, config);
            frontier.clear();
            frontier.push_back(candidate);
            continue;
        }

        insert_triangle(&mut cache, triangle.indices);
        consumed.set(slot, true);

        for &neighbor in &triangle.neighbors {
            if !consumed[neighbor as usize] {
                frontier.push_back(neighbor);
            }
        }
    }

    if !cache.primitives.is_empty() {
        flush_cache(&mut cache, &mut meshlets, config);
    }

    log::debug!(
        "[cluster_triangles] {} triangles -> {} meshlets ({} degenerate skipped)",
        triangles.len(),
        meshlets.len(),
        skipped
    );

    meshlets
}

/// Would adding `triangle` push the cache past either limit
pub fn cannot_insert(cache: &MeshletCache, triangle: [u32; 3], config: &MeshletConfig) -> bool {
    let found = triangle
        .iter()
        .filter(|index| cache.local_index.contains_key(index))
        .count();
    let new_vertices = 3 - found;

    cache.vertices.len() + new_vertices > config.max_vertices as usize
        || cache.primitives.len() + 1 > config.max_primitives as usize
}

/// Append a triangle, assigning local slots to unseen vertices
pub fn insert_triangle(cache: &mut MeshletCache, triangle: [u32; 3]) {
    let mut primitive = [0u8; 3];
    for (corner, &index) in triangle.iter().enumerate() {
        let local = match cache.local_index.get(&index) {
            Some(&local) => local,
            None => {
                let local = cache.vertices.len() as u8;
                cache.vertices.push(index);
                cache.local_index.insert(index, local);
                local
            }
        };
        primitive[corner] = local;
    }
    cache.primitives.push(primitive);
}

/// Move the cache contents into the output list and reset it
///
/// Exceeding a limit here is a clusterer bug, never an input condition.
pub fn flush_cache(cache: &mut MeshletCache, meshlets: &mut Vec<Meshlet>, config: &MeshletConfig) {
    assert!(
        cache.vertices.len() <= config.max_vertices as usize
            && cache.primitives.len() <= config.max_primitives as usize,
        "meshlet exceeds configured limits: {} vertices, {} primitives",
        cache.vertices.len(),
        cache.primitives.len()
    );

    meshlets.push(Meshlet {
        vertices: std::mem::take(&mut cache.vertices),
        primitives: std::mem::take(&mut cache.primitives),
    });
    cache.local_index.clear();
}

/// Global vertex-index triples of a meshlet, in primitive order
pub fn meshlet_triangles(meshlet: &Meshlet) -> Vec<[u32; 3]> {
    meshlet
        .primitives
        .iter()
        .map(|p| {
            [
                meshlet.vertices[p[0] as usize],
                meshlet.vertices[p[1] as usize],
                meshlet.vertices[p[2] as usize],
            ]
        })
        .collect()
}
