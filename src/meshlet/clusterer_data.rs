//! Meshlet clusterer data structures - Pure DOP
//!
//! NO METHODS. Just data.
//! The greedy growth algorithm lives in clusterer_operations.rs

use crate::constants::meshlet::{MAX_PRIMITIVES, MAX_VERTICES, VERTEX_CACHE_SIZE};
use cgmath::Point3;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Order in which unreached triangles are picked as new seeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriangleOrdering {
    /// Scan the index buffer front to back
    #[default]
    InputOrder,
    /// Scan by centroid along the longest axis of the mesh bounds
    CentroidSorted,
}

/// Meshlet size limits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshletConfig {
    /// Unique vertices per meshlet (V_max)
    pub max_vertices: u32,
    /// Primitives per meshlet (P_max)
    pub max_primitives: u32,
    pub ordering: TriangleOrdering,
    /// Reorder the index buffer for vertex cache locality before clustering
    pub reorder_for_cache: bool,
    pub cache_size: u32,
}

/// Triangle view used while clustering
/// Transient: dropped once meshlets are emitted
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterTriangle {
    pub indices: [u32; 3],
    /// Triangles sharing an edge with this one
    pub neighbors: Vec<u32>,
    pub centroid: Point3<f32>,
}

/// One bounded cluster
///
/// `vertices` holds global vertex indices in first-use order; each primitive
/// is a triple of local indices into `vertices`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Meshlet {
    pub vertices: Vec<u32>,
    pub primitives: Vec<[u8; 3]>,
}

/// In-progress cluster
#[derive(Debug, Clone, Default)]
pub struct MeshletCache {
    pub vertices: Vec<u32>,
    pub primitives: Vec<[u8; 3]>,
    /// Global vertex index -> local slot
    pub local_index: FxHashMap<u32, u8>,
}

impl Default for MeshletConfig {
    fn default() -> Self {
        Self {
            max_vertices: MAX_VERTICES,
            max_primitives: MAX_PRIMITIVES,
            ordering: TriangleOrdering::InputOrder,
            reorder_for_cache: false,
            cache_size: VERTEX_CACHE_SIZE,
        }
    }
}
