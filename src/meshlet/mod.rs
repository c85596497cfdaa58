//! Meshlet Module - clustering, packing, and cull metadata

pub mod adjacency;
pub mod clusterer_data;
pub mod clusterer_operations;
pub mod cull_metadata;
pub mod index_reorder;
pub mod mesh_data;
pub mod mesh_utils;
pub mod meshlet_stats;
pub mod packer_data;
pub mod packer_operations;

pub use adjacency::{build_adjacency, edge_neighbors, vertex_triangles, AdjacencyData};
pub use clusterer_data::{ClusterTriangle, Meshlet, MeshletCache, MeshletConfig, TriangleOrdering};
pub use cull_metadata::MeshletCullData;
pub use mesh_data::{MeshData, NamedMesh, Vertex};
pub use meshlet_stats::MeshletStats;
pub use packer_data::{MeshletDescriptor, PackResult, PackedMeshletGeometry, PackingConfig};

// Re-export DOP operations
pub use clusterer_operations::{cluster_meshlets, meshlet_triangles, validate_meshlet_config};
pub use cull_metadata::{
    build_cull_metadata, decode_cone_axis, decode_cull_bounds, is_backface_cullable,
    is_cone_backfacing, meshlet_float_bounds,
};
pub use index_reorder::tipsify_indices;
pub use meshlet_stats::{compute_meshlet_stats, log_meshlet_stats, merge_meshlet_stats};
pub use packer_operations::{
    pack_all_meshlets, pack_meshlets, unpack_meshlet, validate_packing_config,
};
