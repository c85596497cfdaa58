//! LOD Module - simplification chains, scene assembly, and the LOD DAG

pub mod dag_data;
pub mod dag_operations;
pub mod error;
pub mod lod_chain_data;
pub mod lod_chain_operations;
pub mod scene_data;
pub mod scene_operations;
pub mod simplifier;

pub use dag_data::{DagNode, LodDag, NodeRef};
pub use error::{
    record_processing_error, report_processing_errors, LodErrorContext, LodResult,
    ProcessingError, ProcessingReport,
};
pub use lod_chain_data::{LodBuildConfig, LodChain, LodLevel};
pub use scene_data::{LodScene, MeshLevel, MeshletSlot, SceneMesh};
pub use simplifier::{MeshSimplifier, QuadricSimplifier, SimplifiedMesh};

// Re-export DOP operations
pub use dag_operations::{
    build_dag, collect_descendants, dag_edge_count, dag_node, dag_node_by_id, dag_node_count,
    has_ancestor_in, is_acyclic, is_leaf, level_nodes, validate_dag,
};
pub use lod_chain_operations::{build_lod_chain, chain_max_lod, validate_lod_build_config};
pub use scene_operations::{build_scene, mesh_level, meshlet_counts, meshlet_slots};
