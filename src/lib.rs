// Meshlet LOD - Data-Oriented Programming (DOP) Architecture
//
// Load time: meshes -> LOD chains -> meshlets -> packed buffers + cull data -> DAG.
// Frame time: camera -> traversal cut -> coalesced draw batches.
//
// - *_data.rs files hold plain structs
// - *_operations.rs files hold free functions over them
// - Pure functions over methods

// Constants module
pub mod constants;

// Core modules
pub mod bounds;
pub mod config;
pub mod error;

// Load-time pipeline
pub mod lod;
pub mod meshlet;

// Frame-time selection
pub mod camera;
pub mod draw;
pub mod thread_pool;
pub mod traversal;

// Frame driver
pub mod lod_system_data;
pub mod lod_system_operations;

pub use bounds::AABB;
pub use camera::{CameraConfig, CameraData, Frustum};
pub use config::{load_config, save_config, LodSystemConfig};
pub use error::{EngineError, EngineResult, OptionExt};

// === Load-time types ===
pub use lod::{
    build_scene, DagNode, LodBuildConfig, LodDag, LodScene, MeshSimplifier, NodeRef,
    ProcessingError, QuadricSimplifier,
};
pub use meshlet::{
    Meshlet, MeshletConfig, MeshletCullData, MeshletDescriptor, MeshData, NamedMesh,
    PackedMeshletGeometry, PackingConfig, Vertex,
};

// === Frame-time types ===
pub use draw::{DrawBatch, DrawConfig};
pub use thread_pool::SchedulerConfig;
pub use traversal::{SelectionConfig, SelectionPolicy};

pub use lod_system_data::{FrameResult, FrameStats, FrameTotals, LodSystemData, SelectionMode};
pub use lod_system_operations::{
    accumulate_frame_stats, create_lod_system, create_lod_system_from_scene,
    invalidate_selection, log_frame_totals, selection_mode, set_selection_config, update_frame,
};
