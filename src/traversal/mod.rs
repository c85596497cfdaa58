//! Traversal Module - per-frame selection of a cut through the LOD DAG

pub mod scheduler;
pub mod traversal_data;
pub mod traversal_operations;

pub use traversal_data::{
    CameraSnapshot, NodeDecision, SelectionConfig, SelectionParams, SelectionPolicy,
    TraversalCounters, TraversalFrame, TraversalOutcome, TraversalPhase, TraversalScheduler,
    TraversalTask,
};

// Re-export DOP operations
pub use scheduler::{create_traversal_scheduler, run_traversal, run_traversal_inline};
pub use traversal_operations::{
    camera_snapshot, dag_max_lod, discrete_level, enforce_cut, evaluate_node, is_valid_cut,
    level_threshold, prepare_thresholds, projected_pixels, select_discrete_lod,
    select_locked_lod, selection_params, should_debounce, validate_selection_config,
};
