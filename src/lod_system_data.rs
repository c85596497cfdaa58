//! LOD system data structures - Pure DOP
//!
//! NO METHODS. Just data.
//! Ties one preprocessed scene to the per-frame selection machinery.

use crate::camera::CameraData;
use crate::config::LodSystemConfig;
use crate::draw::{BatchPool, DrawBatch};
use crate::lod::{LodScene, NodeRef};
use crate::traversal::TraversalScheduler;
use cgmath::Point3;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the current frame picks nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// One fixed level for every mesh
    Locked(u32),
    /// One level per mesh by distance to its center
    Discrete,
    /// Concurrent DAG traversal
    Continuous,
}

pub struct LodSystemData {
    pub config: LodSystemConfig,
    pub scene: LodScene,
    pub scheduler: TraversalScheduler,
    pub batch_pool: BatchPool,
    /// Camera as of the last update, with derived velocity
    pub camera: CameraData,
    /// Last selection; reused while traversal is debounced
    pub selection: Vec<NodeRef>,
    pub last_mode: Option<SelectionMode>,
    /// Frame time accumulated since the last traversal; None before the first
    pub seconds_since_traversal: Option<f32>,
    pub last_traversal_position: Option<Point3<f32>>,
    pub frame_index: u64,
}

/// Everything measured for one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameStats {
    pub frame_index: u64,
    pub mode: SelectionMode,
    pub traversal_ran: bool,
    pub debounced: bool,
    pub nodes_visited: usize,
    pub nodes_culled: u64,
    /// Projected below the pixel threshold
    pub nodes_too_small: u64,
    pub nodes_selected: usize,
    /// Dropped from the selection because an ancestor was selected
    pub nodes_shadowed: usize,
    pub draw_calls: usize,
    pub meshlets_drawn: usize,
    pub triangles_drawn: u64,
    pub batches_dropped: usize,
    pub duplicates_skipped: usize,
    pub traversal_time: Duration,
}

/// Returned by every frame update
#[derive(Debug, Clone, PartialEq)]
pub struct FrameResult {
    pub batches: Vec<DrawBatch>,
    pub stats: FrameStats,
    pub selection: Vec<NodeRef>,
}

/// Caller-side running totals over many frames
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameTotals {
    pub frames: u64,
    pub traversals: u64,
    pub debounced: u64,
    pub draw_calls: u64,
    pub triangles_drawn: u64,
    pub batches_dropped: u64,
    pub traversal_time: Duration,
}
