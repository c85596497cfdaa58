//! Traversal data structures - Pure DOP
//!
//! NO METHODS. Just data.
//! A traversal is one pass over the LOD DAG that picks the nodes to draw.
//! Per-pass state lives in a `TraversalFrame` shared by every task of
//! that pass and dropped when it drains.

use crate::camera::Frustum;
use crate::constants::lod::{
    DEBOUNCE_SCALE, DEFAULT_THRESHOLDS, PIXEL_THRESHOLD, SSE_THRESHOLD,
    THRESHOLD_EXTENSION_FACTOR, UNLOCKED,
};
use crate::constants::camera::{RESOLUTION_X, RESOLUTION_Y};
use crate::lod::{LodDag, NodeRef};
use crate::thread_pool::WorkerPoolData;
use cgmath::Point3;
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;

/// How a node decides between drawing itself and expanding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Expand while closer than the node level's threshold
    #[default]
    Distance,
    /// Distance test, then projected simplification error
    ScreenSpaceError,
}

/// Per-frame selection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub policy: SelectionPolicy,
    /// Ascending distance per LOD, extended past the table when needed
    pub thresholds: Vec<f32>,
    /// Multiplies every threshold; scales selection to the scene size
    pub threshold_scale: f32,
    pub extension_factor: f32,
    /// Nodes projecting smaller than this many pixels are skipped
    pub pixel_threshold: f32,
    /// Projected error in pixels below which a node is drawn
    pub sse_threshold: f32,
    /// Render target size in pixels (x, y)
    pub resolution: [u32; 2],
    /// -1 traverses the DAG; L >= 0 draws level L of every mesh
    pub locked_lod: i32,
    /// Seconds of traversal delay per unit of camera speed
    pub debounce_scale: f32,
    /// One whole level per mesh chosen by distance to the mesh center
    pub discrete: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            policy: SelectionPolicy::Distance,
            thresholds: DEFAULT_THRESHOLDS.to_vec(),
            threshold_scale: 1.0,
            extension_factor: THRESHOLD_EXTENSION_FACTOR,
            pixel_threshold: PIXEL_THRESHOLD,
            sse_threshold: SSE_THRESHOLD,
            resolution: [RESOLUTION_X, RESOLUTION_Y],
            locked_lod: UNLOCKED,
            debounce_scale: DEBOUNCE_SCALE,
            discrete: false,
        }
    }
}

/// Read-only camera state every task of one traversal sees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSnapshot {
    pub position: Point3<f32>,
    pub frustum: Frustum,
    pub fov_radians: f32,
}

/// Settings resolved once per traversal
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionParams {
    pub policy: SelectionPolicy,
    /// One entry per DAG level, scaled
    pub thresholds: Vec<f32>,
    pub pixel_threshold: f32,
    pub sse_threshold: f32,
    pub resolution: [u32; 2],
}

/// Outcome of evaluating one node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeDecision {
    /// Outside the frustum
    Culled,
    /// Projects below the pixel threshold
    TooSmall,
    Select,
    Expand,
}

/// Lifecycle of the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraversalPhase {
    #[default]
    Idle,
    /// Roots enqueued
    Scheduled,
    /// Workers evaluating nodes
    Expanding,
    /// Queue empty and nothing in flight
    Drained,
}

/// Lock-free tallies for one traversal
#[derive(Debug, Default)]
pub struct TraversalCounters {
    pub evaluated: AtomicU64,
    pub culled: AtomicU64,
    pub too_small: AtomicU64,
    pub expanded: AtomicU64,
}

/// Shared state of one traversal
///
/// Only `visited` and `selected` are written by tasks, each under its own
/// lock with O(1) work inside.
#[derive(Debug)]
pub struct TraversalFrame {
    pub dag: Arc<LodDag>,
    pub camera: CameraSnapshot,
    pub params: SelectionParams,
    pub visited: Mutex<FxHashSet<u32>>,
    pub selected: Mutex<Vec<NodeRef>>,
    pub counters: TraversalCounters,
}

/// One unit of work: evaluate `node_ref` against the frame's camera
#[derive(Debug, Clone)]
pub struct TraversalTask {
    pub node_ref: NodeRef,
    pub frame: Arc<TraversalFrame>,
}

/// What one traversal produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraversalOutcome {
    /// Cut nodes, sorted by (level, index)
    pub selected: Vec<NodeRef>,
    pub visited: usize,
    pub evaluated: u64,
    pub culled: u64,
    pub too_small: u64,
    pub expanded: u64,
    /// Selected nodes dropped because an ancestor was also selected
    pub shadowed: usize,
    pub elapsed: Duration,
}

/// Worker pool plus bookkeeping across traversals
pub struct TraversalScheduler {
    pub pool: WorkerPoolData<TraversalTask>,
    pub phase: TraversalPhase,
    pub traversals: u64,
}
